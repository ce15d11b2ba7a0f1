use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::EngineResult;
use crate::progress::SessionExport;
use crate::rotation::PassageId;
use crate::sensing::{SamplingStatus, SensingController, SensorSample, SensorSource};
use crate::timer::Stopwatch;

use super::engine::{AdvanceResult, PassageView, ScrollEngine};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

const COMMAND_QUEUE_DEPTH: usize = 256;
const EVENT_QUEUE_DEPTH: usize = 32;

/// Latest state of the open passage, published after every change.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub passage: Option<PassageId>,
    pub progress: f64,
    pub completed: bool,
    pub elapsed_secs: f64,
    pub samples_logged: usize,
    pub invert_control: bool,
    pub finished: bool,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    PassageStarted(PassageView),
    PassageCompleted(PassageId),
    SessionFinished(SessionExport),
}

/// Messages processed by the controller task, strictly in arrival order.
pub enum EngineCommand {
    Begin {
        reply: oneshot::Sender<EngineResult<PassageView>>,
    },
    /// `run` is set for samples forwarded by a sampling loop; the sample is discarded if
    /// that run has been stopped.
    Sample {
        sample: SensorSample,
        run: Option<CancellationToken>,
    },
    Advance {
        reply: oneshot::Sender<EngineResult<AdvanceResult>>,
    },
    Finish {
        reply: oneshot::Sender<EngineResult<SessionExport>>,
    },
    Rewind {
        reply: oneshot::Sender<EngineResult<()>>,
    },
    SetInvertControl(bool),
    Snapshot {
        reply: oneshot::Sender<ProgressSnapshot>,
    },
    Shutdown,
}

/// Handle to the task that owns the [`ScrollEngine`]. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    commands: mpsc::Sender<EngineCommand>,
    progress: watch::Receiver<ProgressSnapshot>,
    events: broadcast::Sender<EngineEvent>,
    sensing: Arc<Mutex<SensingController>>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
    sample_interval: Duration,
}

impl SessionController {
    /// Moves `engine` into a new controller task. Must be called inside a tokio runtime.
    pub fn spawn(engine: ScrollEngine) -> Self {
        let sample_interval = engine.config().sample_interval;
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (progress_tx, progress) = watch::channel(ProgressSnapshot {
            invert_control: engine.invert_control(),
            ..ProgressSnapshot::default()
        });
        let (events, _) = broadcast::channel(EVENT_QUEUE_DEPTH);

        let actor = EngineActor {
            engine,
            stopwatch: Stopwatch::new(),
            progress: progress_tx,
            events: events.clone(),
        };
        let worker = tokio::spawn(actor.run(rx));

        Self {
            commands,
            progress,
            events,
            sensing: Arc::new(Mutex::new(SensingController::new())),
            worker: Arc::new(Mutex::new(Some(worker))),
            sample_interval,
        }
    }

    /// Watch channel carrying the latest [`ProgressSnapshot`].
    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn begin(&self) -> Result<PassageView> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Begin { reply }).await?;
        Ok(Self::recv(rx).await??)
    }

    /// Entry point for platforms that push readings instead of being polled.
    pub async fn push_sample(&self, sample: SensorSample) -> Result<()> {
        self.send(EngineCommand::Sample { sample, run: None }).await
    }

    pub async fn advance(&self) -> Result<AdvanceResult> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Advance { reply }).await?;
        Ok(Self::recv(rx).await??)
    }

    pub async fn finish(&self) -> Result<SessionExport> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Finish { reply }).await?;
        Ok(Self::recv(rx).await??)
    }

    pub async fn rewind(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Rewind { reply }).await?;
        Ok(Self::recv(rx).await??)
    }

    pub async fn set_invert_control(&self, invert: bool) -> Result<()> {
        self.send(EngineCommand::SetInvertControl(invert)).await
    }

    /// Snapshot taken after every command queued before this call has been applied.
    pub async fn snapshot(&self) -> Result<ProgressSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(EngineCommand::Snapshot { reply }).await?;
        Self::recv(rx).await
    }

    pub async fn start_sampling<S: SensorSource>(&self, source: S) -> Result<SamplingStatus> {
        self.sensing
            .lock()
            .await
            .start_sampling(source, self.sample_interval, self.commands.clone())
    }

    pub async fn stop_sampling(&self) -> Result<()> {
        self.sensing.lock().await.stop_sampling().await
    }

    pub async fn is_sampling(&self) -> bool {
        self.sensing.lock().await.is_active()
    }

    /// Stops sampling and waits for the controller task to exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.stop_sampling().await?;
        // The task may already be gone; joining below reports that.
        let _ = self.commands.send(EngineCommand::Shutdown).await;

        if let Some(handle) = self.worker.lock().await.take() {
            handle
                .await
                .context("session controller task failed to join")?;
        }
        Ok(())
    }

    async fn send(&self, command: EngineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("session controller task is not running"))
    }

    async fn recv<T>(rx: oneshot::Receiver<T>) -> Result<T> {
        rx.await
            .map_err(|_| anyhow!("session controller dropped the reply"))
    }
}

struct EngineActor {
    engine: ScrollEngine,
    stopwatch: Stopwatch,
    progress: watch::Sender<ProgressSnapshot>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineActor {
    async fn run(mut self, mut rx: mpsc::Receiver<EngineCommand>) {
        while let Some(command) = rx.recv().await {
            if matches!(command, EngineCommand::Shutdown) {
                break;
            }
            self.handle(command);
        }
        log_info!("session controller task exiting");
    }

    fn handle(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Begin { reply } => {
                let result = self.engine.begin();
                if let Ok(view) = &result {
                    self.passage_opened(view);
                }
                let _ = reply.send(result);
            }
            EngineCommand::Sample { sample, run } => {
                if run.as_ref().is_some_and(CancellationToken::is_cancelled) {
                    log_debug!("discarding sample from a stopped sampling run");
                    return;
                }
                self.on_sample(sample);
            }
            EngineCommand::Advance { reply } => {
                let result = self.engine.advance();
                match &result {
                    Ok(AdvanceResult::NextPassage(view)) => self.passage_opened(view),
                    Ok(AdvanceResult::Finished(export)) => self.session_finished(export),
                    Err(err) => log_error!("advance failed: {err}"),
                }
                let _ = reply.send(result);
            }
            EngineCommand::Finish { reply } => {
                let result = self.engine.finish();
                if let Ok(export) = &result {
                    self.session_finished(export);
                }
                let _ = reply.send(result);
            }
            EngineCommand::Rewind { reply } => {
                let result = self.engine.rewind();
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            EngineCommand::SetInvertControl(invert) => {
                self.engine.set_invert_control(invert);
                self.publish();
            }
            EngineCommand::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }
            EngineCommand::Shutdown => {}
        }
    }

    fn on_sample(&mut self, sample: SensorSample) {
        let elapsed = self.stopwatch.round_time();
        let Some(outcome) = self.engine.on_sample(sample, elapsed) else {
            return;
        };

        if outcome.completed_now {
            let _ = self
                .events
                .send(EngineEvent::PassageCompleted(outcome.passage));
        }
        self.publish();
    }

    fn passage_opened(&mut self, view: &PassageView) {
        self.stopwatch.restart();
        let _ = self.events.send(EngineEvent::PassageStarted(view.clone()));
        self.publish();
    }

    fn session_finished(&mut self, export: &SessionExport) {
        self.stopwatch.stop();
        let _ = self.events.send(EngineEvent::SessionFinished(export.clone()));
        self.publish();
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            passage: self.engine.current().map(|view| view.id),
            progress: self.engine.progress(),
            completed: self.engine.is_passage_completed(),
            elapsed_secs: self.stopwatch.round_time(),
            samples_logged: self.engine.pending_samples(),
            invert_control: self.engine.invert_control(),
            finished: self.engine.is_finished(),
        }
    }

    fn publish(&self) {
        self.progress.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::JsonCorpus;
    use crate::error::EngineError;
    use crate::focus::MonospaceMetrics;
    use crate::rotation::{PassageCategory, TextRotationEngine, Variant};
    use crate::sensing::ScriptedSensor;
    use crate::settings::RunConfig;
    use crate::tilt::MappingMode;
    use approx::assert_relative_eq;

    fn controller(mapping_mode: MappingMode) -> SessionController {
        let config = RunConfig {
            mapping_mode,
            total_iterations: 1,
            sample_interval: Duration::from_millis(1),
            ..RunConfig::default()
        };
        let corpus = JsonCorpus::new()
            .with_passage(PassageId::acclimation(), "a".repeat(100))
            .with_passage(
                PassageId::new(PassageCategory::Semantics, 1, Variant::B),
                "b".repeat(50),
            );
        let metrics = Box::new(MonospaceMetrics::from_font(&config.font));
        let rotation = TextRotationEngine::with_cursor(4, Variant::A);
        SessionController::spawn(ScrollEngine::with_rotation(
            config,
            Box::new(corpus),
            metrics,
            rotation,
        ))
    }

    #[tokio::test]
    async fn test_pushed_samples_update_progress() {
        let controller = controller(MappingMode::Linear);
        let view = controller.begin().await.unwrap();
        assert!(view.id.is_acclimation());

        controller
            .push_sample(SensorSample::new(0.0, 0.5))
            .await
            .unwrap();
        controller
            .push_sample(SensorSample::new(0.02, 0.5))
            .await
            .unwrap();

        let snapshot = controller.snapshot().await.unwrap();
        assert_relative_eq!(snapshot.progress, 0.01, epsilon = 1e-12);
        assert_eq!(snapshot.samples_logged, 2);
        let published = controller.progress().borrow().clone();
        assert_eq!(published.passage, snapshot.passage);
        assert_relative_eq!(published.progress, snapshot.progress, epsilon = 1e-12);

        controller.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_samples_from_cancelled_run_are_discarded() {
        let controller = controller(MappingMode::Linear);
        controller.begin().await.unwrap();

        let run = CancellationToken::new();
        run.cancel();
        controller
            .send(EngineCommand::Sample {
                sample: SensorSample::new(0.0, 0.5),
                run: Some(run),
            })
            .await
            .unwrap();

        let snapshot = controller.snapshot().await.unwrap();
        assert_eq!(snapshot.progress, 0.0);
        assert_eq!(snapshot.samples_logged, 0);
    }

    #[tokio::test]
    async fn test_sampling_loop_drives_passage_to_completion() {
        let controller = controller(MappingMode::Impatient);
        let mut events = controller.subscribe();
        controller.begin().await.unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            EngineEvent::PassageStarted(_)
        ));

        let sensor = ScriptedSensor::from_accelerations(0.02, &[2.5; 500]);
        let status = controller.start_sampling(sensor).await.unwrap();
        assert_eq!(status, SamplingStatus::Started);
        assert!(controller.start_sampling(ScriptedSensor::default()).await.is_err());

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, EngineEvent::PassageCompleted(id) if id.is_acclimation()));

        controller.stop_sampling().await.unwrap();
        assert!(!controller.is_sampling().await);

        let snapshot = controller.snapshot().await.unwrap();
        assert_eq!(snapshot.progress, 1.0);
        assert!(snapshot.completed);
    }

    #[tokio::test]
    async fn test_unavailable_sensor_degrades() {
        let controller = controller(MappingMode::Linear);
        controller.begin().await.unwrap();

        let status = controller
            .start_sampling(ScriptedSensor::unavailable())
            .await
            .unwrap();
        assert_eq!(status, SamplingStatus::Degraded);
        assert!(!controller.is_sampling().await);
        assert_eq!(controller.snapshot().await.unwrap().progress, 0.0);
    }

    #[tokio::test]
    async fn test_advance_through_final_passage_finishes() {
        let controller = controller(MappingMode::Linear);
        let mut events = controller.subscribe();
        controller.begin().await.unwrap();

        let AdvanceResult::NextPassage(view) = controller.advance().await.unwrap() else {
            panic!("expected the first real passage");
        };
        assert_eq!(view.id.to_string(), "1BSemantics");
        assert!(view.is_final);

        let AdvanceResult::Finished(export) = controller.advance().await.unwrap() else {
            panic!("expected the session to finish");
        };
        assert_eq!(export.passages.len(), 2);

        let err = controller.advance().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EngineError>(),
            Some(EngineError::SessionFinished)
        ));

        let mut saw_finished = false;
        while let Ok(event) = events.try_recv() {
            saw_finished |= matches!(event, EngineEvent::SessionFinished(_));
        }
        assert!(saw_finished);
        assert!(controller.snapshot().await.unwrap().finished);
    }

    #[tokio::test]
    async fn test_invert_toggle_and_rewind() {
        let controller = controller(MappingMode::Linear);
        controller.begin().await.unwrap();

        controller.set_invert_control(true).await.unwrap();
        controller
            .push_sample(SensorSample::new(0.0, -0.5))
            .await
            .unwrap();
        let snapshot = controller.snapshot().await.unwrap();
        assert!(snapshot.invert_control);
        assert_relative_eq!(snapshot.progress, 0.005, epsilon = 1e-12);

        controller.rewind().await.unwrap();
        assert_eq!(controller.snapshot().await.unwrap().progress, 0.0);
    }
}
