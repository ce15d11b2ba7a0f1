use anyhow::{bail, Context, Result};
use log::{info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::session::controller::EngineCommand;

use super::loop_worker::sampling_loop;
use super::source::SensorSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingStatus {
    Started,
    /// No accelerometer: the session keeps running but progress never changes.
    Degraded,
}

/// Owns at most one running sampling loop.
#[derive(Default)]
pub struct SensingController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl SensingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// False once the loop has exited, whether stopped or run dry.
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn start_sampling<S: SensorSource>(
        &mut self,
        source: S,
        interval: Duration,
        commands: mpsc::Sender<EngineCommand>,
    ) -> Result<SamplingStatus> {
        if self.is_active() {
            bail!("sampling already active");
        }
        if self.handle.take().is_some() {
            self.cancel_token = None;
            info!("previous sampling loop already exited");
        }

        if !source.is_available() {
            warn!("accelerometer unavailable, running without tilt input");
            return Ok(SamplingStatus::Degraded);
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(sampling_loop(
            source,
            interval,
            commands,
            cancel_token.clone(),
        ));

        info!("sampling started every {}ms", interval.as_millis());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(SamplingStatus::Started)
    }

    /// Cancels the run and waits for the loop to exit. Samples it already queued are
    /// discarded by the controller because their run token is now cancelled.
    pub async fn stop_sampling(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("sampling loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensing::ScriptedSensor;

    #[tokio::test]
    async fn test_exhausted_loop_can_be_restarted() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut sensing = SensingController::new();
        let interval = Duration::from_millis(1);

        let trace = ScriptedSensor::from_accelerations(0.001, &[0.5, 0.5]);
        let status = sensing.start_sampling(trace, interval, tx.clone()).unwrap();
        assert_eq!(status, SamplingStatus::Started);

        tokio::time::timeout(Duration::from_secs(2), async {
            while sensing.is_active() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let trace = ScriptedSensor::from_accelerations(0.001, &[0.5]);
        let restarted = sensing.start_sampling(trace, interval, tx).unwrap();
        assert_eq!(restarted, SamplingStatus::Started);
        sensing.stop_sampling().await.unwrap();
        assert!(!sensing.is_active());

        let mut forwarded = 0;
        while let Ok(EngineCommand::Sample { .. }) = rx.try_recv() {
            forwarded += 1;
        }
        assert!(forwarded >= 2);
    }
}
