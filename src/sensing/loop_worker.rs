use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::session::controller::EngineCommand;

use super::source::SensorSource;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Polls `source` every `interval` and forwards readings to the controller task. Each
/// forwarded sample carries `cancel_token` so the controller can drop samples that were
/// already queued when the run was stopped.
pub async fn sampling_loop<S: SensorSource>(
    mut source: S,
    interval: Duration,
    commands: mpsc::Sender<EngineCommand>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut forwarded: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if source.is_exhausted() {
                    log_info!("sensor source exhausted after {} samples", forwarded);
                    break;
                }

                let Some(sample) = source.read() else {
                    continue;
                };

                let command = EngineCommand::Sample {
                    sample,
                    run: Some(cancel_token.clone()),
                };
                if commands.send(command).await.is_err() {
                    log_warn!("session controller gone, sampling loop exiting");
                    break;
                }
                forwarded += 1;
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down after {} samples", forwarded);
                break;
            }
        }
    }
}
