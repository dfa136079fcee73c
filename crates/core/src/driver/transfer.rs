use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::base::DriverShared;
use super::error::DriverError;
use super::traits::DriverState;
use crate::universe::FRAME_LEN;

/// Consecutive tick failures tolerated before the loop gives up and
/// marks its driver stopped.
pub(crate) const MAX_TICK_FAILURES: u32 = 40;

/// Sink for serialized wire frames; one implementation per transport.
pub(crate) trait FrameTransport: Send {
    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), DriverError>;
}

/// Handle to a driver's periodic transmission task.
pub(crate) struct TransferLoop {
    handle: JoinHandle<()>,
}

impl TransferLoop {
    /// Spawn the loop. The first frame ships immediately, then one frame
    /// per `send_interval`; whatever the buffer holds at tick time is
    /// what goes on the wire.
    ///
    /// A failed tick keeps the buffer intact and is retried on the next
    /// natural tick. After [`MAX_TICK_FAILURES`] consecutive failures
    /// the loop exits and the driver transitions to `Stopped`.
    pub fn spawn(
        id: &'static str,
        shared: Arc<DriverShared>,
        send_interval: Duration,
        mut transport: Box<dyn FrameTransport>,
    ) -> Self {
        let period = send_interval.max(Duration::from_millis(1));
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut failures: u32 = 0;

            loop {
                ticker.tick().await;

                let frame = shared.snapshot();
                match transport.send_frame(&frame) {
                    Ok(()) => {
                        failures = 0;
                        shared.clear_transferring();
                    }
                    Err(e) => {
                        failures += 1;
                        log::warn!(
                            "{}: frame transfer failed ({} consecutive): {}",
                            id,
                            failures,
                            e
                        );
                        if failures >= MAX_TICK_FAILURES {
                            log::error!(
                                "{}: giving up after {} consecutive transfer failures",
                                id,
                                failures
                            );
                            shared.set_state(DriverState::Stopped);
                            break;
                        }
                    }
                }
            }
        });

        Self { handle }
    }

    /// Cancel the pending tick. No frame ships after this returns.
    pub async fn stop(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}
