use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::base::DriverShared;
use super::error::DriverError;
use super::traits::{Driver, DriverState};
use super::transfer::{FrameTransport, TransferLoop};
use crate::universe::{ChannelMap, FRAME_LEN};

/// Options for the null driver, which renders frames to the log
/// instead of hardware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NullConfig {
    /// Frames per second to "transmit".
    pub refresh_rate: f64,
}

impl Default for NullConfig {
    fn default() -> Self {
        Self { refresh_rate: 30.0 }
    }
}

impl NullConfig {
    pub fn send_interval(&self) -> Duration {
        let rate = if self.refresh_rate > 0.0 {
            self.refresh_rate
        } else {
            1.0
        };
        Duration::from_secs_f64(1.0 / rate)
    }
}

/// Driver without hardware attached. Keeps the full buffer and transfer
/// loop semantics, useful for development and tests.
pub struct NullDriver {
    config: NullConfig,
    shared: Arc<DriverShared>,
    transfer: tokio::sync::Mutex<Option<TransferLoop>>,
}

impl NullDriver {
    pub fn new(config: NullConfig) -> Self {
        Self {
            config,
            shared: Arc::new(DriverShared::new()),
            transfer: tokio::sync::Mutex::new(None),
        }
    }
}

impl Default for NullDriver {
    fn default() -> Self {
        Self::new(NullConfig::default())
    }
}

#[async_trait]
impl Driver for NullDriver {
    fn id(&self) -> &'static str {
        "null"
    }

    fn send_interval(&self) -> Duration {
        self.config.send_interval()
    }

    fn state(&self) -> DriverState {
        self.shared.state()
    }

    async fn connect(&self) -> Result<(), DriverError> {
        self.shared.set_state(DriverState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        if let Some(transfer) = self.transfer.lock().await.take() {
            transfer.stop().await;
        }
        self.shared.set_state(DriverState::Disconnected);
        Ok(())
    }

    async fn open(&self) -> Result<(), DriverError> {
        let transfer = TransferLoop::spawn(
            "null",
            Arc::clone(&self.shared),
            self.config.send_interval(),
            Box::new(NullTransport),
        );
        if let Some(previous) = self.transfer.lock().await.replace(transfer) {
            previous.stop().await;
        }
        self.shared.set_state(DriverState::Running);
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        if let Some(transfer) = self.transfer.lock().await.take() {
            transfer.stop().await;
        }
        self.shared.set_state(DriverState::Closed);
        Ok(())
    }

    fn get(&self, channel: u16) -> Option<u8> {
        self.shared.get(channel)
    }

    fn channels(&self) -> Vec<u8> {
        self.shared.channels()
    }

    fn update(&self, channels: &ChannelMap) {
        self.shared.update(channels);
    }

    fn update_from(&self, from: u16, values: &[u8]) {
        self.shared.update_from(from, values);
    }

    fn update_all(&self, value: u8) {
        self.shared.update_all(value);
    }

    fn subscribe_transferring(&self) -> watch::Receiver<bool> {
        self.shared.subscribe_transferring()
    }
}

struct NullTransport;

impl FrameTransport for NullTransport {
    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), DriverError> {
        log::trace!("null: frame {:?}", &frame[1..]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lifecycle() {
        let driver = NullDriver::default();
        assert_eq!(driver.state(), DriverState::Disconnected);

        driver.connect().await.unwrap();
        assert_eq!(driver.state(), DriverState::Connected);

        driver.open().await.unwrap();
        assert_eq!(driver.state(), DriverState::Running);

        driver.close().await.unwrap();
        assert_eq!(driver.state(), DriverState::Closed);

        driver.disconnect().await.unwrap();
        assert_eq!(driver.state(), DriverState::Disconnected);
    }

    #[tokio::test]
    async fn test_buffer_works_without_hardware() {
        let driver = NullDriver::default();
        driver.update_all(0);
        driver.update(&ChannelMap::from([(1, 255), (5, 10)]));

        assert_eq!(driver.get(1), Some(255));
        assert_eq!(driver.get(5), Some(10));
        assert_eq!(driver.get(2), Some(0));
        assert_eq!(driver.get(0), None);
        assert_eq!(driver.get(513), None);
        assert_eq!(driver.channels().len(), 512);
    }
}
