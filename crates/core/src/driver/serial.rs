use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serialport::{DataBits, SerialPort, StopBits};
use tokio::sync::watch;

use super::base::DriverShared;
use super::error::DriverError;
use super::traits::{Driver, DriverState};
use super::transfer::{FrameTransport, TransferLoop};
use crate::universe::{ChannelMap, FRAME_LEN};

/// Time the line is held in the break condition before each frame, and
/// the mark-after-break that follows. DMX512 requires at least 88us and
/// 8us respectively.
const BREAK_DURATION: Duration = Duration::from_micros(110);
const MARK_AFTER_BREAK: Duration = Duration::from_micros(16);

/// Serial line options for a DMX universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: SerialParity,
    /// Milliseconds between frames. The DMX512 refresh floor sits
    /// around 23-46ms.
    pub send_interval_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    None,
    Odd,
    Even,
}

impl SerialConfig {
    /// Line settings for the Enttec Open DMX USB interface: 250kbaud,
    /// 8 data bits, 2 stop bits, no parity, one frame every 46ms.
    pub fn enttec_open_dmx_usb() -> Self {
        Self {
            baud_rate: 250_000,
            data_bits: 8,
            stop_bits: 2,
            parity: SerialParity::None,
            send_interval_ms: 46,
        }
    }

    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    fn data_bits(&self) -> Result<DataBits, DriverError> {
        match self.data_bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(DriverError::InvalidConfig(format!(
                "unsupported data bits: {}",
                other
            ))),
        }
    }

    fn stop_bits(&self) -> Result<StopBits, DriverError> {
        match self.stop_bits {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(DriverError::InvalidConfig(format!(
                "unsupported stop bits: {}",
                other
            ))),
        }
    }

    fn parity(&self) -> serialport::Parity {
        match self.parity {
            SerialParity::None => serialport::Parity::None,
            SerialParity::Odd => serialport::Parity::Odd,
            SerialParity::Even => serialport::Parity::Even,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self::enttec_open_dmx_usb()
    }
}

type SharedPort = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

/// Drives a universe over a serial DMX link.
///
/// `connect()` resolves the port path against the ports present on the
/// machine, `open()` applies the line settings and starts the transfer
/// loop, `close()` stops the loop and releases the port.
pub struct SerialDriver {
    path: String,
    config: SerialConfig,
    shared: Arc<DriverShared>,
    port: SharedPort,
    transfer: tokio::sync::Mutex<Option<TransferLoop>>,
}

impl SerialDriver {
    pub fn new(path: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            path: path.into(),
            config,
            shared: Arc::new(DriverShared::new()),
            port: Arc::new(Mutex::new(None)),
            transfer: tokio::sync::Mutex::new(None),
        }
    }

    /// Driver preconfigured for the Enttec Open DMX USB interface.
    pub fn enttec_open_dmx_usb(path: impl Into<String>) -> Self {
        Self::new(path, SerialConfig::enttec_open_dmx_usb())
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Start the transfer loop against the open port. A loop that is
    /// already running is replaced.
    pub async fn start(&self) {
        let transport = SerialTransport {
            port: Arc::clone(&self.port),
        };
        let transfer = TransferLoop::spawn(
            "serial",
            Arc::clone(&self.shared),
            self.config.send_interval(),
            Box::new(transport),
        );
        if let Some(previous) = self.transfer.lock().await.replace(transfer) {
            previous.stop().await;
        }
        self.shared.set_state(DriverState::Running);
    }

    /// Stop the transfer loop without releasing the port. No frame ships
    /// after this returns.
    pub async fn stop(&self) {
        if let Some(transfer) = self.transfer.lock().await.take() {
            transfer.stop().await;
        }
        if self.shared.state() == DriverState::Running {
            self.shared.set_state(DriverState::Stopped);
        }
    }
}

#[async_trait]
impl Driver for SerialDriver {
    fn id(&self) -> &'static str {
        "serial"
    }

    fn send_interval(&self) -> Duration {
        self.config.send_interval()
    }

    fn state(&self) -> DriverState {
        self.shared.state()
    }

    async fn connect(&self) -> Result<(), DriverError> {
        let ports =
            serialport::available_ports().map_err(|e| DriverError::Acquire(e.to_string()))?;
        if !ports.iter().any(|p| p.port_name == self.path) {
            return Err(DriverError::DeviceNotFound(self.path.clone()));
        }

        self.shared.set_state(DriverState::Connected);
        log::info!("serial: connected to {}", self.path);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.stop().await;
        *self.port.lock() = None;
        self.shared.set_state(DriverState::Disconnected);
        Ok(())
    }

    async fn open(&self) -> Result<(), DriverError> {
        if self.shared.state() == DriverState::Disconnected {
            return Err(DriverError::NotConnected);
        }

        let port = serialport::new(self.path.as_str(), self.config.baud_rate)
            .data_bits(self.config.data_bits()?)
            .stop_bits(self.config.stop_bits()?)
            .parity(self.config.parity())
            .timeout(self.config.send_interval())
            .open()
            .map_err(|e| DriverError::Acquire(format!("{}: {}", self.path, e)))?;
        *self.port.lock() = Some(port);

        self.shared.set_state(DriverState::Open);
        self.start().await;
        log::info!(
            "serial: {} open at {} baud, frame every {}ms",
            self.path,
            self.config.baud_rate,
            self.config.send_interval_ms
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.stop().await;
        *self.port.lock() = None;
        self.shared.set_state(DriverState::Closed);
        log::info!("serial: closed {}", self.path);
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

struct SerialTransport {
    port: SharedPort,
}

impl FrameTransport for SerialTransport {
    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), DriverError> {
        let mut guard = self.port.lock();
        let port = guard.as_mut().ok_or(DriverError::NotOpen)?;

        // Frame start: hold the line in the break condition, then release
        // it for the mark-after-break before the first data byte.
        port.set_break()
            .map_err(|e| DriverError::Transfer(e.to_string()))?;
        std::thread::sleep(BREAK_DURATION);
        port.clear_break()
            .map_err(|e| DriverError::Transfer(e.to_string()))?;
        std::thread::sleep(MARK_AFTER_BREAK);

        port.write_all(frame)
            .map_err(|e| DriverError::Transfer(e.to_string()))?;
        port.flush()
            .map_err(|e| DriverError::Transfer(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enttec_profile() {
        let config = SerialConfig::enttec_open_dmx_usb();
        assert_eq!(config.baud_rate, 250_000);
        assert_eq!(config.data_bits, 8);
        assert_eq!(config.stop_bits, 2);
        assert_eq!(config.parity, SerialParity::None);
        assert_eq!(config.send_interval(), Duration::from_millis(46));
    }

    #[test]
    fn test_config_validation() {
        let mut config = SerialConfig::default();
        config.data_bits = 9;
        assert!(matches!(
            config.data_bits(),
            Err(DriverError::InvalidConfig(_))
        ));

        config.data_bits = 8;
        config.stop_bits = 3;
        assert!(matches!(
            config.stop_bits(),
            Err(DriverError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = SerialConfig::enttec_open_dmx_usb();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.baud_rate, config.baud_rate);
        assert_eq!(parsed.parity, config.parity);
        assert_eq!(parsed.send_interval_ms, config.send_interval_ms);
    }

    #[tokio::test]
    async fn test_connect_to_missing_device_is_nonfatal() {
        let driver = SerialDriver::enttec_open_dmx_usb("/dev/lumen-does-not-exist");
        assert!(driver.connect().await.is_err());
        // a rejected connect leaves the driver unconnected, not corrupted
        assert_eq!(driver.state(), DriverState::Disconnected);
        assert_eq!(driver.get(1), Some(0));
    }

    #[tokio::test]
    async fn test_open_requires_connect() {
        let driver = SerialDriver::enttec_open_dmx_usb("/dev/lumen-does-not-exist");
        assert!(matches!(
            driver.open().await,
            Err(DriverError::NotConnected)
        ));
    }
}
