use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use super::error::DriverError;
use crate::universe::ChannelMap;

/// Driver lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Disconnected,
    Connected,
    Open,
    Running,
    Stopped,
    Closed,
}

/// Capability interface shared by every universe driver.
///
/// The expected lifecycle is:
/// 1. `connect()`
/// 2. `open()`
/// 3. `update()` / `update_from()` / `update_all()`
/// 4. `close()`
/// 5. `disconnect()`
///
/// Data operations are synchronous and total; the buffer state at the
/// next transfer tick is what ships, so writes between two ticks are
/// coalesced.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Stable identifier used in logs.
    fn id(&self) -> &'static str;

    /// Cadence of the transfer loop.
    fn send_interval(&self) -> Duration;

    fn state(&self) -> DriverState;

    /// Acquire the transport. Failure is non-fatal and leaves the driver
    /// disconnected.
    async fn connect(&self) -> Result<(), DriverError>;

    /// Release the transport handle.
    async fn disconnect(&self) -> Result<(), DriverError>;

    /// Configure the transport and start the transfer loop.
    async fn open(&self) -> Result<(), DriverError>;

    /// Stop the transfer loop and release the write side.
    async fn close(&self) -> Result<(), DriverError>;

    /// Current value of a channel; `None` when out of range.
    fn get(&self, channel: u16) -> Option<u8>;

    /// Snapshot of channels 1..=512.
    fn channels(&self) -> Vec<u8>;

    fn update(&self, channels: &ChannelMap);

    fn update_from(&self, from: u16, values: &[u8]);

    fn update_all(&self, value: u8);

    /// Observe the transferring flag: raised on every mutation, cleared
    /// once a scheduled frame has fully transmitted.
    fn subscribe_transferring(&self) -> watch::Receiver<bool>;
}
