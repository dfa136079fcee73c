use parking_lot::Mutex;
use tokio::sync::watch;

use super::traits::DriverState;
use crate::universe::{ChannelMap, Universe, FRAME_LEN};

/// State shared between a driver's public surface and its transfer
/// loop: the universe buffer, the lifecycle state and the transferring
/// flag.
///
/// Mutations land synchronously; the loop reads a frame snapshot at
/// tick time.
pub(crate) struct DriverShared {
    universe: Mutex<Universe>,
    state: Mutex<DriverState>,
    transferring: watch::Sender<bool>,
}

impl DriverShared {
    pub fn new() -> Self {
        let (transferring, _) = watch::channel(false);
        Self {
            universe: Mutex::new(Universe::new()),
            state: Mutex::new(DriverState::Disconnected),
            transferring,
        }
    }

    pub fn state(&self) -> DriverState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: DriverState) {
        *self.state.lock() = state;
    }

    pub fn get(&self, channel: u16) -> Option<u8> {
        self.universe.lock().get(channel)
    }

    pub fn channels(&self) -> Vec<u8> {
        self.universe.lock().channels()
    }

    pub fn update(&self, channels: &ChannelMap) {
        self.universe.lock().update(channels);
        self.mark_transferring();
    }

    pub fn update_from(&self, from: u16, values: &[u8]) {
        self.universe.lock().update_from(from, values);
        self.mark_transferring();
    }

    pub fn update_all(&self, value: u8) {
        self.universe.lock().update_all(value);
        self.mark_transferring();
    }

    /// Copy of the wire frame at this instant. Writes landing afterwards
    /// ride the next tick.
    pub fn snapshot(&self) -> [u8; FRAME_LEN] {
        *self.universe.lock().frame()
    }

    pub fn subscribe_transferring(&self) -> watch::Receiver<bool> {
        self.transferring.subscribe()
    }

    pub fn clear_transferring(&self) {
        self.transferring.send_replace(false);
    }

    fn mark_transferring(&self) {
        self.transferring.send_replace(true);
    }
}
