use std::collections::HashMap;
use std::sync::Arc;

use crate::driver::{Driver, DriverError};
use crate::universe::ChannelMap;

/// Registry of named universes and the fan-out point for channel
/// updates.
///
/// The registry is the primary holder of driver handles; data calls
/// against names that are not registered are silent no-ops.
pub struct DmxController {
    universes: HashMap<String, Arc<dyn Driver>>,
}

impl DmxController {
    pub fn new() -> Self {
        Self {
            universes: HashMap::new(),
        }
    }

    /// Connect and open the driver, then register it under `name`.
    ///
    /// Replacing an existing universe does not close the old driver;
    /// shutting down hardware output is left to the caller.
    pub async fn add_universe(
        &mut self,
        name: impl Into<String>,
        driver: Arc<dyn Driver>,
    ) -> Result<(), DriverError> {
        let name = name.into();
        driver.connect().await?;
        driver.open().await?;

        if let Some(previous) = self.universes.insert(name.clone(), driver) {
            log::warn!(
                "universe '{}' replaced; previous {} driver left running",
                name,
                previous.id()
            );
        }
        Ok(())
    }

    /// Update channels in the named universe.
    pub fn update(&self, name: &str, channels: &ChannelMap) {
        if let Some(driver) = self.universes.get(name) {
            driver.update(channels);
        }
    }

    /// Set consecutive values starting at channel `from`, typically a
    /// whole device's values at once.
    pub fn update_from(&self, name: &str, from: u16, values: &[u8]) {
        if let Some(driver) = self.universes.get(name) {
            driver.update_from(from, values);
        }
    }

    /// Set every channel of the named universe to `value`, most likely 0
    /// to blank it.
    pub fn update_all(&self, name: &str, value: u8) {
        if let Some(driver) = self.universes.get(name) {
            driver.update_all(value);
        }
    }

    /// Snapshot of the named universe's channels 1..=512.
    pub fn get_universe(&self, name: &str) -> Option<Vec<u8>> {
        self.universes.get(name).map(|driver| driver.channels())
    }

    /// Handle of the registered driver, e.g. to run an animation against
    /// it.
    pub fn driver(&self, name: &str) -> Option<Arc<dyn Driver>> {
        self.universes.get(name).cloned()
    }

    pub fn universe_names(&self) -> Vec<&str> {
        self.universes.keys().map(String::as_str).collect()
    }

    /// Close every registered universe. A driver that fails to close is
    /// logged and the rest are still attempted.
    pub async fn close(&mut self) {
        for (name, driver) in self.universes.drain() {
            if let Err(e) = driver.close().await {
                log::error!("failed to close universe '{}': {}", name, e);
            }
        }
    }
}

impl Default for DmxController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverState, NullConfig, NullDriver};
    use crate::universe::CHANNELS;

    #[tokio::test]
    async fn test_unknown_universe_is_a_noop() {
        let controller = DmxController::new();
        controller.update("missing", &ChannelMap::from([(1, 255)]));
        controller.update_from("missing", 1, &[1, 2, 3]);
        controller.update_all("missing", 0);
        assert!(controller.get_universe("missing").is_none());
        assert!(controller.driver("missing").is_none());
    }

    #[tokio::test]
    async fn test_add_update_snapshot_close() {
        let mut controller = DmxController::new();
        let driver = Arc::new(NullDriver::new(NullConfig::default()));
        controller
            .add_universe("main", Arc::clone(&driver) as Arc<dyn Driver>)
            .await
            .unwrap();
        assert_eq!(controller.universe_names(), vec!["main"]);

        controller.update_all("main", 0);
        controller.update("main", &ChannelMap::from([(1, 255), (5, 10)]));

        let snapshot = controller.get_universe("main").unwrap();
        assert_eq!(snapshot.len(), CHANNELS);
        // the snapshot is channel-ordered: index 0 holds channel 1
        assert_eq!(snapshot[0], 255);
        assert_eq!(snapshot[4], 10);

        controller.close().await;
        assert!(controller.get_universe("main").is_none());
        assert_eq!(driver.state(), DriverState::Closed);
    }

    #[tokio::test]
    async fn test_replacing_a_universe_leaves_the_old_driver_running() {
        let mut controller = DmxController::new();
        let first = Arc::new(NullDriver::new(NullConfig::default()));
        let second = Arc::new(NullDriver::new(NullConfig::default()));

        controller
            .add_universe("main", Arc::clone(&first) as Arc<dyn Driver>)
            .await
            .unwrap();
        controller
            .add_universe("main", Arc::clone(&second) as Arc<dyn Driver>)
            .await
            .unwrap();

        assert_eq!(first.state(), DriverState::Running);
        assert_eq!(controller.universe_names(), vec!["main"]);

        controller.close().await;
        first.close().await.unwrap();
    }
}
