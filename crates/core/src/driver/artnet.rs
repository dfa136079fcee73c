use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use artnet_protocol::{ArtCommand, Output, PortAddress};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::base::DriverShared;
use super::error::DriverError;
use super::traits::{Driver, DriverState};
use super::transfer::{FrameTransport, TransferLoop};
use crate::universe::{ChannelMap, FRAME_LEN};

/// Art-Net output options for a universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtNetConfig {
    /// Local address to bind the socket to; the source port is
    /// ephemeral since the driver only transmits.
    pub source_ip: IpAddr,
    /// Unicast destination; broadcast is used when absent.
    pub dest_ip: Option<IpAddr>,
    /// Destination UDP port, 6454 for Art-Net.
    pub port: u16,
    /// Art-Net port address (sub-net + universe) the frames target.
    pub universe: u16,
    pub send_interval_ms: u64,
}

impl Default for ArtNetConfig {
    fn default() -> Self {
        Self {
            source_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            dest_ip: None,
            port: 6454,
            universe: 0,
            // 44Hz, the DMX standard refresh rate
            send_interval_ms: 23,
        }
    }
}

impl ArtNetConfig {
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }

    fn destination(&self) -> SocketAddr {
        match self.dest_ip {
            Some(ip) => SocketAddr::new(ip, self.port),
            None => SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), self.port),
        }
    }
}

/// Drives a universe over the network as Art-Net ArtDmx packets.
pub struct ArtNetDriver {
    config: ArtNetConfig,
    shared: Arc<DriverShared>,
    socket: Mutex<Option<Arc<UdpSocket>>>,
    transfer: tokio::sync::Mutex<Option<TransferLoop>>,
}

impl ArtNetDriver {
    pub fn new(config: ArtNetConfig) -> Self {
        Self {
            config,
            shared: Arc::new(DriverShared::new()),
            socket: Mutex::new(None),
            transfer: tokio::sync::Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ArtNetConfig {
        &self.config
    }

    /// Stop the transfer loop without releasing the socket.
    pub async fn stop(&self) {
        if let Some(transfer) = self.transfer.lock().await.take() {
            transfer.stop().await;
        }
        if self.shared.state() == DriverState::Running {
            self.shared.set_state(DriverState::Stopped);
        }
    }
}

impl Default for ArtNetDriver {
    fn default() -> Self {
        Self::new(ArtNetConfig::default())
    }
}

#[async_trait]
impl Driver for ArtNetDriver {
    fn id(&self) -> &'static str {
        "artnet"
    }

    fn send_interval(&self) -> Duration {
        self.config.send_interval()
    }

    fn state(&self) -> DriverState {
        self.shared.state()
    }

    async fn connect(&self) -> Result<(), DriverError> {
        let bind_addr = SocketAddr::new(self.config.source_ip, 0);
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| DriverError::Acquire(format!("{}: {}", bind_addr, e)))?;
        if self.config.dest_ip.is_none() {
            socket
                .set_broadcast(true)
                .map_err(|e| DriverError::Acquire(e.to_string()))?;
        }

        *self.socket.lock() = Some(Arc::new(socket));
        self.shared.set_state(DriverState::Connected);
        log::info!("artnet: socket bound to {}", bind_addr);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), DriverError> {
        self.stop().await;
        *self.socket.lock() = None;
        self.shared.set_state(DriverState::Disconnected);
        Ok(())
    }

    async fn open(&self) -> Result<(), DriverError> {
        let socket = self
            .socket
            .lock()
            .clone()
            .ok_or(DriverError::NotConnected)?;
        let port_address = PortAddress::try_from(self.config.universe).map_err(|e| {
            DriverError::InvalidConfig(format!(
                "art-net universe {}: {:?}",
                self.config.universe, e
            ))
        })?;

        let transport = ArtNetTransport {
            socket,
            destination: self.config.destination(),
            port_address,
        };
        let transfer = TransferLoop::spawn(
            "artnet",
            Arc::clone(&self.shared),
            self.config.send_interval(),
            Box::new(transport),
        );
        if let Some(previous) = self.transfer.lock().await.replace(transfer) {
            previous.stop().await;
        }

        self.shared.set_state(DriverState::Running);
        log::info!(
            "artnet: universe {} -> {}, frame every {}ms",
            self.config.universe,
            self.config.destination(),
            self.config.send_interval_ms
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.stop().await;
        *self.socket.lock() = None;
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

struct ArtNetTransport {
    socket: Arc<UdpSocket>,
    destination: SocketAddr,
    port_address: PortAddress,
}

impl FrameTransport for ArtNetTransport {
    fn send_frame(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), DriverError> {
        // ArtDmx carries the 512 channel bytes; the start code is implied
        // by the protocol.
        let command = ArtCommand::Output(Output {
            data: frame[1..].to_vec().into(),
            port_address: self.port_address.clone(),
            ..Output::default()
        });
        let bytes = command
            .write_to_buffer()
            .map_err(|e| DriverError::Transfer(format!("{:?}", e)))?;
        self.socket
            .send_to(&bytes, self.destination)
            .map_err(|e| DriverError::Transfer(e.to_string()))?;
        Ok(())
    }
}
