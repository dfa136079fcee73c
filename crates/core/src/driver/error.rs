use std::fmt;

/// Driver lifecycle error types
#[derive(Debug)]
pub enum DriverError {
    /// The requested transport does not exist on this machine.
    DeviceNotFound(String),
    /// The transport exists but could not be acquired or configured.
    Acquire(String),
    /// A lifecycle call arrived before `connect()` succeeded.
    NotConnected,
    /// A lifecycle call arrived before `open()` succeeded.
    NotOpen,
    /// Driver options failed validation.
    InvalidConfig(String),
    /// A frame could not be pushed to the transport.
    Transfer(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::DeviceNotFound(name) => write!(f, "Device not found: {}", name),
            DriverError::Acquire(msg) => write!(f, "Failed to acquire transport: {}", msg),
            DriverError::NotConnected => write!(f, "Driver is not connected"),
            DriverError::NotOpen => write!(f, "Driver is not open"),
            DriverError::InvalidConfig(msg) => write!(f, "Invalid driver options: {}", msg),
            DriverError::Transfer(msg) => write!(f, "Failed to transfer frame: {}", msg),
        }
    }
}

impl std::error::Error for DriverError {}
