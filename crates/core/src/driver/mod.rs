pub use artnet::{ArtNetConfig, ArtNetDriver};
pub use error::DriverError;
pub use null::{NullConfig, NullDriver};
pub use serial::{SerialConfig, SerialDriver, SerialParity};
pub use traits::{Driver, DriverState};

mod artnet;
mod base;
mod error;
mod null;
mod serial;
mod traits;
mod transfer;
