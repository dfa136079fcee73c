pub use controller::DmxController;
pub use driver::{
    ArtNetConfig, ArtNetDriver, Driver, DriverError, DriverState, NullConfig, NullDriver,
    SerialConfig, SerialDriver, SerialParity,
};
pub use fx::{Animation, Easing, Filter, Loops, OnFinish, Transition, TransitionOptions};
pub use universe::{ChannelMap, Universe, CHANNELS, FRAME_LEN};

mod controller;
mod driver;
mod fx;
mod universe;
