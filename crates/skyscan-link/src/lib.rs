pub mod channel;
pub mod doctor;
pub mod mock;
pub mod protocol;
pub mod serial;
pub mod timing;

pub use channel::CommandChannel;
pub use serial::{available_ports, DishChannel, SerialChannel, SerialLink, Transport};
pub use timing::{Timing, TimingConfig};
