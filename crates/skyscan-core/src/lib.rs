pub mod encoding;
pub mod error;
pub mod matrix;
pub mod position;
pub mod sample;

pub use error::{Axis, DishError};
pub use position::Orientation;
pub use sample::{Pointing, SignalSample};

/// Signal strength at or above which the dish is considered locked.
pub const NOISE_FLOOR: u32 = 25;
