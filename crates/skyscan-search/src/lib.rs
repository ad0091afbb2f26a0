pub mod doctor;
pub mod elevation;
pub mod finetune;
pub mod lock;
pub mod raster;
pub mod tracking;

use skyscan_core::{DishError, Orientation};
use skyscan_link::CommandChannel;
use tracing::warn;

pub use elevation::{ElevationOutcome, ElevationSearch};
pub use finetune::{Finetune, FinetuneOutcome};
pub use lock::{acquire_lock, FixedPointing, PointingSource};
pub use raster::{EndBound, RasterScan};
pub use tracking::{TrackOutcome, TrackStop, Tracker, TrackingParams};

/// Per-invocation state of the local searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchState {
    pub best_orientation: Orientation,
    pub best_strength: u32,
    pub current_orientation: Orientation,
}

impl SearchState {
    pub fn new(at: Orientation, strength: u32) -> Self {
        Self { best_orientation: at, best_strength: strength, current_orientation: at }
    }

    /// Commits `at` as both current and best.
    pub fn commit(&mut self, at: Orientation, strength: u32) {
        self.best_orientation = at;
        self.best_strength = strength;
        self.current_orientation = at;
    }
}

/// Samples strength, turning an unparsable reply into `None`.
///
/// Only reply-shape failures are absorbed; I/O errors still propagate.
pub(crate) fn sample_or_skip<C>(ch: &mut C, at: Orientation) -> Result<Option<u32>, DishError>
where
    C: CommandChannel + ?Sized,
{
    match ch.query_signal_strength() {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.is_bad_sample() => {
            warn!("search: discarding sample at {}: {}", at, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
