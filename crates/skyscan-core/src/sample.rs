use std::ops::RangeInclusive;

use time::OffsetDateTime;

use crate::error::{Axis, DishError};
use crate::position::{Orientation, AZIMUTH_RANGE, ELEVATION_RANGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSample {
    pub orientation: Orientation,
    pub strength: u32,
    pub timestamp: OffsetDateTime,
}

impl SignalSample {
    pub fn now(orientation: Orientation, strength: u32) -> Self {
        Self { orientation, strength, timestamp: OffsetDateTime::now_utc() }
    }
}

/// Where the ephemeris says the target is, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointing {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub at: OffsetDateTime,
}

impl Pointing {
    /// Converts to device units.
    ///
    /// Azimuth is tenths of a degree wrapped into [0, 3600). Elevation maps
    /// [0, 90] degrees linearly onto [100, 700], so the horizon is the
    /// device's lowest stop. NaN or infinite degrees are out of range.
    pub fn to_orientation(&self) -> Result<Orientation, DishError> {
        finite(Axis::Azimuth, self.azimuth_deg, &AZIMUTH_RANGE)?;
        finite(Axis::Elevation, self.elevation_deg, &ELEVATION_RANGE)?;
        let span = *AZIMUTH_RANGE.end() as i64 + 1;
        let azimuth = ((self.azimuth_deg * 10.0).round() as i64).rem_euclid(span) as i32;
        let elevation = ((self.elevation_deg / 90.0) * 600.0 + 100.0).round() as i32;
        Orientation::new(azimuth, elevation)
    }
}

fn finite(axis: Axis, deg: f64, range: &RangeInclusive<i32>) -> Result<(), DishError> {
    if deg.is_finite() {
        return Ok(());
    }
    // NaN has no integer value; report it as the lowest one
    let value = if deg.is_nan() { i64::MIN } else { deg as i64 };
    Err(DishError::OutOfRange { axis, value, min: *range.start(), max: *range.end() })
}
