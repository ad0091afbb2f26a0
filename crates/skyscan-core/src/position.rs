use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{Axis, DishError};

/// Device azimuth domain, tenths of a degree.
pub const AZIMUTH_RANGE: RangeInclusive<i32> = 0..=3599;
/// Device elevation domain, tenths of a degree.
pub const ELEVATION_RANGE: RangeInclusive<i32> = 100..=700;

/// A validated dish pointing in device-native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation {
    azimuth: i32,
    elevation: i32,
}

impl Orientation {
    /// Forced reference position used to calibrate the dish at startup.
    pub const REFERENCE: Orientation = Orientation { azimuth: 0, elevation: 100 };

    pub fn new(azimuth: i32, elevation: i32) -> Result<Self, DishError> {
        Ok(Self { azimuth: check_azimuth(azimuth)?, elevation: check_elevation(elevation)? })
    }

    pub fn azimuth(&self) -> i32 {
        self.azimuth
    }

    pub fn elevation(&self) -> i32 {
        self.elevation
    }

    pub fn with_azimuth(self, azimuth: i32) -> Result<Self, DishError> {
        Self::new(azimuth, self.elevation)
    }

    pub fn with_elevation(self, elevation: i32) -> Result<Self, DishError> {
        Self::new(self.azimuth, elevation)
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "az={} el={}", self.azimuth, self.elevation)
    }
}

pub fn check_azimuth(value: i32) -> Result<i32, DishError> {
    check(Axis::Azimuth, value, &AZIMUTH_RANGE)
}

pub fn check_elevation(value: i32) -> Result<i32, DishError> {
    check(Axis::Elevation, value, &ELEVATION_RANGE)
}

fn check(axis: Axis, value: i32, range: &RangeInclusive<i32>) -> Result<i32, DishError> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(DishError::OutOfRange {
            axis,
            value: value as i64,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_domain_corners() {
        assert!(Orientation::new(0, 100).is_ok());
        assert!(Orientation::new(3599, 700).is_ok());
    }

    #[test]
    fn rejects_out_of_domain() {
        assert!(matches!(
            Orientation::new(3600, 100),
            Err(DishError::OutOfRange { axis: Axis::Azimuth, value: 3600, .. })
        ));
        assert!(matches!(
            Orientation::new(-1, 100),
            Err(DishError::OutOfRange { axis: Axis::Azimuth, .. })
        ));
        assert!(matches!(
            Orientation::new(0, 99),
            Err(DishError::OutOfRange { axis: Axis::Elevation, value: 99, .. })
        ));
        assert!(matches!(
            Orientation::new(0, 701),
            Err(DishError::OutOfRange { axis: Axis::Elevation, .. })
        ));
    }

    #[test]
    fn reference_is_parked_position() {
        assert_eq!(Orientation::REFERENCE, Orientation::new(0, 100).unwrap());
    }

    #[test]
    fn with_axis_keeps_other_axis() {
        let o = Orientation::new(1200, 350).unwrap();
        let moved = o.with_azimuth(1204).unwrap();
        assert_eq!((moved.azimuth(), moved.elevation()), (1204, 350));
        assert!(o.with_elevation(720).is_err());
    }
}
