use std::ops::RangeInclusive;

use anyhow::Result;
use skyscan_core::matrix::ScanBounds;

use crate::elevation::ElevationSearch;
use crate::tracking::TrackingParams;

pub fn check_scan(start_az: i32, end_az: i32, start_el: i32, end_el: i32, step: i32) -> Result<ScanBounds> {
    anyhow::ensure!(step >= 1, "scan.step must be >= 1");
    let bounds = ScanBounds::new(start_az, end_az, start_el, end_el)?;
    anyhow::ensure!(end_az - start_az >= step && end_el - start_el >= step, "scan range shorter than one step");
    Ok(bounds)
}

pub fn check_elevation(search: &ElevationSearch) -> Result<()> {
    anyhow::ensure!(search.step >= 1, "elevation.step must be >= 1");
    ScanBounds::new(0, 0, search.start, search.end)?;
    Ok(())
}

pub fn check_tracking(p: &TrackingParams) -> Result<()> {
    anyhow::ensure!(p.az_step > 0 && p.el_step > 0, "tracking steps must be positive");
    // the window must lie inside the device domain, or the tracker would
    // fail with OutOfRange instead of stopping out of view
    ScanBounds::new(
        *p.azimuth_bounds.start(),
        *p.azimuth_bounds.end(),
        *p.elevation_bounds.start(),
        *p.elevation_bounds.end(),
    )?;
    anyhow::ensure!(
        window(&p.azimuth_bounds) > 2 * i64::from(p.az_step),
        "tracking azimuth window narrower than two steps"
    );
    anyhow::ensure!(
        window(&p.elevation_bounds) > 2 * i64::from(p.el_step),
        "tracking elevation window narrower than two steps"
    );
    Ok(())
}

fn window(bounds: &RangeInclusive<i32>) -> i64 {
    i64::from(*bounds.end()) - i64::from(*bounds.start())
}
