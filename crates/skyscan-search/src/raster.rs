use std::time::Duration;

use serde::Deserialize;
use skyscan_core::matrix::{ScanBounds, ScanMatrix};
use skyscan_core::{DishError, Orientation};
use skyscan_link::{CommandChannel, Timing};
use tracing::{debug, info};

pub const GRID_STEP: i32 = 10;

/// Whether the `end_*` bounds are themselves sampled.
///
/// `Exclusive` stops one step short of each end bound and also skips any
/// final partial step; this is the coverage existing scan files have.
/// `Inclusive` samples every grid point `<= end`, still never past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndBound {
    #[default]
    Exclusive,
    Inclusive,
}

#[derive(Debug, Clone)]
pub struct RasterScan {
    bounds: ScanBounds,
    step: i32,
    end_bound: EndBound,
    settle: Duration,
}

impl RasterScan {
    pub fn new(bounds: ScanBounds, settle: Duration) -> Self {
        Self { bounds, step: GRID_STEP, end_bound: EndBound::default(), settle }
    }

    pub fn with_step(mut self, step: i32) -> Self {
        self.step = step.max(1);
        self
    }

    pub fn with_end_bound(mut self, end_bound: EndBound) -> Self {
        self.end_bound = end_bound;
        self
    }

    pub fn bounds(&self) -> &ScanBounds {
        &self.bounds
    }

    /// Elevations in visit order.
    pub fn elevations(&self) -> Vec<i32> {
        grid_axis(self.bounds.start_el, self.bounds.end_el, self.step, self.end_bound)
    }

    /// Azimuths in visit order, repeated for every elevation.
    pub fn azimuths(&self) -> Vec<i32> {
        grid_axis(self.bounds.start_az, self.bounds.end_az, self.step, self.end_bound)
    }

    pub fn cells(&self) -> usize {
        self.elevations().len() * self.azimuths().len()
    }

    /// Two moves plus one query per cell; informational only.
    pub fn estimate(&self, timing: &Timing) -> Duration {
        (self.settle * 2 + timing.query) * self.cells() as u32
    }

    /// Visits every cell, writing strengths mirrored against the end bounds
    /// and calling `checkpoint` after each one.
    ///
    /// A cell's row and column are its distance from `end_el` and `end_az`
    /// in whole steps, rounded up. Row 0 and column 0 are the end-bound
    /// bucket, which only an inclusive scan on an exact step multiple
    /// samples; the heatmap renderer drops them.
    ///
    /// A failed sample aborts the scan; whatever `checkpoint` last persisted
    /// stays the latest record.
    pub fn run<C, F>(&self, ch: &mut C, mut checkpoint: F) -> Result<ScanMatrix, DishError>
    where
        C: CommandChannel + ?Sized,
        F: FnMut(&ScanMatrix) -> Result<(), DishError>,
    {
        let elevations = self.elevations();
        let azimuths = self.azimuths();
        if elevations.is_empty() || azimuths.is_empty() {
            return Err(DishError::EmptyScan(format!("{:?} with {:?} end bound", self.bounds, self.end_bound)));
        }

        let b = &self.bounds;
        let rows = bucket(b.end_el, b.start_el, self.step) + 1;
        let cols = bucket(b.end_az, b.start_az, self.step) + 1;
        let mut matrix = ScanMatrix::new(rows, cols);
        info!("scan: {} x {} cells in a {} x {} matrix, step {}", elevations.len(), azimuths.len(), rows, cols, self.step);

        for (i, &el) in elevations.iter().enumerate() {
            for &az in &azimuths {
                let at = Orientation::new(az, el)?;
                ch.move_to(at, self.settle)?;
                let strength = ch.query_signal_strength()?;
                matrix.set(bucket(b.end_el, el, self.step), bucket(b.end_az, az, self.step), strength);
                debug!("scan: {} strength={}", at, strength);
                checkpoint(&matrix)?;
            }
            info!("scan: row el={} done ({}/{})", el, i + 1, elevations.len());
        }

        Ok(matrix)
    }
}

fn bucket(end: i32, value: i32, step: i32) -> usize {
    let step = step.max(1);
    ((end - value).max(0) + step - 1) as usize / step as usize
}

fn grid_axis(start: i32, end: i32, step: i32, end_bound: EndBound) -> Vec<i32> {
    let step = step.max(1) as usize;
    match end_bound {
        EndBound::Exclusive => (start..end).step_by(step).collect(),
        EndBound::Inclusive => (start..=end).step_by(step).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyscan_link::mock::MockDish;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    fn bounds(start_az: i32, end_az: i32, start_el: i32, end_el: i32) -> ScanBounds {
        ScanBounds::new(start_az, end_az, start_el, end_el).unwrap()
    }

    #[test]
    fn small_grid_visits_each_cell_once() {
        let visits = Arc::new(Mutex::new(Vec::new()));
        let seen = visits.clone();
        let mut dish = MockDish::new(move |az, el| {
            seen.lock().unwrap().push((az, el));
            Some((az + el) as u32)
        });

        let scan = RasterScan::new(bounds(0, 20, 100, 120), Duration::ZERO);
        let mut checkpoints = 0;
        let m = scan
            .run(&mut dish, |_| {
                checkpoints += 1;
                Ok(())
            })
            .unwrap();

        let visits = visits.lock().unwrap();
        assert_eq!(visits.len(), 4);
        assert_eq!(visits.iter().collect::<HashSet<_>>().len(), 4);
        assert_eq!(*visits, vec![(0, 100), (10, 100), (0, 110), (10, 110)]);
        assert_eq!(checkpoints, 4);
        assert_eq!(m.sampled(), scan.cells());
        assert_eq!((m.rows(), m.cols()), (3, 3));
    }

    #[test]
    fn matrix_is_mirrored_against_end_bounds() {
        let mut dish = MockDish::new(|az, el| Some((az + el) as u32));
        let m = RasterScan::new(bounds(0, 20, 100, 120), Duration::ZERO)
            .run(&mut dish, |_| Ok(()))
            .unwrap();
        assert_eq!(m.get(1, 1), Some(120));
        assert_eq!(m.get(1, 2), Some(110));
        assert_eq!(m.get(2, 1), Some(110));
        assert_eq!(m.get(2, 2), Some(100));
    }

    #[test]
    fn exclusive_scan_leaves_end_bucket_for_the_renderer_to_drop() {
        let mut dish = MockDish::new(|az, el| Some((az + el) as u32));
        let m = RasterScan::new(bounds(0, 20, 100, 120), Duration::ZERO)
            .run(&mut dish, |_| Ok(()))
            .unwrap();
        assert_eq!(m.to_text(), "-1 -1 -1\n-1 120 110\n-1 110 100\n");
    }

    #[test]
    fn partial_step_keeps_end_bucket_empty() {
        let mut dish = MockDish::new(|_, _| Some(1));
        let scan = RasterScan::new(bounds(0, 25, 100, 125), Duration::ZERO);
        let m = scan.run(&mut dish, |_| Ok(())).unwrap();
        assert_eq!((m.rows(), m.cols()), (4, 4));
        assert_eq!(m.sampled(), scan.cells());
        assert!((0..4).all(|k| m.get(0, k).is_none() && m.get(k, 0).is_none()));
    }

    #[test]
    fn partial_final_step_is_skipped() {
        let scan = RasterScan::new(bounds(0, 25, 100, 125), Duration::ZERO);
        assert_eq!(scan.elevations(), vec![100, 110, 120]);
        assert_eq!(scan.azimuths(), vec![0, 10, 20]);

        let exact = RasterScan::new(bounds(0, 20, 100, 120), Duration::ZERO);
        assert_eq!(exact.elevations(), vec![100, 110]);
    }

    #[test]
    fn inclusive_end_samples_the_bound() {
        let scan = RasterScan::new(bounds(0, 20, 100, 120), Duration::ZERO).with_end_bound(EndBound::Inclusive);
        assert_eq!(scan.elevations(), vec![100, 110, 120]);
        assert_eq!(scan.cells(), 9);

        let mut dish = MockDish::new(|_, _| Some(1));
        let m = scan.run(&mut dish, |_| Ok(())).unwrap();
        assert!(m.is_complete());
        assert_eq!((m.rows(), m.cols()), (3, 3));
    }

    #[test]
    fn parse_failure_aborts_after_last_checkpoint() {
        let mut dish = MockDish::new(|az, el| if (az, el) == (0, 110) { None } else { Some(5) });
        let mut last_sampled = 0;
        let err = RasterScan::new(bounds(0, 20, 100, 120), Duration::ZERO)
            .run(&mut dish, |m| {
                last_sampled = m.sampled();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, DishError::ProtocolParse { .. }));
        assert_eq!(last_sampled, 2);
        assert_eq!(dish.queries(), 3);
    }

    #[test]
    fn degenerate_range_is_rejected_before_io() {
        let mut dish = MockDish::new(|_, _| Some(1));
        let err = RasterScan::new(bounds(0, 20, 100, 100), Duration::ZERO).run(&mut dish, |_| Ok(())).unwrap_err();
        assert!(matches!(err, DishError::EmptyScan(_)));
        assert!(dish.commands().is_empty());
    }

    #[test]
    fn estimate_counts_moves_and_queries() {
        let timing = Timing { query: Duration::from_secs(1), ..Timing::zero() };
        let scan = RasterScan::new(bounds(0, 20, 100, 120), Duration::from_secs(3));
        assert_eq!(scan.estimate(&timing), Duration::from_secs(4 * 7));
    }
}
