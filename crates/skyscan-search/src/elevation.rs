use std::time::Duration;

use skyscan_core::position::ELEVATION_RANGE;
use skyscan_core::{DishError, Orientation};
use skyscan_link::CommandChannel;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct ElevationOutcome {
    pub best: Orientation,
    pub strength: u32,
    /// `(elevation, strength)` in scan order.
    pub samples: Vec<(i32, u32)>,
}

/// Linear sweep of the elevation axis at a fixed azimuth.
#[derive(Debug, Clone)]
pub struct ElevationSearch {
    pub start: i32,
    pub end: i32,
    pub step: i32,
    pub settle: Duration,
}

impl ElevationSearch {
    pub fn new(settle: Duration) -> Self {
        Self { start: *ELEVATION_RANGE.start(), end: *ELEVATION_RANGE.end(), step: 10, settle }
    }

    /// Both ends are sampled.
    pub fn elevations(&self) -> Vec<i32> {
        (self.start..=self.end).step_by(self.step.max(1) as usize).collect()
    }

    /// `(range / step) * settle * 2`; informational, never enforced.
    pub fn estimate(&self) -> Duration {
        let steps = ((self.end - self.start) / self.step.max(1)).max(0) as u32;
        self.settle * steps * 2
    }

    /// Samples every step and parks on the first elevation reaching the
    /// maximum. Any failed sample aborts the search.
    pub fn run<C>(&self, ch: &mut C, azimuth: i32) -> Result<ElevationOutcome, DishError>
    where
        C: CommandChannel + ?Sized,
    {
        let elevations = self.elevations();
        let first = *elevations
            .first()
            .ok_or_else(|| DishError::EmptyScan(format!("elevation {}..={}", self.start, self.end)))?;
        let start = Orientation::new(azimuth, first)?;
        info!("elevation: sweeping {} points at az={}, about {:?}", elevations.len(), azimuth, self.estimate());

        ch.move_to(start, self.settle)?;
        let mut samples = Vec::with_capacity(elevations.len());
        for (i, &el) in elevations.iter().enumerate() {
            if i > 0 {
                ch.move_elevation(el, self.settle)?;
            }
            let strength = ch.query_signal_strength()?;
            debug!("elevation: el={} strength={}", el, strength);
            samples.push((el, strength));
        }

        // strict `>` keeps the earliest of equal maxima
        let (best_el, strength) = samples
            .iter()
            .copied()
            .fold(samples[0], |best, s| if s.1 > best.1 { s } else { best });

        ch.move_elevation(best_el, self.settle)?;
        let best = start.with_elevation(best_el)?;
        info!("elevation: best {} strength={}", best, strength);
        Ok(ElevationOutcome { best, strength, samples })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use skyscan_link::mock::MockDish;

    fn search() -> ElevationSearch {
        ElevationSearch::new(Duration::ZERO)
    }

    #[test]
    fn converges_on_noisy_single_peak() {
        for seed in 0..8 {
            let mut rng = StdRng::seed_from_u64(seed);
            // neighbours sit 3 below the peak; noise stays under that margin
            let mut dish = MockDish::new(move |_, el| {
                let base = 300 - ((el - 350).abs() / 10) * 3;
                Some(base as u32 + rng.gen_range(0..3))
            });
            let out = search().run(&mut dish, 1200).unwrap();
            assert_eq!(out.best.elevation(), 350, "seed {}", seed);
            assert_eq!(dish.position(), (1200, 350));
        }
    }

    #[test]
    fn ties_resolve_to_lowest_elevation() {
        let mut dish = MockDish::new(|_, el| Some(if el == 200 || el == 500 { 90 } else { 10 }));
        assert_eq!(search().run(&mut dish, 0).unwrap().best.elevation(), 200);

        let mut flat = MockDish::new(|_, _| Some(42));
        assert_eq!(search().run(&mut flat, 0).unwrap().best.elevation(), 100);
    }

    #[test]
    fn samples_every_step_of_the_range() {
        let mut dish = MockDish::new(|_, el| Some(el as u32));
        let out = search().run(&mut dish, 0).unwrap();
        assert_eq!(out.samples.len(), 61);
        assert_eq!(out.samples.first(), Some(&(100, 100)));
        assert_eq!(out.samples.last(), Some(&(700, 700)));
        assert_eq!(dish.queries(), 61);
        assert_eq!(dish.commands().last().map(String::as_str), Some("EL,700"));
    }

    #[test]
    fn failed_sample_aborts() {
        let mut dish = MockDish::new(|_, el| if el == 300 { None } else { Some(1) });
        assert!(matches!(search().run(&mut dish, 0), Err(DishError::ProtocolParse { .. })));
    }

    #[test]
    fn estimate_is_steps_times_double_settle() {
        let s = ElevationSearch::new(Duration::from_secs(1));
        assert_eq!(s.estimate(), Duration::from_secs(120));
    }

    #[test]
    fn invalid_azimuth_sends_nothing() {
        let mut dish = MockDish::new(|_, _| Some(1));
        assert!(matches!(search().run(&mut dish, 4000), Err(DishError::OutOfRange { .. })));
        assert!(dish.commands().is_empty());
    }
}
