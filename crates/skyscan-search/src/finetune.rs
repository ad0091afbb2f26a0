use std::time::Duration;

use skyscan_core::position::AZIMUTH_RANGE;
use skyscan_core::{DishError, Orientation};
use skyscan_link::CommandChannel;
use tracing::{debug, info};

use crate::{sample_or_skip, SearchState};

/// Furthest azimuth offset probed on each side of the lock.
pub const FINETUNE_REACH: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub azimuth: i32,
    /// `None` when the reply could not be parsed.
    pub strength: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct FinetuneOutcome {
    pub orientation: Orientation,
    pub strength: u32,
    pub improved: bool,
    pub probes: Vec<Probe>,
}

/// One-shot azimuth perturbation around a locked position.
#[derive(Debug, Clone)]
pub struct Finetune {
    pub reach: i32,
    pub settle: Duration,
}

impl Finetune {
    pub fn new(settle: Duration) -> Self {
        Self { reach: FINETUNE_REACH, settle }
    }

    /// Offsets in probe order: `0..=reach`, then `0, -1, ..., -reach`.
    pub fn offsets(&self) -> Vec<i32> {
        (0..=self.reach).chain((0..=self.reach).map(|o| -o)).collect()
    }

    /// Probes every offset, then moves to the first probe strictly stronger
    /// than `baseline`, or back to `locked` if there is none.
    ///
    /// Probes only move the azimuth; the final move sets both axes, so the
    /// dish ends at exactly the chosen orientation.
    ///
    /// Azimuths wrap around the device circle. Unparsable probes never win.
    pub fn run<C>(&self, ch: &mut C, locked: Orientation, baseline: u32) -> Result<FinetuneOutcome, DishError>
    where
        C: CommandChannel + ?Sized,
    {
        let span = *AZIMUTH_RANGE.end() + 1;
        let mut state = SearchState::new(locked, baseline);
        let mut probes = Vec::with_capacity(self.offsets().len());

        for offset in self.offsets() {
            let at = locked.with_azimuth((locked.azimuth() + offset).rem_euclid(span))?;
            ch.move_azimuth(at.azimuth(), self.settle)?;
            state.current_orientation = at;
            let strength = sample_or_skip(ch, at)?;
            debug!("finetune: az={} strength={:?}", at.azimuth(), strength);
            probes.push(Probe { azimuth: at.azimuth(), strength });
        }

        let winner = probes
            .iter()
            .find_map(|p| p.strength.filter(|&s| s > baseline).map(|s| (p.azimuth, s)));
        if let Some((azimuth, strength)) = winner {
            state.commit(locked.with_azimuth(azimuth)?, strength);
        }

        ch.move_to(state.best_orientation, self.settle)?;
        state.current_orientation = state.best_orientation;

        let improved = winner.is_some();
        info!(
            "finetune: {} {} strength={} (baseline {})",
            if improved { "moved to" } else { "kept" },
            state.best_orientation,
            state.best_strength,
            baseline
        );
        Ok(FinetuneOutcome {
            orientation: state.best_orientation,
            strength: state.best_strength,
            improved,
            probes,
        })
    }
}
