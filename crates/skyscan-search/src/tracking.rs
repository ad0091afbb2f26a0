use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use skyscan_core::position::ELEVATION_RANGE;
use skyscan_core::{DishError, Orientation};
use skyscan_link::CommandChannel;
use tracing::{debug, info};

use crate::{sample_or_skip, SearchState};

#[derive(Debug, Clone)]
pub struct TrackingParams {
    pub az_step: i32,
    pub el_step: i32,
    /// Leaving this window means the target has left the field of view.
    pub azimuth_bounds: RangeInclusive<i32>,
    pub elevation_bounds: RangeInclusive<i32>,
    pub settle: Duration,
}

impl Default for TrackingParams {
    fn default() -> Self {
        Self {
            az_step: 10,
            el_step: 5,
            azimuth_bounds: 0..=360,
            elevation_bounds: ELEVATION_RANGE,
            settle: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStop {
    /// A position checked before the iteration left the bounds.
    OutOfView,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackState {
    Tracking,
    Terminated(TrackStop),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackOutcome {
    pub stop: TrackStop,
    pub last_good: Orientation,
    /// `None` if cancelled before the baseline sample.
    pub best_strength: Option<u32>,
    pub iterations: u64,
}

/// Closed-loop diagonal stepping that follows the signal.
///
/// Each iteration tries `(+az_step, +el_step)`, then the mirrored step, and
/// returns to where it started if neither beats the best strength so far.
/// The loop has no iteration cap; `cancel` is polled only between
/// iterations so a move is never left half issued.
pub struct Tracker {
    params: TrackingParams,
}

impl Tracker {
    pub fn new(params: TrackingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrackingParams {
        &self.params
    }

    /// Runs from `start`, where the dish is assumed to already point.
    ///
    /// The baseline sample at `start` must parse, since nothing can be
    /// compared against it otherwise.
    pub fn run<C>(&self, ch: &mut C, start: Orientation, cancel: &AtomicBool) -> Result<TrackOutcome, DishError>
    where
        C: CommandChannel + ?Sized,
    {
        if cancel.load(Ordering::SeqCst) {
            return Ok(TrackOutcome { stop: TrackStop::Cancelled, last_good: start, best_strength: None, iterations: 0 });
        }

        let baseline = ch.query_signal_strength()?;
        let mut state = SearchState::new(start, baseline);
        let mut iterations = 0u64;
        let mut track = TrackState::Tracking;
        info!("track: starting at {} strength={}", start, baseline);

        let stop = loop {
            if let TrackState::Terminated(stop) = track {
                break stop;
            }
            if cancel.load(Ordering::SeqCst) {
                track = TrackState::Terminated(TrackStop::Cancelled);
                continue;
            }

            let (az, el) = (state.current_orientation.azimuth(), state.current_orientation.elevation());
            let (da, de) = (self.params.az_step, self.params.el_step);
            let forward = (az.saturating_add(da), el.saturating_add(de));
            let backward = (az.saturating_sub(da), el.saturating_sub(de));
            if ![(az, el), forward, backward].iter().all(|&p| self.in_view(p)) {
                info!("track: satellite out of view from {}", state.current_orientation);
                track = TrackState::Terminated(TrackStop::OutOfView);
                continue;
            }

            iterations += 1;
            let pre = state.current_orientation;
            if self.try_step(ch, forward, &mut state)? || self.try_step(ch, backward, &mut state)? {
                continue;
            }
            ch.move_to(pre, self.params.settle)?;
            state.current_orientation = pre;
            debug!("track: no improvement, holding {}", pre);
        };

        info!("track: stopped ({:?}) at {} after {} iterations", stop, state.best_orientation, iterations);
        Ok(TrackOutcome {
            stop,
            last_good: state.current_orientation,
            best_strength: Some(state.best_strength),
            iterations,
        })
    }

    fn in_view(&self, (az, el): (i32, i32)) -> bool {
        self.params.azimuth_bounds.contains(&az) && self.params.elevation_bounds.contains(&el)
    }

    // Moves to `to`; commits it if it beats the best strength so far.
    fn try_step<C>(&self, ch: &mut C, (az, el): (i32, i32), state: &mut SearchState) -> Result<bool, DishError>
    where
        C: CommandChannel + ?Sized,
    {
        let to = Orientation::new(az, el)?;
        ch.move_to(to, self.params.settle)?;
        state.current_orientation = to;
        match sample_or_skip(ch, to)? {
            Some(s) if s > state.best_strength => {
                debug!("track: {} improved to {}", to, s);
                state.commit(to, s);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
