use anyhow::Result;
use skyscan_core::{DishError, Pointing, SignalSample, NOISE_FLOOR};
use skyscan_link::CommandChannel;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Ephemeris collaborator: where `target` is, seen from the station, now.
pub trait PointingSource {
    fn pointing(&mut self, target: &str) -> Result<Pointing>;
}

/// Pointing supplied up front, e.g. from config for a geostationary target.
#[derive(Debug, Clone, Copy)]
pub struct FixedPointing {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl PointingSource for FixedPointing {
    fn pointing(&mut self, _target: &str) -> Result<Pointing> {
        Ok(Pointing {
            azimuth_deg: self.azimuth_deg,
            elevation_deg: self.elevation_deg,
            at: OffsetDateTime::now_utc(),
        })
    }
}

/// Points the dish at `target` and checks the signal clears the noise floor.
///
/// Fails with [`DishError::SignalLoss`] when it does not; the dish is left
/// pointing at the target either way.
pub fn acquire_lock<C, P>(ch: &mut C, source: &mut P, target: &str) -> Result<SignalSample>
where
    C: CommandChannel + ?Sized,
    P: PointingSource + ?Sized,
{
    let pointing = source.pointing(target)?;
    let at = pointing.to_orientation()?;
    info!(
        "lock: {} at az={:.1}° el={:.1}° -> {}",
        target, pointing.azimuth_deg, pointing.elevation_deg, at
    );

    let settle = ch.timing().motion;
    ch.move_to(at, settle)?;
    let sample = ch.sample(at)?;
    if sample.strength < NOISE_FLOOR {
        warn!("lock: no signal at {} (strength {})", at, sample.strength);
        return Err(DishError::SignalLoss { strength: sample.strength, floor: NOISE_FLOOR }.into());
    }

    info!("lock: acquired {} strength={}", at, sample.strength);
    Ok(sample)
}
