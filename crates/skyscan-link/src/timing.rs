use serde::Deserialize;
use std::time::Duration;

/// Settle windows imposed after each kind of command before the reply is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// After `halt`, long enough to interrupt the boot sequence.
    pub halt: Duration,
    /// Non-motion commands such as `version`.
    pub command: Duration,
    pub query: Duration,
    /// Moves to the reference position, which may cross the whole range.
    pub park: Duration,
    /// Ordinary moves issued by the searches.
    pub motion: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            halt: Duration::from_secs(3),
            command: Duration::from_secs(1),
            query: Duration::from_secs(1),
            park: Duration::from_secs(5),
            motion: Duration::from_secs(3),
        }
    }
}

impl Timing {
    pub const fn zero() -> Self {
        Self {
            halt: Duration::ZERO,
            command: Duration::ZERO,
            query: Duration::ZERO,
            park: Duration::ZERO,
            motion: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimingConfig {
    pub halt_ms: Option<u64>,
    pub command_ms: Option<u64>,
    pub query_ms: Option<u64>,
    pub park_ms: Option<u64>,
    pub move_ms: Option<u64>,
}

impl From<&TimingConfig> for Timing {
    fn from(cfg: &TimingConfig) -> Self {
        let d = Timing::default();
        let ms = |v: Option<u64>, fallback: Duration| v.map(Duration::from_millis).unwrap_or(fallback);
        Self {
            halt: ms(cfg.halt_ms, d.halt),
            command: ms(cfg.command_ms, d.command),
            query: ms(cfg.query_ms, d.query),
            park: ms(cfg.park_ms, d.park),
            motion: ms(cfg.move_ms, d.motion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_overrides_only_given_windows() {
        let cfg = TimingConfig { query_ms: Some(250), ..Default::default() };
        let t = Timing::from(&cfg);
        assert_eq!(t.query, Duration::from_millis(250));
        assert_eq!(t.halt, Duration::from_secs(3));
        assert_eq!(t.park, Duration::from_secs(5));
    }
}
