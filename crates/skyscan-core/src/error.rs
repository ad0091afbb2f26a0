use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Azimuth,
    Elevation,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Azimuth => f.write_str("azimuth"),
            Axis::Elevation => f.write_str("elevation"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DishError {
    /// The serial device could not be opened.
    #[error("cannot open dish on {port}: {reason}")]
    Connection { port: String, reason: String },

    /// A response did not have the shape expected for the command that was sent.
    #[error("unexpected response to {command}: {response:?}")]
    ProtocolParse { command: String, response: String },

    /// Rejected before any command was written.
    #[error("{axis} {value} outside device range [{min}, {max}]")]
    OutOfRange { axis: Axis, value: i64, min: i32, max: i32 },

    #[error("no lock: signal strength {strength} below noise floor {floor}")]
    SignalLoss { strength: u32, floor: u32 },

    #[error("scan bounds cover no cells: {0}")]
    EmptyScan(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DishError {
    pub fn parse(command: &str, response: &str) -> Self {
        Self::ProtocolParse { command: command.to_string(), response: response.to_string() }
    }

    /// True for failures that only invalidate a single sample, not the session.
    pub fn is_bad_sample(&self) -> bool {
        matches!(self, DishError::ProtocolParse { .. })
    }
}
