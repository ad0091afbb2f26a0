//! In-memory dish for exercising the searches without hardware.

use std::time::Duration;

use skyscan_core::DishError;

use crate::channel::CommandChannel;
use crate::protocol::{AZIMUTH_PREFIX, ELEVATION_PREFIX, HALT, SIGLEVEL, VERSION};
use crate::timing::Timing;

pub const MOCK_VERSION: &str = "TracVision L2 (mock) v1.0";

type Landscape = Box<dyn FnMut(i32, i32) -> Option<u32> + Send>;

/// Zero-delay dish that answers `SIGLEVEL` from a strength landscape.
///
/// The landscape maps `(azimuth, elevation)` to a strength; `None` produces a
/// reply without `=`, which the parser rejects. Azimuth fields are read as
/// plain zero-padded decimals.
pub struct MockDish {
    azimuth: i32,
    elevation: i32,
    landscape: Landscape,
    commands: Vec<String>,
    timing: Timing,
}

impl MockDish {
    pub fn new(landscape: impl FnMut(i32, i32) -> Option<u32> + Send + 'static) -> Self {
        Self {
            azimuth: 0,
            elevation: 100,
            landscape: Box::new(landscape),
            commands: Vec::new(),
            timing: Timing::zero(),
        }
    }

    pub fn starting_at(mut self, azimuth: i32, elevation: i32) -> Self {
        self.azimuth = azimuth;
        self.elevation = elevation;
        self
    }

    pub fn position(&self) -> (i32, i32) {
        (self.azimuth, self.elevation)
    }

    /// Every command received, in order.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn moves(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| c.starts_with(AZIMUTH_PREFIX) || c.starts_with(ELEVATION_PREFIX))
            .count()
    }

    pub fn queries(&self) -> usize {
        self.commands.iter().filter(|c| *c == SIGLEVEL).count()
    }

    fn reply(&mut self, command: &str) -> String {
        if let Some(field) = command.strip_prefix(AZIMUTH_PREFIX) {
            if let Ok(az) = field.parse() {
                self.azimuth = az;
            }
            return String::new();
        }
        if let Some(field) = command.strip_prefix(ELEVATION_PREFIX) {
            if let Ok(el) = field.parse() {
                self.elevation = el;
            }
            return String::new();
        }
        match command {
            SIGLEVEL => match (self.landscape)(self.azimuth, self.elevation) {
                Some(v) => format!("Signal Strength = {:04} dB\r\n", v),
                None => "SIGLEVEL ?\r\n".to_string(),
            },
            VERSION => format!("{}\r\n", MOCK_VERSION),
            HALT => "halted\r\n".to_string(),
            _ => "Unknown command\r\n".to_string(),
        }
    }
}

impl CommandChannel for MockDish {
    fn send(&mut self, command: &str, _settle: Duration) -> Result<String, DishError> {
        self.commands.push(command.to_string());
        Ok(self.reply(command))
    }

    fn timing(&self) -> &Timing {
        &self.timing
    }
}
