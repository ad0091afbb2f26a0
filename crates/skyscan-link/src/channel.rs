use std::time::Duration;

use skyscan_core::encoding::AzimuthEncoding;
use skyscan_core::position::{check_azimuth, check_elevation};
use skyscan_core::{DishError, Orientation, SignalSample};

use crate::protocol::{self, SIGLEVEL, VERSION};
use crate::timing::Timing;

/// A dish in terminal mode, reachable only through request/response exchanges.
///
/// Implementors provide [`send`](CommandChannel::send); everything else is
/// built on it so every caller inherits the same settle discipline.
pub trait CommandChannel {
    /// Writes `command` plus the line terminator, waits `settle`, then returns
    /// whatever the device buffered. An empty string means no reply.
    fn send(&mut self, command: &str, settle: Duration) -> Result<String, DishError>;

    fn timing(&self) -> &Timing;

    fn azimuth_encoding(&self) -> AzimuthEncoding {
        AzimuthEncoding::Plain
    }

    /// Firmware identification string.
    fn identify(&mut self) -> Result<String, DishError> {
        let settle = self.timing().command;
        Ok(self.send(VERSION, settle)?.trim().to_string())
    }

    fn query_signal_strength(&mut self) -> Result<u32, DishError> {
        let settle = self.timing().query;
        let response = self.send(SIGLEVEL, settle)?;
        protocol::parse_signal_level(&response)
    }

    /// Queries strength and stamps it with the position it was taken at.
    fn sample(&mut self, at: Orientation) -> Result<SignalSample, DishError> {
        let strength = self.query_signal_strength()?;
        Ok(SignalSample::now(at, strength))
    }

    fn move_azimuth(&mut self, azimuth: i32, settle: Duration) -> Result<(), DishError> {
        check_azimuth(azimuth)?;
        let command = protocol::azimuth_command(azimuth, self.azimuth_encoding());
        self.send(&command, settle)?;
        Ok(())
    }

    fn move_elevation(&mut self, elevation: i32, settle: Duration) -> Result<(), DishError> {
        check_elevation(elevation)?;
        self.send(&protocol::elevation_command(elevation), settle)?;
        Ok(())
    }

    /// Azimuth first, then elevation.
    fn move_to(&mut self, orientation: Orientation, settle: Duration) -> Result<(), DishError> {
        self.move_azimuth(orientation.azimuth(), settle)?;
        self.move_elevation(orientation.elevation(), settle)
    }

    /// Drives to [`Orientation::REFERENCE`].
    fn park(&mut self) -> Result<(), DishError> {
        let settle = self.timing().park;
        self.move_to(Orientation::REFERENCE, settle)
    }
}
