//! Command vocabulary of the dish controller and its response shapes.

use skyscan_core::encoding::{encode_azimuth, encode_elevation, AzimuthEncoding};
use skyscan_core::DishError;

pub const LINE_END: &str = "\r\n";

pub const HALT: &str = "halt";
pub const VERSION: &str = "version";
pub const SIGLEVEL: &str = "SIGLEVEL";
pub const AZIMUTH_PREFIX: &str = "AZ,";
pub const ELEVATION_PREFIX: &str = "EL,";

pub fn azimuth_command(azimuth: i32, encoding: AzimuthEncoding) -> String {
    format!("{}{}", AZIMUTH_PREFIX, encode_azimuth(azimuth, encoding))
}

pub fn elevation_command(elevation: i32) -> String {
    format!("{}{}", ELEVATION_PREFIX, encode_elevation(elevation))
}

/// Parses a `SIGLEVEL` reply of the form `<label> = <value> <unit>`.
///
/// The reply may be preceded by an echo of the command; the first line
/// carrying `=` is used. Leading zeros are stripped and an all-zero value
/// is 0.
pub fn parse_signal_level(response: &str) -> Result<u32, DishError> {
    let err = || DishError::parse(SIGLEVEL, response);

    let line = response.lines().find(|l| l.contains('=')).ok_or_else(err)?;
    let (_, rest) = line.split_once('=').ok_or_else(err)?;
    let value = rest.split_whitespace().next().ok_or_else(err)?;
    if !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(err());
    }

    let digits = value.trim_start_matches('0');
    if digits.is_empty() {
        return Ok(0);
    }
    digits.parse().map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_value() {
        assert_eq!(parse_signal_level("Signal Strength =  0041 dB").unwrap(), 41);
        assert_eq!(parse_signal_level("Signal Strength = 0041 dB\r\n").unwrap(), 41);
    }

    #[test]
    fn all_zero_is_zero() {
        assert_eq!(parse_signal_level("Signal Strength = 0000 dB").unwrap(), 0);
    }

    #[test]
    fn skips_echoed_command() {
        assert_eq!(parse_signal_level("SIGLEVEL\r\nSignal Strength = 0120 dB\r\n>").unwrap(), 120);
    }

    #[test]
    fn missing_delimiter_is_parse_error() {
        for bad in ["Signal Strength 0041 dB", "", "SIGLEVEL\r\n", "Signal Strength = dB", "Signal Strength =   "] {
            assert!(
                matches!(parse_signal_level(bad), Err(DishError::ProtocolParse { .. })),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn overflowing_value_is_parse_error() {
        assert!(parse_signal_level("Signal Strength = 99999999999 dB").is_err());
    }

    #[test]
    fn move_commands() {
        assert_eq!(azimuth_command(0, AzimuthEncoding::ShiftTrailingZero), "AZ,0000");
        assert_eq!(azimuth_command(1200, AzimuthEncoding::ShiftTrailingZero), "AZ,0120");
        assert_eq!(azimuth_command(1200, AzimuthEncoding::Plain), "AZ,1200");
        assert_eq!(elevation_command(100), "EL,100");
    }
}
