//! Fixed-width field encoding for the dish's move commands.

use serde::Deserialize;

/// How the 4-digit azimuth field is rendered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AzimuthEncoding {
    /// Zero-padded decimal, as computed.
    Plain,
    /// TracVision-family firmware: a trailing zero is rotated to the front.
    ///
    /// Distinct multiples of 10 stay distinct on the wire, but an off-grid
    /// azimuth can share a field with a grid one (`12` and `120` both send
    /// `"0012"`); that ambiguity belongs to the firmware's field format.
    #[default]
    ShiftTrailingZero,
}

/// Moves a trailing `'0'` to the front of a field (`"1200"` -> `"0120"`).
///
/// Fields ending in any other digit are sent unchanged.
pub fn shift_trailing_zero(field: &str) -> String {
    match field.strip_suffix('0') {
        Some(head) => format!("0{}", head),
        None => field.to_string(),
    }
}

pub fn encode_azimuth(azimuth: i32, encoding: AzimuthEncoding) -> String {
    let field = format!("{:04}", azimuth);
    match encoding {
        AzimuthEncoding::Plain => field,
        AzimuthEncoding::ShiftTrailingZero => shift_trailing_zero(&field),
    }
}

pub fn encode_elevation(elevation: i32) -> String {
    format!("{:03}", elevation)
}
