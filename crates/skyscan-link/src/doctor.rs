use anyhow::Result;

use crate::serial::available_ports;
use crate::timing::Timing;

pub fn check_serial(port: &str, baud: u32) -> Result<()> {
    anyhow::ensure!(!port.is_empty(), "serial.port missing");
    anyhow::ensure!(baud >= 1200 && baud <= 115_200, "serial.baud should be 1200..115200, got {}", baud);
    Ok(())
}

pub fn check_timing(t: &Timing) -> Result<()> {
    anyhow::ensure!(!t.halt.is_zero(), "timing.halt_ms must be > 0 to interrupt boot");
    anyhow::ensure!(!t.query.is_zero(), "timing.query_ms must be > 0; replies are read after the settle window");
    anyhow::ensure!(t.park >= t.motion, "timing.park_ms should not be shorter than timing.move_ms");
    Ok(())
}

/// Whether the OS currently enumerates `port`.
pub fn port_present(port: &str) -> bool {
    available_ports().iter().any(|p| p == port)
}
