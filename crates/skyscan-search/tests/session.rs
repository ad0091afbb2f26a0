use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::time::Duration;

use skyscan_core::encoding::AzimuthEncoding;
use skyscan_core::matrix::ScanBounds;
use skyscan_core::Orientation;
use skyscan_link::{CommandChannel, SerialLink, Timing, Transport};
use skyscan_search::{Finetune, RasterScan};
use tempfile::TempDir;

/// Byte-level stand-in for the dish firmware.
struct SimDish {
    line: Vec<u8>,
    out: VecDeque<u8>,
    az: i32,
    el: i32,
    halted: bool,
}

impl SimDish {
    fn booting() -> Self {
        Self {
            line: Vec::new(),
            out: b"boot: TracVision L2\r\nboot: self test ok\r\n".iter().copied().collect(),
            az: 900,
            el: 400,
            halted: false,
        }
    }

    fn strength(&self) -> u32 {
        (200 - (self.az - 1203).abs() - (self.el - 110).abs()).max(0) as u32
    }

    fn handle(&mut self, cmd: &str) {
        let reply = if cmd == "halt" {
            self.halted = true;
            self.out.clear();
            "halted\r\n".to_string()
        } else if !self.halted {
            "booting\r\n".to_string()
        } else if let Some(v) = cmd.strip_prefix("AZ,") {
            self.az = v.parse().unwrap();
            String::new()
        } else if let Some(v) = cmd.strip_prefix("EL,") {
            self.el = v.parse().unwrap();
            String::new()
        } else if cmd == "SIGLEVEL" {
            format!("Signal Strength = {:04} dB\r\n", self.strength())
        } else if cmd == "version" {
            "TracVision L2 v1.21\r\n".to_string()
        } else {
            "?\r\n".to_string()
        };
        self.out.extend(reply.bytes());
    }
}

impl Read for SimDish {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.out.len());
        for (slot, b) in buf.iter_mut().zip(self.out.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

impl Write for SimDish {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &b in buf {
            if b == b'\n' {
                let line = String::from_utf8_lossy(&self.line).trim().to_string();
                self.line.clear();
                self.handle(&line);
            } else {
                self.line.push(b);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for SimDish {
    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.out.len())
    }
}

#[test]
fn startup_scan_and_finetune() {
    let mut ch = SerialLink::from_transport(SimDish::booting(), "sim")
        .enter_terminal_mode(Timing::zero(), AzimuthEncoding::Plain)
        .unwrap();

    assert_eq!(ch.identify().unwrap(), "TracVision L2 v1.21");
    ch.park().unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.txt");
    let bounds = ScanBounds::new(1180, 1220, 100, 120).unwrap();
    let scan = RasterScan::new(bounds, Duration::ZERO);
    let matrix = scan.run(&mut ch, |m| m.save(&path)).unwrap();

    assert_eq!(matrix.sampled(), scan.cells());
    assert_eq!((matrix.rows(), matrix.cols()), (3, 5));
    let saved = std::fs::read_to_string(&path).unwrap();
    assert_eq!(saved.lines().count(), 3);
    assert_eq!(saved.lines().next(), Some("-1 -1 -1 -1 -1"));
    assert!(saved.lines().skip(1).all(|l| l.starts_with("-1 ") && !l[3..].contains("-1")));

    // strongest cell is el=110 (row 1), az=1200 (column 2)
    assert_eq!(matrix.max(), matrix.get(1, 2));

    let locked = Orientation::new(1200, 110).unwrap();
    ch.move_to(locked, Duration::ZERO).unwrap();
    let baseline = ch.query_signal_strength().unwrap();
    let out = Finetune::new(Duration::ZERO).run(&mut ch, locked, baseline).unwrap();
    assert!(out.improved);
    assert_eq!(out.orientation.azimuth(), 1201);
}
