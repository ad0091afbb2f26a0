use std::fs;
use std::io::Write;
use std::path::Path;

use crate::error::DishError;
use crate::position::{check_azimuth, check_elevation};

/// Written for cells that have not been sampled yet.
pub const UNSAMPLED: i64 = -1;

/// Raster bounds in device units, validated against the device domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanBounds {
    pub start_az: i32,
    pub end_az: i32,
    pub start_el: i32,
    pub end_el: i32,
}

impl ScanBounds {
    pub fn new(start_az: i32, end_az: i32, start_el: i32, end_el: i32) -> Result<Self, DishError> {
        check_azimuth(start_az)?;
        check_azimuth(end_az)?;
        check_elevation(start_el)?;
        check_elevation(end_el)?;
        if start_az > end_az || start_el > end_el {
            return Err(DishError::EmptyScan(format!(
                "az {}..{} el {}..{}",
                start_az, end_az, start_el, end_el
            )));
        }
        Ok(Self { start_az, end_az, start_el, end_el })
    }

    /// Sidecar consumed by the heatmap renderer: one bound per line.
    pub fn save_settings(&self, path: &Path) -> Result<(), DishError> {
        let text = format!("{}\n{}\n{}\n{}\n", self.start_az, self.end_az, self.start_el, self.end_el);
        write_replacing(path, text.as_bytes())
    }
}

/// Elevation-by-azimuth grid of signal strengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<u32>>,
}

impl ScanMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols, cells: vec![None; rows * cols] }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        self.cells.get(self.index(row, col)?).copied().flatten()
    }

    /// Overwrites the cell; returns the previous value.
    pub fn set(&mut self, row: usize, col: usize, strength: u32) -> Option<u32> {
        let idx = self.index(row, col)?;
        self.cells[idx].replace(strength)
    }

    pub fn sampled(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    pub fn max(&self) -> Option<u32> {
        self.cells.iter().flatten().copied().max()
    }

    /// Plain-text matrix, one row per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for row in self.cells.chunks(self.cols.max(1)).take(self.rows) {
            let line: Vec<String> = row
                .iter()
                .map(|c| c.map(i64::from).unwrap_or(UNSAMPLED).to_string())
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }

    /// Checkpoints the whole matrix, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<(), DishError> {
        write_replacing(path, self.to_text().as_bytes())
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }
}

// Write-then-rename so a reader never sees a partial checkpoint.
fn write_replacing(path: &Path, bytes: &[u8]) -> Result<(), DishError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
