use std::fmt::Display;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Tuning constants for one scan profile. Thresholds are applied to the
/// dark-pixel fraction of a mark region; the `line_*` values describe the
/// cross-shaped window used to suppress ruling lines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Calibration {
    /// Pixels strictly darker than this count as ink.
    pub black_level: u8,
    pub overfilled_threshold: f32,
    pub filled_threshold: f32,
    pub void_threshold: f32,
    /// Side length of the square suppression window. Must be odd.
    pub line_window: u32,
    /// Half-width of the central bands, which span `2 * line_band - 1` pixels.
    pub line_band: u32,
    pub line_threshold: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            black_level: 204,
            overfilled_threshold: 0.6,
            filled_threshold: 0.04,
            void_threshold: 0.02,
            line_window: 31,
            line_band: 3,
            line_threshold: 0.06,
        }
    }
}

#[derive(Debug)]
pub enum CalibrationError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, serde_json::Error),
    InvalidLineWindow(u32),
    InvalidLineBand { band: u32, window: u32 },
    ThresholdOutOfRange(&'static str, f32),
}

impl Display for CalibrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationError::Io(path, e) => {
                write!(f, "unable to read calibration {}: {}", path.display(), e)
            }
            CalibrationError::Parse(path, e) => {
                write!(f, "unable to parse calibration {}: {}", path.display(), e)
            }
            CalibrationError::InvalidLineWindow(window) => {
                write!(f, "line window must be odd and non-zero, got {}", window)
            }
            CalibrationError::InvalidLineBand { band, window } => write!(
                f,
                "line band {} does not fit in a window of {} (need 0 < 2*band-1 < window)",
                band, window
            ),
            CalibrationError::ThresholdOutOfRange(name, value) => {
                write!(f, "{} must lie within [0, 1], got {}", name, value)
            }
        }
    }
}

impl std::error::Error for CalibrationError {}

impl Calibration {
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.line_window == 0 || self.line_window % 2 == 0 {
            return Err(CalibrationError::InvalidLineWindow(self.line_window));
        }
        if self.line_band == 0 || self.line_band.saturating_mul(2) - 1 >= self.line_window {
            return Err(CalibrationError::InvalidLineBand {
                band: self.line_band,
                window: self.line_window,
            });
        }

        for (name, value) in [
            ("overfilledThreshold", self.overfilled_threshold),
            ("filledThreshold", self.filled_threshold),
            ("voidThreshold", self.void_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(CalibrationError::ThresholdOutOfRange(name, value));
            }
        }

        Ok(())
    }

    /// Reads a JSON calibration file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| CalibrationError::Io(path.to_path_buf(), e))?;
        let calibration: Calibration = serde_json::from_str(&json)
            .map_err(|e| CalibrationError::Parse(path.to_path_buf(), e))?;
        calibration.validate()?;
        Ok(calibration)
    }
}
