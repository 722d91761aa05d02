use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Rational number used for sequence frame rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// 30 frames per second.
    pub const FPS_30: Self = Self { num: 30, den: 1 };

    /// Creates a validated rational.
    ///
    /// # Example
    /// ```
    /// use splice_engine::Rational;
    ///
    /// let ntsc = Rational::new(30_000, 1_001).expect("valid");
    /// assert_eq!(ntsc.den, 1_001);
    /// assert!(Rational::new(0, 1).is_err());
    /// ```
    pub fn new(num: i32, den: i32) -> Result<Self> {
        if num <= 0 || den <= 0 {
            return Err(EngineError::InvalidRational { num, den });
        }
        Ok(Self { num, den })
    }

    /// Returns the value as a float.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Whole frames per second used for timecode display, rounded to nearest.
    pub fn timebase(self) -> i64 {
        let num = i64::from(self.num);
        let den = i64::from(self.den);
        ((num + den / 2) / den).max(1)
    }
}

/// Converts a frame offset to seconds at `rate`.
pub fn frame_to_seconds(frame: i64, rate: Rational) -> f64 {
    frame as f64 * f64::from(rate.den) / f64::from(rate.num)
}

/// Formats a frame offset as non-drop `HH:MM:SS:FF` timecode.
///
/// # Example
/// ```
/// use splice_engine::{Rational, frame_to_timecode};
///
/// assert_eq!(frame_to_timecode(95, Rational::FPS_30), "00:00:03:05");
/// ```
pub fn frame_to_timecode(frame: i64, rate: Rational) -> String {
    let timebase = rate.timebase();
    let sign = if frame < 0 { "-" } else { "" };
    let frame = frame.abs();

    let frames = frame % timebase;
    let total_seconds = frame / timebase;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3_600;
    format!("{sign}{hours:02}:{minutes:02}:{seconds:02}:{frames:02}")
}
