use crate::foundation::error::{ShortsError, ShortsResult};

/// Absolute 0-based frame index on the output video timeline.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Half-open frame range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRange {
    /// Inclusive range start.
    pub start: FrameIndex,
    /// Exclusive range end.
    pub end: FrameIndex, // exclusive
}

impl FrameRange {
    /// Create a validated range with `start <= end`.
    pub fn new(start: FrameIndex, end: FrameIndex) -> ShortsResult<Self> {
        if start.0 > end.0 {
            return Err(ShortsError::validation("FrameRange start must be <= end"));
        }
        Ok(Self { start, end })
    }

    /// Number of frames contained in the range.
    pub fn len_frames(self) -> u64 {
        self.end.0.saturating_sub(self.start.0)
    }

    /// Return `true` when the range has no frames.
    pub fn is_empty(self) -> bool {
        self.start.0 == self.end.0
    }

    /// Return `true` when `f` is inside `[start, end)`.
    pub fn contains(self, f: FrameIndex) -> bool {
        self.start.0 <= f.0 && f.0 < self.end.0
    }

    /// Iterate the frame indices of the range in ascending order.
    pub fn iter(self) -> impl Iterator<Item = FrameIndex> {
        (self.start.0..self.end.0).map(FrameIndex)
    }
}

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32, // must be > 0
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> ShortsResult<Self> {
        if den == 0 {
            return Err(ShortsError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(ShortsError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number frame rate, e.g. `Fps::integer(30)`.
    pub fn integer(num: u32) -> ShortsResult<Self> {
        Self::new(num, 1)
    }

    /// Time position of a frame in seconds (`frame / fps`).
    ///
    /// Computed as `frame * den / num` so integer rates give exact values for exact inputs
    /// (frame 75 at 30 fps is exactly `2.5`).
    pub fn frame_time_secs(self, frame: FrameIndex) -> f64 {
        (frame.0 as f64) * f64::from(self.den) / f64::from(self.num)
    }

    /// Convert seconds to frame count using floor semantics.
    pub fn secs_to_frames_floor(self, secs: f64) -> u64 {
        (secs * f64::from(self.num) / f64::from(self.den))
            .floor()
            .max(0.0) as u64
    }

    /// Render the rate the way `ffmpeg -framerate` expects it.
    pub fn ffmpeg_rate(self) -> String {
        if self.den == 1 {
            self.num.to_string()
        } else {
            format!("{}/{}", self.num, self.den)
        }
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Validate dimensions for the rasterizer (`u16` surfaces) and yuv420p output (even sizes).
    pub fn validate(self) -> ShortsResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ShortsError::validation("canvas width/height must be non-zero"));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(ShortsError::validation(
                "canvas width/height must fit in 16 bits",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(ShortsError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
