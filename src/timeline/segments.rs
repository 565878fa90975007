use std::path::PathBuf;

use crate::foundation::core::{FrameIndex, Fps};
use crate::foundation::error::{ShortsError, ShortsResult};

/// Frames appended after the last segment so the final words are not cut off.
pub const DEFAULT_FRAME_BUFFER: u64 = 10;

/// One narration unit placed on the absolute time axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimedSegment {
    /// Narration text shown while the segment is active.
    pub text: String,
    /// Start time in seconds (running sum of prior durations).
    pub start_time: f64,
    /// Spoken duration in seconds, `> 0`.
    pub duration: f64,
    /// `start_time + duration`.
    pub end_time: f64,
    /// Audio clip this segment was measured from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<PathBuf>,
}

impl TimedSegment {
    /// Fraction of the segment elapsed at `t`, clamped to `[0, 1]`.
    pub fn progress_at(&self, t: f64) -> f64 {
        ((t - self.start_time) / self.duration).clamp(0.0, 1.0)
    }
}

/// Input for one segment before it is placed on the time axis.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SegmentInput {
    pub text: String,
    pub duration: f64,
    #[serde(default, alias = "file_path", skip_serializing_if = "Option::is_none")]
    pub audio_ref: Option<PathBuf>,
}

impl SegmentInput {
    pub fn new(text: impl Into<String>, duration: f64) -> Self {
        Self {
            text: text.into(),
            duration,
            audio_ref: None,
        }
    }
}

/// Ordered, contiguous, immutable sequence of [`TimedSegment`]s.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct Timeline {
    segments: Vec<TimedSegment>,
}

impl Timeline {
    /// Place segments back to back starting at `0.0`.
    ///
    /// Each segment's `start_time` is the exact `end_time` value of its predecessor, so
    /// contiguity holds bit-for-bit rather than within a tolerance.
    pub fn build(inputs: impl IntoIterator<Item = SegmentInput>) -> ShortsResult<Self> {
        let mut segments = Vec::new();
        let mut cursor = 0.0f64;
        for (i, input) in inputs.into_iter().enumerate() {
            if !input.duration.is_finite() || input.duration <= 0.0 {
                return Err(ShortsError::validation(format!(
                    "segment {i} duration must be finite and > 0 (got {})",
                    input.duration
                )));
            }
            let end_time = cursor + input.duration;
            segments.push(TimedSegment {
                text: input.text,
                start_time: cursor,
                duration: input.duration,
                end_time,
                audio_ref: input.audio_ref,
            });
            cursor = end_time;
        }
        if segments.is_empty() {
            return Err(ShortsError::EmptyInput);
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[TimedSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// End time of the last segment, i.e. the narration span in seconds.
    pub fn total_duration(&self) -> f64 {
        self.segments.last().map(|s| s.end_time).unwrap_or(0.0)
    }

    /// Segment active at time `t`.
    ///
    /// Bounds are inclusive on both ends. On a shared boundary the later segment wins, so
    /// the frame that lands exactly on a cut already shows the next line of narration.
    /// Returns `None` before `0.0` and after the last segment's `end_time`.
    pub fn active_segment(&self, t: f64) -> Option<&TimedSegment> {
        let idx = self.segments.partition_point(|s| s.start_time <= t);
        let seg = self.segments.get(idx.checked_sub(1)?)?;
        (t <= seg.end_time).then_some(seg)
    }

    /// Active segment and progress for a frame.
    pub fn frame_task(&self, frame: FrameIndex, fps: Fps) -> FrameTask<'_> {
        let time_position = fps.frame_time_secs(frame);
        let active = self
            .active_segment(time_position)
            .map(|seg| (seg, seg.progress_at(time_position)));
        FrameTask {
            frame,
            time_position,
            active,
        }
    }

    /// `floor(total_duration * fps) + buffer`.
    pub fn total_frames(&self, fps: Fps, buffer: u64) -> u64 {
        fps.secs_to_frames_floor(self.total_duration())
            .saturating_add(buffer)
    }
}

/// Free-function form of [`Timeline::build`] over bare durations.
pub fn build_timeline(durations: &[f64]) -> ShortsResult<Timeline> {
    Timeline::build(
        durations
            .iter()
            .enumerate()
            .map(|(i, &d)| SegmentInput::new(format!("segment {i}"), d)),
    )
}

/// Per-frame work item derived from the timeline. Never persisted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTask<'a> {
    pub frame: FrameIndex,
    pub time_position: f64,
    /// Active segment and `progress_in_segment`, absent for trailing buffer frames.
    pub active: Option<(&'a TimedSegment, f64)>,
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/segments.rs"]
mod tests;
