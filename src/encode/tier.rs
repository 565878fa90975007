use std::ffi::OsStr;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::encode::command::{RunLimits, ToolCommand, ToolRunner};
use crate::foundation::core::Fps;
use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::frames::FRAME_PATTERN;

const AUDIO_ARGS: [&str; 4] = ["-c:a", "aac", "-b:a", "192k"];
const HW_BITRATE: &str = "5M";

/// Encoding strategies, tried in this order until one produces a verified video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncodeTier {
    /// Image-sequence input, hardware H.264 encoder when available.
    HwDirect,
    /// Explicit per-frame file list through the concat demuxer, software H.264.
    ConcatDemuxer,
    /// First frame looped for the whole narration.
    StaticImage,
}

impl EncodeTier {
    pub const ALL: [EncodeTier; 3] = [Self::HwDirect, Self::ConcatDemuxer, Self::StaticImage];

    pub fn first() -> Self {
        Self::HwDirect
    }

    /// Tier to escalate to after this one fails. Never goes backwards.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::HwDirect => Some(Self::ConcatDemuxer),
            Self::ConcatDemuxer => Some(Self::StaticImage),
            Self::StaticImage => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HwDirect => "hw_direct",
            Self::ConcatDemuxer => "concat_demuxer",
            Self::StaticImage => "static_image",
        }
    }
}

impl std::fmt::Display for EncodeTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of one tier invocation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct EncodeAttempt {
    pub tier: EncodeTier,
    pub command: String,
    /// `None` when the process never exited normally (spawn failure, timeout, signal).
    pub exit_status: Option<i32>,
    pub stderr_text: String,
}

impl std::fmt::Display for EncodeAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.exit_status {
            Some(code) => write!(f, "{} (exit {code}): {}", self.tier, self.stderr_text),
            None => write!(f, "{} (no exit status): {}", self.tier, self.stderr_text),
        }
    }
}

/// A hardware H.264 encoder reachable through one ffmpeg hwaccel method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HwEncoder {
    pub accel: &'static str,
    pub codec: &'static str,
    extra_args: &'static [&'static str],
}

/// Known accelerators in preference order.
pub const KNOWN_HW_ENCODERS: [HwEncoder; 3] = [
    HwEncoder {
        accel: "videotoolbox",
        codec: "h264_videotoolbox",
        extra_args: &["-allow_sw", "1"],
    },
    HwEncoder {
        accel: "cuda",
        codec: "h264_nvenc",
        extra_args: &[],
    },
    HwEncoder {
        accel: "qsv",
        codec: "h264_qsv",
        extra_args: &[],
    },
];

/// `ffmpeg -hide_banner -hwaccels`
pub fn hwaccels_command(ffmpeg: &OsStr) -> ToolCommand {
    ToolCommand::new(ffmpeg).args(["-hide_banner", "-hwaccels"])
}

/// Method names listed by [`hwaccels_command`], lowercased, header dropped.
pub fn parse_hwaccels(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.ends_with(':'))
        .map(str::to_ascii_lowercase)
        .collect()
}

pub fn select_hw_encoder(methods: &[String]) -> Option<HwEncoder> {
    KNOWN_HW_ENCODERS
        .iter()
        .find(|enc| methods.iter().any(|m| m == enc.accel))
        .copied()
}

/// Probe ffmpeg for a usable hardware encoder. Any failure means "none".
pub fn detect_hw_encoder(
    runner: &dyn ToolRunner,
    ffmpeg: &OsStr,
    limits: &RunLimits,
) -> ShortsResult<Option<HwEncoder>> {
    let out = match runner.run(&hwaccels_command(ffmpeg), limits) {
        Ok(out) => out,
        Err(ShortsError::Cancelled) => return Err(ShortsError::Cancelled),
        Err(e) => {
            tracing::debug!(error = %e, "hwaccel listing failed");
            return Ok(None);
        }
    };
    if !out.success() {
        return Ok(None);
    }
    let mut listing = out.stdout_text();
    listing.push('\n');
    listing.push_str(&out.stderr_text());
    let found = select_hw_encoder(&parse_hwaccels(&listing));
    match found {
        Some(enc) => tracing::info!(accel = enc.accel, codec = enc.codec, "hardware encoder available"),
        None => tracing::info!("no hardware encoder found, using libx264"),
    }
    Ok(found)
}

/// HW_DIRECT: image-sequence input at the frame rate, hardware or libx264 video.
pub fn hw_direct_command(
    ffmpeg: &OsStr,
    hw: Option<HwEncoder>,
    fps: Fps,
    frames_dir: &Path,
    audio: &Path,
    out: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffmpeg).arg("-y");
    if let Some(hw) = hw {
        cmd = cmd.args(["-hwaccel", hw.accel]);
    }
    cmd = cmd
        .args(["-framerate", &fps.ffmpeg_rate(), "-i"])
        .arg(frames_dir.join(FRAME_PATTERN))
        .arg("-i")
        .arg(audio);
    cmd = match hw {
        Some(hw) => cmd
            .args(["-c:v", hw.codec, "-b:v", HW_BITRATE])
            .args(hw.extra_args),
        None => cmd.args([
            "-c:v",
            "libx264",
            "-profile:v",
            "main",
            "-preset",
            "medium",
            "-crf",
            "23",
        ]),
    };
    cmd.args(["-pix_fmt", "yuv420p"])
        .args(AUDIO_ARGS)
        .arg("-shortest")
        .arg(out)
}

/// CONCAT_DEMUXER: explicit frame list, software H.264.
pub fn concat_command(ffmpeg: &OsStr, manifest: &Path, audio: &Path, out: &Path) -> ToolCommand {
    ToolCommand::new(ffmpeg)
        .args(["-y", "-f", "concat", "-safe", "0", "-i"])
        .arg(manifest)
        .arg("-i")
        .arg(audio)
        .args([
            "-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf", "23", "-preset", "medium",
        ])
        .args(AUDIO_ARGS)
        .arg("-shortest")
        .arg(out)
}

/// STATIC_IMAGE: one looped still for `duration_secs`.
pub fn static_image_command(
    ffmpeg: &OsStr,
    first_frame: &Path,
    audio: &Path,
    duration_secs: f64,
    out: &Path,
) -> ToolCommand {
    ToolCommand::new(ffmpeg)
        .args(["-y", "-loop", "1", "-i"])
        .arg(first_frame)
        .arg("-i")
        .arg(audio)
        .args(["-c:v", "libx264", "-tune", "stillimage"])
        .args(AUDIO_ARGS)
        .args(["-pix_fmt", "yuv420p", "-shortest", "-t"])
        .arg(format!("{duration_secs:.3}"))
        .arg(out)
}

/// Concat-demuxer list: one `file` line per frame, in the given order, each shown for one
/// frame interval.
pub fn concat_manifest(frames: &[PathBuf], fps: Fps) -> ShortsResult<String> {
    let frame_secs = f64::from(fps.den) / f64::from(fps.num);
    let mut text = String::new();
    let mut last = None;
    for frame in frames {
        let abs = std::path::absolute(frame).map_err(|e| {
            ShortsError::validation(format!(
                "cannot make frame path '{}' absolute: {e}",
                frame.display()
            ))
        })?;
        let quoted = abs.to_string_lossy().replace('\'', r"'\''");
        text.push_str(&format!("file '{quoted}'\nduration {frame_secs:.6}\n"));
        last = Some(quoted);
    }
    // The demuxer drops the last entry's duration unless that file is listed once more.
    if let Some(quoted) = last {
        text.push_str(&format!("file '{quoted}'\n"));
    }
    Ok(text)
}

pub fn write_concat_manifest(path: &Path, frames: &[PathBuf], fps: Fps) -> ShortsResult<()> {
    let text = concat_manifest(frames, fps)?;
    let mut file = std::fs::File::create(path).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to create concat list '{}': {e}",
            path.display()
        ))
    })?;
    file.write_all(text.as_bytes()).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to write concat list '{}': {e}",
            path.display()
        ))
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/tier.rs"]
mod tests;
