use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encode::command::{
    RunLimits, SystemRunner, ToolCommand, ToolRunner, ensure_parent_dir, tail_lines,
};
use crate::encode::probe::probe_duration;
use crate::encode::tier::{
    EncodeAttempt, EncodeTier, HwEncoder, concat_command, detect_hw_encoder, hw_direct_command,
    static_image_command, write_concat_manifest,
};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Fps;
use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::frames::list_frames;

/// Lines of stderr kept per failed attempt.
const STDERR_TAIL_LINES: usize = 20;

/// Tool locations and policy shared by every encode.
#[derive(Clone, Debug)]
pub struct EncodeOptions {
    pub ffmpeg: OsString,
    pub ffprobe: OsString,
    /// Probe for and use a hardware encoder in the HW_DIRECT tier.
    pub use_gpu: bool,
    /// Per-invocation wall clock limit.
    pub timeout: Option<Duration>,
    /// Durations above this are accepted with a warning.
    pub soft_limit_secs: f64,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            ffmpeg: OsString::from("ffmpeg"),
            ffprobe: OsString::from("ffprobe"),
            use_gpu: true,
            timeout: Some(Duration::from_secs(600)),
            soft_limit_secs: 50.0,
        }
    }
}

/// One video to produce from a rendered frame directory and a narration track.
#[derive(Clone, Debug)]
pub struct EncodeRequest {
    pub frames_dir: PathBuf,
    pub audio_path: PathBuf,
    pub fps: Fps,
    pub output_path: PathBuf,
    /// Where the verified result is copied for easy pickup.
    pub well_known_path: Option<PathBuf>,
    /// Narration length; probed from `audio_path` when absent and needed.
    pub audio_duration: Option<f64>,
    /// Location of the concat-demuxer list.
    pub manifest_path: PathBuf,
}

/// A verified encode.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct EncodeOutcome {
    pub tier: EncodeTier,
    pub output_path: PathBuf,
    pub well_known_path: Option<PathBuf>,
    pub duration_secs: f64,
    /// Failed attempts that preceded the successful tier.
    pub attempts: Vec<EncodeAttempt>,
}

/// Drives the HW_DIRECT → CONCAT_DEMUXER → STATIC_IMAGE fallback chain.
///
/// Tiers run strictly in order, each at most once. A tier counts as successful only when its
/// output exists, is non-empty and has a probeable duration.
pub struct EncodingOrchestrator<R: ToolRunner = SystemRunner> {
    runner: R,
    opts: EncodeOptions,
}

impl<R: ToolRunner> EncodingOrchestrator<R> {
    pub fn new(runner: R, opts: EncodeOptions) -> Self {
        Self { runner, opts }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Encode `req`, escalating through tiers on failure.
    ///
    /// Returns `EncodeExhausted` carrying every attempt when no tier succeeds; nothing is
    /// copied to the well-known path in that case. Cancellation aborts immediately.
    pub fn encode(&self, req: &EncodeRequest, cancel: &CancelToken) -> ShortsResult<EncodeOutcome> {
        let frames = list_frames(&req.frames_dir)?
            .into_iter()
            .map(|(_, path)| path)
            .collect::<Vec<_>>();
        if frames.is_empty() {
            return Err(ShortsError::resource(format!(
                "no rendered frames in '{}'",
                req.frames_dir.display()
            )));
        }
        if !req.audio_path.is_file() {
            return Err(ShortsError::resource(format!(
                "narration audio '{}' not found",
                req.audio_path.display()
            )));
        }
        ensure_parent_dir(&req.output_path)?;

        let limits = RunLimits::new(self.opts.timeout, cancel.clone());
        let mut attempts = Vec::new();
        let mut tier = Some(EncodeTier::first());

        while let Some(current) = tier {
            cancel.check()?;
            tracing::info!(tier = %current, frames = frames.len(), "encoding");
            match self.run_tier(current, req, &frames, &limits)? {
                Ok(duration_secs) => {
                    return Ok(self.finish(req, current, duration_secs, attempts));
                }
                Err(attempt) => {
                    let err = ShortsError::EncodeTierFailure {
                        tier: current,
                        detail: tail_lines(&attempt.stderr_text, 3),
                    };
                    tracing::warn!(error = %err, command = %attempt.command, "encode tier failed");
                    attempts.push(attempt);
                    tier = current.next();
                }
            }
        }

        tracing::error!(attempts = attempts.len(), "every encode tier failed");
        Err(ShortsError::EncodeExhausted { attempts })
    }

    /// Outer error: the job must stop (cancellation). Inner error: this tier failed.
    fn run_tier(
        &self,
        tier: EncodeTier,
        req: &EncodeRequest,
        frames: &[PathBuf],
        limits: &RunLimits,
    ) -> ShortsResult<Result<f64, EncodeAttempt>> {
        let failed = |command: String, exit_status: Option<i32>, stderr_text: String| {
            EncodeAttempt {
                tier,
                command,
                exit_status,
                stderr_text,
            }
        };

        remove_stale(&req.output_path);
        let cmd = match self.tier_command(tier, req, frames, limits) {
            Ok(cmd) => cmd,
            Err(ShortsError::Cancelled) => return Err(ShortsError::Cancelled),
            Err(e) => return Ok(Err(failed(String::new(), None, e.to_string()))),
        };
        let command = cmd.to_string();

        let out = match self.runner.run(&cmd, limits) {
            Ok(out) => out,
            Err(ShortsError::Cancelled) => return Err(ShortsError::Cancelled),
            Err(e) => return Ok(Err(failed(command, None, e.to_string()))),
        };
        if !out.success() {
            let stderr = tail_lines(&out.stderr_text(), STDERR_TAIL_LINES);
            return Ok(Err(failed(command, out.status, stderr)));
        }

        match self.verify_output(&req.output_path, limits) {
            Ok(duration) => Ok(Ok(duration)),
            Err(ShortsError::Cancelled) => Err(ShortsError::Cancelled),
            Err(e) => Ok(Err(failed(command, out.status, e.to_string()))),
        }
    }

    fn tier_command(
        &self,
        tier: EncodeTier,
        req: &EncodeRequest,
        frames: &[PathBuf],
        limits: &RunLimits,
    ) -> ShortsResult<ToolCommand> {
        let ffmpeg = self.opts.ffmpeg.as_os_str();
        match tier {
            EncodeTier::HwDirect => {
                let hw = self.hw_encoder(limits)?;
                Ok(hw_direct_command(
                    ffmpeg,
                    hw,
                    req.fps,
                    &req.frames_dir,
                    &req.audio_path,
                    &req.output_path,
                ))
            }
            EncodeTier::ConcatDemuxer => {
                ensure_parent_dir(&req.manifest_path)?;
                write_concat_manifest(&req.manifest_path, frames, req.fps)?;
                Ok(concat_command(
                    ffmpeg,
                    &req.manifest_path,
                    &req.audio_path,
                    &req.output_path,
                ))
            }
            EncodeTier::StaticImage => {
                let first = frames
                    .first()
                    .ok_or_else(|| ShortsError::resource("no frame to use as still image"))?;
                let duration = match req.audio_duration {
                    Some(d) => d,
                    None => probe_duration(
                        &self.runner,
                        self.opts.ffprobe.as_os_str(),
                        &req.audio_path,
                        limits,
                    )?,
                };
                Ok(static_image_command(
                    ffmpeg,
                    first,
                    &req.audio_path,
                    duration,
                    &req.output_path,
                ))
            }
        }
    }

    fn hw_encoder(&self, limits: &RunLimits) -> ShortsResult<Option<HwEncoder>> {
        if !self.opts.use_gpu {
            return Ok(None);
        }
        detect_hw_encoder(&self.runner, self.opts.ffmpeg.as_os_str(), limits)
    }

    fn verify_output(&self, output: &Path, limits: &RunLimits) -> ShortsResult<f64> {
        let len = std::fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(ShortsError::tool(format!(
                "output '{}' missing or empty after encode",
                output.display()
            )));
        }
        probe_duration(&self.runner, self.opts.ffprobe.as_os_str(), output, limits)
    }

    fn finish(
        &self,
        req: &EncodeRequest,
        tier: EncodeTier,
        duration_secs: f64,
        attempts: Vec<EncodeAttempt>,
    ) -> EncodeOutcome {
        if duration_secs > self.opts.soft_limit_secs {
            tracing::warn!(
                duration_secs,
                soft_limit_secs = self.opts.soft_limit_secs,
                "video exceeds the short-form duration limit"
            );
        } else {
            tracing::info!(tier = %tier, duration_secs, output = %req.output_path.display(), "video encoded");
        }

        let well_known_path = req
            .well_known_path
            .as_ref()
            .and_then(|dst| match copy_to(&req.output_path, dst) {
                Ok(()) => Some(dst.clone()),
                Err(e) => {
                    tracing::warn!(error = %e, "could not copy video to well-known path");
                    None
                }
            });

        EncodeOutcome {
            tier,
            output_path: req.output_path.clone(),
            well_known_path,
            duration_secs,
            attempts,
        }
    }
}

fn remove_stale(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed stale output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove stale output"),
    }
}

fn copy_to(src: &Path, dst: &Path) -> ShortsResult<()> {
    ensure_parent_dir(dst)?;
    std::fs::copy(src, dst).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to copy '{}' to '{}': {e}",
            src.display(),
            dst.display()
        ))
    })?;
    Ok(())
}
