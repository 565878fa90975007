use std::path::{Path, PathBuf};

use crate::config::ShortConfig;
use crate::encode::command::{RunLimits, SystemRunner, ToolCommand, ToolRunner, tail_lines};
use crate::encode::orchestrator::{EncodeOutcome, EncodeRequest, EncodingOrchestrator};
use crate::encode::probe::probe_duration;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::background::stage_background;
use crate::render::font::resolve_font;
use crate::render::pipeline::{RenderContext, RenderStats, render_all};
use crate::timeline::segments::{SegmentInput, Timeline};
use crate::timeline::speed::{SpeedPlan, plan};

/// Everything one video is made from.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobManifest {
    /// Narration segments in playback order.
    pub segments: Vec<SegmentInput>,
    /// Full narration track (all segments back to back).
    pub audio_path: PathBuf,
    /// Length of `audio_path` in seconds; probed when absent.
    #[serde(default)]
    pub audio_duration: Option<f64>,
    /// Background photo; the gradient is used when absent or unreadable.
    #[serde(default)]
    pub background: Option<PathBuf>,
    /// Music bed mixed under the narration; skipped when absent or unreadable.
    #[serde(default)]
    pub background_music: Option<PathBuf>,
}

impl JobManifest {
    /// Read a manifest. Relative media paths are taken relative to the manifest's directory.
    pub fn load(path: &Path) -> ShortsResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ShortsError::validation(format!("failed to read manifest '{}': {e}", path.display()))
        })?;
        let mut manifest: Self = serde_json::from_str(&text).map_err(|e| {
            ShortsError::validation(format!("invalid manifest '{}': {e}", path.display()))
        })?;
        if let Some(base) = path.parent() {
            manifest.resolve_relative_to(base);
        }
        Ok(manifest)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let fix = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        fix(&mut self.audio_path);
        if let Some(bg) = self.background.as_mut() {
            fix(bg);
        }
        if let Some(music) = self.background_music.as_mut() {
            fix(music);
        }
        for seg in &mut self.segments {
            if let Some(audio) = seg.audio_ref.as_mut() {
                fix(audio);
            }
        }
    }
}

/// Pipeline stage a job failure is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Timeline,
    Reconcile,
    Background,
    Render,
    Encode,
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Timeline => "timeline",
            Self::Reconcile => "reconcile",
            Self::Background => "background",
            Self::Render => "render",
            Self::Encode => "encode",
        })
    }
}

#[derive(thiserror::Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct JobError {
    pub stage: JobStage,
    #[source]
    pub source: ShortsError,
}

trait StageExt<T> {
    fn stage(self, stage: JobStage) -> Result<T, JobError>;
}

impl<T> StageExt<T> for ShortsResult<T> {
    fn stage(self, stage: JobStage) -> Result<T, JobError> {
        self.map_err(|source| JobError { stage, source })
    }
}

/// Summary of a finished job, also written to `report.json` in the run directory.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct JobReport {
    pub run_dir: PathBuf,
    pub narration_secs: f64,
    pub speed_plan: Option<SpeedPlan>,
    pub render: RenderStats,
    pub encode: EncodeOutcome,
}

/// Run a job with the system's external tools.
pub fn run_job(
    cfg: &ShortConfig,
    manifest: &JobManifest,
    run_dir: &Path,
    cancel: &CancelToken,
) -> Result<JobReport, JobError> {
    run_job_with(SystemRunner, cfg, manifest, run_dir, cancel)
}

/// Timeline → reconcile → background → render → encode, all artifacts under `run_dir`.
///
/// Artifacts of a failed stage are left in place.
pub fn run_job_with<R: ToolRunner>(
    runner: R,
    cfg: &ShortConfig,
    manifest: &JobManifest,
    run_dir: &Path,
    cancel: &CancelToken,
) -> Result<JobReport, JobError> {
    cfg.validate().stage(JobStage::Timeline)?;
    let fps = cfg.fps().stage(JobStage::Timeline)?;
    let canvas = cfg.canvas();
    let limits = RunLimits::new(
        Some(std::time::Duration::from_secs(cfg.encode_timeout_secs)),
        cancel.clone(),
    );

    let timeline = Timeline::build(manifest.segments.iter().cloned()).stage(JobStage::Timeline)?;
    std::fs::create_dir_all(run_dir)
        .map_err(|e| {
            ShortsError::Other(anyhow::anyhow!(
                "failed to create run directory '{}': {e}",
                run_dir.display()
            ))
        })
        .stage(JobStage::Timeline)?;
    tracing::info!(
        segments = timeline.len(),
        narration_secs = timeline.total_duration(),
        run_dir = %run_dir.display(),
        "timeline built"
    );

    let reconciled = reconcile(&runner, cfg, manifest, &timeline, run_dir, &limits)
        .stage(JobStage::Reconcile)?;
    let timeline = reconciled.timeline.unwrap_or(timeline);

    let background = stage_background(manifest.background.as_deref(), canvas, run_dir)
        .stage(JobStage::Background)?;

    cancel.check().stage(JobStage::Render)?;
    let frames_dir = run_dir.join("frames");
    let total_frames = timeline.total_frames(fps, cfg.frame_buffer);
    let ctx = RenderContext {
        canvas,
        fps,
        background,
        font: resolve_font(cfg.font_path.as_deref()),
        font_size_px: cfg.font_size_px,
        out_dir: frames_dir.clone(),
        timeline,
    };
    let render = render_all(&ctx, total_frames, cfg.resolved_workers(), cancel)
        .stage(JobStage::Render)?;
    render.ensure_complete().stage(JobStage::Render)?;

    let request = EncodeRequest {
        frames_dir,
        audio_path: reconciled.audio_path,
        fps,
        output_path: run_dir.join(&cfg.output_name),
        well_known_path: cfg.well_known_output.clone(),
        audio_duration: Some(reconciled.audio_secs),
        manifest_path: run_dir.join("frames.txt"),
    };
    let orchestrator = EncodingOrchestrator::new(runner, cfg.encode_options());
    let encode = orchestrator.encode(&request, cancel).stage(JobStage::Encode)?;

    let report = JobReport {
        run_dir: run_dir.to_path_buf(),
        narration_secs: reconciled.audio_secs,
        speed_plan: reconciled.plan,
        render,
        encode,
    };
    if let Err(e) = write_json(&run_dir.join("report.json"), &report) {
        tracing::warn!(error = %e, "could not write job report");
    }
    Ok(report)
}

/// File name of the re-encoded narration (tempo change, music bed, or both).
pub const NARRATION_OUTPUT: &str = "narration_final.m4a";
/// Gain applied to the background music bed.
pub const MUSIC_GAIN_DB: f64 = -14.0;
/// Slack allowed over the ceiling after the tempo change (AAC priming and rounding).
const CEILING_TOLERANCE_SECS: f64 = 0.1;

struct Reconciled {
    audio_path: PathBuf,
    audio_secs: f64,
    plan: Option<SpeedPlan>,
    /// Rescaled timeline when the narration was sped up.
    timeline: Option<Timeline>,
}

fn reconcile(
    runner: &dyn ToolRunner,
    cfg: &ShortConfig,
    manifest: &JobManifest,
    timeline: &Timeline,
    run_dir: &Path,
    limits: &RunLimits,
) -> ShortsResult<Reconciled> {
    let actual = match manifest.audio_duration {
        Some(secs) => secs,
        None => match probe_duration(runner, cfg.ffprobe.as_os_str(), &manifest.audio_path, limits)
        {
            Ok(secs) => secs,
            Err(ShortsError::Cancelled) => return Err(ShortsError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "narration probe failed, using segment total");
                timeline.total_duration()
            }
        },
    };
    let untouched = Reconciled {
        audio_path: manifest.audio_path.clone(),
        audio_secs: actual,
        plan: None,
        timeline: None,
    };

    let speed = plan(actual, cfg.max_duration_secs)?;
    let music = manifest.background_music.as_deref().filter(|music| {
        let found = music.is_file();
        if !found {
            tracing::warn!(music = %music.display(), "background music not found, narration only");
        }
        found
    });
    if speed.is_none() && music.is_none() {
        return Ok(untouched);
    }

    if let Some(speed) = &speed {
        tracing::info!(
            actual_secs = actual,
            ceiling_secs = cfg.max_duration_secs,
            factor = speed.target_factor,
            filter = %speed.filter_chain(),
            "narration exceeds ceiling, speeding up"
        );
        write_json(&run_dir.join("speed_plan.json"), speed)?;
    }

    let out_path = run_dir.join(NARRATION_OUTPUT);
    let mut mixed = false;
    if let Some(music) = music {
        let cmd = narration_command(
            cfg.ffmpeg.as_os_str(),
            &manifest.audio_path,
            speed.as_ref(),
            Some(music),
            &out_path,
        );
        match run_audio_tool(runner, &cmd, limits) {
            Ok(()) => mixed = true,
            Err(ShortsError::Cancelled) => return Err(ShortsError::Cancelled),
            Err(e) => tracing::warn!(error = %e, "background music mix failed, narration only"),
        }
    }
    if !mixed {
        let Some(speed) = &speed else {
            return Ok(untouched);
        };
        let cmd = narration_command(
            cfg.ffmpeg.as_os_str(),
            &manifest.audio_path,
            Some(speed),
            None,
            &out_path,
        );
        run_audio_tool(runner, &cmd, limits)?;
    }

    let measured = probe_duration(runner, cfg.ffprobe.as_os_str(), &out_path, limits)?;
    tracing::info!(
        secs = measured,
        mixed,
        path = %out_path.display(),
        "narration re-encoded"
    );
    let Some(speed) = speed else {
        return Ok(Reconciled {
            audio_path: out_path,
            audio_secs: measured,
            plan: None,
            timeline: None,
        });
    };
    if measured > cfg.max_duration_secs + CEILING_TOLERANCE_SECS {
        return Err(ShortsError::tool(format!(
            "narration is {measured:.2}s after the tempo change, over the {:.2}s ceiling",
            cfg.max_duration_secs
        )));
    }

    let scale = measured / actual;
    let scaled = Timeline::build(manifest.segments.iter().map(|seg| SegmentInput {
        duration: seg.duration * scale,
        ..seg.clone()
    }))?;
    Ok(Reconciled {
        audio_path: out_path,
        audio_secs: measured,
        plan: Some(speed),
        timeline: Some(scaled),
    })
}

fn run_audio_tool(
    runner: &dyn ToolRunner,
    cmd: &ToolCommand,
    limits: &RunLimits,
) -> ShortsResult<()> {
    let out = runner.run(cmd, limits)?;
    if !out.success() {
        return Err(ShortsError::tool(format!(
            "narration re-encode failed: {}",
            tail_lines(&out.stderr_text(), 5)
        )));
    }
    Ok(())
}

/// Re-encode the narration `voice` with an optional tempo chain and an optional music bed.
///
/// The music is looped, lowered by [`MUSIC_GAIN_DB`] and mixed under the voice; the mix ends
/// with the voice, so music never changes the narration length.
pub fn narration_command(
    ffmpeg: &std::ffi::OsStr,
    voice: &Path,
    speed: Option<&SpeedPlan>,
    music: Option<&Path>,
    out: &Path,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(ffmpeg).args(["-y", "-i"]).arg(voice);
    match (music, speed) {
        (Some(music), speed) => {
            let voice_chain = speed.map_or_else(|| "anull".to_string(), SpeedPlan::filter_chain);
            let graph = format!(
                "[0:a]{voice_chain}[voice];[1:a]volume={MUSIC_GAIN_DB}dB[music];\
                 [voice][music]amix=inputs=2:duration=first:normalize=0:dropout_transition=0[mix]"
            );
            cmd = cmd
                .args(["-stream_loop", "-1", "-i"])
                .arg(music)
                .args(["-filter_complex", graph.as_str(), "-map", "[mix]"]);
        }
        (None, Some(speed)) => {
            cmd = cmd.args(["-filter:a", speed.filter_chain().as_str()]);
        }
        (None, None) => {}
    }
    cmd.args(["-c:a", "aac", "-b:a", "192k"]).arg(out)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> ShortsResult<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| ShortsError::Other(anyhow::Error::new(e)))?;
    std::fs::write(path, bytes).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!("failed to write '{}': {e}", path.display()))
    })
}
