use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::encode::orchestrator::EncodeOptions;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::pipeline::default_worker_count;

/// Render and encode settings.
///
/// Every field has a default; a config file only needs to name what it changes. Unknown
/// fields are rejected so typos do not silently fall back to defaults.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShortConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Render threads; `None` picks one less than the available cores.
    pub workers: Option<usize>,
    /// Background-only frames appended after the last segment.
    pub frame_buffer: u64,
    /// Narration longer than this is sped up.
    pub max_duration_secs: f64,
    /// Encoded videos longer than this are accepted with a warning.
    pub soft_limit_secs: f64,
    pub font_path: Option<PathBuf>,
    pub font_size_px: f32,
    pub use_gpu: bool,
    pub encode_timeout_secs: u64,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    /// Copy of the final video, relative to the working directory unless absolute.
    pub well_known_output: Option<PathBuf>,
    /// Video file name inside the run directory.
    pub output_name: String,
}

impl Default for ShortConfig {
    fn default() -> Self {
        Self {
            width: 1080,
            height: 1920,
            fps: 30,
            workers: None,
            frame_buffer: crate::timeline::segments::DEFAULT_FRAME_BUFFER,
            max_duration_secs: 45.0,
            soft_limit_secs: 50.0,
            font_path: None,
            font_size_px: crate::render::compositor::DEFAULT_FONT_SIZE_PX,
            use_gpu: true,
            encode_timeout_secs: 600,
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            well_known_output: Some(PathBuf::from("latest_short.mp4")),
            output_name: "short.mp4".to_string(),
        }
    }
}

impl ShortConfig {
    /// Read and validate a JSON config file.
    pub fn load(path: &Path) -> ShortsResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ShortsError::validation(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> ShortsResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| ShortsError::validation(format!("invalid config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> ShortsResult<()> {
        self.canvas().validate()?;
        self.fps()?;
        if self.workers == Some(0) {
            return Err(ShortsError::validation("workers must be >= 1 when set"));
        }
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(ShortsError::validation("max_duration_secs must be > 0"));
        }
        if !self.soft_limit_secs.is_finite() || self.soft_limit_secs <= 0.0 {
            return Err(ShortsError::validation("soft_limit_secs must be > 0"));
        }
        if !self.font_size_px.is_finite() || self.font_size_px <= 0.0 {
            return Err(ShortsError::validation("font_size_px must be > 0"));
        }
        if self.encode_timeout_secs == 0 {
            return Err(ShortsError::validation("encode_timeout_secs must be > 0"));
        }
        if self.output_name.trim().is_empty() || self.output_name.contains(['/', '\\']) {
            return Err(ShortsError::validation(
                "output_name must be a bare file name",
            ));
        }
        Ok(())
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    pub fn fps(&self) -> ShortsResult<Fps> {
        Fps::integer(self.fps)
    }

    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_worker_count)
    }

    pub fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            ffmpeg: self.ffmpeg.clone().into_os_string(),
            ffprobe: self.ffprobe.clone().into_os_string(),
            use_gpu: self.use_gpu,
            timeout: Some(Duration::from_secs(self.encode_timeout_secs)),
            soft_limit_secs: self.soft_limit_secs,
        }
    }
}
