//! shortreel renders narrated short-form vertical videos.
//!
//! A job moves through five stages:
//!
//! - Place narration segments on an absolute [`Timeline`]
//! - Reconcile narration length against a ceiling with a [`SpeedPlan`]
//! - Stage the background (photo or gradient)
//! - Render every frame in parallel with [`render_all`] ([`TextCompositor`] per worker)
//! - Encode with the [`EncodingOrchestrator`], falling back HW_DIRECT → CONCAT_DEMUXER →
//!   STATIC_IMAGE
//!
//! [`run_job`] drives all of them from a [`JobManifest`] and a [`ShortConfig`].
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod config;
pub(crate) mod encode;
pub(crate) mod job;
pub(crate) mod render;
pub(crate) mod timeline;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange};
pub use crate::foundation::error::{ShortsError, ShortsResult};

pub use crate::config::ShortConfig;
pub use crate::encode::command::{
    RunLimits, SystemRunner, ToolCommand, ToolOutput, ToolRunner, ensure_parent_dir,
    is_tool_on_path, tail_lines,
};
pub use crate::encode::orchestrator::{
    EncodeOptions, EncodeOutcome, EncodeRequest, EncodingOrchestrator,
};
pub use crate::encode::probe::{duration_command, parse_duration, probe_duration};
pub use crate::encode::tier::{
    EncodeAttempt, EncodeTier, HwEncoder, KNOWN_HW_ENCODERS, concat_command, concat_manifest,
    detect_hw_encoder, hw_direct_command, hwaccels_command, parse_hwaccels, select_hw_encoder,
    static_image_command, write_concat_manifest,
};
pub use crate::job::{
    JobError, JobManifest, JobReport, JobStage, MUSIC_GAIN_DB, NARRATION_OUTPUT, narration_command,
    run_job, run_job_with,
};
pub use crate::render::background::{
    BACKGROUND_BLUR_SIGMA, BACKGROUND_BRIGHTNESS, BackgroundSource, gradient_background,
    prepare_photo, stage_background,
};
pub use crate::render::compositor::{
    DEFAULT_FONT_SIZE_PX, LINE_HEIGHT_PX, TEXT_MARGIN_PX, TextCompositor, fade_alpha,
};
pub use crate::render::font::{FontFace, platform_font_candidates, resolve_font, system_default_font};
pub use crate::render::frames::{
    FRAME_JPEG_QUALITY, FRAME_PATTERN, frame_file_name, frame_path, list_frames,
    parse_frame_file_name, write_frame,
};
pub use crate::render::pipeline::{
    FrameChunk, RenderContext, RenderStats, default_worker_count, partition, render_all,
    render_single_frame,
};
pub use crate::render::text::{display_text, wrap_words};
pub use crate::timeline::segments::{
    DEFAULT_FRAME_BUFFER, FrameTask, SegmentInput, TimedSegment, Timeline, build_timeline,
};
pub use crate::timeline::speed::{MAX_FILTER_FACTOR, MIN_FILTER_FACTOR, SpeedPlan, plan};
