use std::ffi::OsStr;
use std::path::Path;

use crate::encode::command::{RunLimits, ToolCommand, ToolRunner, tail_lines};
use crate::foundation::error::{ShortsError, ShortsResult};

/// `ffprobe` query printing only the container duration in seconds.
pub fn duration_command(ffprobe: &OsStr, media: &Path) -> ToolCommand {
    ToolCommand::new(ffprobe)
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(media)
}

/// Parse the bare duration printed by [`duration_command`].
pub fn parse_duration(stdout: &str) -> ShortsResult<f64> {
    let text = stdout.trim();
    let secs: f64 = text
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .parse()
        .map_err(|_| ShortsError::tool(format!("unparseable duration '{text}'")))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(ShortsError::tool(format!("invalid duration '{text}'")));
    }
    Ok(secs)
}

/// Media duration in seconds as reported by `ffprobe`.
pub fn probe_duration(
    runner: &dyn ToolRunner,
    ffprobe: &OsStr,
    media: &Path,
    limits: &RunLimits,
) -> ShortsResult<f64> {
    let out = runner.run(&duration_command(ffprobe, media), limits)?;
    if !out.success() {
        return Err(ShortsError::tool(format!(
            "ffprobe failed on '{}': {}",
            media.display(),
            tail_lines(&out.stderr_text(), 5)
        )));
    }
    parse_duration(&out.stdout_text())
}
