use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ShortsError, ShortsResult};

/// JPEG quality for rendered frames.
pub const FRAME_JPEG_QUALITY: u8 = 90;
/// `printf`-style pattern matching [`frame_file_name`], as ffmpeg's image2 demuxer expects.
pub const FRAME_PATTERN: &str = "frame_%05d.jpg";

const FRAME_PREFIX: &str = "frame_";
const FRAME_EXT: &str = "jpg";

/// `frame_00042.jpg` for frame 42. Lexicographic order equals index order below 100000.
pub fn frame_file_name(frame: FrameIndex) -> String {
    format!("{FRAME_PREFIX}{:05}.{FRAME_EXT}", frame.0)
}

pub fn frame_path(dir: &Path, frame: FrameIndex) -> PathBuf {
    dir.join(frame_file_name(frame))
}

/// Encode `img` as JPEG at `path`, replacing any previous file.
pub fn write_frame(path: &Path, img: &RgbImage) -> ShortsResult<()> {
    let file = std::fs::File::create(path).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to create frame '{}': {e}",
            path.display()
        ))
    })?;
    let mut writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, FRAME_JPEG_QUALITY)
        .encode_image(img)
        .map_err(|e| {
            ShortsError::Other(anyhow::anyhow!(
                "failed to encode frame '{}': {e}",
                path.display()
            ))
        })?;
    writer.flush().map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to write frame '{}': {e}",
            path.display()
        ))
    })?;
    Ok(())
}

/// Parse the frame index back out of a file name produced by [`frame_file_name`].
pub fn parse_frame_file_name(name: &str) -> Option<FrameIndex> {
    let digits = name
        .strip_prefix(FRAME_PREFIX)?
        .strip_suffix(FRAME_EXT)?
        .strip_suffix('.')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(FrameIndex)
}

/// All frame files in `dir`, ascending by frame index. Other files are ignored.
pub fn list_frames(dir: &Path) -> ShortsResult<Vec<(FrameIndex, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        ShortsError::resource(format!("failed to read frame dir '{}': {e}", dir.display()))
    })?;
    let mut frames = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            ShortsError::resource(format!("failed to read frame dir '{}': {e}", dir.display()))
        })?;
        let name = entry.file_name();
        let Some(index) = name.to_str().and_then(parse_frame_file_name) else {
            continue;
        };
        frames.push((index, entry.path()));
    }
    frames.sort_by_key(|(index, _)| *index);
    Ok(frames)
}
