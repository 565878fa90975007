use std::path::PathBuf;
use std::sync::mpsc;

use image::RgbImage;

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Canvas, FrameIndex, FrameRange, Fps};
use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::background::BackgroundSource;
use crate::render::compositor::TextCompositor;
use crate::render::font::FontFace;
use crate::render::frames::{frame_path, write_frame};
use crate::timeline::segments::Timeline;

/// Contiguous, non-overlapping slice of the output frame range assigned to one worker task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameChunk {
    /// 0-based position of the chunk in the partition.
    pub index: usize,
    pub range: FrameRange,
}

/// Split `[0, total_frames)` into contiguous chunks of `ceil(total / workers)` frames.
///
/// The last chunk may be shorter. `total_frames == 0` yields no chunks.
pub fn partition(total_frames: u64, workers: usize) -> ShortsResult<Vec<FrameChunk>> {
    if workers == 0 {
        return Err(ShortsError::validation("worker count must be >= 1"));
    }
    if total_frames == 0 {
        return Ok(Vec::new());
    }
    let chunk_size = total_frames.div_ceil(workers as u64);
    let mut chunks = Vec::new();
    let mut start = 0u64;
    while start < total_frames {
        let end = (start + chunk_size).min(total_frames);
        chunks.push(FrameChunk {
            index: chunks.len(),
            range: FrameRange::new(FrameIndex(start), FrameIndex(end))?,
        });
        start = end;
    }
    Ok(chunks)
}

/// `max(1, available_parallelism - 1)`: one core is left for the coordinating thread.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
}

/// Read-only inputs shared by every render task.
///
/// Tasks never share decoded pixels or font registrations: each one decodes the background
/// and registers the font on its own.
#[derive(Clone, Debug)]
pub struct RenderContext {
    pub canvas: Canvas,
    pub fps: Fps,
    pub background: BackgroundSource,
    pub font: Option<FontFace>,
    pub font_size_px: f32,
    pub out_dir: PathBuf,
    pub timeline: Timeline,
}

impl RenderContext {
    fn compositor(&self) -> ShortsResult<TextCompositor> {
        TextCompositor::new(self.canvas, self.font.as_ref(), self.font_size_px)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
/// Aggregated counters for one [`render_all`] call.
pub struct RenderStats {
    pub frames_expected: u64,
    pub frames_rendered: u64,
    pub chunks_total: usize,
    pub chunks_failed: usize,
}

impl RenderStats {
    pub fn is_complete(&self) -> bool {
        self.chunks_failed == 0 && self.frames_rendered == self.frames_expected
    }

    /// `PartialRender` unless every expected frame exists.
    pub fn ensure_complete(&self) -> ShortsResult<()> {
        if self.is_complete() {
            return Ok(());
        }
        Err(ShortsError::PartialRender {
            expected: self.frames_expected,
            rendered: self.frames_rendered,
            failed_chunks: self.chunks_failed,
        })
    }
}

struct ChunkReport {
    chunk: FrameChunk,
    written: u64,
    error: Option<ShortsError>,
}

/// Render a single frame in memory.
pub fn render_single_frame(ctx: &RenderContext, frame: FrameIndex) -> ShortsResult<RgbImage> {
    let background = ctx.background.load(ctx.canvas);
    let mut compositor = ctx.compositor()?;
    let task = ctx.timeline.frame_task(frame, ctx.fps);
    let (segment, progress) = match task.active {
        Some((seg, p)) => (Some(seg), p),
        None => (None, 0.0),
    };
    compositor.render_frame(&background, segment, progress)
}

/// Render `[0, total_frames)` to `ctx.out_dir` with `workers` threads, one task per chunk.
///
/// A frame error aborts only its own chunk; other chunks keep going and the shortfall shows
/// up in the returned stats. Cancellation is observed once per frame and turns the whole call
/// into `Err(Cancelled)`.
pub fn render_all(
    ctx: &RenderContext,
    total_frames: u64,
    workers: usize,
    cancel: &CancelToken,
) -> ShortsResult<RenderStats> {
    ctx.canvas.validate()?;
    let chunks = partition(total_frames, workers)?;
    let mut stats = RenderStats {
        frames_expected: total_frames,
        chunks_total: chunks.len(),
        ..RenderStats::default()
    };
    if chunks.is_empty() {
        return Ok(stats);
    }

    std::fs::create_dir_all(&ctx.out_dir).map_err(|e| {
        ShortsError::Other(anyhow::anyhow!(
            "failed to create frame dir '{}': {e}",
            ctx.out_dir.display()
        ))
    })?;

    let pool = build_thread_pool(workers)?;
    tracing::info!(
        total_frames,
        workers,
        chunks = chunks.len(),
        out_dir = %ctx.out_dir.display(),
        "rendering frames"
    );

    let (tx, rx) = mpsc::channel::<ChunkReport>();
    let mut cancelled = false;
    std::thread::scope(|s| {
        let chunks = &chunks;
        let pool = &pool;
        s.spawn(move || {
            pool.scope(|ps| {
                for &chunk in chunks {
                    let tx = tx.clone();
                    ps.spawn(move |_| {
                        let report = render_chunk(ctx, chunk, cancel);
                        let _ = tx.send(report);
                    });
                }
            });
            drop(tx);
        });

        for (done, report) in rx.iter().enumerate() {
            stats.frames_rendered += report.written;
            match report.error {
                None => tracing::info!(
                    chunk = report.chunk.index,
                    start = report.chunk.range.start.0,
                    end = report.chunk.range.end.0,
                    completed = done + 1,
                    of = stats.chunks_total,
                    "chunk rendered"
                ),
                Some(ShortsError::Cancelled) => {
                    cancelled = true;
                    stats.chunks_failed += 1;
                }
                Some(e) => {
                    stats.chunks_failed += 1;
                    tracing::error!(
                        chunk = report.chunk.index,
                        written = report.written,
                        error = %e,
                        "chunk failed"
                    );
                }
            }
        }
    });

    if cancelled {
        return Err(ShortsError::Cancelled);
    }
    tracing::info!(
        rendered = stats.frames_rendered,
        expected = stats.frames_expected,
        failed_chunks = stats.chunks_failed,
        "frame rendering finished"
    );
    Ok(stats)
}

fn render_chunk(ctx: &RenderContext, chunk: FrameChunk, cancel: &CancelToken) -> ChunkReport {
    run_chunk_task(chunk, |written| render_chunk_frames(ctx, chunk, cancel, written))
}

/// Run one chunk's work, turning a panic into a failed report for that chunk alone.
fn run_chunk_task(
    chunk: FrameChunk,
    task: impl FnOnce(&mut u64) -> ShortsResult<()>,
) -> ChunkReport {
    let mut written = 0u64;
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| task(&mut written)));
    let error = match outcome {
        Ok(result) => result.err(),
        Err(payload) => Some(ShortsError::Other(anyhow::anyhow!(
            "render task panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };
    ChunkReport {
        chunk,
        written,
        error,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

fn render_chunk_frames(
    ctx: &RenderContext,
    chunk: FrameChunk,
    cancel: &CancelToken,
    written: &mut u64,
) -> ShortsResult<()> {
    let background = ctx.background.load(ctx.canvas);
    let mut compositor = ctx.compositor()?;
    for frame in chunk.range.iter() {
        cancel.check()?;
        let task = ctx.timeline.frame_task(frame, ctx.fps);
        let (segment, progress) = match task.active {
            Some((seg, p)) => (Some(seg), p),
            None => (None, 0.0),
        };
        let img = compositor.render_frame(&background, segment, progress)?;
        write_frame(&frame_path(&ctx.out_dir, frame), &img)?;
        *written += 1;
    }
    Ok(())
}

fn build_thread_pool(threads: usize) -> ShortsResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(ShortsError::validation("render worker count must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("shortreel-render-{i}"))
        .build()
        .map_err(|e| ShortsError::Other(anyhow::anyhow!("failed to build render pool: {e}")))
}
