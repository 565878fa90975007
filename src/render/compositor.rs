use std::collections::HashMap;
use std::rc::Rc;

use image::RgbImage;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::font::FontFace;
use crate::render::text::{
    TextBrushRgba8, TextLayoutEngine, display_text, layout_advance, wrap_words,
};
use crate::timeline::segments::TimedSegment;

/// Default narration font size.
pub const DEFAULT_FONT_SIZE_PX: f32 = 70.0;
/// Horizontal space reserved around wrapped text (split across both sides).
pub const TEXT_MARGIN_PX: u32 = 120;
/// Fixed distance between consecutive line tops.
pub const LINE_HEIGHT_PX: f64 = 80.0;
/// Backing rectangle padding: left/right, above the line top, below the line top.
const RECT_PAD_X: f64 = 20.0;
const RECT_PAD_TOP: f64 = 10.0;
const RECT_EXTENT_BELOW: f64 = 70.0;
const RECT_MAX_ALPHA: u8 = 128;
const OUTLINE_OFFSET_PX: f64 = 2.0;
const OUTLINE_OFFSETS: [(f64, f64); 8] = [
    (-OUTLINE_OFFSET_PX, -OUTLINE_OFFSET_PX),
    (-OUTLINE_OFFSET_PX, 0.0),
    (-OUTLINE_OFFSET_PX, OUTLINE_OFFSET_PX),
    (0.0, -OUTLINE_OFFSET_PX),
    (0.0, OUTLINE_OFFSET_PX),
    (OUTLINE_OFFSET_PX, -OUTLINE_OFFSET_PX),
    (OUTLINE_OFFSET_PX, 0.0),
    (OUTLINE_OFFSET_PX, OUTLINE_OFFSET_PX),
];

/// Text opacity for a position inside a segment.
///
/// Linear fade-in over the first 20%, opaque through the middle 60%, linear fade-out over the
/// last 20%.
pub fn fade_alpha(progress: f64) -> u8 {
    let a = if progress < 0.2 {
        progress * 5.0 * 255.0
    } else if progress > 0.8 {
        (1.0 - progress) * 5.0 * 255.0
    } else {
        255.0
    };
    a.clamp(0.0, 255.0) as u8
}

struct ShapedLine {
    width: f32,
    layout: parley::Layout<TextBrushRgba8>,
}

struct TextRaster {
    engine: TextLayoutEngine,
    font: vello_cpu::peniko::FontData,
}

/// Renders narration frames: background plus wrapped, outlined, fading text.
///
/// Owns its own font registration, rasterizer context and wrap cache; one instance per
/// worker. Output is deterministic for identical inputs.
pub struct TextCompositor {
    canvas: Canvas,
    text: Option<TextRaster>,
    ctx: Option<vello_cpu::RenderContext>,
    overlay: Option<vello_cpu::Pixmap>,
    wrap_cache: HashMap<String, Rc<Vec<ShapedLine>>>,
}

impl TextCompositor {
    /// Build a compositor for `canvas`.
    ///
    /// `font = None`, or a font that fails to register, yields a compositor that returns the
    /// background unchanged.
    pub fn new(canvas: Canvas, font: Option<&FontFace>, font_size_px: f32) -> ShortsResult<Self> {
        canvas.validate()?;
        let text = match font {
            None => None,
            Some(face) => match TextLayoutEngine::new(face, font_size_px) {
                Ok(engine) => {
                    tracing::debug!(family = engine.family_name(), origin = %face.origin, "text font ready");
                    Some(TextRaster {
                        engine,
                        font: vello_cpu::peniko::FontData::new(
                            vello_cpu::peniko::Blob::from(face.bytes.to_vec()),
                            face.index,
                        ),
                    })
                }
                Err(e @ ShortsError::Validation(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(error = %e, "font could not be registered; text disabled");
                    None
                }
            },
        };
        Ok(Self {
            canvas,
            text,
            ctx: None,
            overlay: None,
            wrap_cache: HashMap::new(),
        })
    }

    /// Whether this compositor can draw text at all.
    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }

    /// Render one frame.
    ///
    /// `segment = None` (trailing buffer frames) returns the background unchanged.
    pub fn render_frame(
        &mut self,
        background: &RgbImage,
        segment: Option<&TimedSegment>,
        progress_in_segment: f64,
    ) -> ShortsResult<RgbImage> {
        if background.dimensions() != (self.canvas.width, self.canvas.height) {
            return Err(ShortsError::validation(format!(
                "background is {}x{}, expected {}x{}",
                background.width(),
                background.height(),
                self.canvas.width,
                self.canvas.height
            )));
        }
        let Some(segment) = segment else {
            return Ok(background.clone());
        };
        let alpha = fade_alpha(progress_in_segment);
        if alpha == 0 || self.text.is_none() {
            return Ok(background.clone());
        }

        let lines = self.shaped_lines(&segment.text)?;
        if lines.is_empty() {
            return Ok(background.clone());
        }

        self.draw_overlay(&lines, alpha)?;
        let overlay = self
            .overlay
            .as_ref()
            .ok_or_else(|| ShortsError::validation("overlay surface missing after draw"))?;

        let mut out = background.clone();
        composite_premul_over_rgb(out.as_mut(), overlay.data_as_u8_slice())?;
        Ok(out)
    }

    fn shaped_lines(&mut self, raw: &str) -> ShortsResult<Rc<Vec<ShapedLine>>> {
        if let Some(lines) = self.wrap_cache.get(raw) {
            return Ok(Rc::clone(lines));
        }
        let Some(text) = self.text.as_mut() else {
            return Ok(Rc::new(Vec::new()));
        };

        let shown = display_text(raw);
        let budget = self.canvas.width.saturating_sub(TEXT_MARGIN_PX) as f32;
        let wrapped = wrap_words(&shown, budget, |candidate| {
            Ok(text.engine.measure(candidate))
        })?;
        let shaped = wrapped
            .iter()
            .map(|line| {
                let layout = text.engine.layout_line(line, TextBrushRgba8::default());
                ShapedLine {
                    width: layout_advance(&layout),
                    layout,
                }
            })
            .collect::<Vec<_>>();

        let shaped = Rc::new(shaped);
        self.wrap_cache.insert(raw.to_string(), Rc::clone(&shaped));
        Ok(shaped)
    }

    fn draw_overlay(&mut self, lines: &[ShapedLine], alpha: u8) -> ShortsResult<()> {
        let text = self
            .text
            .as_ref()
            .ok_or_else(|| ShortsError::validation("text raster missing"))?;
        let w = self.canvas.width as u16;
        let h = self.canvas.height as u16;

        let mut ctx = self
            .ctx
            .take()
            .unwrap_or_else(|| vello_cpu::RenderContext::new(w, h));
        ctx.reset();
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);

        let width = f64::from(self.canvas.width);
        let height = f64::from(self.canvas.height);
        let start_y = ((height - lines.len() as f64 * LINE_HEIGHT_PX) / 2.0).floor();
        let rect_alpha = (alpha / 2).min(RECT_MAX_ALPHA);
        let outline = vello_cpu::peniko::Color::from_rgba8(0, 0, 0, alpha);
        let fill = vello_cpu::peniko::Color::from_rgba8(255, 255, 255, alpha);

        for (k, line) in lines.iter().enumerate() {
            let text_w = f64::from(line.width);
            let x = ((width - text_w) / 2.0).floor();
            let y = start_y + k as f64 * LINE_HEIGHT_PX;

            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(0, 0, 0, rect_alpha));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                x - RECT_PAD_X,
                y - RECT_PAD_TOP,
                x + text_w + RECT_PAD_X,
                y + RECT_EXTENT_BELOW,
            ));

            for (dx, dy) in OUTLINE_OFFSETS {
                fill_layout(&mut ctx, &text.font, &line.layout, x + dx, y + dy, outline);
            }
            fill_layout(&mut ctx, &text.font, &line.layout, x, y, fill);
        }

        let mut overlay = self
            .overlay
            .take()
            .unwrap_or_else(|| vello_cpu::Pixmap::new(w, h));
        overlay.data_as_u8_slice_mut().fill(0);
        ctx.flush();
        ctx.render_to_pixmap(&mut overlay);

        self.ctx = Some(ctx);
        self.overlay = Some(overlay);
        Ok(())
    }
}

fn fill_layout(
    ctx: &mut vello_cpu::RenderContext,
    font: &vello_cpu::peniko::FontData,
    layout: &parley::Layout<TextBrushRgba8>,
    x: f64,
    y: f64,
    color: vello_cpu::peniko::Color,
) {
    ctx.set_transform(vello_cpu::kurbo::Affine::translate((x, y)));
    ctx.set_paint(color);
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            let glyphs = run.glyphs().map(|g| vello_cpu::Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            });
            ctx.glyph_run(font)
                .font_size(run.run().font_size())
                .fill_glyphs(glyphs);
        }
    }
}

/// Source-over of a premultiplied RGBA8 overlay onto an opaque RGB8 buffer, in place.
fn composite_premul_over_rgb(dst_rgb: &mut [u8], src_premul: &[u8]) -> ShortsResult<()> {
    if dst_rgb.len() % 3 != 0 || dst_rgb.len() / 3 != src_premul.len() / 4 {
        return Err(ShortsError::validation(
            "composite expects matching rgb8 destination and rgba8 overlay",
        ));
    }
    for (d, s) in dst_rgb.chunks_exact_mut(3).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 0 {
            continue;
        }
        let inv = 255 - a;
        for c in 0..3 {
            let v = u16::from(s[c]) + mul_div255(u16::from(d[c]), inv);
            d[c] = v.min(255) as u8;
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
