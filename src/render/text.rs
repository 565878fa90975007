use std::borrow::Cow;
use std::sync::LazyLock;

use crate::foundation::error::{ShortsError, ShortsResult};
use crate::render::font::FontFace;

static NUMBERED_POINT: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?s)^(\d+)[.:]\s+\*\*([^*]+)\*\*:?\s*(.*)$")
        .expect("numbered-point pattern is a valid regex")
});

/// Compose the string shown on screen for a narration line.
///
/// `"2. **Sleep**: Aim for eight hours"` becomes `"2. Sleep: Aim for eight hours"`. Lines
/// without a leading number and bold title are returned unchanged.
pub fn display_text(raw: &str) -> Cow<'_, str> {
    let Some(caps) = NUMBERED_POINT.captures(raw) else {
        return Cow::Borrowed(raw);
    };
    let number = &caps[1];
    let title = caps[2].trim();
    let content = caps[3].trim();
    if content.is_empty() {
        Cow::Owned(format!("{number}. {title}"))
    } else {
        Cow::Owned(format!("{number}. {title}: {content}"))
    }
}

/// Greedy word wrap.
///
/// Words are appended to the current line while the measured candidate stays strictly under
/// `max_width`; otherwise the line is closed and the word starts a new one. A single word wider
/// than the budget gets a line of its own rather than an empty line before it.
pub fn wrap_words(
    text: &str,
    max_width: f32,
    mut measure: impl FnMut(&str) -> ShortsResult<f32>,
) -> ShortsResult<Vec<String>> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(&candidate)? < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    Ok(lines)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// RGBA8 brush color carried through Parley layouts.
pub(crate) struct TextBrushRgba8 {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

/// Parley contexts bound to a single registered font family.
pub(crate) struct TextLayoutEngine {
    font_ctx: parley::FontContext,
    layout_ctx: parley::LayoutContext<TextBrushRgba8>,
    family_name: String,
    size_px: f32,
}

impl TextLayoutEngine {
    /// Register `font` and prepare layouts at `size_px`.
    pub(crate) fn new(font: &FontFace, size_px: f32) -> ShortsResult<Self> {
        if !size_px.is_finite() || size_px <= 0.0 {
            return Err(ShortsError::validation(
                "text size_px must be finite and > 0",
            ));
        }

        let mut font_ctx = parley::FontContext::default();
        let families = font_ctx
            .collection
            .register_fonts(parley::fontique::Blob::from(font.bytes.to_vec()), None);
        let family_id = families.first().map(|(id, _)| *id).ok_or_else(|| {
            ShortsError::resource(format!("no font families registered from {}", font.origin))
        })?;
        let family_name = font_ctx
            .collection
            .family_name(family_id)
            .ok_or_else(|| ShortsError::resource("registered font family has no name"))?
            .to_string();

        Ok(Self {
            font_ctx,
            layout_ctx: parley::LayoutContext::new(),
            family_name,
            size_px,
        })
    }

    pub(crate) fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Shape one unwrapped line.
    pub(crate) fn layout_line(
        &mut self,
        text: &str,
        brush: TextBrushRgba8,
    ) -> parley::Layout<TextBrushRgba8> {
        let mut builder = self
            .layout_ctx
            .ranged_builder(&mut self.font_ctx, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(self.family_name.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(self.size_px));
        builder.push_default(parley::style::StyleProperty::Brush(brush));

        let mut layout: parley::Layout<TextBrushRgba8> = builder.build(text);
        layout.break_all_lines(None);
        layout
    }

    /// Shaped advance width of `text` on a single line.
    pub(crate) fn measure(&mut self, text: &str) -> f32 {
        let layout = self.layout_line(text, TextBrushRgba8::default());
        layout_advance(&layout)
    }
}

pub(crate) fn layout_advance(layout: &parley::Layout<TextBrushRgba8>) -> f32 {
    layout
        .lines()
        .map(|line| line.metrics().advance)
        .fold(0.0f32, f32::max)
}

#[cfg(test)]
#[path = "../../tests/unit/render/text.rs"]
mod tests;
