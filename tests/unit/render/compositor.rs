use super::*;
use crate::render::background::gradient_background;
use crate::render::font::resolve_font;

fn canvas() -> Canvas {
    Canvas {
        width: 360,
        height: 640,
    }
}

fn segment(text: &str) -> TimedSegment {
    TimedSegment {
        text: text.to_string(),
        start_time: 0.0,
        duration: 2.0,
        end_time: 2.0,
        audio_ref: None,
    }
}

#[test]
fn fade_envelope_matches_ramp_points() {
    assert_eq!(fade_alpha(0.0), 0);
    assert_eq!(fade_alpha(0.1), 127);
    assert_eq!(fade_alpha(0.2), 255);
    assert_eq!(fade_alpha(0.5), 255);
    assert_eq!(fade_alpha(0.8), 255);
    assert_eq!(fade_alpha(0.9), 127);
    assert_eq!(fade_alpha(1.0), 0);
}

#[test]
fn fade_clamps_out_of_range_progress() {
    assert_eq!(fade_alpha(-1.0), 0);
    assert_eq!(fade_alpha(2.0), 0);
}

#[test]
fn no_active_segment_returns_background() {
    let bg = gradient_background(canvas());
    let mut comp = TextCompositor::new(canvas(), None, DEFAULT_FONT_SIZE_PX).unwrap();
    let out = comp.render_frame(&bg, None, 0.5).unwrap();
    assert_eq!(out, bg);
}

#[test]
fn zero_alpha_frame_equals_background() {
    let bg = gradient_background(canvas());
    let font = resolve_font(None);
    let mut comp = TextCompositor::new(canvas(), font.as_ref(), 40.0).unwrap();
    let out = comp
        .render_frame(&bg, Some(&segment("Hello there")), 0.0)
        .unwrap();
    assert_eq!(out, bg);
}

#[test]
fn mismatched_background_is_rejected() {
    let bg = gradient_background(Canvas {
        width: 10,
        height: 10,
    });
    let mut comp = TextCompositor::new(canvas(), None, DEFAULT_FONT_SIZE_PX).unwrap();
    let err = comp.render_frame(&bg, None, 0.5).unwrap_err();
    assert!(matches!(err, ShortsError::Validation(_)));
}

#[test]
fn text_frames_are_deterministic_and_draw_something() {
    let Some(font) = resolve_font(None) else {
        // Hosts without any font render background-only frames.
        return;
    };
    let bg = gradient_background(canvas());
    let seg = segment("1. **Focus**: one small task at a time keeps momentum");

    let mut a = TextCompositor::new(canvas(), Some(&font), 40.0).unwrap();
    let mut b = TextCompositor::new(canvas(), Some(&font), 40.0).unwrap();
    assert!(a.has_text());

    let fa = a.render_frame(&bg, Some(&seg), 0.5).unwrap();
    let fb = b.render_frame(&bg, Some(&seg), 0.5).unwrap();
    assert_eq!(fa, fb);
    assert_ne!(fa, bg);

    // Cached wrap path gives the same pixels as the first render.
    let again = a.render_frame(&bg, Some(&seg), 0.5).unwrap();
    assert_eq!(again, fa);

    // Top-left corner is far from the centered text block.
    assert_eq!(fa.get_pixel(0, 0), bg.get_pixel(0, 0));
}

#[test]
fn half_faded_text_differs_from_opaque_text() {
    let Some(font) = resolve_font(None) else {
        return;
    };
    let bg = gradient_background(canvas());
    let seg = segment("Fade me");
    let mut comp = TextCompositor::new(canvas(), Some(&font), 40.0).unwrap();
    let full = comp.render_frame(&bg, Some(&seg), 0.5).unwrap();
    let half = comp.render_frame(&bg, Some(&seg), 0.1).unwrap();
    assert_ne!(full, half);
    assert_ne!(half, bg);
}

#[test]
fn composite_applies_premultiplied_source_over() {
    let mut dst = vec![200u8, 100, 0];
    // 50% black.
    composite_premul_over_rgb(&mut dst, &[0, 0, 0, 128]).unwrap();
    assert_eq!(dst, vec![100, 50, 0]);

    let mut dst = vec![10u8, 20, 30];
    composite_premul_over_rgb(&mut dst, &[255, 255, 255, 255]).unwrap();
    assert_eq!(dst, vec![255, 255, 255]);

    assert!(composite_premul_over_rgb(&mut [0u8; 3], &[0u8; 8]).is_err());
}
