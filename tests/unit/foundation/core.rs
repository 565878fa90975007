use super::*;

#[test]
fn frame_range_contains_boundaries() {
    let r = FrameRange::new(FrameIndex(2), FrameIndex(5)).unwrap();
    assert!(!r.contains(FrameIndex(1)));
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
    assert_eq!(r.iter().map(|f| f.0).collect::<Vec<_>>(), vec![2, 3, 4]);
}

#[test]
fn frame_range_rejects_inverted_bounds() {
    assert!(FrameRange::new(FrameIndex(5), FrameIndex(2)).is_err());
    assert!(FrameRange::new(FrameIndex(3), FrameIndex(3)).unwrap().is_empty());
}

#[test]
fn fps_frame_time_is_exact_for_integer_rates() {
    let fps = Fps::integer(30).unwrap();
    assert_eq!(fps.frame_time_secs(FrameIndex(0)), 0.0);
    assert_eq!(fps.frame_time_secs(FrameIndex(75)), 2.5);
    assert_eq!(fps.secs_to_frames_floor(6.5), 195);
    assert_eq!(fps.ffmpeg_rate(), "30");
    assert_eq!(Fps::new(30000, 1001).unwrap().ffmpeg_rate(), "30000/1001");
}

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
}

#[test]
fn canvas_validation_catches_bad_values() {
    assert!(Canvas { width: 1080, height: 1920 }.validate().is_ok());
    assert!(Canvas { width: 0, height: 1920 }.validate().is_err());
    assert!(Canvas { width: 1081, height: 1920 }.validate().is_err());
    assert!(Canvas { width: 70_000, height: 1920 }.validate().is_err());
}
