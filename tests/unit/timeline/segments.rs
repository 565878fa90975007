use super::*;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn build_places_segments_back_to_back() {
    let tl = build_timeline(&[2.0, 3.0, 1.5]).unwrap();
    let segs = tl.segments();
    assert_eq!(segs.len(), 3);
    assert_eq!(segs[0].start_time, 0.0);
    for pair in segs.windows(2) {
        assert_eq!(pair[0].end_time, pair[1].start_time);
    }
    assert!(approx(tl.total_duration(), 6.5));
}

#[test]
fn span_equals_sum_of_durations() {
    let durations = [0.37, 1.91, 4.2, 0.05, 2.333, 7.0];
    let tl = build_timeline(&durations).unwrap();
    let sum: f64 = durations.iter().sum();
    assert!(approx(tl.total_duration(), sum));
    for (seg, d) in tl.segments().iter().zip(durations) {
        assert!(approx(seg.end_time - seg.start_time, d));
    }
}

#[test]
fn empty_input_is_rejected() {
    assert!(matches!(build_timeline(&[]), Err(ShortsError::EmptyInput)));
}

#[test]
fn non_positive_durations_are_rejected() {
    assert!(build_timeline(&[1.0, 0.0]).is_err());
    assert!(build_timeline(&[1.0, -2.0]).is_err());
    assert!(build_timeline(&[f64::NAN]).is_err());
}

#[test]
fn boundary_prefers_later_segment() {
    let tl = build_timeline(&[2.0, 3.0, 1.5]).unwrap();
    assert_eq!(tl.active_segment(2.0).unwrap().start_time, 2.0);
    assert_eq!(tl.active_segment(5.0).unwrap().start_time, 5.0);
    // The very last end time still belongs to the last segment.
    assert_eq!(tl.active_segment(6.5).unwrap().start_time, 5.0);
}

#[test]
fn every_time_in_span_maps_to_one_segment() {
    let tl = build_timeline(&[2.0, 3.0, 1.5]).unwrap();
    let mut t = 0.0;
    while t <= tl.total_duration() {
        let seg = tl.active_segment(t).expect("segment inside span");
        assert!(seg.start_time <= t && t <= seg.end_time);
        let covering = tl
            .segments()
            .iter()
            .filter(|s| s.start_time <= t && t < s.end_time)
            .count();
        assert!(covering <= 1);
        t += 0.01;
    }
}

#[test]
fn outside_span_has_no_segment() {
    let tl = build_timeline(&[2.0, 3.0, 1.5]).unwrap();
    assert!(tl.active_segment(6.5001).is_none());
    assert!(tl.active_segment(100.0).is_none());
    assert!(tl.active_segment(-0.1).is_none());
}

#[test]
fn end_to_end_frame_mapping() {
    let tl = build_timeline(&[2.0, 3.0, 1.5]).unwrap();
    let fps = Fps::integer(30).unwrap();
    assert_eq!(tl.total_frames(fps, DEFAULT_FRAME_BUFFER), 205);

    let first = tl.frame_task(FrameIndex(0), fps);
    let (seg, progress) = first.active.unwrap();
    assert_eq!(seg.start_time, 0.0);
    assert_eq!(progress, 0.0);

    let mid = tl.frame_task(FrameIndex(75), fps);
    assert_eq!(mid.time_position, 2.5);
    let (seg, progress) = mid.active.unwrap();
    assert_eq!(seg.start_time, 2.0);
    assert!((progress - 0.1667).abs() < 1e-4);

    let trailing = tl.frame_task(FrameIndex(200), fps);
    assert!(trailing.active.is_none());
}
