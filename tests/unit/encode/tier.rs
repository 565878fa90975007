use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn tiers_escalate_linearly() {
    assert_eq!(EncodeTier::first(), EncodeTier::HwDirect);
    assert_eq!(EncodeTier::HwDirect.next(), Some(EncodeTier::ConcatDemuxer));
    assert_eq!(EncodeTier::ConcatDemuxer.next(), Some(EncodeTier::StaticImage));
    assert_eq!(EncodeTier::StaticImage.next(), None);
    assert_eq!(EncodeTier::ConcatDemuxer.to_string(), "concat_demuxer");
    assert_eq!(
        serde_json::to_string(&EncodeTier::StaticImage).unwrap(),
        "\"static_image\""
    );
}

#[test]
fn hwaccel_listing_selects_preferred_encoder() {
    let listing = "Hardware acceleration methods:\nvdpau\ncuda\nvaapi\nqsv\n\n";
    let methods = parse_hwaccels(listing);
    assert_eq!(methods, vec!["vdpau", "cuda", "vaapi", "qsv"]);
    let enc = select_hw_encoder(&methods).unwrap();
    assert_eq!(enc.codec, "h264_nvenc");

    let mac = parse_hwaccels("Hardware acceleration methods:\nVideoToolbox\n");
    assert_eq!(select_hw_encoder(&mac).unwrap().codec, "h264_videotoolbox");

    assert!(select_hw_encoder(&parse_hwaccels("Hardware acceleration methods:\n")).is_none());
}

#[test]
fn hw_direct_software_command() {
    let cmd = hw_direct_command(
        OsStr::new("ffmpeg"),
        None,
        fps30(),
        Path::new("/run/frames"),
        Path::new("/run/audio.mp3"),
        Path::new("/run/short.mp4"),
    );
    let text = cmd.to_string();
    assert!(text.starts_with("ffmpeg -y -framerate 30 -i /run/frames/frame_%05d.jpg -i /run/audio.mp3"));
    assert!(text.contains("-c:v libx264 -profile:v main -preset medium -crf 23"));
    assert!(text.ends_with("-pix_fmt yuv420p -c:a aac -b:a 192k -shortest /run/short.mp4"));
    assert!(!cmd.has_arg("-hwaccel"));
}

#[test]
fn hw_direct_videotoolbox_command() {
    let cmd = hw_direct_command(
        OsStr::new("ffmpeg"),
        Some(KNOWN_HW_ENCODERS[0]),
        fps30(),
        Path::new("/f"),
        Path::new("/a.mp3"),
        Path::new("/o.mp4"),
    );
    assert_eq!(cmd.arg_after("-hwaccel"), Some(OsStr::new("videotoolbox")));
    assert_eq!(cmd.arg_after("-c:v"), Some(OsStr::new("h264_videotoolbox")));
    assert_eq!(cmd.arg_after("-b:v"), Some(OsStr::new("5M")));
    assert_eq!(cmd.arg_after("-allow_sw"), Some(OsStr::new("1")));
}

#[test]
fn concat_and_static_commands() {
    let concat = concat_command(
        OsStr::new("ffmpeg"),
        Path::new("/run/frames.txt"),
        Path::new("/a.mp3"),
        Path::new("/o.mp4"),
    );
    assert_eq!(
        concat.to_string(),
        "ffmpeg -y -f concat -safe 0 -i /run/frames.txt -i /a.mp3 -c:v libx264 -pix_fmt yuv420p \
         -crf 23 -preset medium -c:a aac -b:a 192k -shortest /o.mp4"
    );

    let still = static_image_command(
        OsStr::new("ffmpeg"),
        Path::new("/f/frame_00000.jpg"),
        Path::new("/a.mp3"),
        6.84,
        Path::new("/o.mp4"),
    );
    assert_eq!(
        still.to_string(),
        "ffmpeg -y -loop 1 -i /f/frame_00000.jpg -i /a.mp3 -c:v libx264 -tune stillimage \
         -c:a aac -b:a 192k -pix_fmt yuv420p -shortest -t 6.840 /o.mp4"
    );
}

#[test]
fn manifest_lists_absolute_frames_in_order() {
    let frames = vec![
        PathBuf::from("/r/frames/frame_00000.jpg"),
        PathBuf::from("/r/frames/frame_00001.jpg"),
        PathBuf::from("/r/it's/frame_00002.jpg"),
    ];
    let text = concat_manifest(&frames, fps30()).unwrap();
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[0], "file '/r/frames/frame_00000.jpg'");
    assert_eq!(lines[1], "duration 0.033333");
    assert_eq!(lines[2], "file '/r/frames/frame_00001.jpg'");
    assert_eq!(lines[4], r"file '/r/it'\''s/frame_00002.jpg'");
    assert_eq!(lines[5], "duration 0.033333");
    // Last frame repeated so its duration is honoured.
    assert_eq!(lines[6], lines[4]);
    assert_eq!(text.matches("duration ").count(), 3);

    assert_eq!(concat_manifest(&[], fps30()).unwrap(), "");

    let relative = concat_manifest(&[PathBuf::from("frames/frame_00000.jpg")], fps30()).unwrap();
    let path = relative
        .lines()
        .next()
        .unwrap()
        .trim_start_matches("file '")
        .trim_end_matches('\'');
    assert!(Path::new(path).is_absolute());
}

#[test]
fn attempt_display_names_tier_and_status() {
    let a = EncodeAttempt {
        tier: EncodeTier::HwDirect,
        command: "ffmpeg -y".into(),
        exit_status: Some(187),
        stderr_text: "Unknown encoder".into(),
    };
    assert_eq!(a.to_string(), "hw_direct (exit 187): Unknown encoder");
    let b = EncodeAttempt {
        exit_status: None,
        ..a
    };
    assert!(b.to_string().contains("no exit status"));
}
