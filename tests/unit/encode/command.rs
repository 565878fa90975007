use super::*;

#[test]
fn display_quotes_whitespace_arguments() {
    let cmd = ToolCommand::new("ffmpeg")
        .args(["-y", "-i"])
        .arg("/tmp/my frames/frame_%05d.jpg")
        .arg("");
    assert_eq!(
        cmd.to_string(),
        "ffmpeg -y -i '/tmp/my frames/frame_%05d.jpg' ''"
    );
    assert!(cmd.has_arg("-y"));
    assert_eq!(
        cmd.arg_after("-i"),
        Some(OsStr::new("/tmp/my frames/frame_%05d.jpg"))
    );
    assert_eq!(cmd.arg_after("-c:v"), None);
}

#[test]
fn tail_keeps_last_non_empty_lines() {
    let text = "a\n\nb\nc\n   \nd\n";
    assert_eq!(tail_lines(text, 2), "c\nd");
    assert_eq!(tail_lines(text, 10), "a\nb\nc\nd");
    assert_eq!(tail_lines("", 3), "");
}

#[test]
fn missing_program_is_a_tool_error() {
    let cmd = ToolCommand::new("shortreel-definitely-not-a-real-program");
    let err = SystemRunner.run(&cmd, &RunLimits::default()).unwrap_err();
    assert!(matches!(err, ShortsError::Tool(_)));
}

#[test]
fn tool_lookup_reports_missing_programs() {
    assert!(!is_tool_on_path(OsStr::new(
        "shortreel-definitely-not-a-real-program"
    )));
}

#[test]
fn pre_cancelled_token_aborts_run() {
    if !cfg!(unix) || !std::path::Path::new("/bin/sleep").exists() {
        return;
    }
    let cancel = CancelToken::new();
    cancel.cancel();
    let limits = RunLimits::new(None, cancel);
    let err = SystemRunner
        .run(&ToolCommand::new("/bin/sleep").arg("5"), &limits)
        .unwrap_err();
    assert!(err.is_cancelled());
}

#[test]
fn timeout_kills_long_running_process() {
    if !cfg!(unix) || !std::path::Path::new("/bin/sleep").exists() {
        return;
    }
    let limits = RunLimits::new(Some(Duration::from_millis(100)), CancelToken::new());
    let started = Instant::now();
    let err = SystemRunner
        .run(&ToolCommand::new("/bin/sleep").arg("5"), &limits)
        .unwrap_err();
    assert!(matches!(err, ShortsError::ToolTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn exit_status_and_output_are_captured() {
    if !cfg!(unix) || !std::path::Path::new("/bin/sh").exists() {
        return;
    }
    let out = SystemRunner
        .run(
            &ToolCommand::new("/bin/sh").args(["-c", "echo out; echo err >&2; exit 3"]),
            &RunLimits::default(),
        )
        .unwrap();
    assert_eq!(out.status, Some(3));
    assert!(!out.success());
    assert_eq!(out.stdout_text().trim(), "out");
    assert_eq!(out.stderr_text().trim(), "err");
}

#[test]
fn parent_dir_is_created() {
    let path = std::path::PathBuf::from("target")
        .join("unit_command_parent")
        .join("nested")
        .join("out.mp4");
    let _ = std::fs::remove_dir_all(path.parent().unwrap());
    ensure_parent_dir(&path).unwrap();
    assert!(path.parent().unwrap().is_dir());
    ensure_parent_dir(std::path::Path::new("bare.mp4")).unwrap();
}
