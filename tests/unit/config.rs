use super::*;
use std::io::Write;

#[test]
fn defaults_are_valid() {
    let cfg = StudioConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.output.paint_fps, 60);
    assert_eq!(cfg.output.capture_fps, 30);
    assert_eq!(cfg.timing.progress_interval_ms, 50);
    assert_eq!(cfg.encode.format, VideoFormat::Webm);
    assert_eq!(cfg.batch.failure_policy, BatchFailurePolicy::Skip);
}

#[test]
fn partial_toml_keeps_other_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        [output]
        width = 360
        height = 640

        [encode]
        format = "mp4"

        [batch]
        failure_policy = "abort"
        "#
    )
    .unwrap();

    let cfg = StudioConfig::load(file.path()).unwrap();
    assert_eq!(cfg.output.width, 360);
    assert_eq!(cfg.output.height, 640);
    assert_eq!(cfg.output.capture_fps, 30);
    assert_eq!(cfg.encode.format.extension(), "mp4");
    assert_eq!(cfg.batch.failure_policy, BatchFailurePolicy::Abort);
    assert_eq!(cfg.audio, AudioConfig::default());
}

#[test]
fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = StudioConfig::load_or_default(&dir.path().join("nope.toml")).unwrap();
    assert_eq!(cfg, StudioConfig::default());
}

#[test]
fn invalid_toml_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[output\nwidth = ").unwrap();
    assert!(StudioConfig::load_or_default(file.path()).is_err());
}

#[test]
fn validate_rejects_bad_values() {
    let mut cfg = StudioConfig::default();
    cfg.output.capture_fps = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = StudioConfig::default();
    cfg.theme.stroke = "black".to_string();
    assert!(cfg.validate().is_err());

    let mut cfg = StudioConfig::default();
    cfg.strokes.speed = 0.0;
    assert!(cfg.validate().is_err());
}
