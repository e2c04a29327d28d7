use super::*;
use crate::assets::color::Color;

#[test]
fn defaults_match_the_classic_look() {
    let cfg = RunConfig::new("in.wav", "out.mp4");
    assert_eq!(cfg.fps, Fps::integer(30).unwrap());
    assert_eq!(cfg.window_periods, 2);
    assert_eq!(cfg.style.line_color, Color::from_rgb8(0, 0, 255));
    assert_eq!(cfg.style.background_color, Color::from_rgb8(255, 255, 255));
    assert_eq!((cfg.style.canvas.width, cfg.style.canvas.height), (1000, 400));
    assert_eq!(cfg.max_duration_secs, None);
    assert!(cfg.validate().is_ok());
}

#[test]
fn work_dir_defaults_to_sibling_of_output() {
    let cfg = RunConfig::new("in.wav", "videos/clip.mp4");
    assert_eq!(
        cfg.resolved_work_dir(),
        PathBuf::from("videos/clip.mp4.frames")
    );

    let cfg = RunConfig {
        work_dir: Some(PathBuf::from("/tmp/custom")),
        ..cfg
    };
    assert_eq!(cfg.resolved_work_dir(), PathBuf::from("/tmp/custom"));
}

#[test]
fn json_config_fills_missing_fields_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    std::fs::write(
        &path,
        r##"{
            "input_audio": "song.flac",
            "output_video": "song.mp4",
            "fps": { "num": 24, "den": 1 },
            "style": { "line_color": "red", "background_color": "#000000", "width": 640, "height": 360 },
            "threading": { "parallel": true, "threads": 2 },
            "encode": { "timeout_secs": 30.0 }
        }"##,
    )
    .unwrap();

    let cfg = RunConfig::from_json_path(&path).unwrap();
    assert_eq!(cfg.input_audio, PathBuf::from("song.flac"));
    assert_eq!(cfg.fps, Fps::integer(24).unwrap());
    assert_eq!(cfg.style.line_color, Color::from_rgb8(255, 0, 0));
    assert_eq!(cfg.style.background_color, Color::from_rgb8(0, 0, 0));
    assert_eq!(cfg.style.canvas.width, 640);
    assert_eq!(cfg.style.line_width, 2.0);
    assert!(cfg.threading.parallel);
    assert_eq!(cfg.threading.threads, Some(2));
    assert_eq!(cfg.threading.chunk_size, 64);
    assert_eq!(cfg.encode.timeout_secs, Some(30.0));
    assert_eq!(cfg.encode.video_codec, "libx264");
    assert!(cfg.validate().is_ok());
}

#[test]
fn bad_json_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.json");
    std::fs::write(&path, r#"{ "style": { "line_color": "not-a-color" } }"#).unwrap();
    assert!(matches!(
        RunConfig::from_json_path(&path),
        Err(WaveframeError::Validation(_))
    ));

    assert!(matches!(
        RunConfig::from_json_path(&dir.path().join("missing.json")),
        Err(WaveframeError::Other(_))
    ));
}

#[test]
fn validate_rejects_bad_values() {
    let base = RunConfig::new("in.wav", "out.mp4");
    let cases = [
        RunConfig {
            input_audio: PathBuf::new(),
            ..base.clone()
        },
        RunConfig {
            output_video: PathBuf::new(),
            ..base.clone()
        },
        RunConfig {
            window_periods: 0,
            ..base.clone()
        },
        RunConfig {
            max_duration_secs: Some(0.0),
            ..base.clone()
        },
        RunConfig {
            fps: Fps { num: 0, den: 1 },
            ..base.clone()
        },
        RunConfig {
            threading: RenderThreading {
                threads: Some(0),
                ..RenderThreading::default()
            },
            ..base.clone()
        },
        RunConfig {
            encode: FfmpegOpts {
                timeout_secs: Some(-1.0),
                ..FfmpegOpts::default()
            },
            ..base.clone()
        },
    ];
    for cfg in cases {
        assert!(
            matches!(cfg.validate(), Err(WaveframeError::Validation(_))),
            "{cfg:?}"
        );
        assert!(Pipeline::new(cfg).is_err());
    }
}

#[test]
fn loader_and_encoder_follow_config() {
    let mut cfg = RunConfig::new("in.wav", "out.mp4");
    cfg.encode.ffmpeg_bin = PathBuf::from("/opt/ffmpeg/bin/ffmpeg");
    cfg.ffprobe_bin = PathBuf::from("/opt/ffmpeg/bin/ffprobe");
    cfg.decoder = DecoderKind::Ffmpeg;

    let loader = cfg.signal_loader();
    assert_eq!(loader.decoder, DecoderKind::Ffmpeg);
    assert_eq!(loader.ffmpeg_bin, cfg.encode.ffmpeg_bin);
    assert_eq!(loader.ffprobe_bin, cfg.ffprobe_bin);
    assert_eq!(cfg.ffmpeg_encoder().opts(), &cfg.encode);
}

#[test]
fn stage_and_failure_display() {
    assert_eq!(Stage::CleaningUp.to_string(), "cleaning up");
    let failure = RunFailure {
        stage: Stage::Encoding,
        error: WaveframeError::Encode {
            status: Some(1),
            stderr: "boom\n".to_owned(),
        },
    };
    assert_eq!(failure.to_string(), "encoding stage failed");
    let source = std::error::Error::source(&failure).unwrap().to_string();
    assert_eq!(source, "encoder exited with status 1: boom");
}
