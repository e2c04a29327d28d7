use super::*;
use crate::foundation::core::Canvas;
use std::sync::Mutex;

fn style() -> RenderStyle {
    RenderStyle {
        canvas: Canvas {
            width: 32,
            height: 16,
        },
        ..RenderStyle::default()
    }
}

fn sine(len: usize, sr: u32) -> AudioSignal {
    let samples = (0..len)
        .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / sr as f32).sin())
        .collect();
    AudioSignal::new(samples, sr).unwrap().normalized()
}

fn frame_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| FrameNaming::is_frame_file(n))
        .collect();
    names.sort();
    names
}

#[derive(Default)]
struct Recorder {
    frames: Mutex<Vec<u64>>,
}

impl PipelineObserver for Recorder {
    fn frame_written(&self, frame: FrameIndex, _done: u64, _total: u64) {
        self.frames.lock().unwrap().push(frame.0);
    }
}

#[test]
fn writes_one_file_per_frame_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let signal = sine(8000, 8000);

    let n = synthesize(&signal, &style(), Fps::integer(10).unwrap(), &out).unwrap();
    assert_eq!(n, 10);

    let names = frame_names(&out);
    assert_eq!(names.len() as u64, n);
    assert_eq!(names[0], "frame_00000.png");
    assert_eq!(names[9], "frame_00009.png");
}

#[test]
fn render_is_pure_and_matches_written_file() {
    let dir = tempfile::tempdir().unwrap();
    let signal = sine(4000, 8000);
    let synth = FrameSynthesizer::new(&signal, style(), Fps::integer(20).unwrap(), 2).unwrap();

    let a = synth.render_frame_png(FrameIndex(3)).unwrap();
    let b = synth.render_frame_png(FrameIndex(3)).unwrap();
    assert_eq!(a, b);

    synth
        .synthesize(
            dir.path(),
            &RenderThreading::default(),
            &NoopObserver,
            &CancelToken::new(),
        )
        .unwrap();
    let on_disk = std::fs::read(dir.path().join("frame_00003.png")).unwrap();
    assert_eq!(on_disk, a);

    let free = render_frame_png(&signal, synth.plan(), &style(), FrameIndex(3)).unwrap();
    assert_eq!(free, a);
}

#[test]
fn parallel_output_matches_sequential() {
    let signal = sine(6000, 8000);
    let synth = FrameSynthesizer::new(&signal, style(), Fps::integer(30).unwrap(), 2).unwrap();

    let seq = tempfile::tempdir().unwrap();
    synth
        .synthesize(
            seq.path(),
            &RenderThreading::default(),
            &NoopObserver,
            &CancelToken::new(),
        )
        .unwrap();

    let par = tempfile::tempdir().unwrap();
    let recorder = Recorder::default();
    let threading = RenderThreading {
        parallel: true,
        chunk_size: 4,
        threads: Some(2),
    };
    let report = synth
        .synthesize(par.path(), &threading, &recorder, &CancelToken::new())
        .unwrap();

    assert_eq!(report.frames, 22);
    let names = frame_names(par.path());
    assert_eq!(names, frame_names(seq.path()));
    for name in &names {
        let a = std::fs::read(seq.path().join(name)).unwrap();
        let b = std::fs::read(par.path().join(name)).unwrap();
        assert_eq!(a, b, "{name} differs");
    }

    let mut seen = recorder.frames.into_inner().unwrap();
    seen.sort_unstable();
    assert_eq!(seen, (0..22).collect::<Vec<_>>());
}

#[test]
fn stale_frames_are_removed_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("frame_00099.png"), b"old").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

    let signal = sine(800, 8000);
    let n = synthesize(&signal, &style(), Fps::integer(20).unwrap(), dir.path()).unwrap();
    assert_eq!(n, 2);
    assert_eq!(
        frame_names(dir.path()),
        vec!["frame_00000.png", "frame_00001.png"]
    );
    assert!(dir.path().join("notes.txt").exists());
}

#[test]
fn silent_input_renders_flat_frames() {
    let dir = tempfile::tempdir().unwrap();
    let signal = AudioSignal::new(vec![0.0; 2400], 8000).unwrap().normalized();
    let n = synthesize(&signal, &style(), Fps::integer(10).unwrap(), dir.path()).unwrap();
    assert_eq!(n, 3);

    let a = std::fs::read(dir.path().join("frame_00000.png")).unwrap();
    let b = std::fs::read(dir.path().join("frame_00001.png")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn zero_frame_signal_is_rejected_without_creating_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("frames");
    let signal = sine(100, 8000);
    let err = synthesize(&signal, &style(), Fps::integer(30).unwrap(), &out).unwrap_err();
    assert!(matches!(err, WaveframeError::Validation(_)));
    assert!(!out.exists());
}

#[test]
fn cancelled_token_stops_before_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let signal = sine(8000, 8000);
    let synth = FrameSynthesizer::new(&signal, style(), Fps::integer(10).unwrap(), 2).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();

    for parallel in [false, true] {
        let threading = RenderThreading {
            parallel,
            ..RenderThreading::default()
        };
        let err = synth
            .synthesize(dir.path(), &threading, &NoopObserver, &cancel)
            .unwrap_err();
        assert!(matches!(err, WaveframeError::Cancelled));
    }
    assert!(frame_names(dir.path()).is_empty());
}

#[test]
fn out_of_range_frame_is_a_render_error() {
    let signal = sine(800, 8000);
    let synth = FrameSynthesizer::new(&signal, style(), Fps::integer(10).unwrap(), 2).unwrap();
    let err = synth.render_frame_png(FrameIndex(1)).unwrap_err();
    assert!(matches!(err, WaveframeError::Render { frame: 1, .. }));
}

#[test]
fn write_failure_carries_frame_index() {
    let dir = tempfile::tempdir().unwrap();
    // A directory squatting on the first frame's file name makes the write fail.
    std::fs::create_dir(dir.path().join("frame_00000.png")).unwrap();
    let signal = sine(1600, 8000);
    let err = synthesize(&signal, &style(), Fps::integer(10).unwrap(), dir.path()).unwrap_err();
    assert!(matches!(err, WaveframeError::Render { frame: 0, .. }), "{err}");
}

#[test]
fn zero_threads_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let signal = sine(1600, 8000);
    let synth = FrameSynthesizer::new(&signal, style(), Fps::integer(10).unwrap(), 2).unwrap();
    let threading = RenderThreading {
        parallel: true,
        chunk_size: 0,
        threads: Some(0),
    };
    let err = synth
        .synthesize(dir.path(), &threading, &NoopObserver, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, WaveframeError::Validation(_)));
}

#[test]
fn invalid_style_is_rejected() {
    let signal = sine(1600, 8000);
    let bad = RenderStyle {
        line_width: 0.0,
        ..style()
    };
    assert!(FrameSynthesizer::new(&signal, bad, Fps::integer(10).unwrap(), 2).is_err());

    let odd = RenderStyle {
        canvas: Canvas {
            width: 33,
            height: 16,
        },
        ..style()
    };
    assert!(FrameSynthesizer::new(&signal, odd, Fps::integer(10).unwrap(), 2).is_err());
}
