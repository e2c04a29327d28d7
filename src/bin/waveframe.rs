use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use waveframe::{CancelToken, Color, Fps, LogObserver, Pipeline, RunConfig};

/// Render an audio file's waveform into a video with the original audio track.
#[derive(Parser, Debug)]
#[command(name = "waveframe", version)]
struct Cli {
    /// Input audio file (WAV in-process, anything else through ffmpeg).
    input_audio: PathBuf,

    /// Output video path. Overwritten if it exists.
    output_video: PathBuf,

    /// JSON run config. Flags given on the command line override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Waveform color: a name (`blue`), `#RRGGBB` or `#RRGGBBAA`.
    #[arg(long)]
    line_color: Option<Color>,

    /// Background color.
    #[arg(long = "bg-color")]
    bg_color: Option<Color>,

    /// Output frame rate, integer or `num/den`.
    #[arg(long)]
    fps: Option<Fps>,

    /// Only render the first this-many seconds of audio.
    #[arg(long)]
    max_duration: Option<f64>,

    /// Frame width in pixels (even).
    #[arg(long)]
    width: Option<u32>,

    /// Frame height in pixels (even).
    #[arg(long)]
    height: Option<u32>,

    /// Stroke width in pixels.
    #[arg(long)]
    line_width: Option<f64>,

    /// Frame periods covered by each frame's window.
    #[arg(long)]
    window_periods: Option<u32>,

    /// Directory for intermediate frames (default: `<output>.frames` next to the output).
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Render chunk size (parallel mode only).
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Kill ffmpeg after this many seconds.
    #[arg(long)]
    timeout_secs: Option<f64>,

    /// ffmpeg binary.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// ffprobe binary.
    #[arg(long)]
    ffprobe: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<RunConfig> {
        let mut cfg = match &self.config {
            Some(path) => RunConfig::from_json_path(path)
                .with_context(|| format!("load config '{}'", path.display()))?,
            None => RunConfig::default(),
        };
        cfg.input_audio = self.input_audio;
        cfg.output_video = self.output_video;

        if let Some(c) = self.line_color {
            cfg.style.line_color = c;
        }
        if let Some(c) = self.bg_color {
            cfg.style.background_color = c;
        }
        if let Some(fps) = self.fps {
            cfg.fps = fps;
        }
        if self.max_duration.is_some() {
            cfg.max_duration_secs = self.max_duration;
        }
        if let Some(w) = self.width {
            cfg.style.canvas.width = w;
        }
        if let Some(h) = self.height {
            cfg.style.canvas.height = h;
        }
        if let Some(w) = self.line_width {
            cfg.style.line_width = w;
        }
        if let Some(k) = self.window_periods {
            cfg.window_periods = k;
        }
        if self.work_dir.is_some() {
            cfg.work_dir = self.work_dir;
        }
        if self.parallel {
            cfg.threading.parallel = true;
        }
        if self.threads.is_some() {
            cfg.threading.threads = self.threads;
        }
        if let Some(n) = self.chunk_size {
            cfg.threading.chunk_size = n;
        }
        if self.timeout_secs.is_some() {
            cfg.encode.timeout_secs = self.timeout_secs;
        }
        if let Some(bin) = self.ffmpeg {
            cfg.encode.ffmpeg_bin = bin;
        }
        if let Some(bin) = self.ffprobe {
            cfg.ffprobe_bin = bin;
        }
        Ok(cfg)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cfg = Cli::parse().into_config()?;
    let pipeline = Pipeline::new(cfg)?;
    let report = pipeline.run_with_ffmpeg(&LogObserver::default(), &CancelToken::new())?;
    eprintln!("wrote {}", report.output.display());
    Ok(())
}
