//! One end-to-end run: load, synthesize, encode, clean up.

pub(crate) mod observer;

use std::path::{Path, PathBuf};

use crate::encode::ffmpeg::{FfmpegEncoder, FfmpegOpts};
use crate::encode::{EncodeJob, VideoEncoder, cleanup_frames};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Fps;
use crate::foundation::error::{WaveframeError, WaveframeResult};
use crate::pipeline::observer::PipelineObserver;
use crate::render::RenderStyle;
use crate::render::synth::{FrameSynthesizer, RenderThreading};
use crate::render::window::WindowPlan;
use crate::signal::SignalLoader;
use crate::signal::decode::DecoderKind;

/// Resolved configuration for one run.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Source audio file.
    pub input_audio: PathBuf,
    /// Destination video file. Overwritten when it exists.
    pub output_video: PathBuf,
    /// Directory for intermediate frames. Defaults to `<output file name>.frames` next to the
    /// output.
    pub work_dir: Option<PathBuf>,
    /// Frame style.
    pub style: RenderStyle,
    /// Output frame rate.
    pub fps: Fps,
    /// Frame periods covered by each frame's window.
    pub window_periods: u32,
    /// Only the first this-many seconds of audio are rendered.
    pub max_duration_secs: Option<f64>,
    /// Audio decoder selection.
    pub decoder: DecoderKind,
    /// `ffprobe` binary used by the ffmpeg audio decoder.
    pub ffprobe_bin: PathBuf,
    /// Frame-level parallelism.
    pub threading: RenderThreading,
    /// Encoder options.
    pub encode: FfmpegOpts,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_audio: PathBuf::new(),
            output_video: PathBuf::new(),
            work_dir: None,
            style: RenderStyle::default(),
            fps: Fps::default(),
            window_periods: WindowPlan::DEFAULT_WINDOW_PERIODS,
            max_duration_secs: None,
            decoder: DecoderKind::default(),
            ffprobe_bin: PathBuf::from("ffprobe"),
            threading: RenderThreading::default(),
            encode: FfmpegOpts::default(),
        }
    }
}

impl RunConfig {
    /// Default configuration for `input_audio` -> `output_video`.
    pub fn new(input_audio: impl Into<PathBuf>, output_video: impl Into<PathBuf>) -> Self {
        Self {
            input_audio: input_audio.into(),
            output_video: output_video.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_path(path: &Path) -> WaveframeResult<Self> {
        use anyhow::Context as _;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        serde_json::from_str(&text).map_err(|e| {
            WaveframeError::validation(format!("invalid config '{}': {e}", path.display()))
        })
    }

    /// Check every field that can be checked without touching the filesystem.
    pub fn validate(&self) -> WaveframeResult<()> {
        if self.input_audio.as_os_str().is_empty() {
            return Err(WaveframeError::validation("input audio path is empty"));
        }
        if self.output_video.as_os_str().is_empty() {
            return Err(WaveframeError::validation("output video path is empty"));
        }
        if self.output_video.file_name().is_none() {
            return Err(WaveframeError::validation(format!(
                "output path '{}' has no file name",
                self.output_video.display()
            )));
        }
        self.style.validate()?;
        self.fps.validate()?;
        if self.window_periods == 0 {
            return Err(WaveframeError::validation("window_periods must be >= 1"));
        }
        if let Some(secs) = self.max_duration_secs
            && (!secs.is_finite() || secs <= 0.0)
        {
            return Err(WaveframeError::validation(format!(
                "max duration must be a positive number of seconds, got {secs}"
            )));
        }
        if self.threading.threads == Some(0) {
            return Err(WaveframeError::validation("threads must be >= 1 when set"));
        }
        self.encode.timeout()?;
        Ok(())
    }

    /// Working directory for this run.
    pub fn resolved_work_dir(&self) -> PathBuf {
        match &self.work_dir {
            Some(dir) => dir.clone(),
            None => default_work_dir(&self.output_video),
        }
    }

    /// Audio loader configured from this run.
    pub fn signal_loader(&self) -> SignalLoader {
        SignalLoader {
            decoder: self.decoder,
            ffmpeg_bin: self.encode.ffmpeg_bin.clone(),
            ffprobe_bin: self.ffprobe_bin.clone(),
        }
    }

    /// Process encoder configured from this run.
    pub fn ffmpeg_encoder(&self) -> FfmpegEncoder {
        FfmpegEncoder::new(self.encode.clone())
    }
}

/// `<output file name>.frames` beside `output`.
pub fn default_work_dir(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "waveframe".into());
    name.push(".frames");
    output.with_file_name(name)
}

/// Stages of a run, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Decoding and normalizing the input audio.
    Loading,
    /// Rendering frame images.
    Synthesizing,
    /// Running the video encoder.
    Encoding,
    /// Removing intermediate frames.
    CleaningUp,
    /// Finished successfully.
    Done,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Loading => "loading",
            Self::Synthesizing => "synthesizing",
            Self::Encoding => "encoding",
            Self::CleaningUp => "cleaning up",
            Self::Done => "done",
        })
    }
}

/// Summary of a successful run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Frames rendered and encoded.
    pub frames: u64,
    /// Duration of the rendered audio in seconds.
    pub duration_secs: f64,
    /// Sample rate of the input audio.
    pub sample_rate: u32,
    /// Written video.
    pub output: PathBuf,
}

/// A run stopped at `stage`. Work finished in earlier stages is kept.
#[derive(thiserror::Error, Debug)]
#[error("{stage} stage failed")]
pub struct RunFailure {
    /// Stage that failed.
    pub stage: Stage,
    /// Underlying error.
    #[source]
    pub error: WaveframeError,
}

trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T, RunFailure>;
}

impl<T> AtStage<T> for WaveframeResult<T> {
    fn at(self, stage: Stage) -> Result<T, RunFailure> {
        self.map_err(|error| RunFailure { stage, error })
    }
}

/// A validated run configuration, ready to execute.
#[derive(Clone, Debug)]
pub struct Pipeline {
    config: RunConfig,
}

impl Pipeline {
    /// Validate `config`.
    pub fn new(config: RunConfig) -> WaveframeResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration of this run.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run every stage with the configured ffmpeg encoder.
    pub fn run_with_ffmpeg(
        &self,
        observer: &dyn PipelineObserver,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunFailure> {
        self.run(&self.config.ffmpeg_encoder(), observer, cancel)
    }

    /// Run every stage with `encoder`.
    ///
    /// The working directory is only created once the audio has loaded and the encoder passed
    /// its preflight. It is removed after a successful encode and kept when encoding fails.
    #[tracing::instrument(skip_all, fields(input = %self.config.input_audio.display()))]
    pub fn run(
        &self,
        encoder: &dyn VideoEncoder,
        observer: &dyn PipelineObserver,
        cancel: &CancelToken,
    ) -> Result<RunReport, RunFailure> {
        let cfg = &self.config;
        let work_dir = cfg.resolved_work_dir();

        observer.stage_changed(Stage::Loading);
        cancel.check().at(Stage::Loading)?;
        let signal = cfg
            .signal_loader()
            .load(&cfg.input_audio, cfg.max_duration_secs)
            .at(Stage::Loading)?;
        encoder.preflight().at(Stage::Encoding)?;

        observer.stage_changed(Stage::Synthesizing);
        let synth = FrameSynthesizer::new(&signal, cfg.style, cfg.fps, cfg.window_periods)
            .at(Stage::Synthesizing)?;
        let synthesized = synth
            .synthesize(&work_dir, &cfg.threading, observer, cancel)
            .at(Stage::Synthesizing)?;

        observer.stage_changed(Stage::Encoding);
        let job = EncodeJob::new(
            &work_dir,
            synthesized.naming,
            &cfg.input_audio,
            &cfg.output_video,
            cfg.fps,
        )
        .with_cancel(cancel.clone());
        encoder.encode(&job).at(Stage::Encoding)?;

        observer.stage_changed(Stage::CleaningUp);
        cleanup_frames(&work_dir).at(Stage::CleaningUp)?;

        observer.stage_changed(Stage::Done);
        tracing::info!(
            frames = synthesized.frames,
            output = %cfg.output_video.display(),
            "run complete"
        );
        Ok(RunReport {
            frames: synthesized.frames,
            duration_secs: signal.duration_secs(),
            sample_rate: signal.sample_rate(),
            output: cfg.output_video.clone(),
        })
    }
}

#[cfg(test)]
#[path = "../tests/unit/pipeline/pipeline.rs"]
mod tests;
