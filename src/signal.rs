//! Audio input: decoding a file into a normalized mono [`AudioSignal`].

pub(crate) mod decode;

use std::path::{Path, PathBuf};

use crate::foundation::error::{WaveframeError, WaveframeResult};
use crate::signal::decode::{DecoderKind, FfmpegTools, decode};

/// Mono sample sequence plus its sample rate.
///
/// Signals returned by [`SignalLoader::load`] are peak-normalized into `[-1.0, 1.0]`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSignal {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSignal {
    /// Wrap raw mono samples. Rejects a zero sample rate and non-finite samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> WaveframeResult<Self> {
        if sample_rate == 0 {
            return Err(WaveframeError::validation("sample_rate must be > 0"));
        }
        if let Some(i) = samples.iter().position(|s| !s.is_finite()) {
            return Err(WaveframeError::validation(format!(
                "sample {i} is not a finite number"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Samples in time order.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Return `true` when the signal holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, `len / sample_rate`.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Largest absolute sample value, `0.0` for silence.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
    }

    /// Divide every sample by the peak so the result spans exactly `[-1.0, 1.0]`.
    ///
    /// Silent input (peak of zero) is returned unchanged. Normalizing twice is a no-op.
    pub fn normalized(mut self) -> Self {
        let peak = self.peak();
        if peak > 0.0 && peak != 1.0 {
            for s in &mut self.samples {
                *s /= peak;
            }
        }
        self
    }

    /// Keep at most the first `max_secs` seconds.
    pub fn truncated(mut self, max_secs: f64) -> WaveframeResult<Self> {
        validate_max_duration(max_secs)?;
        let keep = (max_secs * f64::from(self.sample_rate)).floor();
        if keep < self.samples.len() as f64 {
            self.samples.truncate(keep as usize);
        }
        Ok(self)
    }
}

fn validate_max_duration(secs: f64) -> WaveframeResult<()> {
    if !secs.is_finite() || secs <= 0.0 {
        return Err(WaveframeError::validation(format!(
            "max duration must be a positive number of seconds, got {secs}"
        )));
    }
    Ok(())
}

/// Decodes audio files into normalized [`AudioSignal`]s.
#[derive(Clone, Debug)]
pub struct SignalLoader {
    /// Decoder selection.
    pub decoder: DecoderKind,
    /// `ffmpeg` binary used for non-WAV input.
    pub ffmpeg_bin: PathBuf,
    /// `ffprobe` binary used to read the native sample rate of non-WAV input.
    pub ffprobe_bin: PathBuf,
}

impl Default for SignalLoader {
    fn default() -> Self {
        Self {
            decoder: DecoderKind::Auto,
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: decode::default_ffprobe(),
        }
    }
}

impl SignalLoader {
    /// Decode `path`, keep at most `max_duration_secs` from the start, and peak-normalize.
    ///
    /// No resampling is performed; the returned sample rate is the file's own.
    #[tracing::instrument(skip(self), fields(decoder = ?self.decoder))]
    pub fn load(&self, path: &Path, max_duration_secs: Option<f64>) -> WaveframeResult<AudioSignal> {
        if let Some(secs) = max_duration_secs {
            validate_max_duration(secs)?;
        }
        if !path.exists() {
            return Err(WaveframeError::NotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(WaveframeError::decode(path, "not a regular file"));
        }

        let tools = FfmpegTools {
            ffmpeg: &self.ffmpeg_bin,
            ffprobe: &self.ffprobe_bin,
        };
        let decoded = decode(self.decoder, path, &tools, max_duration_secs)?;
        let mut signal = AudioSignal::new(decoded.samples, decoded.sample_rate)
            .map_err(|e| WaveframeError::decode(path, e.to_string()))?;
        if let Some(secs) = max_duration_secs {
            signal = signal.truncated(secs)?;
        }

        let peak = signal.peak();
        if peak == 0.0 {
            tracing::warn!("input is silent; frames will render as a flat line");
        }
        let signal = signal.normalized();
        tracing::info!(
            samples = signal.len(),
            sample_rate = signal.sample_rate(),
            duration_secs = signal.duration_secs(),
            peak,
            "loaded audio"
        );
        Ok(signal)
    }
}

/// Load with the default [`SignalLoader`].
pub fn load(path: &Path, max_duration_secs: Option<f64>) -> WaveframeResult<AudioSignal> {
    SignalLoader::default().load(path, max_duration_secs)
}

#[cfg(test)]
#[path = "../tests/unit/signal/signal.rs"]
mod tests;
