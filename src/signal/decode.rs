use std::path::{Path, PathBuf};
use std::process::Command;

use crate::foundation::error::{WaveframeError, WaveframeResult};

/// Which decoder turns an input file into mono PCM.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderKind {
    /// `.wav` in-process through `hound`, everything else through `ffmpeg`.
    #[default]
    Auto,
    /// In-process RIFF/WAVE decoding only.
    Wav,
    /// System `ffprobe` + `ffmpeg`.
    Ffmpeg,
}

/// Mono `f32` PCM at the source's native sample rate.
#[derive(Clone, Debug)]
pub(crate) struct DecodedAudio {
    pub(crate) sample_rate: u32,
    pub(crate) samples: Vec<f32>,
}

/// External tool locations used by the ffmpeg decoder.
#[derive(Clone, Debug)]
pub(crate) struct FfmpegTools<'a> {
    pub(crate) ffmpeg: &'a Path,
    pub(crate) ffprobe: &'a Path,
}

pub(crate) fn decode(
    kind: DecoderKind,
    path: &Path,
    tools: &FfmpegTools<'_>,
    max_secs: Option<f64>,
) -> WaveframeResult<DecodedAudio> {
    match kind {
        DecoderKind::Wav => decode_wav(path, max_secs),
        DecoderKind::Ffmpeg => decode_ffmpeg(path, tools, max_secs),
        DecoderKind::Auto => {
            if !has_wav_extension(path) {
                return decode_ffmpeg(path, tools, max_secs);
            }
            match decode_wav(path, max_secs) {
                Ok(audio) => Ok(audio),
                Err(wav_err) if tool_available(tools.ffmpeg) && tool_available(tools.ffprobe) => {
                    // Compressed WAV payloads (ADPCM, mu-law, ...) are not handled by hound.
                    tracing::debug!(error = %wav_err, "wav decode failed, retrying through ffmpeg");
                    decode_ffmpeg(path, tools, max_secs)
                }
                Err(wav_err) => Err(wav_err),
            }
        }
    }
}

fn has_wav_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav") || e.eq_ignore_ascii_case("wave"))
}

/// Decode RIFF/WAVE PCM, averaging all channels down to mono.
pub(crate) fn decode_wav(path: &Path, max_secs: Option<f64>) -> WaveframeResult<DecodedAudio> {
    let reader =
        hound::WavReader::open(path).map_err(|e| WaveframeError::decode(path, e.to_string()))?;
    let spec = reader.spec();
    if spec.channels == 0 || spec.sample_rate == 0 {
        return Err(WaveframeError::decode(
            path,
            "wav header declares zero channels or zero sample rate",
        ));
    }

    let channels = usize::from(spec.channels);
    let frame_limit = max_secs.map(|s| (s * f64::from(spec.sample_rate)).floor() as usize);
    let sample_limit = frame_limit.map_or(usize::MAX, |f| f.saturating_mul(channels));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .take(sample_limit)
            .collect::<Result<_, _>>()
            .map_err(|e| WaveframeError::decode(path, e.to_string()))?,
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(WaveframeError::decode(
                    path,
                    format!("unsupported bit depth {}", spec.bits_per_sample),
                ));
            }
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .take(sample_limit)
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| WaveframeError::decode(path, e.to_string()))?
        }
    };

    Ok(DecodedAudio {
        sample_rate: spec.sample_rate,
        samples: downmix_to_mono(&interleaved, channels),
    })
}

/// Average interleaved channels into one. A trailing partial frame is dropped.
pub(crate) fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    let inv = 1.0 / channels as f32;
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * inv)
        .collect()
}

/// Probe the first audio stream's sample rate through `ffprobe`.
pub(crate) fn probe_sample_rate(path: &Path, ffprobe: &Path) -> WaveframeResult<u32> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        sample_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        #[serde(default)]
        streams: Vec<ProbeStream>,
    }

    let out = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate",
            "-print_format",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            WaveframeError::decode(path, format!("failed to run '{}': {e}", ffprobe.display()))
        })?;
    if !out.status.success() {
        return Err(WaveframeError::decode(
            path,
            format!("ffprobe failed: {}", String::from_utf8_lossy(&out.stderr).trim()),
        ));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| WaveframeError::decode(path, format!("ffprobe json parse failed: {e}")))?;
    let rate = parsed
        .streams
        .first()
        .ok_or_else(|| WaveframeError::decode(path, "no audio stream found"))?
        .sample_rate
        .as_deref()
        .ok_or_else(|| WaveframeError::decode(path, "ffprobe reported no sample rate"))?;
    match rate.trim().parse::<u32>() {
        Ok(r) if r > 0 => Ok(r),
        _ => Err(WaveframeError::decode(
            path,
            format!("invalid sample rate \"{rate}\" from ffprobe"),
        )),
    }
}

/// Decode any ffmpeg-readable audio to mono `f32` at its native rate.
pub(crate) fn decode_ffmpeg(
    path: &Path,
    tools: &FfmpegTools<'_>,
    max_secs: Option<f64>,
) -> WaveframeResult<DecodedAudio> {
    let sample_rate = probe_sample_rate(path, tools.ffprobe)?;

    let mut cmd = Command::new(tools.ffmpeg);
    cmd.args(["-v", "error", "-i"]).arg(path);
    if let Some(secs) = max_secs {
        cmd.args(["-t", &format!("{secs:.9}")]);
    }
    cmd.args([
        "-vn",
        "-f",
        "f32le",
        "-acodec",
        "pcm_f32le",
        "-ac",
        "1",
        "-ar",
        &sample_rate.to_string(),
        "pipe:1",
    ]);

    let out = cmd.output().map_err(|e| {
        WaveframeError::decode(
            path,
            format!("failed to run '{}': {e}", tools.ffmpeg.display()),
        )
    })?;
    if !out.status.success() {
        return Err(WaveframeError::decode(
            path,
            format!(
                "ffmpeg audio decode failed: {}",
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }
    if !out.stdout.len().is_multiple_of(4) {
        return Err(WaveframeError::decode(
            path,
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }

    let samples = out
        .stdout
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(DecodedAudio {
        sample_rate,
        samples,
    })
}

/// Return `true` when `tool -version` runs successfully.
pub(crate) fn tool_available(tool: &Path) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

pub(crate) fn default_ffprobe() -> PathBuf {
    PathBuf::from("ffprobe")
}

#[cfg(test)]
#[path = "../../tests/unit/signal/decode.rs"]
mod tests;
