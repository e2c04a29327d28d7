//! Video assembly: muxing the frame sequence with the source audio, then reclaiming the frames.

pub(crate) mod ffmpeg;

use std::path::{Path, PathBuf};

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::Fps;
use crate::foundation::error::{WaveframeError, WaveframeResult};
use crate::render::synth::remove_frame_files;
use crate::render::window::FrameNaming;

/// Everything an encoder needs to produce one output video.
#[derive(Clone, Debug)]
pub struct EncodeJob {
    /// Directory holding `frame_*.png` files.
    pub frames_dir: PathBuf,
    /// Naming the frames were written with.
    pub naming: FrameNaming,
    /// Source audio, muxed as the audio track.
    pub audio_path: PathBuf,
    /// Output video path. Overwritten when it exists.
    pub dest: PathBuf,
    /// Frame rate of the image sequence.
    pub fps: Fps,
    /// Cancellation observed while the encoder runs.
    pub cancel: CancelToken,
}

impl EncodeJob {
    /// Job with a fresh, never-cancelled token.
    pub fn new(
        frames_dir: impl Into<PathBuf>,
        naming: FrameNaming,
        audio_path: impl Into<PathBuf>,
        dest: impl Into<PathBuf>,
        fps: Fps,
    ) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            naming,
            audio_path: audio_path.into(),
            dest: dest.into(),
            fps,
            cancel: CancelToken::new(),
        }
    }

    /// Use `cancel` instead of the job's own token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Turns a numbered frame sequence plus an audio file into a video.
///
/// Implementations must leave `job.dest` untouched unless they return `Ok`.
pub trait VideoEncoder: Send + Sync {
    /// Cheap availability check run before any frame is rendered.
    fn preflight(&self) -> WaveframeResult<()> {
        Ok(())
    }

    /// Produce `job.dest`. Blocks until the encode finishes, fails, times out or is cancelled.
    fn encode(&self, job: &EncodeJob) -> WaveframeResult<()>;
}

/// Encode `job`, then delete its frames and their directory.
///
/// Cleanup only runs after a successful encode, so a failed encode keeps the frames for
/// diagnosis and its error is never replaced by a cleanup error.
pub fn assemble(encoder: &dyn VideoEncoder, job: &EncodeJob) -> WaveframeResult<()> {
    encoder.encode(job)?;
    cleanup_frames(&job.frames_dir)?;
    Ok(())
}

/// Delete every frame file in `dir`, then `dir` itself. Returns the number of frames removed.
///
/// Fails with [`WaveframeError::Cleanup`] when any removal fails, including when `dir` still
/// holds files that are not frames.
pub fn cleanup_frames(dir: &Path) -> WaveframeResult<u64> {
    let removed = remove_frame_files(dir)?;
    std::fs::remove_dir(dir).map_err(|e| WaveframeError::cleanup(dir, e))?;
    tracing::debug!(dir = %dir.display(), removed, "removed frame directory");
    Ok(removed)
}

#[cfg(test)]
#[path = "../tests/unit/encode/encode.rs"]
mod tests;
