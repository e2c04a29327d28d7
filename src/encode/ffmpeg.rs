use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::encode::{EncodeJob, VideoEncoder};
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{WaveframeError, WaveframeResult};
use crate::signal::decode::tool_available;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Options for [`FfmpegEncoder`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FfmpegOpts {
    /// `ffmpeg` binary, looked up on `PATH` when relative.
    pub ffmpeg_bin: PathBuf,
    /// Video codec (`-c:v`).
    pub video_codec: String,
    /// Output pixel format (`-pix_fmt`).
    pub pixel_format: String,
    /// Audio codec (`-c:a`).
    pub audio_codec: String,
    /// Replace an existing output file. When `false` an existing destination is an error.
    pub overwrite: bool,
    /// Kill the encoder after this many seconds. `None` waits indefinitely.
    pub timeout_secs: Option<f64>,
}

impl Default for FfmpegOpts {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_owned(),
            pixel_format: "yuv420p".to_owned(),
            audio_codec: "aac".to_owned(),
            overwrite: true,
            timeout_secs: None,
        }
    }
}

impl FfmpegOpts {
    /// Parsed timeout. Rejects non-positive or non-finite values.
    pub fn timeout(&self) -> WaveframeResult<Option<Duration>> {
        match self.timeout_secs {
            None => Ok(None),
            Some(secs) if secs.is_finite() && secs > 0.0 => Duration::try_from_secs_f64(secs)
                .map(Some)
                .map_err(|e| WaveframeError::validation(format!("invalid encoder timeout: {e}"))),
            Some(secs) => Err(WaveframeError::validation(format!(
                "encoder timeout must be a positive number of seconds, got {secs}"
            ))),
        }
    }
}

/// [`VideoEncoder`] backed by the system `ffmpeg` binary.
///
/// Reads the numbered PNG sequence at the job's frame rate plus the source audio, encodes
/// h264/yuv420p video and AAC audio, and stops at the shorter stream. Output goes to a hidden
/// sibling of the destination and is renamed into place only after `ffmpeg` succeeds. The
/// destination's directory is never created here; an unusable output path surfaces as the
/// encoder's own non-zero exit.
#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoder {
    opts: FfmpegOpts,
}

impl FfmpegEncoder {
    /// Encoder with the given options.
    pub fn new(opts: FfmpegOpts) -> Self {
        Self { opts }
    }

    /// Options in use.
    pub fn opts(&self) -> &FfmpegOpts {
        &self.opts
    }

    /// Full `ffmpeg` argument list writing to `out`.
    pub fn command_args(&self, job: &EncodeJob, out: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let mut push = |s: &str| args.push(OsString::from(s));

        push("-y");
        push("-loglevel");
        push("error");
        push("-framerate");
        push(&job.fps.to_ffmpeg_rate());
        push("-start_number");
        push("0");
        push("-i");
        args.push(
            job.frames_dir
                .join(job.naming.sequence_pattern())
                .into_os_string(),
        );
        args.push(OsString::from("-i"));
        args.push(job.audio_path.clone().into_os_string());
        for (flag, value) in [
            ("-c:v", &self.opts.video_codec),
            ("-pix_fmt", &self.opts.pixel_format),
            ("-c:a", &self.opts.audio_codec),
        ] {
            args.push(OsString::from(flag));
            args.push(OsString::from(value));
        }
        args.push(OsString::from("-shortest"));
        if wants_faststart(&job.dest) {
            args.push(OsString::from("-movflags"));
            args.push(OsString::from("+faststart"));
        }
        args.push(out.as_os_str().to_owned());
        args
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn preflight(&self) -> WaveframeResult<()> {
        self.opts.timeout()?;
        if !tool_available(&self.opts.ffmpeg_bin) {
            return Err(WaveframeError::validation(format!(
                "ffmpeg is required for encoding, but '{}' was not found or is not runnable",
                self.opts.ffmpeg_bin.display()
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(dest = %job.dest.display()))]
    fn encode(&self, job: &EncodeJob) -> WaveframeResult<()> {
        job.fps.validate()?;
        let timeout = self.opts.timeout()?;
        if !job.frames_dir.is_dir() {
            return Err(WaveframeError::validation(format!(
                "frame directory '{}' does not exist",
                job.frames_dir.display()
            )));
        }
        if !self.opts.overwrite && job.dest.exists() {
            return Err(WaveframeError::validation(format!(
                "output file '{}' already exists",
                job.dest.display()
            )));
        }
        job.cancel.check()?;

        let tmp = partial_path(&job.dest)?;
        let mut guard = TempFileGuard(Some(tmp.clone()));

        let args = self.command_args(job, &tmp);
        tracing::debug!(bin = %self.opts.ffmpeg_bin.display(), ?args, "spawning encoder");

        let mut child = Command::new(&self.opts.ffmpeg_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                WaveframeError::Other(anyhow::anyhow!(
                    "failed to spawn '{}' (is it installed and on PATH?): {e}",
                    self.opts.ffmpeg_bin.display()
                ))
            })?;

        let mut stderr = child.stderr.take().ok_or_else(|| {
            WaveframeError::Other(anyhow::anyhow!("failed to open ffmpeg stderr (unexpected)"))
        })?;
        let stderr_drain: JoinHandle<std::io::Result<Vec<u8>>> = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        let status = wait_polling(&mut child, timeout, &job.cancel)?;
        let stderr_bytes = stderr_drain
            .join()
            .map_err(|_| WaveframeError::Other(anyhow::anyhow!("ffmpeg stderr drain thread panicked")))?
            .map_err(|e| WaveframeError::Other(anyhow::anyhow!("ffmpeg stderr read failed: {e}")))?;

        if !status.success() {
            return Err(WaveframeError::Encode {
                status: status.code(),
                stderr: String::from_utf8_lossy(&stderr_bytes).into_owned(),
            });
        }

        std::fs::rename(&tmp, &job.dest).map_err(|e| {
            WaveframeError::Other(anyhow::anyhow!(
                "failed to move encoded video to '{}': {e}",
                job.dest.display()
            ))
        })?;
        guard.disarm();
        tracing::info!(fps = %job.fps, "encoded video");
        Ok(())
    }
}

/// Wait for `child`, killing it when `timeout` elapses or `cancel` fires.
///
/// After a kill the caller must not join the stderr drain thread.
fn wait_polling(
    child: &mut std::process::Child,
    timeout: Option<Duration>,
    cancel: &CancelToken,
) -> WaveframeResult<ExitStatus> {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().map_err(|e| {
            WaveframeError::Other(anyhow::anyhow!("failed to wait for ffmpeg: {e}"))
        })? {
            return Ok(status);
        }

        let err = if cancel.is_cancelled() {
            Some(WaveframeError::Cancelled)
        } else {
            timeout
                .filter(|after| started.elapsed() >= *after)
                .map(|after| WaveframeError::Timeout { after })
        };
        if let Some(err) = err {
            tracing::warn!(error = %err, "killing encoder");
            let _ = child.kill();
            let _ = child.wait();
            return Err(err);
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

fn wants_faststart(dest: &Path) -> bool {
    dest.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ["mp4", "mov", "m4v"].iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Hidden sibling of `dest` that keeps its extension, so ffmpeg picks the same muxer.
pub(crate) fn partial_path(dest: &Path) -> WaveframeResult<PathBuf> {
    let name = dest.file_name().ok_or_else(|| {
        WaveframeError::validation(format!(
            "output path '{}' has no file name",
            dest.display()
        ))
    })?;
    let mut partial = OsString::from(format!(".waveframe-partial-{}-", std::process::id()));
    partial.push(name);
    Ok(dest.with_file_name(partial))
}

/// Return `true` when `ffmpeg -version` runs from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_available(Path::new("ffmpeg"))
}

struct TempFileGuard(Option<PathBuf>);

impl TempFileGuard {
    fn disarm(&mut self) {
        self.0 = None;
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
