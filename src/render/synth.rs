use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{WaveframeError, WaveframeResult};
use crate::pipeline::observer::{NoopObserver, PipelineObserver};
use crate::render::RenderStyle;
use crate::render::cpu::{CpuWaveformBackend, encode_png};
use crate::render::window::{FrameNaming, WindowPlan};
use crate::signal::AudioSignal;

/// Frame-level parallelism for [`FrameSynthesizer::synthesize`].
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderThreading {
    /// Render frames on a dedicated rayon pool.
    pub parallel: bool,
    /// Frames scheduled per parallel batch. `0` is treated as `1`.
    pub chunk_size: usize,
    /// Override the number of rayon worker threads. `None` uses rayon defaults.
    pub threads: Option<usize>,
}

impl Default for RenderThreading {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: 64,
            threads: None,
        }
    }
}

/// Outcome of a completed synthesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesisReport {
    /// Number of frame files written, `0..frames`.
    pub frames: u64,
    /// Naming used for the files, shared with the encoder.
    pub naming: FrameNaming,
    /// Directory holding the frames.
    pub output_dir: PathBuf,
}

/// Renders one PNG per output frame from an immutable signal and style.
#[derive(Debug)]
pub struct FrameSynthesizer<'a> {
    signal: &'a AudioSignal,
    style: RenderStyle,
    plan: WindowPlan,
    naming: FrameNaming,
}

impl<'a> FrameSynthesizer<'a> {
    /// Plan frames for `signal` at `fps`, each window spanning `window_periods` frame periods.
    pub fn new(
        signal: &'a AudioSignal,
        style: RenderStyle,
        fps: Fps,
        window_periods: u32,
    ) -> WaveframeResult<Self> {
        style.validate()?;
        let plan = WindowPlan::new(signal.len(), signal.sample_rate(), fps, window_periods)?;
        Ok(Self {
            signal,
            style,
            plan,
            naming: FrameNaming::for_frame_count(plan.total_frames()),
        })
    }

    /// Window plan for this signal.
    pub fn plan(&self) -> &WindowPlan {
        &self.plan
    }

    /// File naming for this run.
    pub fn naming(&self) -> FrameNaming {
        self.naming
    }

    /// Number of frames [`synthesize`](Self::synthesize) will write.
    pub fn total_frames(&self) -> u64 {
        self.plan.total_frames()
    }

    /// PNG bytes of frame `idx`. Pure: no filesystem access.
    pub fn render_frame_png(&self, idx: FrameIndex) -> WaveframeResult<Vec<u8>> {
        let mut backend = CpuWaveformBackend::new(self.style);
        self.render_with(&mut backend, idx)
    }

    fn render_with(
        &self,
        backend: &mut CpuWaveformBackend,
        idx: FrameIndex,
    ) -> WaveframeResult<Vec<u8>> {
        if idx.0 >= self.plan.total_frames() {
            return Err(WaveframeError::render(
                idx.0,
                format!("frame index out of range (total {})", self.plan.total_frames()),
            ));
        }
        let window = self
            .signal
            .samples()
            .get(self.plan.window(idx))
            .ok_or_else(|| WaveframeError::render(idx.0, "window plan does not match the signal"))?;
        let frame = backend.render(window).map_err(at_frame(idx))?;
        encode_png(&frame).map_err(at_frame(idx))
    }

    fn write_frame(&self, dir: &Path, idx: FrameIndex, png: &[u8]) -> WaveframeResult<()> {
        let path = dir.join(self.naming.file_name(idx));
        std::fs::write(&path, png).map_err(|e| {
            WaveframeError::render(idx.0, format!("failed to write '{}': {e}", path.display()))
        })
    }

    /// Render every frame into `output_dir`, creating it when absent.
    ///
    /// Frame files left over from an earlier run in the same directory are removed first. Every
    /// frame is on disk when this returns `Ok`; the first failure aborts the run.
    #[tracing::instrument(skip_all, fields(dir = %output_dir.display(), parallel = threading.parallel))]
    pub fn synthesize(
        &self,
        output_dir: &Path,
        threading: &RenderThreading,
        observer: &dyn PipelineObserver,
        cancel: &CancelToken,
    ) -> WaveframeResult<SynthesisReport> {
        let total = self.plan.total_frames();
        if total == 0 {
            return Err(WaveframeError::validation(format!(
                "signal of {} samples at {} Hz is shorter than one frame period",
                self.signal.len(),
                self.signal.sample_rate()
            )));
        }
        cancel.check()?;

        std::fs::create_dir_all(output_dir).map_err(|e| {
            WaveframeError::Other(anyhow::anyhow!(
                "failed to create frame directory '{}': {e}",
                output_dir.display()
            ))
        })?;
        let stale = remove_frame_files(output_dir)?;
        if stale > 0 {
            tracing::debug!(stale, "removed frames left by an earlier run");
        }

        tracing::info!(
            frames = total,
            samples_per_frame = self.plan.samples_per_frame(),
            window_len = self.plan.window_len(),
            "synthesizing frames"
        );
        let started = Instant::now();

        if threading.parallel {
            self.synthesize_parallel(output_dir, threading, observer, cancel)?;
        } else {
            self.synthesize_sequential(output_dir, observer, cancel)?;
        }

        tracing::info!(
            frames = total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "frames written"
        );
        Ok(SynthesisReport {
            frames: total,
            naming: self.naming,
            output_dir: output_dir.to_path_buf(),
        })
    }

    fn synthesize_sequential(
        &self,
        dir: &Path,
        observer: &dyn PipelineObserver,
        cancel: &CancelToken,
    ) -> WaveframeResult<()> {
        let total = self.plan.total_frames();
        let mut backend = CpuWaveformBackend::new(self.style);
        for f in 0..total {
            cancel.check()?;
            let idx = FrameIndex(f);
            let png = self.render_with(&mut backend, idx)?;
            self.write_frame(dir, idx, &png)?;
            observer.frame_written(idx, f + 1, total);
        }
        Ok(())
    }

    fn synthesize_parallel(
        &self,
        dir: &Path,
        threading: &RenderThreading,
        observer: &dyn PipelineObserver,
        cancel: &CancelToken,
    ) -> WaveframeResult<()> {
        let total = self.plan.total_frames();
        let pool = build_thread_pool(threading.threads)?;
        let chunk_size = threading.chunk_size.max(1) as u64;
        let done = AtomicU64::new(0);
        let style = self.style;

        let mut chunk_start = 0u64;
        while chunk_start < total {
            cancel.check()?;
            let chunk_end = chunk_start.saturating_add(chunk_size).min(total);

            let results = pool.install(|| {
                (chunk_start..chunk_end)
                    .into_par_iter()
                    .map_init(
                        || CpuWaveformBackend::new(style),
                        |backend, f| -> WaveframeResult<()> {
                            cancel.check()?;
                            let idx = FrameIndex(f);
                            let png = self.render_with(backend, idx)?;
                            self.write_frame(dir, idx, &png)?;
                            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                            observer.frame_written(idx, n, total);
                            Ok(())
                        },
                    )
                    .collect::<Vec<_>>()
            });
            // Results keep index order, so the first error is the lowest failing frame.
            results.into_iter().collect::<WaveframeResult<Vec<()>>>()?;

            chunk_start = chunk_end;
        }
        Ok(())
    }
}

fn at_frame(idx: FrameIndex) -> impl FnOnce(WaveframeError) -> WaveframeError {
    move |e| match e {
        e @ WaveframeError::Render { .. } => e,
        other => WaveframeError::render(idx.0, other.to_string()),
    }
}

fn build_thread_pool(threads: Option<usize>) -> WaveframeResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(WaveframeError::validation(
            "render 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| WaveframeError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

/// Remove every `frame_<digits>.png` file directly inside `dir`, returning how many were removed.
///
/// A missing directory counts as empty. Other files are left alone.
pub(crate) fn remove_frame_files(dir: &Path) -> WaveframeResult<u64> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(WaveframeError::cleanup(dir, e)),
    };

    let mut removed = 0u64;
    for entry in entries {
        let entry = entry.map_err(|e| WaveframeError::cleanup(dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !FrameNaming::is_frame_file(name) {
            continue;
        }
        let path = entry.path();
        if path.is_file() {
            std::fs::remove_file(&path).map_err(|e| WaveframeError::cleanup(&path, e))?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Pure render of frame `idx` for `signal` under `plan` and `style`.
pub fn render_frame_png(
    signal: &AudioSignal,
    plan: &WindowPlan,
    style: &RenderStyle,
    idx: FrameIndex,
) -> WaveframeResult<Vec<u8>> {
    style.validate()?;
    let synth = FrameSynthesizer {
        signal,
        style: *style,
        plan: *plan,
        naming: FrameNaming::for_frame_count(plan.total_frames()),
    };
    synth.render_frame_png(idx)
}

/// Sequentially render `signal` into `output_dir` with default window overlap, returning the
/// number of frames written.
pub fn synthesize(
    signal: &AudioSignal,
    style: &RenderStyle,
    fps: Fps,
    output_dir: &Path,
) -> WaveframeResult<u64> {
    let synth = FrameSynthesizer::new(signal, *style, fps, WindowPlan::DEFAULT_WINDOW_PERIODS)?;
    let report = synth.synthesize(
        output_dir,
        &RenderThreading::default(),
        &NoopObserver,
        &CancelToken::new(),
    )?;
    Ok(report.frames)
}

#[cfg(test)]
#[path = "../../tests/unit/render/synth.rs"]
mod tests;
