use crate::foundation::core::FrameIndex;
use crate::pipeline::Stage;

/// Receives stage transitions and per-frame progress of a run.
///
/// Frame notifications may arrive from rayon worker threads and out of index order; `done`
/// is the running count of frames written so far.
pub trait PipelineObserver: Sync {
    /// The run entered `stage`.
    fn stage_changed(&self, _stage: Stage) {}

    /// Frame `frame` has been written; `done` of `total` frames are on disk.
    fn frame_written(&self, _frame: FrameIndex, _done: u64, _total: u64) {}
}

/// Observer that ignores every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Observer that reports progress through `tracing`.
#[derive(Clone, Copy, Debug)]
pub struct LogObserver {
    every: u64,
}

impl LogObserver {
    /// Log one progress line every `every` frames (and always for the last one).
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(30)
    }
}

impl PipelineObserver for LogObserver {
    fn stage_changed(&self, stage: Stage) {
        tracing::info!(%stage, "stage");
    }

    fn frame_written(&self, frame: FrameIndex, done: u64, total: u64) {
        if done % self.every == 0 || done == total {
            let percent = if total == 0 {
                100.0
            } else {
                (done as f64 * 1000.0 / total as f64).round() / 10.0
            };
            tracing::info!(frame = frame.0, done, total, percent, "frames");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/observer.rs"]
mod tests;
