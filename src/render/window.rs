use std::ops::Range;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{WaveframeError, WaveframeResult};

/// Per-frame sample windows for one signal at one frame rate.
///
/// Frame `i` covers samples `[i * spf, i * spf + window_periods * spf)` clipped to the signal,
/// where `spf = floor(sample_rate / fps)`. Consecutive windows overlap by
/// `(window_periods - 1) * spf` samples.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowPlan {
    signal_len: u64,
    samples_per_frame: u64,
    window_periods: u32,
    total_frames: u64,
}

impl WindowPlan {
    /// Default number of frame periods spanned by one window.
    pub const DEFAULT_WINDOW_PERIODS: u32 = 2;

    /// Plan windows for a signal of `signal_len` samples.
    pub fn new(
        signal_len: usize,
        sample_rate: u32,
        fps: Fps,
        window_periods: u32,
    ) -> WaveframeResult<Self> {
        fps.validate()?;
        if sample_rate == 0 {
            return Err(WaveframeError::validation("sample_rate must be > 0"));
        }
        if window_periods == 0 {
            return Err(WaveframeError::validation("window_periods must be >= 1"));
        }
        let samples_per_frame = fps.samples_per_frame(sample_rate);
        if samples_per_frame == 0 {
            return Err(WaveframeError::validation(format!(
                "fps {fps} exceeds the sample rate {sample_rate} Hz"
            )));
        }

        let signal_len = signal_len as u64;
        Ok(Self {
            signal_len,
            samples_per_frame,
            window_periods,
            total_frames: fps.frames_for_samples(signal_len, sample_rate),
        })
    }

    /// `floor(duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// `floor(sample_rate / fps)`.
    pub fn samples_per_frame(&self) -> u64 {
        self.samples_per_frame
    }

    /// Frame periods per window.
    pub fn window_periods(&self) -> u32 {
        self.window_periods
    }

    /// Unclipped window length in samples.
    pub fn window_len(&self) -> u64 {
        self.samples_per_frame * u64::from(self.window_periods)
    }

    /// Sample range rendered into frame `frame`, clipped to the signal. Never panics; indices
    /// past the end yield an empty range.
    pub fn window(&self, frame: FrameIndex) -> Range<usize> {
        let start = frame
            .0
            .saturating_mul(self.samples_per_frame)
            .min(self.signal_len);
        let end = start.saturating_add(self.window_len()).min(self.signal_len);
        start as usize..end as usize
    }
}

/// Zero-padded frame file names, `frame_00000.png` and up.
///
/// The pad width is at least five digits and grows when a run needs more than 99,999 frames,
/// so lexicographic order always equals frame order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameNaming {
    digits: usize,
}

const PREFIX: &str = "frame_";
const SUFFIX: &str = ".png";

impl FrameNaming {
    /// Minimum pad width.
    pub const MIN_DIGITS: usize = 5;

    /// Naming wide enough for frame indices `0..total_frames`.
    pub fn for_frame_count(total_frames: u64) -> Self {
        let last = total_frames.saturating_sub(1);
        let digits = last.checked_ilog10().map_or(1, |d| d as usize + 1);
        Self {
            digits: digits.max(Self::MIN_DIGITS),
        }
    }

    /// Pad width in digits.
    pub fn digits(&self) -> usize {
        self.digits
    }

    /// File name for frame `idx`.
    pub fn file_name(&self, idx: FrameIndex) -> String {
        format!("{PREFIX}{:0width$}{SUFFIX}", idx.0, width = self.digits)
    }

    /// printf-style sequence pattern consumed by ffmpeg's image2 demuxer.
    pub fn sequence_pattern(&self) -> String {
        format!("{PREFIX}%0{}d{SUFFIX}", self.digits)
    }

    /// Return `true` for any `frame_<digits>.png` name, whatever its pad width.
    pub fn is_frame_file(name: &str) -> bool {
        name.strip_prefix(PREFIX)
            .and_then(|rest| rest.strip_suffix(SUFFIX))
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/window.rs"]
mod tests;
