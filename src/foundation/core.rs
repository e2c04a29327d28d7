use crate::foundation::error::{WaveframeError, WaveframeResult};

/// Absolute 0-based output frame index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// Create a validated FPS value.
    pub fn new(num: u32, den: u32) -> WaveframeResult<Self> {
        if den == 0 {
            return Err(WaveframeError::validation("Fps den must be > 0"));
        }
        if num == 0 {
            return Err(WaveframeError::validation("Fps num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Whole-number FPS, e.g. `Fps::integer(30)`.
    pub fn integer(num: u32) -> WaveframeResult<Self> {
        Self::new(num, 1)
    }

    /// Re-check the invariants of a value built through struct literal or serde.
    pub fn validate(self) -> WaveframeResult<()> {
        Self::new(self.num, self.den).map(|_| ())
    }

    /// Number of whole audio samples covered by one frame period, `floor(sample_rate / fps)`.
    pub fn samples_per_frame(self, sample_rate: u32) -> u64 {
        let num = u128::from(sample_rate) * u128::from(self.den);
        (num / u128::from(self.num)) as u64
    }

    /// Whole frames that fit into `samples` at `sample_rate`, `floor(samples / sample_rate * fps)`.
    ///
    /// Exact integer arithmetic, so a 2 s clip at 30 fps is always 60 frames.
    pub fn frames_for_samples(self, samples: u64, sample_rate: u32) -> u64 {
        if sample_rate == 0 {
            return 0;
        }
        let num = u128::from(samples) * u128::from(self.num);
        let den = u128::from(sample_rate) * u128::from(self.den);
        (num / den) as u64
    }

    /// `num/den` form accepted by ffmpeg rate options.
    pub fn to_ffmpeg_rate(self) -> String {
        format!("{}/{}", self.num, self.den)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self { num: 30, den: 1 }
    }
}

impl std::fmt::Display for Fps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl std::str::FromStr for Fps {
    type Err = WaveframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (num, den) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s, "1"),
        };
        let num = num
            .parse::<u32>()
            .map_err(|_| WaveframeError::validation(format!("invalid fps numerator \"{num}\"")))?;
        let den = den.parse::<u32>().map_err(|_| {
            WaveframeError::validation(format!("invalid fps denominator \"{den}\""))
        })?;
        Self::new(num, den)
    }
}

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Check the canvas is usable by both the rasterizer and a yuv420p encode.
    pub fn validate(self) -> WaveframeResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(WaveframeError::validation(
                "canvas width/height must be non-zero",
            ));
        }
        if self.width > u32::from(u16::MAX) || self.height > u32::from(u16::MAX) {
            return Err(WaveframeError::validation(
                "canvas width/height must fit in 16 bits",
            ));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            // yuv420p output subsamples chroma 2x2.
            return Err(WaveframeError::validation(
                "canvas width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Ok(())
    }

    /// Byte length of a tightly packed RGBA8 buffer of this size.
    pub fn rgba_len(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 400,
        }
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully opaque color.
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
