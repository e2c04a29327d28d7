//! Frame synthesis: per-frame sample windows rasterized to PNG line plots.

pub(crate) mod cpu;
pub(crate) mod synth;
pub(crate) mod window;

use crate::assets::color::Color;
use crate::foundation::core::Canvas;
use crate::foundation::error::{WaveframeError, WaveframeResult};

/// Visual style shared by every frame of a run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    /// Waveform stroke color.
    pub line_color: Color,
    /// Canvas fill color.
    pub background_color: Color,
    /// Output frame size.
    #[serde(flatten)]
    pub canvas: Canvas,
    /// Stroke width in pixels.
    pub line_width: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            line_color: Color::from_rgb8(0, 0, 255),
            background_color: Color::from_rgb8(255, 255, 255),
            canvas: Canvas::default(),
            line_width: 2.0,
        }
    }
}

impl RenderStyle {
    /// Check canvas bounds and stroke width.
    pub fn validate(&self) -> WaveframeResult<()> {
        self.canvas.validate()?;
        if !self.line_width.is_finite() || self.line_width <= 0.0 {
            return Err(WaveframeError::validation(format!(
                "line_width must be a positive number, got {}",
                self.line_width
            )));
        }
        Ok(())
    }
}
