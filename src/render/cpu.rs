use crate::foundation::core::{Canvas, Rgba8};
use crate::foundation::error::{WaveframeError, WaveframeResult};
use crate::foundation::math::flatten_premul_over_bg;
use crate::render::RenderStyle;
use kurbo::{BezPath, PathEl, Point};

/// A rendered frame as opaque, straight-alpha RGBA8 pixels.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
}

impl FrameRGBA {
    /// RGBA of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data
            .get(i..i + 4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }
}

/// Polyline through `window` in canvas space.
///
/// The x axis spans `[0, len)` across the full width; the y axis is fixed to `[-1, 1]` (top to
/// bottom), inset by `inset` pixels so a thick stroke at full scale stays on canvas. Samples
/// outside `[-1, 1]` are clamped. Windows with fewer than two samples produce an empty path.
pub fn waveform_path(window: &[f32], canvas: Canvas, inset: f64) -> BezPath {
    let mut path = BezPath::new();
    if window.len() < 2 {
        return path;
    }

    let w = f64::from(canvas.width);
    let h = f64::from(canvas.height);
    let inset = inset.clamp(0.0, h / 2.0);
    let span = h - 2.0 * inset;
    let x_step = w / window.len() as f64;

    for (i, &s) in window.iter().enumerate() {
        let y = inset + (1.0 - f64::from(s.clamp(-1.0, 1.0))) * 0.5 * span;
        let p = Point::new(i as f64 * x_step, y);
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    path
}

/// CPU waveform rasterizer powered by `vello_cpu`.
///
/// One backend renders frames sequentially and reuses its render context; parallel rendering
/// creates one backend per worker.
pub(crate) struct CpuWaveformBackend {
    style: RenderStyle,
    ctx: Option<vello_cpu::RenderContext>,
}

impl CpuWaveformBackend {
    /// `style` must already be validated (canvas fits in `u16`).
    pub(crate) fn new(style: RenderStyle) -> Self {
        Self { style, ctx: None }
    }

    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut vello_cpu::RenderContext) -> WaveframeResult<R>,
    ) -> WaveframeResult<R> {
        let mut ctx = match self.ctx.take() {
            None => vello_cpu::RenderContext::new(width, height),
            Some(ctx) if ctx.width() == width && ctx.height() == height => ctx,
            Some(_) => vello_cpu::RenderContext::new(width, height),
        };
        ctx.reset();
        let out = f(&mut ctx)?;
        self.ctx = Some(ctx);
        Ok(out)
    }

    /// Draw `window` as a line plot over the background color.
    pub(crate) fn render(&mut self, window: &[f32]) -> WaveframeResult<FrameRGBA> {
        let canvas = self.style.canvas;
        let width_u16: u16 = canvas
            .width
            .try_into()
            .map_err(|_| WaveframeError::validation("canvas width exceeds u16"))?;
        let height_u16: u16 = canvas
            .height
            .try_into()
            .map_err(|_| WaveframeError::validation("canvas height exceeds u16"))?;

        let line = self.style.line_color.to_rgba8();
        let bg = self.style.background_color.to_rgba8();
        let line_width = self.style.line_width;
        let path = bezpath_to_cpu(&waveform_path(window, canvas, line_width * 0.5));

        let mut data = self.with_ctx_mut(width_u16, height_u16, |ctx| {
            ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_paint(paint_color(bg));
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                0.0,
                0.0,
                f64::from(canvas.width),
                f64::from(canvas.height),
            ));

            if !path.elements().is_empty() {
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(line_width));
                ctx.set_paint(paint_color(line));
                ctx.stroke_path(&path);
            }

            ctx.flush();
            let mut pixmap = vello_cpu::Pixmap::new(width_u16, height_u16);
            ctx.render_to_pixmap(&mut pixmap);
            Ok(pixmap.data_as_u8_slice().to_vec())
        })?;

        if data.len() != canvas.rgba_len() {
            return Err(WaveframeError::validation(
                "rasterizer returned a buffer that does not match the canvas size",
            ));
        }
        // Translucent backgrounds are flattened over black so frames are always opaque.
        flatten_premul_over_bg(&mut data, [0, 0, 0, 255]);

        Ok(FrameRGBA {
            width: canvas.width,
            height: canvas.height,
            data,
        })
    }
}

fn paint_color(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

/// Encode a frame as PNG bytes.
pub fn encode_png(frame: &FrameRGBA) -> WaveframeResult<Vec<u8>> {
    use image::ImageEncoder as _;

    let mut out = Vec::new();
    image::codecs::png::PngEncoder::new(&mut out)
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            image::ExtendedColorType::Rgba8,
        )
        .map_err(|e| WaveframeError::validation(format!("png encode failed: {e}")))?;
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
