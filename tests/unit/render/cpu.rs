use super::*;
use crate::assets::color::Color;

fn small_style() -> RenderStyle {
    RenderStyle {
        canvas: Canvas {
            width: 64,
            height: 32,
        },
        ..RenderStyle::default()
    }
}

#[test]
fn path_spans_width_and_fixed_amplitude_axis() {
    let canvas = Canvas {
        width: 100,
        height: 50,
    };
    let path = waveform_path(&[1.0, 0.0, -1.0, 0.0], canvas, 0.0);
    let pts: Vec<Point> = path
        .elements()
        .iter()
        .map(|el| match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => *p,
            other => panic!("unexpected element {other:?}"),
        })
        .collect();

    assert_eq!(pts.len(), 4);
    assert_eq!(pts[0], Point::new(0.0, 0.0));
    assert_eq!(pts[1], Point::new(25.0, 25.0));
    assert_eq!(pts[2], Point::new(50.0, 50.0));
    assert_eq!(pts[3], Point::new(75.0, 25.0));
}

#[test]
fn path_clamps_out_of_range_samples_and_applies_inset() {
    let canvas = Canvas {
        width: 10,
        height: 20,
    };
    let path = waveform_path(&[4.0, -4.0], canvas, 1.0);
    let ys: Vec<f64> = path
        .elements()
        .iter()
        .filter_map(|el| match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(p.y),
            _ => None,
        })
        .collect();
    assert_eq!(ys, vec![1.0, 19.0]);
}

#[test]
fn short_windows_draw_nothing() {
    let canvas = Canvas::default();
    assert!(waveform_path(&[], canvas, 1.0).elements().is_empty());
    assert!(waveform_path(&[0.5], canvas, 1.0).elements().is_empty());
}

#[test]
fn flat_line_renders_over_background() {
    let mut backend = CpuWaveformBackend::new(small_style());
    let frame = backend.render(&[0.0; 32]).unwrap();
    assert_eq!(frame.width, 64);
    assert_eq!(frame.height, 32);
    assert_eq!(frame.data.len(), 64 * 32 * 4);

    assert_eq!(frame.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(frame.pixel(63, 31), Some([255, 255, 255, 255]));

    let mid = frame.pixel(32, 16).unwrap();
    assert!(mid[2] > 200, "expected a blue line, got {mid:?}");
    assert!(mid[0] < 80 && mid[1] < 80, "expected a blue line, got {mid:?}");
}

#[test]
fn frames_are_opaque_even_with_translucent_background() {
    let style = RenderStyle {
        background_color: Color::rgba(1.0, 1.0, 1.0, 0.5),
        ..small_style()
    };
    let mut backend = CpuWaveformBackend::new(style);
    let frame = backend.render(&[0.0, 0.0]).unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px[3] == 255));
}

#[test]
fn backend_reuse_is_deterministic() {
    let mut backend = CpuWaveformBackend::new(small_style());
    let window: Vec<f32> = (0..200).map(|i| (i as f32 * 0.1).sin()).collect();
    let a = backend.render(&window).unwrap();
    let _ = backend.render(&[0.0; 10]).unwrap();
    let b = backend.render(&window).unwrap();
    assert_eq!(a, b);
}

#[test]
fn png_roundtrips_dimensions() {
    let mut backend = CpuWaveformBackend::new(small_style());
    let frame = backend.render(&[0.0, 0.5, -0.5, 0.0]).unwrap();
    let png = encode_png(&frame).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

    let decoded = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
        .unwrap()
        .to_rgba8();
    assert_eq!(decoded.dimensions(), (64, 32));
    assert_eq!(decoded.as_raw(), &frame.data);
}
