use super::*;
use serde_json::json;

#[test]
fn parses_names_case_insensitively() {
    let c: Color = "Blue".parse().unwrap();
    assert_eq!(c.to_rgba8(), Rgba8::opaque(0, 0, 255));

    let c: Color = " white ".parse().unwrap();
    assert_eq!(c.to_rgba8(), Rgba8::opaque(255, 255, 255));

    assert!("not-a-color".parse::<Color>().is_err());
}

#[test]
fn parses_hex_rgb_and_rgba() {
    let c: Color = serde_json::from_value(json!("#ff0000")).unwrap();
    assert_eq!(c, Color::rgba(1.0, 0.0, 0.0, 1.0));

    let c: Color = serde_json::from_value(json!("#0000ff80")).unwrap();
    assert!((c.b - 1.0).abs() < 1e-9);
    assert!((c.a - (128.0 / 255.0)).abs() < 1e-9);

    assert!("#12345".parse::<Color>().is_err());
    assert!("#gg0000".parse::<Color>().is_err());
}

#[test]
fn parses_rgba_object_and_array() {
    let c: Color = serde_json::from_value(json!({"r": 0.25, "g": 0.5, "b": 0.75})).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 1.0));

    let c: Color = serde_json::from_value(json!([0.25, 0.5, 0.75, 0.9])).unwrap();
    assert_eq!(c, Color::rgba(0.25, 0.5, 0.75, 0.9));

    assert!(serde_json::from_value::<Color>(json!([0.25, 0.5])).is_err());
}

#[test]
fn serializes_as_hex() {
    let c = Color::from_rgb8(0x12, 0xab, 0xff);
    assert_eq!(serde_json::to_value(c).unwrap(), json!("#12abff"));

    let back: Color = serde_json::from_value(json!("#12abff")).unwrap();
    assert_eq!(back.to_rgba8(), c.to_rgba8());

    let translucent = Color::rgba(0.0, 0.0, 0.0, 0.0);
    assert_eq!(translucent.to_string(), "#00000000");
}
