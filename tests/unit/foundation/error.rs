use super::*;

#[test]
fn display_carries_diagnostic_context() {
    let err = WaveframeError::render(42, "boom");
    assert!(err.to_string().contains("frame 42"));

    let err = WaveframeError::Encode {
        status: Some(3),
        stderr: "  bad output path \n".to_owned(),
    };
    let msg = err.to_string();
    assert!(msg.contains("status 3"));
    assert!(msg.ends_with("bad output path"));

    let err = WaveframeError::Encode {
        status: None,
        stderr: String::new(),
    };
    assert!(err.to_string().contains("<signal>"));

    let err = WaveframeError::NotFound {
        path: PathBuf::from("missing.wav"),
    };
    assert!(err.to_string().contains("missing.wav"));

    assert!(
        WaveframeError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn cleanup_preserves_source() {
    use std::error::Error as _;

    let err = WaveframeError::cleanup("frames", std::io::Error::other("busy"));
    assert!(err.source().is_some());
    assert!(err.to_string().contains("busy"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = WaveframeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
