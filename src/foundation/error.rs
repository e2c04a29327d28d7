use std::path::PathBuf;
use std::time::Duration;

/// Convenience result type used across waveframe.
pub type WaveframeResult<T> = Result<T, WaveframeError>;

/// Top-level error taxonomy. Every variant is fatal to a run; nothing is retried.
#[derive(thiserror::Error, Debug)]
pub enum WaveframeError {
    /// The input audio path does not exist.
    #[error("input not found: '{}'", path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// The input exists but could not be decoded as audio.
    #[error("decode error for '{}': {message}", path.display())]
    Decode {
        /// Input path.
        path: PathBuf,
        /// Decoder diagnostic.
        message: String,
    },

    /// Rasterizing or persisting a single frame failed.
    #[error("render error at frame {frame}: {message}")]
    Render {
        /// Index of the failing frame.
        frame: u64,
        /// Underlying failure.
        message: String,
    },

    /// The external encoder exited unsuccessfully.
    #[error("encoder exited with status {}: {}", display_status(*status), stderr.trim())]
    Encode {
        /// Exit code, `None` when the process was terminated by a signal.
        status: Option<i32>,
        /// Captured diagnostic output.
        stderr: String,
    },

    /// Removing intermediate frames or the working directory failed.
    #[error("cleanup of '{}' failed: {source}", path.display())]
    Cleanup {
        /// Path that could not be removed.
        path: PathBuf,
        /// IO failure.
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled through its [`CancelToken`](crate::CancelToken).
    #[error("cancelled")]
    Cancelled,

    /// The external encoder exceeded its time budget and was killed.
    #[error("encoder timed out after {after:?}")]
    Timeout {
        /// Configured limit.
        after: Duration,
    },

    /// Invalid user-provided configuration or input shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn display_status(status: Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "<signal>".to_owned(),
    }
}

impl WaveframeError {
    /// Build a [`WaveframeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`WaveframeError::Decode`] value.
    pub fn decode(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Build a [`WaveframeError::Render`] value.
    pub fn render(frame: u64, msg: impl Into<String>) -> Self {
        Self::Render {
            frame,
            message: msg.into(),
        }
    }

    /// Build a [`WaveframeError::Cleanup`] value.
    pub fn cleanup(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Cleanup {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
