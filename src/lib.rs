//! Waveframe turns an audio recording into a waveform video.
//!
//! A run has three parts:
//!
//! - [`SignalLoader`] decodes the input into a peak-normalized mono [`AudioSignal`]
//! - [`FrameSynthesizer`] renders one PNG per output frame from an overlapping sample window
//! - a [`VideoEncoder`] (by default [`FfmpegEncoder`]) muxes the frames with the source audio,
//!   after which [`cleanup_frames`] reclaims the intermediate images
//!
//! [`Pipeline`] drives all three from a [`RunConfig`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod foundation;

pub mod encode;
pub mod pipeline;
pub mod render;
pub mod signal;

pub use crate::assets::color::Color;
pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::core::{Canvas, Fps, FrameIndex, Rgba8};
pub use crate::foundation::error::{WaveframeError, WaveframeResult};

pub use crate::encode::ffmpeg::{FfmpegEncoder, FfmpegOpts, is_ffmpeg_on_path};
pub use crate::encode::{EncodeJob, VideoEncoder, assemble, cleanup_frames};
pub use crate::pipeline::observer::{LogObserver, NoopObserver, PipelineObserver};
pub use crate::pipeline::{Pipeline, RunConfig, RunFailure, RunReport, Stage, default_work_dir};
pub use crate::render::RenderStyle;
pub use crate::render::cpu::{FrameRGBA, encode_png, waveform_path};
pub use crate::render::synth::{
    FrameSynthesizer, RenderThreading, SynthesisReport, render_frame_png, synthesize,
};
pub use crate::render::window::{FrameNaming, WindowPlan};
pub use crate::signal::decode::DecoderKind;
pub use crate::signal::{AudioSignal, SignalLoader, load};
