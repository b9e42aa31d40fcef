//! Synthetic sensor frames and payload encoders

pub mod codec;
pub mod error;
pub mod generator;

pub use codec::{Codec, Encoder, DEFAULT_QUALITY};
pub use error::{FrameError, FrameResult};
pub use generator::{
    synthetic_rgb, synthetic_tof, DepthFrame, Frame, FrameSource, RgbFrame, SignalKind,
};
