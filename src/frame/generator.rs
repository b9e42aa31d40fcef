//! Deterministic synthetic sensor frames
//!
//! Each frame is a pure function of its index, so a producer can be re-run and
//! emit byte-identical payloads.

use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

use crate::frame::error::{FrameError, FrameResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// 8-bit RGB camera image
    #[default]
    Rgb,
    /// 16-bit time-of-flight depth map
    Tof,
}

impl SignalKind {
    /// Default frame size (width, height)
    pub fn default_dimensions(&self) -> (usize, usize) {
        match self {
            SignalKind::Rgb => (640, 480),
            SignalKind::Tof => (320, 240),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Rgb => "rgb",
            SignalKind::Tof => "tof",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(SignalKind::Rgb),
            "tof" | "depth" => Ok(SignalKind::Tof),
            other => Err(FrameError::UnknownKind(other.to_string())),
        }
    }
}

/// Row-major `height x width x 3` RGB image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbFrame {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let at = (y * self.width + x) * 3;
        [self.data[at], self.data[at + 1], self.data[at + 2]]
    }
}

/// Row-major `height x width` depth map in millimetres
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u16>,
}

impl DepthFrame {
    pub fn at(&self, x: usize, y: usize) -> u16 {
        self.data[y * self.width + x]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Rgb(RgbFrame),
    Depth(DepthFrame),
}

impl Frame {
    pub fn kind(&self) -> SignalKind {
        match self {
            Frame::Rgb(_) => SignalKind::Rgb,
            Frame::Depth(_) => SignalKind::Tof,
        }
    }

    /// Uncompressed size in bytes
    pub fn raw_len(&self) -> usize {
        match self {
            Frame::Rgb(frame) => frame.data.len(),
            Frame::Depth(frame) => frame.data.len() * 2,
        }
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive
fn linspace(start: f32, end: f32, n: usize) -> impl Iterator<Item = f32> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f32
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as f32)
}

/// Diagonal colour gradient that scrolls right by one column every two frames
pub fn synthetic_rgb(width: usize, height: usize, idx: u64) -> RgbFrame {
    // Ramps are truncated to u8 like an integer-typed linspace
    let xs: Vec<u8> = linspace(0.0, 255.0, width).map(|v| v as u8).collect();
    let ys: Vec<u8> = linspace(0.0, 255.0, height).map(|v| v as u8).collect();
    let shift = if width > 0 {
        ((idx / 2) % width as u64) as usize
    } else {
        0
    };

    let mut data = Vec::with_capacity(width * height * 3);
    for &g in &ys {
        for col in 0..width {
            // Rolling right by `shift` reads from `shift` columns to the left
            let r = xs[(col + width - shift) % width];
            let b = ((r as u16 + g as u16) % 256) as u8;
            data.extend_from_slice(&[r, g, b]);
        }
    }

    RgbFrame {
        width,
        height,
        data,
    }
}

/// Rippled depth surface around one metre whose phase advances with `idx`
pub fn synthetic_tof(width: usize, height: usize, idx: u64) -> DepthFrame {
    let xs: Vec<f32> = linspace(0.0, TAU, width).collect();
    let ys: Vec<f32> = linspace(0.0, TAU, height).collect();
    let phase = idx as f32 * 0.1;

    let mut data = Vec::with_capacity(width * height);
    for &y in &ys {
        let row_gain = (y * 0.7).cos();
        for &x in &xs {
            let depth = 1000.0 + 300.0 * (x + phase).sin() * row_gain;
            data.push(depth.clamp(0.0, u16::MAX as f32) as u16);
        }
    }

    DepthFrame {
        width,
        height,
        data,
    }
}

/// Produces frame `i` of a synthetic signal on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSource {
    kind: SignalKind,
    width: usize,
    height: usize,
}

impl FrameSource {
    pub fn new(kind: SignalKind, width: usize, height: usize) -> FrameResult<Self> {
        if width == 0 || height == 0 {
            return Err(FrameError::InvalidDimensions { width, height });
        }
        Ok(Self {
            kind,
            width,
            height,
        })
    }

    /// Source with the kind's default dimensions
    pub fn with_defaults(kind: SignalKind) -> Self {
        let (width, height) = kind.default_dimensions();
        Self {
            kind,
            width,
            height,
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn frame(&self, idx: u64) -> Frame {
        match self.kind {
            SignalKind::Rgb => Frame::Rgb(synthetic_rgb(self.width, self.height, idx)),
            SignalKind::Tof => Frame::Depth(synthetic_tof(self.width, self.height, idx)),
        }
    }
}
