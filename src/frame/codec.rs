//! Payload encoders
//!
//! The set of (signal kind, codec) strategies is closed and chosen once, when
//! the [`Encoder`] is built. Asking for a pairing outside the table fails
//! immediately rather than on the first frame.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::frame::error::{FrameError, FrameResult};
use crate::frame::generator::{Frame, SignalKind};

/// Default quality knob, 1-100
pub const DEFAULT_QUALITY: u32 = 80;

const MAX_ZSTD_LEVEL: i32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// LZ4 block compression with a size prefix
    Lz4,
    /// Zstandard over the raw 8-bit samples
    Zstd,
    /// Zstandard over little-endian 16-bit samples
    Zstd16,
}

impl Codec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Codec::Lz4 => "lz4",
            Codec::Zstd => "zstd",
            Codec::Zstd16 => "zstd16",
        }
    }

    /// Codec used when none is requested for `kind`
    pub fn default_for(kind: SignalKind) -> Self {
        match kind {
            SignalKind::Rgb => Codec::Lz4,
            SignalKind::Tof => Codec::Zstd16,
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Codec {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lz4" => Ok(Codec::Lz4),
            "zstd" => Ok(Codec::Zstd),
            "zstd16" => Ok(Codec::Zstd16),
            other => Err(FrameError::UnknownCodec(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    RgbLz4,
    RgbZstd { level: i32 },
    DepthZstd16 { level: i32 },
}

/// Map quality 1-100 onto zstd levels 1..=MAX_ZSTD_LEVEL
fn zstd_level(quality: u32) -> i32 {
    let quality = quality.clamp(1, 100) as i32;
    1 + (quality - 1) * (MAX_ZSTD_LEVEL - 1) / 99
}

/// Frame encoder bound to one (kind, codec) strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoder {
    kind: SignalKind,
    codec: Codec,
    strategy: Strategy,
}

impl Encoder {
    /// Select the strategy for `(kind, codec)`; `quality` is clamped to 1-100
    pub fn new(kind: SignalKind, codec: Codec, quality: u32) -> FrameResult<Self> {
        let strategy = match (kind, codec) {
            (SignalKind::Rgb, Codec::Lz4) => Strategy::RgbLz4,
            (SignalKind::Rgb, Codec::Zstd) => Strategy::RgbZstd {
                level: zstd_level(quality),
            },
            (SignalKind::Tof, Codec::Zstd16) => Strategy::DepthZstd16 {
                level: zstd_level(quality),
            },
            _ => {
                return Err(FrameError::UnsupportedCombination {
                    kind: kind.to_string(),
                    codec: codec.to_string(),
                })
            }
        };

        Ok(Self {
            kind,
            codec,
            strategy,
        })
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn codec(&self) -> Codec {
        self.codec
    }

    pub fn encode(&self, frame: &Frame) -> FrameResult<Bytes> {
        match (self.strategy, frame) {
            (Strategy::RgbLz4, Frame::Rgb(rgb)) => {
                Ok(Bytes::from(lz4_flex::compress_prepend_size(&rgb.data)))
            }
            (Strategy::RgbZstd { level }, Frame::Rgb(rgb)) => zstd::bulk::compress(&rgb.data, level)
                .map(Bytes::from)
                .map_err(|e| FrameError::EncodeFailed(e.to_string())),
            (Strategy::DepthZstd16 { level }, Frame::Depth(depth)) => {
                let raw: Vec<u8> = depth.data.iter().flat_map(|d| d.to_le_bytes()).collect();
                zstd::bulk::compress(&raw, level)
                    .map(Bytes::from)
                    .map_err(|e| FrameError::EncodeFailed(e.to_string()))
            }
            (_, other) => Err(FrameError::FrameMismatch {
                expected: self.kind.as_str(),
                actual: other.kind().as_str(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::generator::{synthetic_rgb, synthetic_tof};

    #[test]
    fn test_supported_combinations() {
        assert!(Encoder::new(SignalKind::Rgb, Codec::Lz4, DEFAULT_QUALITY).is_ok());
        assert!(Encoder::new(SignalKind::Rgb, Codec::Zstd, DEFAULT_QUALITY).is_ok());
        assert!(Encoder::new(SignalKind::Tof, Codec::Zstd16, DEFAULT_QUALITY).is_ok());
    }

    #[test]
    fn test_unsupported_combination_fails_at_construction() {
        for (kind, codec) in [
            (SignalKind::Rgb, Codec::Zstd16),
            (SignalKind::Tof, Codec::Lz4),
            (SignalKind::Tof, Codec::Zstd),
        ] {
            let err = Encoder::new(kind, codec, DEFAULT_QUALITY).unwrap_err();
            assert!(matches!(err, FrameError::UnsupportedCombination { .. }));
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_quality_is_clamped() {
        assert_eq!(zstd_level(0), 1);
        assert_eq!(zstd_level(1), 1);
        assert_eq!(zstd_level(100), MAX_ZSTD_LEVEL);
        assert_eq!(zstd_level(1000), MAX_ZSTD_LEVEL);

        // Out-of-range quality still builds a working encoder
        let encoder = Encoder::new(SignalKind::Rgb, Codec::Zstd, 5).unwrap();
        let out = encoder
            .encode(&Frame::Rgb(synthetic_rgb(10, 10, 0)))
            .unwrap();
        assert!(!out.is_empty());
    }

    #[test]
    fn test_lz4_payload_decompresses() {
        let frame = synthetic_rgb(64, 48, 4);
        let encoder = Encoder::new(SignalKind::Rgb, Codec::Lz4, DEFAULT_QUALITY).unwrap();

        let payload = encoder.encode(&Frame::Rgb(frame.clone())).unwrap();
        let restored = lz4_flex::decompress_size_prepended(&payload).unwrap();
        assert_eq!(restored, frame.data);
        // Gradients compress well
        assert!(payload.len() < frame.data.len());
    }

    #[test]
    fn test_zstd16_payload_decompresses() {
        let frame = synthetic_tof(32, 24, 2);
        let encoder = Encoder::new(SignalKind::Tof, Codec::Zstd16, DEFAULT_QUALITY).unwrap();

        let payload = encoder.encode(&Frame::Depth(frame.clone())).unwrap();
        let raw = zstd::bulk::decompress(&payload, frame.data.len() * 2).unwrap();
        let restored: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(restored, frame.data);
    }

    #[test]
    fn test_frame_mismatch() {
        let encoder = Encoder::new(SignalKind::Rgb, Codec::Lz4, DEFAULT_QUALITY).unwrap();
        let err = encoder
            .encode(&Frame::Depth(synthetic_tof(4, 4, 0)))
            .unwrap_err();
        assert!(matches!(err, FrameError::FrameMismatch { .. }));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_codec_parsing() {
        assert_eq!("LZ4".parse::<Codec>().unwrap(), Codec::Lz4);
        assert_eq!("zstd16".parse::<Codec>().unwrap(), Codec::Zstd16);
        assert!(matches!(
            "jpeg".parse::<Codec>(),
            Err(FrameError::UnknownCodec(_))
        ));
        assert_eq!(Codec::default_for(SignalKind::Tof), Codec::Zstd16);
    }
}
