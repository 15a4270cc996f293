//! Texel encodings for animation maps.
//!
//! Positions are written as RGBA with the xyz components in RGB and alpha
//! fixed at 1.0. Bytes are little-endian. An all-zero texel is the "empty"
//! value used for padding columns.

use glam::Vec3;
use half::f16;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexelFormat {
    /// Four IEEE 754 half-precision channels (8 bytes per texel).
    #[default]
    RgbaHalf,
    /// Four single-precision channels (16 bytes per texel).
    RgbaFloat,
}

impl TexelFormat {
    pub const CHANNELS: usize = 4;

    #[inline]
    pub const fn bytes_per_channel(self) -> usize {
        match self {
            TexelFormat::RgbaHalf => 2,
            TexelFormat::RgbaFloat => 4,
        }
    }

    #[inline]
    pub const fn bytes_per_texel(self) -> usize {
        self.bytes_per_channel() * Self::CHANNELS
    }

    /// Write one position into `out`, which must be exactly one texel long.
    pub fn encode(self, position: Vec3, out: &mut [u8]) {
        debug_assert_eq!(out.len(), self.bytes_per_texel());
        let rgba = [position.x, position.y, position.z, 1.0];
        let step = self.bytes_per_channel();
        for (chunk, value) in out.chunks_exact_mut(step).zip(rgba) {
            match self {
                TexelFormat::RgbaHalf => chunk.copy_from_slice(&f16::from_f32(value).to_le_bytes()),
                TexelFormat::RgbaFloat => chunk.copy_from_slice(&value.to_le_bytes()),
            }
        }
    }

    /// Read one texel back as RGBA floats.
    pub fn decode(self, texel: &[u8]) -> [f32; 4] {
        let mut rgba = [0.0f32; 4];
        let step = self.bytes_per_channel();
        for (slot, chunk) in rgba.iter_mut().zip(texel.chunks_exact(step)) {
            *slot = match self {
                TexelFormat::RgbaHalf => f16::from_le_bytes([chunk[0], chunk[1]]).to_f32(),
                TexelFormat::RgbaFloat => {
                    f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])
                }
            };
        }
        rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_sizes() {
        assert_eq!(TexelFormat::RgbaHalf.bytes_per_texel(), 8);
        assert_eq!(TexelFormat::RgbaFloat.bytes_per_texel(), 16);
    }

    #[test]
    fn half_keeps_values_within_half_precision() {
        let fmt = TexelFormat::RgbaHalf;
        let mut buf = [0u8; 8];
        fmt.encode(Vec3::new(1.5, -0.333, 12.25), &mut buf);
        let [r, g, b, a] = fmt.decode(&buf);
        assert_eq!(r, 1.5);
        assert!((g + 0.333).abs() < 1e-3);
        assert_eq!(b, 12.25);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn float_is_exact() {
        let fmt = TexelFormat::RgbaFloat;
        let mut buf = [0u8; 16];
        let p = Vec3::new(0.1, -7.77, 1234.5);
        fmt.encode(p, &mut buf);
        assert_eq!(fmt.decode(&buf), [p.x, p.y, p.z, 1.0]);
    }

    #[test]
    fn zero_bytes_decode_to_zero() {
        assert_eq!(TexelFormat::RgbaHalf.decode(&[0u8; 8]), [0.0; 4]);
        assert_eq!(TexelFormat::RgbaFloat.decode(&[0u8; 16]), [0.0; 4]);
    }

    #[test]
    fn half_channels_are_little_endian() {
        let mut buf = [0u8; 8];
        TexelFormat::RgbaHalf.encode(Vec3::new(1.0, 0.0, 0.0), &mut buf);
        // 1.0 in binary16 is 0x3C00
        assert_eq!(&buf[0..2], &[0x00, 0x3C]);
        assert_eq!(&buf[6..8], &[0x00, 0x3C]);
    }
}
