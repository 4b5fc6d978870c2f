// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Pixel formats accepted by texture creation and upload.

use crate::error::{Error, Result};
use crate::math::Color;
use serde::{Deserialize, Serialize};

/// The memory layout of one pixel in a caller-provided buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 8-bit red, green, blue, alpha.
    Rgba8,
    /// 8-bit blue, green, red, alpha.
    Bgra8,
    /// 8-bit red, green, blue, no alpha.
    Rgb8,
    /// 8-bit alpha only. Color channels read as white.
    Alpha8,
    /// 8-bit luminance. Alpha reads as opaque.
    Grayscale8,
    /// 16-bit float red, green, blue, alpha. Only hardware backends accept it.
    Rgba16Float,
}

impl PixelFormat {
    /// Size of one pixel in bytes.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Alpha8 | PixelFormat::Grayscale8 => 1,
            PixelFormat::Rgba16Float => 8,
        }
    }

    /// Number of bytes a tightly packed `width x height` image occupies.
    ///
    /// Returns `None` on overflow.
    pub fn buffer_len(self, width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(self.bytes_per_pixel())
    }

    /// Returns `true` if the format carries a meaningful alpha channel.
    pub const fn has_alpha(self) -> bool {
        !matches!(self, PixelFormat::Rgb8 | PixelFormat::Grayscale8)
    }

    /// Encodes `color` as one pixel of this format.
    ///
    /// Grayscale uses Rec. 601 luma weights. Channels the format cannot store are
    /// dropped.
    pub fn encode(self, color: Color) -> Result<Vec<u8>> {
        let [r, g, b, a] = color.to_rgba8();
        let pixel = match self {
            PixelFormat::Rgba8 => vec![r, g, b, a],
            PixelFormat::Bgra8 => vec![b, g, r, a],
            PixelFormat::Rgb8 => vec![r, g, b],
            PixelFormat::Alpha8 => vec![a],
            PixelFormat::Grayscale8 => {
                let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
                vec![luma.round().clamp(0.0, 255.0) as u8]
            }
            PixelFormat::Rgba16Float => {
                return Err(Error::UnsupportedFormat(
                    "Rgba16Float pixels cannot be encoded on the CPU".to_string(),
                ))
            }
        };
        Ok(pixel)
    }

    /// Decodes one pixel of this format. `bytes` must hold exactly one pixel.
    pub fn decode(self, bytes: &[u8]) -> Result<Color> {
        if bytes.len() != self.bytes_per_pixel() {
            return Err(Error::InvalidParameter(format!(
                "{:?} pixel needs {} bytes, got {}",
                self,
                self.bytes_per_pixel(),
                bytes.len()
            )));
        }
        let rgba = expand_to_rgba8(self, bytes)?;
        Ok(Color::from_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]))
    }
}

/// Expands tightly packed pixels of `format` into RGBA8.
///
/// Fails with [`Error::UnsupportedFormat`] for formats that have no 8-bit
/// expansion, and with [`Error::InvalidParameter`] if `pixels` is not a whole
/// number of pixels.
pub fn expand_to_rgba8(format: PixelFormat, pixels: &[u8]) -> Result<Vec<u8>> {
    let bpp = format.bytes_per_pixel();
    if pixels.len() % bpp != 0 {
        return Err(Error::InvalidParameter(format!(
            "{} bytes is not a whole number of {:?} pixels",
            pixels.len(),
            format
        )));
    }

    let count = pixels.len() / bpp;
    let mut out = Vec::with_capacity(count * 4);
    match format {
        PixelFormat::Rgba8 => out.extend_from_slice(pixels),
        PixelFormat::Bgra8 => {
            for p in pixels.chunks_exact(4) {
                out.extend_from_slice(&[p[2], p[1], p[0], p[3]]);
            }
        }
        PixelFormat::Rgb8 => {
            for p in pixels.chunks_exact(3) {
                out.extend_from_slice(&[p[0], p[1], p[2], 255]);
            }
        }
        PixelFormat::Alpha8 => {
            for &a in pixels {
                out.extend_from_slice(&[255, 255, 255, a]);
            }
        }
        PixelFormat::Grayscale8 => {
            for &l in pixels {
                out.extend_from_slice(&[l, l, l, 255]);
            }
        }
        PixelFormat::Rgba16Float => {
            return Err(Error::UnsupportedFormat(
                "Rgba16Float has no 8-bit expansion".to_string(),
            ))
        }
    }
    Ok(out)
}
