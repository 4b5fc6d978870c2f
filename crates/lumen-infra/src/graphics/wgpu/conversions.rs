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

//! Conversions from Lumen types to their WGPU counterparts.

use lumen_core::math::Color;
use lumen_core::renderer::{AddressMode, BlendMode, Filter, PixelFormat, PrimitiveKind};

/// A local extension trait to convert Lumen types into WGPU-compatible types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_wgpu()` syntax.
pub trait IntoWgpu<T> {
    /// Consumes self and converts it into a WGPU-compatible type.
    fn into_wgpu(self) -> T;
}

impl IntoWgpu<wgpu::Color> for Color {
    fn into_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: f64::from(self.r),
            g: f64::from(self.g),
            b: f64::from(self.b),
            a: f64::from(self.a),
        }
    }
}

impl IntoWgpu<wgpu::FilterMode> for Filter {
    fn into_wgpu(self) -> wgpu::FilterMode {
        match self {
            Filter::Nearest => wgpu::FilterMode::Nearest,
            Filter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl IntoWgpu<wgpu::AddressMode> for AddressMode {
    fn into_wgpu(self) -> wgpu::AddressMode {
        match self {
            AddressMode::Wrap => wgpu::AddressMode::Repeat,
            AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
        }
    }
}

/// Triangle fans have no WGPU topology; they are expanded to lists before upload.
impl IntoWgpu<wgpu::PrimitiveTopology> for PrimitiveKind {
    fn into_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            PrimitiveKind::TriangleList | PrimitiveKind::TriangleFan => {
                wgpu::PrimitiveTopology::TriangleList
            }
            PrimitiveKind::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
            PrimitiveKind::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveKind::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveKind::PointList => wgpu::PrimitiveTopology::PointList,
        }
    }
}

impl IntoWgpu<Option<wgpu::BlendState>> for BlendMode {
    fn into_wgpu(self) -> Option<wgpu::BlendState> {
        let component = |operation| wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::SrcAlpha,
            dst_factor: wgpu::BlendFactor::One,
            operation,
        };
        match self {
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Add => Some(wgpu::BlendState {
                color: component(wgpu::BlendOperation::Add),
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Subtract => Some(wgpu::BlendState {
                color: component(wgpu::BlendOperation::ReverseSubtract),
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Overwrite => Some(wgpu::BlendState::REPLACE),
        }
    }
}

/// How pixels of a given format are stored on the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageFormat {
    /// The GPU texture format.
    pub format: wgpu::TextureFormat,
    /// Bytes per stored pixel.
    pub bytes_per_pixel: u32,
    /// `true` if uploads are expanded to RGBA8 first.
    pub expand: bool,
}

impl IntoWgpu<StorageFormat> for PixelFormat {
    fn into_wgpu(self) -> StorageFormat {
        let rgba8 = StorageFormat {
            format: wgpu::TextureFormat::Rgba8Unorm,
            bytes_per_pixel: 4,
            expand: false,
        };
        match self {
            PixelFormat::Rgba8 => rgba8,
            PixelFormat::Bgra8 => StorageFormat {
                format: wgpu::TextureFormat::Bgra8Unorm,
                ..rgba8
            },
            PixelFormat::Rgb8 | PixelFormat::Alpha8 | PixelFormat::Grayscale8 => StorageFormat {
                expand: true,
                ..rgba8
            },
            PixelFormat::Rgba16Float => StorageFormat {
                format: wgpu::TextureFormat::Rgba16Float,
                bytes_per_pixel: 8,
                expand: false,
            },
        }
    }
}
