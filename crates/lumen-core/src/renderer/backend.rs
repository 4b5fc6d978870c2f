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

//! The contract every concrete render backend implements.
//!
//! The [`RenderSystem`](super::RenderSystem) owns exactly one backend and is the
//! only caller of this trait. It validates parameters, tracks context state and
//! transforms vertices to clip space before forwarding, so backends only encode.

use super::format::PixelFormat;
use super::primitive::{ClipVertex, PrimitiveKind};
use super::state::BlendMode;
use super::texture::{AddressMode, Filter};
use crate::error::Result;
use crate::math::{Color, Rect};
use crate::platform::backend::SurfaceHandle;
use crate::resource::DecodedImage;
use serde::{Deserialize, Serialize};

/// An opaque reference to device memory, issued and interpreted by one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceHandle(pub u64);

/// The broad capability class of a backend, used by hint resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// GPU-accelerated.
    Hardware,
    /// CPU rasterizer.
    Software,
}

/// Static information about a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendInfo {
    /// Human readable backend name, e.g. `"wgpu (Vulkan)"`.
    pub name: String,
    /// Capability class.
    pub kind: BackendKind,
    /// Largest texture edge the device accepts.
    pub max_texture_size: u32,
}

/// Everything a backend needs to allocate a texture.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Format of the pixels that will be uploaded.
    pub format: PixelFormat,
    /// `true` if the texture can be bound as a render target.
    pub render_target: bool,
}

/// A sub-rectangle of a texture, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl TextureRegion {
    /// The region covering a whole `width x height` texture.
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// A texture bound to a draw call, with its sampling state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureBinding {
    /// Device handle of the texture.
    pub handle: DeviceHandle,
    /// Sampling filter.
    pub filter: Filter,
    /// Coordinate addressing mode.
    pub address_mode: AddressMode,
}

/// One draw call, with vertices already in clip space.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Topology of `vertices`.
    pub kind: PrimitiveKind,
    /// Clip-space vertices. Borrowed for the duration of the call only.
    pub vertices: &'a [ClipVertex],
    /// Texture to sample, or `None` for flat color.
    pub texture: Option<TextureBinding>,
    /// Color every sample is modulated with.
    pub color: Color,
    /// Blend state.
    pub blend: BlendMode,
    /// Pixel viewport on the current target, or `None` for the full target.
    pub viewport: Option<Rect>,
}

/// The backend contract.
///
/// Backends report a lost device by returning [`Error::ContextInvalid`] from any
/// call. After [`release_device`](Self::release_device) every previously issued
/// [`DeviceHandle`] is dead and must never be passed back.
///
/// [`Error::ContextInvalid`]: crate::Error::ContextInvalid
pub trait RenderBackend: std::fmt::Debug {
    /// Returns static information about the backend.
    fn info(&self) -> BackendInfo;

    /// Returns `true` if textures of `format` can be created.
    fn supports_format(&self, format: PixelFormat) -> bool;

    /// Binds the backend to a window surface, or to an offscreen target when
    /// `surface` is `None`.
    fn attach_surface(&mut self, surface: Option<SurfaceHandle>, width: u32, height: u32)
        -> Result<()>;

    /// Resizes the presentation target.
    fn resize_surface(&mut self, width: u32, height: u32);

    /// Allocates device memory for a texture. Contents are zeroed.
    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<DeviceHandle>;

    /// Uploads `pixels` (tightly packed, in `format`) into `region`.
    fn upload_texture(
        &mut self,
        handle: DeviceHandle,
        region: TextureRegion,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<()>;

    /// Frees a texture. Unknown handles are ignored.
    fn destroy_texture(&mut self, handle: DeviceHandle);

    /// Redirects subsequent clears and draws into a render-target texture, or back
    /// to the presentation target with `None`.
    fn set_render_target(&mut self, target: Option<DeviceHandle>) -> Result<()>;

    /// Clears the current target.
    fn clear(&mut self, color: Color) -> Result<()>;

    /// Encodes one draw call.
    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()>;

    /// Presents the current frame.
    fn present(&mut self) -> Result<()>;

    /// Reads the current target back as RGBA8, top row first.
    ///
    /// Work encoded so far is flushed first. Backends that cannot read their
    /// presentation target return [`Error::UnsupportedFormat`].
    ///
    /// [`Error::UnsupportedFormat`]: crate::Error::UnsupportedFormat
    fn read_pixels(&mut self) -> Result<DecodedImage>;

    /// Drops every device object after a context loss.
    fn release_device(&mut self);

    /// Reacquires the device after a context loss.
    fn restore_device(&mut self) -> Result<()>;

    /// Releases the device for good.
    fn shutdown(&mut self);
}
