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

//! Textures: caller-owned image resources whose device handle is leased from a
//! [`RenderSystem`](super::RenderSystem).
//!
//! A [`Texture`] survives context loss. Its metadata stays readable while the
//! handle is invalid, and [`RenderSystem::recreate_textures`] restores the handle
//! from whatever pixel source the texture still has.
//!
//! [`RenderSystem::recreate_textures`]: super::RenderSystem::recreate_textures

use super::backend::{DeviceHandle, TextureBinding, TextureRegion};
use super::format::{expand_to_rgba8, PixelFormat};
use super::render_system::DeviceCore;
use super::state::ContextState;
use crate::error::{Error, Result};
use crate::math::Color;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

slotmap::new_key_type! {
    /// Key of a texture in its render system's registry.
    pub struct TextureKey;
}

/// Where a texture's pixels came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureSource {
    /// Decoded from a named resource through a resource loader.
    Resource {
        /// Logical resource name.
        name: String,
    },
    /// Uploaded from a caller-provided buffer.
    Buffer,
    /// Allocated as a render target.
    RenderTarget,
}

/// Whether the render system keeps a CPU copy of the pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextureType {
    /// A CPU copy is kept, updated by writes and used to restore after loss.
    #[default]
    Managed,
    /// No CPU copy. Restorable after loss only if the texture has a resource name.
    Volatile,
}

/// Texture sampling filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Filter {
    /// Nearest texel.
    Nearest,
    /// Bilinear interpolation.
    #[default]
    Linear,
}

/// How coordinates outside `[0, 1]` are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AddressMode {
    /// Repeat the texture.
    Wrap,
    /// Clamp to the edge texel.
    #[default]
    Clamp,
}

/// Texture state shared between the caller-owned [`Texture`] and the registry.
#[derive(Debug)]
pub(crate) struct TextureRecord {
    pub(crate) label: String,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: PixelFormat,
    pub(crate) source: TextureSource,
    pub(crate) texture_type: TextureType,
    pub(crate) filter: Filter,
    pub(crate) address_mode: AddressMode,
    pub(crate) handle: Option<DeviceHandle>,
    pub(crate) pixels: Option<Vec<u8>>,
    /// Device memory was released on request, not by a context loss.
    pub(crate) unloaded: bool,
    pub(crate) destroyed: bool,
}

impl TextureRecord {
    pub(crate) fn binding(&self) -> Option<TextureBinding> {
        self.handle.map(|handle| TextureBinding {
            handle,
            filter: self.filter,
            address_mode: self.address_mode,
        })
    }

    fn check_region(&self, region: TextureRegion) -> Result<()> {
        let fits = |offset: u32, len: u32, bound: u32| {
            offset.checked_add(len).is_some_and(|end| end <= bound)
        };
        if !fits(region.x, region.width, self.width) || !fits(region.y, region.height, self.height)
        {
            return Err(Error::OutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                bounds_width: self.width,
                bounds_height: self.height,
            });
        }
        Ok(())
    }

    fn check_live(&self) -> Result<()> {
        if self.destroyed {
            return Err(Error::ResourceInvalid(format!(
                "texture '{}' was destroyed",
                self.label
            )));
        }
        Ok(())
    }

    fn cpu_pixels(&self) -> Result<&[u8]> {
        self.pixels.as_deref().ok_or_else(|| {
            Error::InvalidParameter(format!("texture '{}' keeps no CPU copy to read", self.label))
        })
    }

    /// Copies `pixels` (tightly packed rows of `region`) into the CPU copy.
    fn blit_cpu(&mut self, region: TextureRegion, pixels: &[u8]) {
        let bpp = self.format.bytes_per_pixel();
        let row_len = region.width as usize * bpp;
        let stride = self.width as usize * bpp;
        let Some(dst) = self.pixels.as_mut() else {
            return;
        };
        for (row, src) in pixels.chunks_exact(row_len).enumerate() {
            let start = (region.y as usize + row) * stride + region.x as usize * bpp;
            dst[start..start + row_len].copy_from_slice(src);
        }
    }
}

/// An image resource owned by the caller.
///
/// The device handle is leased from the render system that created the texture
/// and goes back through [`destroy`](Self::destroy), which also runs on drop.
/// Destroying after the render system has shut down is a no-op.
#[derive(Debug)]
pub struct Texture {
    pub(crate) key: TextureKey,
    pub(crate) record: Rc<RefCell<TextureRecord>>,
    pub(crate) core: Weak<RefCell<DeviceCore>>,
}

impl Texture {
    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.record.borrow().width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.record.borrow().height
    }

    /// Pixel format of the source data.
    pub fn format(&self) -> PixelFormat {
        self.record.borrow().format
    }

    /// Where the pixels came from.
    pub fn source(&self) -> TextureSource {
        self.record.borrow().source.clone()
    }

    /// Whether a CPU copy is kept.
    pub fn texture_type(&self) -> TextureType {
        self.record.borrow().texture_type
    }

    /// Debug label.
    pub fn label(&self) -> String {
        self.record.borrow().label.clone()
    }

    /// Returns `true` while the device handle is usable.
    pub fn is_valid(&self) -> bool {
        let record = self.record.borrow();
        !record.destroyed && record.handle.is_some()
    }

    /// Returns `true` once [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.record.borrow().destroyed
    }

    /// Returns `true` while the texture holds device memory.
    ///
    /// Unlike [`is_valid`](Self::is_valid) this is about residency: a texture that
    /// was unloaded or never loaded reports `false` until [`load`](Self::load).
    pub fn is_loaded(&self) -> bool {
        let record = self.record.borrow();
        !record.destroyed && !record.unloaded && record.handle.is_some()
    }

    /// Sampling filter.
    pub fn filter(&self) -> Filter {
        self.record.borrow().filter
    }

    /// Sets the sampling filter used by subsequent draws.
    pub fn set_filter(&mut self, filter: Filter) {
        self.record.borrow_mut().filter = filter;
    }

    /// Coordinate addressing mode.
    pub fn address_mode(&self) -> AddressMode {
        self.record.borrow().address_mode
    }

    /// Sets the addressing mode used by subsequent draws.
    pub fn set_address_mode(&mut self, mode: AddressMode) {
        self.record.borrow_mut().address_mode = mode;
    }

    /// A copy of the CPU-side pixels, if this is a managed texture.
    pub fn pixels(&self) -> Option<Vec<u8>> {
        self.record.borrow().pixels.clone()
    }

    /// Updates the `width x height` sub-rectangle at `(x, y)`.
    ///
    /// `pixels` holds tightly packed rows in the texture's format. The rectangle and
    /// buffer are validated before anything is touched, so a failing write leaves
    /// both the device and the CPU copy unchanged.
    ///
    /// # Errors
    /// - [`Error::OutOfBounds`] if the rectangle exceeds the texture.
    /// - [`Error::InvalidParameter`] if `pixels` does not match the rectangle.
    /// - [`Error::ResourceInvalid`] if the texture is destroyed, lost or unloaded.
    /// - [`Error::ContextInvalid`] if the render context is not active. A device
    ///   loss reported by the backend moves the render system to
    ///   [`ContextState::Lost`].
    /// - [`Error::NotInitialized`] once the render system has shut down.
    pub fn write(&mut self, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) -> Result<()> {
        let region = TextureRegion {
            x,
            y,
            width,
            height,
        };
        let mut record = self.record.borrow_mut();
        record.check_live()?;
        record.check_region(region)?;

        let expected = record.format.buffer_len(width, height);
        if expected != Some(pixels.len()) {
            return Err(Error::InvalidParameter(format!(
                "write of {}x{} {:?} pixels needs {:?} bytes, got {}",
                width,
                height,
                record.format,
                expected,
                pixels.len()
            )));
        }
        if width == 0 || height == 0 {
            return Ok(());
        }

        let core = self.core.upgrade().ok_or(Error::NotInitialized)?;
        let mut core = core.borrow_mut();
        core.ensure_active()?;
        let handle = record.handle.ok_or_else(|| {
            Error::ResourceInvalid(format!("texture '{}' has no device handle", record.label))
        })?;

        if let Err(err) = core
            .backend
            .upload_texture(handle, region, record.format, pixels)
        {
            if err == Error::ContextInvalid {
                drop(record);
                core.mark_lost();
            }
            return Err(err);
        }
        record.blit_cpu(region, pixels);
        log::trace!(
            "Wrote {}x{} region at ({}, {}) of texture '{}'",
            width,
            height,
            x,
            y,
            record.label
        );
        Ok(())
    }

    /// Reads one pixel from the CPU copy.
    ///
    /// # Errors
    /// - [`Error::OutOfBounds`] outside the texture.
    /// - [`Error::InvalidParameter`] if the texture keeps no CPU copy.
    /// - [`Error::UnsupportedFormat`] for formats without an 8-bit decoding.
    pub fn get_pixel(&self, x: u32, y: u32) -> Result<Color> {
        let record = self.record.borrow();
        record.check_live()?;
        record.check_region(TextureRegion {
            x,
            y,
            width: 1,
            height: 1,
        })?;
        let bpp = record.format.bytes_per_pixel();
        let start = (y as usize * record.width as usize + x as usize) * bpp;
        let pixels = record.cpu_pixels()?;
        record.format.decode(&pixels[start..start + bpp])
    }

    /// Sets one pixel to `color`. Same rules as [`write`](Self::write).
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> Result<()> {
        self.fill_rect(x, y, 1, 1, color)
    }

    /// Fills the `width x height` rectangle at `(x, y)` with `color`. Same rules as
    /// [`write`](Self::write).
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Color) -> Result<()> {
        let pixel = {
            let record = self.record.borrow();
            record.check_live()?;
            record.check_region(TextureRegion {
                x,
                y,
                width,
                height,
            })?;
            record.format.encode(color)?
        };
        let count = width as usize * height as usize;
        let pixels: Vec<u8> = pixel.iter().copied().cycle().take(count * pixel.len()).collect();
        self.write(x, y, width, height, &pixels)
    }

    /// Sets every byte of the texture to zero.
    pub fn clear(&mut self) -> Result<()> {
        let (width, height, len) = {
            let record = self.record.borrow();
            record.check_live()?;
            let len = record.format.buffer_len(record.width, record.height).ok_or_else(|| {
                Error::InvalidParameter(format!("texture '{}' is too large", record.label))
            })?;
            (record.width, record.height, len)
        };
        self.write(0, 0, width, height, &vec![0; len])
    }

    /// Copies the `width x height` rectangle at `(src_x, src_y)` of `source` to
    /// `(x, y)` in this texture.
    ///
    /// `source` must keep a CPU copy. Its pixels are converted when this texture is
    /// RGBA8, otherwise both formats must match.
    #[allow(clippy::too_many_arguments)]
    pub fn write_from(
        &mut self,
        source: &Texture,
        src_x: u32,
        src_y: u32,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    ) -> Result<()> {
        let format = self.format();
        let rows = {
            let src = source.record.borrow();
            src.check_live()?;
            src.check_region(TextureRegion {
                x: src_x,
                y: src_y,
                width,
                height,
            })?;
            if src.format != format && format != PixelFormat::Rgba8 {
                return Err(Error::UnsupportedFormat(format!(
                    "cannot copy {:?} pixels into a {:?} texture",
                    src.format, format
                )));
            }
            let bpp = src.format.bytes_per_pixel();
            let stride = src.width as usize * bpp;
            let row_len = width as usize * bpp;
            let pixels = src.cpu_pixels()?;
            let mut rows = Vec::with_capacity(row_len * height as usize);
            for row in 0..height as usize {
                let start = (src_y as usize + row) * stride + src_x as usize * bpp;
                rows.extend_from_slice(&pixels[start..start + row_len]);
            }
            if src.format != format {
                rows = expand_to_rgba8(src.format, &rows)?;
            }
            rows
        };
        self.write(x, y, width, height, &rows)
    }

    /// Allocates device memory and uploads the pixels again, from the CPU copy or
    /// the named resource. Does nothing if the texture is already loaded.
    ///
    /// # Errors
    /// - [`Error::ResourceInvalid`] if the texture is destroyed or its pixels are gone.
    /// - [`Error::ResourceNotFound`] or [`Error::UnsupportedFormat`] if the resource
    ///   cannot be decoded.
    /// - [`Error::ContextInvalid`] if the render context is not active.
    /// - [`Error::NotInitialized`] once the render system has shut down.
    pub fn load(&mut self) -> Result<()> {
        let mut record = self.record.borrow_mut();
        record.check_live()?;
        if record.handle.is_some() {
            record.unloaded = false;
            return Ok(());
        }
        let core = self.core.upgrade().ok_or(Error::NotInitialized)?;
        let mut core = core.borrow_mut();
        core.ensure_active()?;
        match core.load_record(&mut record) {
            Ok(handle) => {
                record.handle = Some(handle);
                record.unloaded = false;
                log::debug!(
                    "Loaded texture '{}' ({}x{})",
                    record.label,
                    record.width,
                    record.height
                );
                Ok(())
            }
            Err(err) => {
                if err == Error::ContextInvalid {
                    drop(record);
                    core.mark_lost();
                }
                Err(err)
            }
        }
    }

    /// Releases the device memory but keeps the texture, its metadata and its CPU
    /// copy. A volatile texture without a resource name cannot be loaded again.
    pub fn unload(&mut self) {
        let handle = {
            let mut record = self.record.borrow_mut();
            if record.destroyed {
                return;
            }
            record.unloaded = true;
            record.handle.take()
        };
        let Some(handle) = handle else {
            return;
        };
        let Some(core) = self.core.upgrade() else {
            return;
        };
        let Ok(mut core) = core.try_borrow_mut() else {
            return;
        };
        if core.state == ContextState::Destroyed {
            return;
        }
        if core.render_target == Some(self.key) {
            core.render_target = None;
        }
        core.backend.destroy_texture(handle);
        log::debug!("Unloaded texture '{}'", self.record.borrow().label);
    }

    /// Releases the device handle and unregisters the texture.
    ///
    /// Idempotent: the second call, and any call after the render system shut
    /// down, does nothing.
    pub fn destroy(&mut self) {
        let handle = {
            let mut record = self.record.borrow_mut();
            if record.destroyed {
                return;
            }
            record.destroyed = true;
            record.pixels = None;
            record.handle.take()
        };

        let Some(core) = self.core.upgrade() else {
            return;
        };
        let Ok(mut core) = core.try_borrow_mut() else {
            log::warn!(
                "Texture '{}' destroyed while its render system was busy; its device handle could not be released",
                self.record.borrow().label
            );
            return;
        };
        core.textures.remove(self.key);
        if core.render_target == Some(self.key) {
            core.render_target = None;
        }
        if let Some(handle) = handle {
            core.backend.destroy_texture(handle);
        }
        log::debug!("Destroyed texture '{}'", self.record.borrow().label);
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        self.destroy();
    }
}
