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

use super::raster::{Canvas, Raster, Sampler};
use lumen_core::math::Color;
use lumen_core::platform::SurfaceHandle;
use lumen_core::renderer::format::expand_to_rgba8;
use lumen_core::renderer::{
    BackendInfo, BackendKind, DeviceHandle, DrawCall, PixelFormat, RenderBackend,
    TextureDescriptor, TextureRegion,
};
use lumen_core::resource::DecodedImage;
use lumen_core::{Error, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

const DEFAULT_MAX_TEXTURE_SIZE: u32 = 4096;

/// A texture in host memory, always stored as RGBA8.
#[derive(Debug)]
struct SoftTexture {
    width: u32,
    height: u32,
    render_target: bool,
    pixels: Vec<u8>,
}

/// State shared by a [`SoftwareBackend`] and its probes.
#[derive(Debug, Default)]
struct SoftwareDevice {
    width: u32,
    height: u32,
    framebuffer: Vec<u8>,
    textures: HashMap<u64, SoftTexture>,
    next_handle: u64,
    target: Option<DeviceHandle>,
    lost: bool,
    frames_presented: u64,
    shut_down: bool,
}

impl SoftwareDevice {
    fn check_alive(&self) -> Result<()> {
        if self.lost || self.shut_down {
            Err(Error::ContextInvalid)
        } else {
            Ok(())
        }
    }

    fn texture(&self, handle: DeviceHandle) -> Result<&SoftTexture> {
        self.textures
            .get(&handle.0)
            .ok_or_else(|| Error::ResourceInvalid(format!("unknown texture handle {}", handle.0)))
    }
}

/// The software render backend.
#[derive(Debug)]
pub struct SoftwareBackend {
    device: Rc<RefCell<SoftwareDevice>>,
    max_texture_size: u32,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    /// Creates a backend with an empty framebuffer. The framebuffer is sized by
    /// [`RenderBackend::attach_surface`].
    pub fn new() -> Self {
        Self {
            device: Rc::new(RefCell::new(SoftwareDevice::default())),
            max_texture_size: DEFAULT_MAX_TEXTURE_SIZE,
        }
    }

    /// Caps the accepted texture edge length.
    pub fn with_max_texture_size(mut self, max_texture_size: u32) -> Self {
        self.max_texture_size = max_texture_size;
        self
    }

    /// Returns a probe observing this backend.
    pub fn probe(&self) -> SoftwareProbe {
        SoftwareProbe {
            device: self.device.clone(),
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: "software".to_string(),
            kind: BackendKind::Software,
            max_texture_size: self.max_texture_size,
        }
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        format != PixelFormat::Rgba16Float
    }

    fn attach_surface(
        &mut self,
        _surface: Option<SurfaceHandle>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        log::debug!("Software framebuffer attached at {width}x{height}");
        device.width = width;
        device.height = height;
        device.framebuffer = vec![0; width as usize * height as usize * 4];
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        let mut device = self.device.borrow_mut();
        if (device.width, device.height) == (width, height) {
            return;
        }
        device.width = width;
        device.height = height;
        device.framebuffer = vec![0; width as usize * height as usize * 4];
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<DeviceHandle> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        if !self.supports_format(desc.format) {
            return Err(Error::UnsupportedFormat(format!("{:?}", desc.format)));
        }
        device.next_handle += 1;
        let id = device.next_handle;
        device.textures.insert(
            id,
            SoftTexture {
                width: desc.width,
                height: desc.height,
                render_target: desc.render_target,
                pixels: vec![0; desc.width as usize * desc.height as usize * 4],
            },
        );
        log::trace!(
            "Software texture {} '{}' allocated ({}x{})",
            id,
            desc.label,
            desc.width,
            desc.height
        );
        Ok(DeviceHandle(id))
    }

    fn upload_texture(
        &mut self,
        handle: DeviceHandle,
        region: TextureRegion,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        let rgba = expand_to_rgba8(format, pixels)?;
        let texture = device
            .textures
            .get_mut(&handle.0)
            .ok_or_else(|| Error::ResourceInvalid(format!("unknown texture handle {}", handle.0)))?;

        let row_len = region.width as usize * 4;
        let stride = texture.width as usize * 4;
        let fits = |offset: u32, len: u32, bound: u32| {
            u64::from(offset) + u64::from(len) <= u64::from(bound)
        };
        if !fits(region.x, region.width, texture.width)
            || !fits(region.y, region.height, texture.height)
        {
            return Err(Error::OutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                bounds_width: texture.width,
                bounds_height: texture.height,
            });
        }
        if rgba.len() != row_len * region.height as usize {
            return Err(Error::InvalidParameter(format!(
                "upload of {}x{} pixels got {} bytes",
                region.width,
                region.height,
                pixels.len()
            )));
        }
        if row_len == 0 {
            return Ok(());
        }
        for (row, src) in rgba.chunks_exact(row_len).enumerate() {
            let start = (region.y as usize + row) * stride + region.x as usize * 4;
            texture.pixels[start..start + row_len].copy_from_slice(src);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, handle: DeviceHandle) {
        let mut device = self.device.borrow_mut();
        device.textures.remove(&handle.0);
        if device.target == Some(handle) {
            device.target = None;
        }
    }

    fn set_render_target(&mut self, target: Option<DeviceHandle>) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        if let Some(handle) = target {
            if !device.texture(handle)?.render_target {
                return Err(Error::InvalidParameter(format!(
                    "texture handle {} is not a render target",
                    handle.0
                )));
            }
        }
        device.target = target;
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        let device = &mut *device;
        let mut canvas = match device.target {
            Some(handle) => {
                let texture = device.textures.get_mut(&handle.0).ok_or_else(|| {
                    Error::ResourceInvalid(format!("unknown texture handle {}", handle.0))
                })?;
                Canvas {
                    width: texture.width,
                    height: texture.height,
                    pixels: &mut texture.pixels,
                }
            }
            None => Canvas {
                width: device.width,
                height: device.height,
                pixels: &mut device.framebuffer,
            },
        };
        canvas.clear(color);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        let device = &mut *device;

        // The target's pixels are taken out for the duration of the draw so the
        // sampled texture can be borrowed from the same map.
        let (width, height, mut pixels) = match device.target {
            Some(handle) => {
                if call.texture.map(|t| t.handle) == Some(handle) {
                    return Err(Error::InvalidParameter(
                        "a render target cannot be sampled while bound".to_string(),
                    ));
                }
                let texture = device.textures.get_mut(&handle.0).ok_or_else(|| {
                    Error::ResourceInvalid(format!("unknown texture handle {}", handle.0))
                })?;
                (
                    texture.width,
                    texture.height,
                    std::mem::take(&mut texture.pixels),
                )
            }
            None => (
                device.width,
                device.height,
                std::mem::take(&mut device.framebuffer),
            ),
        };

        let result = rasterize(device, call, width, height, &mut pixels);

        match device.target {
            Some(handle) => {
                if let Some(texture) = device.textures.get_mut(&handle.0) {
                    texture.pixels = pixels;
                }
            }
            None => device.framebuffer = pixels,
        }
        result
    }

    fn present(&mut self) -> Result<()> {
        let mut device = self.device.borrow_mut();
        device.check_alive()?;
        device.frames_presented += 1;
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<DecodedImage> {
        let device = self.device.borrow();
        device.check_alive()?;
        let (width, height, pixels) = match device.target {
            Some(handle) => {
                let texture = device.texture(handle)?;
                (texture.width, texture.height, texture.pixels.clone())
            }
            None => (device.width, device.height, device.framebuffer.clone()),
        };
        Ok(DecodedImage {
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels,
        })
    }

    fn release_device(&mut self) {
        let mut device = self.device.borrow_mut();
        let count = device.textures.len();
        device.textures.clear();
        device.target = None;
        log::debug!("Software device released ({count} textures dropped)");
    }

    fn restore_device(&mut self) -> Result<()> {
        let mut device = self.device.borrow_mut();
        if device.shut_down {
            return Err(Error::ContextInvalid);
        }
        device.lost = false;
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut device = self.device.borrow_mut();
        device.textures.clear();
        device.target = None;
        device.framebuffer = Vec::new();
        device.shut_down = true;
    }
}

fn rasterize(
    device: &SoftwareDevice,
    call: &DrawCall<'_>,
    width: u32,
    height: u32,
    pixels: &mut [u8],
) -> Result<()> {
    let sampler = match call.texture {
        Some(binding) => {
            let texture = device.texture(binding.handle)?;
            Some(Sampler {
                width: texture.width,
                height: texture.height,
                pixels: &texture.pixels,
                filter: binding.filter,
                address_mode: binding.address_mode,
            })
        }
        None => None,
    };
    let mut canvas = Canvas {
        width,
        height,
        pixels,
    };
    Raster::new(
        &mut canvas,
        sampler.as_ref(),
        call.color,
        call.blend,
        call.viewport,
    )
    .draw(call.kind, call.vertices);
    Ok(())
}

/// Read access to a [`SoftwareBackend`] after it was moved into a render system.
#[derive(Debug, Clone)]
pub struct SoftwareProbe {
    device: Rc<RefCell<SoftwareDevice>>,
}

impl SoftwareProbe {
    /// Number of textures currently holding device memory.
    pub fn live_allocations(&self) -> usize {
        self.device.borrow().textures.len()
    }

    /// Framebuffer size in pixels.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let device = self.device.borrow();
        (device.width, device.height)
    }

    /// A copy of the RGBA8 framebuffer.
    pub fn framebuffer(&self) -> Vec<u8> {
        self.device.borrow().framebuffer.clone()
    }

    /// The framebuffer pixel at `(x, y)`, or `None` outside the framebuffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let device = self.device.borrow();
        if x >= device.width || y >= device.height {
            return None;
        }
        let i = (y as usize * device.width as usize + x as usize) * 4;
        device
            .framebuffer
            .get(i..i + 4)
            .and_then(|p| p.try_into().ok())
    }

    /// RGBA8 contents of the texture behind `handle`.
    pub fn texture_pixels(&self, handle: DeviceHandle) -> Option<Vec<u8>> {
        self.device
            .borrow()
            .textures
            .get(&handle.0)
            .map(|t| t.pixels.clone())
    }

    /// RGBA8 contents of every live texture, in allocation order.
    pub fn all_texture_pixels(&self) -> Vec<Vec<u8>> {
        let device = self.device.borrow();
        let mut ids: Vec<u64> = device.textures.keys().copied().collect();
        ids.sort_unstable();
        ids.iter().map(|id| device.textures[id].pixels.clone()).collect()
    }

    /// How many frames were presented.
    pub fn frames_presented(&self) -> u64 {
        self.device.borrow().frames_presented
    }

    /// Returns `true` once the backend was shut down.
    pub fn is_shut_down(&self) -> bool {
        self.device.borrow().shut_down
    }

    /// Simulates a device loss: every call fails with `ContextInvalid` until the
    /// device is restored.
    pub fn lose_device(&self) {
        self.device.borrow_mut().lost = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::renderer::{
        AddressMode, BlendMode, ClipVertex, Filter, PrimitiveKind, TextureBinding,
    };

    fn vertex(x: f32, y: f32, u: f32, v: f32) -> ClipVertex {
        ClipVertex {
            position: [x, y, 0.0, 1.0],
            uv: [u, v],
        }
    }

    fn quad() -> [ClipVertex; 4] {
        [
            vertex(-1.0, 1.0, 0.0, 0.0),
            vertex(1.0, 1.0, 1.0, 0.0),
            vertex(-1.0, -1.0, 0.0, 1.0),
            vertex(1.0, -1.0, 1.0, 1.0),
        ]
    }

    fn descriptor(width: u32, height: u32, render_target: bool) -> TextureDescriptor {
        TextureDescriptor {
            label: "test".to_string(),
            width,
            height,
            format: PixelFormat::Rgba8,
            render_target,
        }
    }

    #[test]
    fn test_uploads_expand_to_rgba() {
        let mut backend = SoftwareBackend::new();
        let probe = backend.probe();
        let handle = backend
            .create_texture(&TextureDescriptor {
                format: PixelFormat::Bgra8,
                ..descriptor(1, 1, false)
            })
            .unwrap();
        backend
            .upload_texture(handle, TextureRegion::full(1, 1), PixelFormat::Bgra8, &[1, 2, 3, 4])
            .unwrap();
        assert_eq!(probe.texture_pixels(handle), Some(vec![3, 2, 1, 4]));
        assert_eq!(probe.live_allocations(), 1);

        backend.destroy_texture(handle);
        assert_eq!(probe.live_allocations(), 0);
    }

    #[test]
    fn test_textured_quad_samples_texture() {
        let mut backend = SoftwareBackend::new();
        let probe = backend.probe();
        backend.attach_surface(None, 4, 4).unwrap();
        let handle = backend.create_texture(&descriptor(2, 2, false)).unwrap();
        let texels = [
            255, 0, 0, 255, 0, 255, 0, 255, //
            0, 0, 255, 255, 255, 255, 255, 255,
        ];
        backend
            .upload_texture(handle, TextureRegion::full(2, 2), PixelFormat::Rgba8, &texels)
            .unwrap();
        backend
            .draw(&DrawCall {
                kind: PrimitiveKind::TriangleStrip,
                vertices: &quad(),
                texture: Some(TextureBinding {
                    handle,
                    filter: Filter::Nearest,
                    address_mode: AddressMode::Clamp,
                }),
                color: Color::WHITE,
                blend: BlendMode::Overwrite,
                viewport: None,
            })
            .unwrap();

        assert_eq!(probe.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(probe.pixel(3, 0), Some([0, 255, 0, 255]));
        assert_eq!(probe.pixel(0, 3), Some([0, 0, 255, 255]));
        assert_eq!(probe.pixel(3, 3), Some([255, 255, 255, 255]));
        assert_eq!(probe.pixel(4, 0), None);
    }

    #[test]
    fn test_render_target_receives_draws() {
        let mut backend = SoftwareBackend::new();
        let probe = backend.probe();
        backend.attach_surface(None, 2, 2).unwrap();
        let target = backend.create_texture(&descriptor(3, 3, true)).unwrap();
        let plain = backend.create_texture(&descriptor(3, 3, false)).unwrap();

        assert!(matches!(
            backend.set_render_target(Some(plain)),
            Err(Error::InvalidParameter(_))
        ));
        backend.set_render_target(Some(target)).unwrap();
        backend.clear(Color::BLUE).unwrap();
        assert_eq!(probe.texture_pixels(target).unwrap()[..4], [0, 0, 255, 255]);
        assert_eq!(probe.pixel(0, 0), Some([0, 0, 0, 0]));

        let sampled = TextureBinding {
            handle: target,
            filter: Filter::Linear,
            address_mode: AddressMode::Clamp,
        };
        let err = backend
            .draw(&DrawCall {
                kind: PrimitiveKind::TriangleStrip,
                vertices: &quad(),
                texture: Some(sampled),
                color: Color::WHITE,
                blend: BlendMode::Alpha,
                viewport: None,
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        // The failed draw left the target's pixels in place.
        assert_eq!(probe.texture_pixels(target).unwrap().len(), 36);

        backend.set_render_target(None).unwrap();
        backend.clear(Color::RED).unwrap();
        assert_eq!(probe.pixel(1, 1), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_read_pixels_follows_the_bound_target() {
        let mut backend = SoftwareBackend::new();
        backend.attach_surface(None, 2, 1).unwrap();
        backend.clear(Color::RED).unwrap();
        let target = backend.create_texture(&descriptor(1, 1, true)).unwrap();
        backend.set_render_target(Some(target)).unwrap();
        backend.clear(Color::GREEN).unwrap();

        let shot = backend.read_pixels().unwrap();
        assert_eq!((shot.width, shot.height), (1, 1));
        assert_eq!(shot.pixels, vec![0, 255, 0, 255]);

        backend.set_render_target(None).unwrap();
        let shot = backend.read_pixels().unwrap();
        assert_eq!((shot.width, shot.height, shot.format), (2, 1, PixelFormat::Rgba8));
        assert_eq!(shot.pixels, vec![255, 0, 0, 255, 255, 0, 0, 255]);
    }

    #[test]
    fn test_lost_device_rejects_calls_until_restored() {
        let mut backend = SoftwareBackend::new();
        let probe = backend.probe();
        backend.attach_surface(None, 1, 1).unwrap();
        backend.create_texture(&descriptor(1, 1, false)).unwrap();

        probe.lose_device();
        assert_eq!(backend.clear(Color::BLACK), Err(Error::ContextInvalid));
        assert_eq!(backend.present(), Err(Error::ContextInvalid));
        backend.release_device();
        assert_eq!(probe.live_allocations(), 0);

        backend.restore_device().unwrap();
        backend.clear(Color::BLACK).unwrap();
        backend.present().unwrap();
        assert_eq!(probe.frames_presented(), 1);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let mut backend = SoftwareBackend::new();
        let probe = backend.probe();
        backend.create_texture(&descriptor(1, 1, false)).unwrap();
        backend.shutdown();
        assert!(probe.is_shut_down());
        assert_eq!(probe.live_allocations(), 0);
        assert!(backend.restore_device().is_err());
    }
}
