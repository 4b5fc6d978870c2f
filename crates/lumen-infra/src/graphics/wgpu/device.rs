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

//! The WGPU implementation of [`RenderBackend`].

use super::context::{GpuContext, PresentTarget, OFFSCREEN_FORMAT};
use super::conversions::{IntoWgpu, StorageFormat};
use super::pipeline::{fan_to_list, GpuVertex, PipelineKey, Pipelines};
use super::selector::{backend_name, WgpuAdapterSelector};
use lumen_core::math::{Color, Rect};
use lumen_core::platform::SurfaceHandle;
use lumen_core::renderer::format::expand_to_rgba8;
use lumen_core::renderer::{
    BackendInfo, BackendKind, DeviceHandle, DrawCall, PixelFormat, PrimitiveKind, RenderBackend,
    TextureDescriptor, TextureRegion,
};
use lumen_core::resource::DecodedImage;
use lumen_core::{Error, Result};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

#[derive(Debug)]
struct GpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
    storage: StorageFormat,
    render_target: bool,
}

/// Device-side state. Dropped as a whole when the device is lost.
#[derive(Debug)]
struct Gpu {
    context: GpuContext,
    pipelines: Pipelines,
    textures: HashMap<u64, GpuTexture>,
    encoder: Option<wgpu::CommandEncoder>,
    acquired: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
}

impl Gpu {
    fn new(adapter: wgpu::Adapter) -> Result<Self> {
        let context = GpuContext::new(adapter)?;
        let pipelines = Pipelines::new(&context.device, &context.queue);
        Ok(Self {
            context,
            pipelines,
            textures: HashMap::new(),
            encoder: None,
            acquired: None,
        })
    }

    /// Submits recorded work without presenting.
    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.context.queue.submit(std::iter::once(encoder.finish()));
        }
    }
}

/// A hardware render backend on top of WGPU.
///
/// Draw calls are recorded into one command encoder per frame, each as its own
/// render pass that loads the previous contents. [`present`](RenderBackend::present)
/// submits the encoder and presents the acquired surface texture.
#[derive(Debug)]
pub struct WgpuBackend {
    instance: wgpu::Instance,
    gpu: Option<Gpu>,
    target: Option<PresentTarget>,
    render_target: Option<DeviceHandle>,
    vsync: bool,
    next_handle: u64,
    name: String,
    max_texture_size: u32,
    shut_down: bool,
}

impl WgpuBackend {
    /// Selects a hardware adapter and creates a device on it.
    ///
    /// # Errors
    /// [`Error::BackendUnavailable`] if no hardware adapter or device can be obtained.
    pub fn new(vsync: bool) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = WgpuAdapterSelector::new(&instance).select()?;
        let name = format!("wgpu ({})", backend_name(adapter.get_info().backend));
        let gpu = Gpu::new(adapter)?;
        let max_texture_size = gpu.context.max_texture_size();
        log::info!("WgpuBackend created: {name}, max texture size {max_texture_size}");
        Ok(Self {
            instance,
            gpu: Some(gpu),
            target: None,
            render_target: None,
            vsync,
            next_handle: 0,
            name,
            max_texture_size,
            shut_down: false,
        })
    }

    fn gpu_mut(&mut self) -> Result<&mut Gpu> {
        match self.gpu.as_mut() {
            Some(gpu) if !gpu.context.is_lost() => Ok(gpu),
            _ => Err(Error::ContextInvalid),
        }
    }

    /// Makes sure a surface texture is held for the current frame.
    fn acquire(&mut self) -> Result<()> {
        let vsync = self.vsync;
        let gpu = match self.gpu.as_mut() {
            Some(gpu) if !gpu.context.is_lost() => gpu,
            _ => return Err(Error::ContextInvalid),
        };
        if gpu.acquired.is_some() {
            return Ok(());
        }
        let Some(target) = self.target.as_mut() else {
            return Err(Error::NotInitialized);
        };
        let PresentTarget::Surface { surface, .. } = &*target else {
            return Ok(());
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface outdated, reconfiguring.");
                target.configure(&gpu.context, vsync);
                let PresentTarget::Surface { surface, .. } = &*target else {
                    return Ok(());
                };
                surface
                    .get_current_texture()
                    .map_err(|e| surface_error(&gpu.context, e))?
            }
            Err(e) => return Err(surface_error(&gpu.context, e)),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        gpu.acquired = Some((frame, view));
        Ok(())
    }

    /// Records one render pass into the frame encoder.
    fn encode_pass(
        &mut self,
        load: wgpu::LoadOp<wgpu::Color>,
        call: Option<&DrawCall<'_>>,
    ) -> Result<()> {
        if self.render_target.is_none() {
            self.acquire()?;
        }
        let render_target = self.render_target;
        let gpu = match self.gpu.as_mut() {
            Some(gpu) if !gpu.context.is_lost() => gpu,
            _ => return Err(Error::ContextInvalid),
        };
        let Gpu {
            context,
            pipelines,
            textures,
            encoder,
            acquired,
        } = gpu;

        let (view, format, width, height) = match render_target {
            Some(handle) => {
                let texture = textures
                    .get(&handle.0)
                    .ok_or_else(|| Error::ResourceInvalid(format!("unknown render target {handle:?}")))?;
                (&texture.view, texture.storage.format, texture.width, texture.height)
            }
            None => match self.target.as_ref() {
                Some(PresentTarget::Surface { .. }) => {
                    let (frame, view) = acquired.as_ref().ok_or(Error::ContextInvalid)?;
                    let (width, height) = (frame.texture.width(), frame.texture.height());
                    (view, frame.texture.format(), width, height)
                }
                Some(PresentTarget::Offscreen {
                    texture: Some((_, view)),
                    width,
                    height,
                }) => (view, OFFSCREEN_FORMAT, (*width).max(1), (*height).max(1)),
                Some(PresentTarget::Offscreen { texture: None, .. }) => {
                    return Err(Error::ContextInvalid)
                }
                None => return Err(Error::NotInitialized),
            },
        };

        // Resolve everything the pass borrows before it begins.
        let draw = match call {
            Some(call) => {
                let Some(viewport) = clamp_viewport(call.viewport, width, height) else {
                    log::trace!("Draw skipped: viewport does not intersect the target");
                    return Ok(());
                };
                let sampled = match call.texture {
                    Some(binding) => {
                        if Some(binding.handle) == render_target {
                            return Err(Error::InvalidParameter(
                                "cannot sample the texture currently bound as render target"
                                    .to_string(),
                            ));
                        }
                        let texture = textures.get(&binding.handle.0).ok_or_else(|| {
                            Error::ResourceInvalid(format!("unknown texture {:?}", binding.handle))
                        })?;
                        Some((&texture.view, binding.filter, binding.address_mode))
                    }
                    None => None,
                };
                let (filter, address_mode) = sampled
                    .map(|(_, filter, mode)| (filter, mode))
                    .unwrap_or_default();
                let key = PipelineKey {
                    kind: call.kind,
                    blend: call.blend,
                    format,
                };
                pipelines.prepare(&context.device, key, filter, address_mode);
                let bind_group = pipelines
                    .bind_group(&context.device, sampled.map(|(view, _, _)| view), filter, address_mode)
                    .ok_or_else(|| Error::ResourceInvalid("sampler missing".to_string()))?;

                let vertices = gpu_vertices(call);
                let count = vertices.len();
                if count == 0 {
                    return Ok(());
                }
                let buffer = context
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Lumen Vertex Buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                Some((key, count as u32, bind_group, buffer, viewport))
            }
            None => None,
        };

        let encoder = encoder.get_or_insert_with(|| {
            context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Lumen Frame Encoder"),
                })
        });
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Lumen Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        if let Some((key, count, bind_group, buffer, viewport)) = draw {
            let Some(pipeline) = pipelines.pipeline(&key) else {
                return Err(Error::ResourceInvalid("pipeline missing".to_string()));
            };
            let (x, y, w, h) = viewport;
            pass.set_viewport(x, y, w, h, 0.0, 1.0);
            pass.set_scissor_rect(
                x.floor() as u32,
                y.floor() as u32,
                (w.ceil() as u32).max(1),
                (h.ceil() as u32).max(1),
            );
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.set_vertex_buffer(0, buffer.slice(..));
            pass.draw(0..count, 0..1);
        }
        Ok(())
    }
}

fn surface_error(context: &GpuContext, error: wgpu::SurfaceError) -> Error {
    match error {
        wgpu::SurfaceError::Lost => {
            log::warn!("Surface lost; the device must be recreated.");
            context.mark_lost();
            Error::ContextInvalid
        }
        wgpu::SurfaceError::Timeout => {
            Error::ResourceInvalid("timed out acquiring the next surface texture".to_string())
        }
        other => {
            log::error!("Failed to acquire next swap chain texture: {other:?}");
            Error::ContextInvalid
        }
    }
}

/// Fans are expanded here; every other topology is uploaded as is.
fn gpu_vertices(call: &DrawCall<'_>) -> Vec<GpuVertex> {
    let color = [call.color.r, call.color.g, call.color.b, call.color.a];
    let vertices: Vec<GpuVertex> = call
        .vertices
        .iter()
        .map(|v| GpuVertex {
            position: v.position,
            uv: v.uv,
            color,
        })
        .collect();
    match call.kind {
        PrimitiveKind::TriangleFan => fan_to_list(&vertices),
        _ => vertices,
    }
}

/// Intersects `viewport` with the target. `None` if nothing is left.
fn clamp_viewport(viewport: Option<Rect>, width: u32, height: u32) -> Option<(f32, f32, f32, f32)> {
    let (tw, th) = (width as f32, height as f32);
    let Some(v) = viewport else {
        return Some((0.0, 0.0, tw, th));
    };
    let x0 = v.x.max(0.0);
    let y0 = v.y.max(0.0);
    let x1 = (v.x + v.w).min(tw);
    let y1 = (v.y + v.h).min(th);
    (x1 > x0 && y1 > y0).then(|| (x0, y0, x1 - x0, y1 - y0))
}

impl RenderBackend for WgpuBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: self.name.clone(),
            kind: BackendKind::Hardware,
            max_texture_size: self.max_texture_size,
        }
    }

    fn supports_format(&self, _format: PixelFormat) -> bool {
        true
    }

    fn attach_surface(
        &mut self,
        surface: Option<SurfaceHandle>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        if self.shut_down {
            return Err(Error::ContextInvalid);
        }
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.flush();
            gpu.acquired = None;
        }
        let mut target = PresentTarget::new(&self.instance, surface, width, height)?;
        if let Some(gpu) = self.gpu.as_ref() {
            target.configure(&gpu.context, self.vsync);
        }
        log::info!("Presentation target attached ({width}x{height}).");
        self.target = Some(target);
        Ok(())
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.flush();
            gpu.acquired = None;
        }
        let vsync = self.vsync;
        let context = self.gpu.as_ref().map(|gpu| &gpu.context);
        if let Some(target) = self.target.as_mut() {
            target.resize(context, width, height, vsync);
        }
    }

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<DeviceHandle> {
        let max = self.max_texture_size;
        if desc.width == 0 || desc.height == 0 || desc.width > max || desc.height > max {
            return Err(Error::InvalidParameter(format!(
                "texture size {}x{} outside 1..={max}",
                desc.width, desc.height
            )));
        }
        let storage: StorageFormat = desc.format.into_wgpu();
        let gpu = self.gpu_mut()?;
        let mut usage = wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST;
        if desc.render_target {
            usage |= wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC;
        }
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        // Textures are zero-initialized by WGPU.
        let texture = gpu.context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label.as_str()),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: storage.format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.next_handle += 1;
        let id = self.next_handle;
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.textures.insert(
                id,
                GpuTexture {
                    texture,
                    view,
                    width: desc.width,
                    height: desc.height,
                    storage,
                    render_target: desc.render_target,
                },
            );
        }
        log::debug!(
            "WgpuBackend: Created texture '{}' ({}x{} {:?}) with handle {id}",
            desc.label,
            desc.width,
            desc.height,
            desc.format
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
        let gpu = self.gpu_mut()?;
        // Queue writes land before the encoder, so earlier draws go first.
        gpu.flush();
        let texture = gpu
            .textures
            .get(&handle.0)
            .ok_or_else(|| Error::ResourceInvalid(format!("unknown texture {handle:?}")))?;

        let fits = u64::from(region.x) + u64::from(region.width) <= u64::from(texture.width)
            && u64::from(region.y) + u64::from(region.height) <= u64::from(texture.height);
        if !fits {
            return Err(Error::OutOfBounds {
                x: region.x,
                y: region.y,
                width: region.width,
                height: region.height,
                bounds_width: texture.width,
                bounds_height: texture.height,
            });
        }
        if format.buffer_len(region.width, region.height) != Some(pixels.len()) {
            return Err(Error::InvalidParameter(format!(
                "upload of {}x{} {format:?} got {} bytes",
                region.width,
                region.height,
                pixels.len()
            )));
        }
        if region.width == 0 || region.height == 0 {
            return Ok(());
        }

        let expanded;
        let data = if texture.storage.expand {
            expanded = expand_to_rgba8(format, pixels)?;
            expanded.as_slice()
        } else {
            pixels
        };
        gpu.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: region.x,
                    y: region.y,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(region.width * texture.storage.bytes_per_pixel),
                rows_per_image: Some(region.height),
            },
            wgpu::Extent3d {
                width: region.width,
                height: region.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn destroy_texture(&mut self, handle: DeviceHandle) {
        if let Some(gpu) = self.gpu.as_mut() {
            if let Some(texture) = gpu.textures.remove(&handle.0) {
                texture.texture.destroy();
                log::debug!("WgpuBackend: Destroyed texture with handle {}", handle.0);
            }
        }
        if self.render_target == Some(handle) {
            self.render_target = None;
        }
    }

    fn set_render_target(&mut self, target: Option<DeviceHandle>) -> Result<()> {
        let gpu = self.gpu_mut()?;
        if let Some(handle) = target {
            let texture = gpu
                .textures
                .get(&handle.0)
                .ok_or_else(|| Error::ResourceInvalid(format!("unknown texture {handle:?}")))?;
            if !texture.render_target {
                return Err(Error::InvalidParameter(format!(
                    "texture {handle:?} was not created as a render target"
                )));
            }
        }
        self.render_target = target;
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        self.encode_pass(wgpu::LoadOp::Clear(color.into_wgpu()), None)
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        self.encode_pass(wgpu::LoadOp::Load, Some(call))
    }

    fn present(&mut self) -> Result<()> {
        let on_surface = matches!(self.target, Some(PresentTarget::Surface { .. }));
        if on_surface {
            self.acquire()?;
        }
        let gpu = self.gpu_mut()?;
        gpu.flush();
        if let Some((frame, _)) = gpu.acquired.take() {
            frame.present();
        }
        log::trace!("Frame presented.");
        Ok(())
    }

    fn read_pixels(&mut self) -> Result<DecodedImage> {
        let gpu = match self.gpu.as_mut() {
            Some(gpu) if !gpu.context.is_lost() => gpu,
            _ => return Err(Error::ContextInvalid),
        };
        gpu.flush();
        let (texture, width, height, format) = match self.render_target {
            Some(handle) => {
                let texture = gpu
                    .textures
                    .get(&handle.0)
                    .ok_or_else(|| Error::ResourceInvalid(format!("unknown texture {handle:?}")))?;
                (&texture.texture, texture.width, texture.height, texture.storage.format)
            }
            None => match self.target.as_ref() {
                Some(PresentTarget::Offscreen {
                    texture: Some((texture, _)),
                    width,
                    height,
                }) => (texture, (*width).max(1), (*height).max(1), OFFSCREEN_FORMAT),
                Some(PresentTarget::Surface { .. }) => {
                    return Err(Error::UnsupportedFormat(
                        "the window surface cannot be read back".to_string(),
                    ))
                }
                _ => return Err(Error::NotInitialized),
            },
        };
        let swap_red_blue = match format {
            wgpu::TextureFormat::Rgba8Unorm => false,
            wgpu::TextureFormat::Bgra8Unorm => true,
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    "readback of {other:?} targets"
                )))
            }
        };

        let row_len = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_row_len = row_len.div_ceil(align) * align;
        let device = &gpu.context.device;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lumen Readback Buffer"),
            size: u64::from(padded_row_len) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Lumen Readback Encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_len),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        gpu.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        if let Err(e) = device.poll(wgpu::PollType::Wait) {
            log::error!("WgpuBackend: polling for readback failed: {e:?}");
            return Err(Error::ContextInvalid);
        }
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                log::error!("WgpuBackend: readback buffer could not be mapped: {e:?}");
                return Err(Error::ContextInvalid);
            }
            Err(_) => return Err(Error::ContextInvalid),
        }

        let mut pixels = Vec::with_capacity(row_len as usize * height as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded_row_len as usize) {
                pixels.extend_from_slice(&row[..row_len as usize]);
            }
        }
        staging.unmap();
        if swap_red_blue {
            for px in pixels.chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
        Ok(DecodedImage {
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels,
        })
    }

    fn release_device(&mut self) {
        if let Some(target) = self.target.as_mut() {
            target.release();
        }
        if self.gpu.take().is_some() {
            log::warn!("WgpuBackend: device released, every texture handle is now dead.");
        }
        self.render_target = None;
    }

    fn restore_device(&mut self) -> Result<()> {
        if self.shut_down {
            return Err(Error::ContextInvalid);
        }
        if matches!(self.gpu.as_ref(), Some(gpu) if !gpu.context.is_lost()) {
            return Ok(());
        }
        self.release_device();
        let adapter = WgpuAdapterSelector::new(&self.instance).select()?;
        let gpu = Gpu::new(adapter)?;
        if let Some(target) = self.target.as_mut() {
            target.configure(&gpu.context, self.vsync);
        }
        self.max_texture_size = gpu.context.max_texture_size();
        self.gpu = Some(gpu);
        log::info!("WgpuBackend: device restored.");
        Ok(())
    }

    fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        if let Some(gpu) = self.gpu.as_mut() {
            gpu.acquired = None;
            gpu.flush();
        }
        self.gpu = None;
        self.target = None;
        self.render_target = None;
        self.shut_down = true;
        log::info!("WgpuBackend shut down.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_is_clamped_to_target() {
        assert_eq!(clamp_viewport(None, 8, 4), Some((0.0, 0.0, 8.0, 4.0)));
        assert_eq!(
            clamp_viewport(Some(Rect::new(-2.0, 1.0, 6.0, 10.0)), 8, 4),
            Some((0.0, 1.0, 4.0, 3.0))
        );
        assert_eq!(clamp_viewport(Some(Rect::new(9.0, 0.0, 2.0, 2.0)), 8, 4), None);
    }

    #[test]
    fn test_fan_vertices_are_expanded_with_draw_color() {
        let quad = [
            lumen_core::renderer::ClipVertex::default(),
            lumen_core::renderer::ClipVertex::default(),
            lumen_core::renderer::ClipVertex::default(),
            lumen_core::renderer::ClipVertex::default(),
        ];
        let call = DrawCall {
            kind: PrimitiveKind::TriangleFan,
            vertices: &quad,
            texture: None,
            color: Color::RED,
            blend: Default::default(),
            viewport: None,
        };
        let vertices = gpu_vertices(&call);
        assert_eq!(vertices.len(), 6);
        assert!(vertices.iter().all(|v| v.color == [1.0, 0.0, 0.0, 1.0]));
    }
}
