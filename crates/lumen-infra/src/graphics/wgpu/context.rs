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

//! The device connection and the presentation target.

use lumen_core::platform::SurfaceHandle;
use lumen_core::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use wgpu::{Adapter, Instance};

/// Holds the core WGPU state objects required for rendering.
#[derive(Debug)]
pub(crate) struct GpuContext {
    pub(crate) adapter: Adapter,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    /// Creates the logical device and command queue on `adapter`.
    pub(crate) fn new(adapter: Adapter) -> Result<Self> {
        let info = adapter.get_info();
        log::info!(
            "Using graphics adapter: \"{}\" (Backend: {:?})",
            info.name,
            info.backend
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("Lumen Logical Device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|e| Error::BackendUnavailable(format!("Failed to create logical device: {e}")))?;
        log::info!("Logical device and command queue created.");

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("WGPU Uncaptured Error: {e:?}");
        }));

        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("WGPU device lost ({reason:?}): {message}");
            flag.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            adapter,
            device,
            queue,
            lost,
        })
    }

    /// Returns `true` once the device-lost callback fired.
    pub(crate) fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    /// Flags the device lost, as reported by a surface.
    pub(crate) fn mark_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
    }

    pub(crate) fn max_texture_size(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }
}

/// Where frames go when no render target is bound.
#[derive(Debug)]
pub(crate) enum PresentTarget {
    /// A window surface.
    Surface {
        surface: wgpu::Surface<'static>,
        config: Option<wgpu::SurfaceConfiguration>,
        width: u32,
        height: u32,
    },
    /// An offscreen color texture, for windows without a native handle.
    Offscreen {
        texture: Option<(wgpu::Texture, wgpu::TextureView)>,
        width: u32,
        height: u32,
    },
}

pub(crate) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

impl PresentTarget {
    pub(crate) fn new(instance: &Instance, handle: Option<SurfaceHandle>, width: u32, height: u32) -> Result<Self> {
        match handle {
            Some(handle) => {
                let surface = instance
                    .create_surface(handle)
                    .map_err(|e| Error::WindowCreationFailed(format!("Failed to create surface: {e}")))?;
                log::debug!("WGPU surface created for the window.");
                Ok(Self::Surface {
                    surface,
                    config: None,
                    width,
                    height,
                })
            }
            None => Ok(Self::Offscreen {
                texture: None,
                width,
                height,
            }),
        }
    }

    /// (Re)creates the device-side objects of the target on `context`.
    pub(crate) fn configure(&mut self, context: &GpuContext, vsync: bool) {
        match self {
            Self::Surface {
                surface,
                config,
                width,
                height,
            } => {
                let caps = surface.get_capabilities(&context.adapter);
                let Some(&first_format) = caps.formats.first() else {
                    log::error!("Surface reports no supported formats for this adapter");
                    *config = None;
                    return;
                };
                let format = caps
                    .formats
                    .iter()
                    .copied()
                    .find(|f| !f.is_srgb())
                    .unwrap_or(first_format);
                let present_mode = if vsync {
                    wgpu::PresentMode::Fifo
                } else {
                    caps.present_modes
                        .iter()
                        .copied()
                        .find(|m| *m == wgpu::PresentMode::Mailbox)
                        .unwrap_or(wgpu::PresentMode::Fifo) // Fifo is guaranteed to be supported
                };
                let surface_config = wgpu::SurfaceConfiguration {
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    format,
                    width: (*width).max(1),
                    height: (*height).max(1),
                    present_mode,
                    alpha_mode: caps
                        .alpha_modes
                        .first()
                        .copied()
                        .unwrap_or(wgpu::CompositeAlphaMode::Auto),
                    view_formats: vec![],
                    desired_maximum_frame_latency: 2,
                };
                surface.configure(&context.device, &surface_config);
                *config = Some(surface_config);
            }
            Self::Offscreen {
                texture,
                width,
                height,
            } => {
                let color = context.device.create_texture(&wgpu::TextureDescriptor {
                    label: Some("Lumen Offscreen Target"),
                    size: wgpu::Extent3d {
                        width: (*width).max(1),
                        height: (*height).max(1),
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: OFFSCREEN_FORMAT,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                    view_formats: &[],
                });
                let view = color.create_view(&wgpu::TextureViewDescriptor::default());
                *texture = Some((color, view));
            }
        }
    }

    /// Drops the device-side objects after a loss.
    pub(crate) fn release(&mut self) {
        match self {
            Self::Surface { config, .. } => *config = None,
            Self::Offscreen { texture, .. } => *texture = None,
        }
    }

    pub(crate) fn resize(&mut self, context: Option<&GpuContext>, new_width: u32, new_height: u32, vsync: bool) {
        if new_width == 0 || new_height == 0 {
            log::warn!("Ignoring resize request to zero dimensions: {new_width}x{new_height}");
            return;
        }
        match self {
            Self::Surface { width, height, .. } | Self::Offscreen { width, height, .. } => {
                *width = new_width;
                *height = new_height;
            }
        }
        if let Some(context) = context {
            log::info!("Resizing presentation target to {new_width}x{new_height}");
            self.configure(context, vsync);
        }
    }

    pub(crate) fn size(&self) -> (u32, u32) {
        match self {
            Self::Surface { width, height, .. } | Self::Offscreen { width, height, .. } => {
                ((*width).max(1), (*height).max(1))
            }
        }
    }

    pub(crate) fn format(&self) -> Option<wgpu::TextureFormat> {
        match self {
            Self::Surface { config, .. } => config.as_ref().map(|c| c.format),
            Self::Offscreen { texture, .. } => texture.as_ref().map(|_| OFFSCREEN_FORMAT),
        }
    }
}
