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

//! Render pipelines, samplers and the fallback texture used by the draw path.

use super::conversions::IntoWgpu;
use lumen_core::renderer::{AddressMode, BlendMode, Filter, PrimitiveKind};
use std::collections::HashMap;

/// The vertex layout consumed by `shader.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct GpuVertex {
    pub(crate) position: [f32; 4],
    pub(crate) uv: [f32; 2],
    pub(crate) color: [f32; 4],
}

impl GpuVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x2, 2 => Float32x4];

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<GpuVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Everything that selects a distinct pipeline object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub(crate) kind: PrimitiveKind,
    pub(crate) blend: BlendMode,
    pub(crate) format: wgpu::TextureFormat,
}

/// Device objects shared by every draw, created once per device.
#[derive(Debug)]
pub(crate) struct Pipelines {
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    layout: wgpu::PipelineLayout,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    samplers: HashMap<(Filter, AddressMode), wgpu::Sampler>,
    white: wgpu::TextureView,
}

impl Pipelines {
    pub(crate) fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lumen Primitive Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Lumen Texture Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Lumen Primitive Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Untextured draws sample this, so one shader covers both cases.
        let white_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Lumen White Texel"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &white_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[255; 4],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        let white = white_texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("Primitive shader and pipeline layout created.");
        Self {
            shader,
            bind_group_layout,
            layout,
            pipelines: HashMap::new(),
            samplers: HashMap::new(),
            white,
        }
    }

    /// Creates the pipeline and sampler a draw needs, if not cached yet.
    pub(crate) fn prepare(
        &mut self,
        device: &wgpu::Device,
        key: PipelineKey,
        filter: Filter,
        address_mode: AddressMode,
    ) {
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(device, key);
            self.pipelines.insert(key, pipeline);
        }
        self.samplers.entry((filter, address_mode)).or_insert_with(|| {
            let address: wgpu::AddressMode = address_mode.into_wgpu();
            let mode: wgpu::FilterMode = filter.into_wgpu();
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some("Lumen Sampler"),
                address_mode_u: address,
                address_mode_v: address,
                address_mode_w: address,
                mag_filter: mode,
                min_filter: mode,
                mipmap_filter: wgpu::FilterMode::Nearest,
                ..Default::default()
            })
        });
    }

    pub(crate) fn pipeline(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    pub(crate) fn bind_group(
        &self,
        device: &wgpu::Device,
        view: Option<&wgpu::TextureView>,
        filter: Filter,
        address_mode: AddressMode,
    ) -> Option<wgpu::BindGroup> {
        let sampler = self.samplers.get(&(filter, address_mode))?;
        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Lumen Texture Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view.unwrap_or(&self.white)),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }))
    }

    fn create_pipeline(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        log::debug!(
            "Creating render pipeline for {:?} / {:?} / {:?}",
            key.kind,
            key.blend,
            key.format
        );
        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Lumen Primitive Pipeline"),
            layout: Some(&self.layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: key.blend.into_wgpu(),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: key.kind.into_wgpu(),
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }
}

/// Expands a fan into an equivalent triangle list.
pub(crate) fn fan_to_list<T: Copy>(vertices: &[T]) -> Vec<T> {
    let Some((&hub, rest)) = vertices.split_first() else {
        return Vec::new();
    };
    rest.windows(2)
        .flat_map(|pair| [hub, pair[0], pair[1]])
        .collect()
}
