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

//! Instrumented backends shared by the integration tests.

#![allow(dead_code)]

use lumen_core::math::Color;
use lumen_core::platform::{
    CursorImage, PlatformEvent, PumpError, SurfaceHandle, WindowBackend, WindowDescriptor,
};
use lumen_core::renderer::{
    BackendInfo, BackendKind, DeviceHandle, DrawCall, PixelFormat, PrimitiveKind, RenderBackend,
    TextureDescriptor, TextureRegion,
};
use lumen_core::resource::DecodedImage;
use lumen_core::{Error, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

/// A command as seen by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Clear(Color),
    Draw {
        kind: PrimitiveKind,
        positions: Vec<[f32; 4]>,
        textured: bool,
    },
    Present,
    SetTarget(Option<DeviceHandle>),
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub textures: HashMap<u64, (u32, u32, PixelFormat, Vec<u8>)>,
    pub commands: Vec<Command>,
    pub next_handle: u64,
    pub surface: (u32, u32),
    pub target: Option<DeviceHandle>,
    pub last_clear: Option<Color>,
    pub device_lost: bool,
    pub refuse_restore: bool,
    pub releases: usize,
    pub restores: usize,
    pub shut_down: bool,
}

/// Stores textures in memory and records every command.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    pub state: Rc<RefCell<Recorded>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    /// Device pixels of every live texture, in allocation order.
    pub fn texture_pixels(&self) -> Vec<Vec<u8>> {
        let state = self.state.borrow();
        let mut keys: Vec<_> = state.textures.keys().copied().collect();
        keys.sort();
        keys.into_iter().map(|k| state.textures[&k].3.clone()).collect()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.borrow().commands.clone()
    }

    /// Makes every subsequent call fail as if the device was lost.
    pub fn lose_device(&self) {
        self.state.borrow_mut().device_lost = true;
    }
}

impl RenderBackend for RecordingBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            name: "recording".to_string(),
            kind: BackendKind::Software,
            max_texture_size: 1024,
        }
    }

    fn supports_format(&self, format: PixelFormat) -> bool {
        format != PixelFormat::Rgba16Float
    }

    fn attach_surface(&mut self, _surface: Option<SurfaceHandle>, w: u32, h: u32) -> Result<()> {
        self.state.borrow_mut().surface = (w, h);
        Ok(())
    }

    fn resize_surface(&mut self, _width: u32, _height: u32) {}

    fn create_texture(&mut self, desc: &TextureDescriptor) -> Result<DeviceHandle> {
        let mut state = self.state.borrow_mut();
        if state.device_lost {
            return Err(Error::ContextInvalid);
        }
        state.next_handle += 1;
        let id = state.next_handle;
        let len = desc.format.buffer_len(desc.width, desc.height).unwrap_or(0);
        state
            .textures
            .insert(id, (desc.width, desc.height, desc.format, vec![0; len]));
        Ok(DeviceHandle(id))
    }

    fn upload_texture(
        &mut self,
        handle: DeviceHandle,
        region: TextureRegion,
        format: PixelFormat,
        pixels: &[u8],
    ) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.device_lost {
            return Err(Error::ContextInvalid);
        }
        let (width, _, _, data) = state
            .textures
            .get_mut(&handle.0)
            .ok_or_else(|| Error::ResourceInvalid("unknown handle".into()))?;
        let bpp = format.bytes_per_pixel();
        let row = region.width as usize * bpp;
        for (i, src) in pixels.chunks_exact(row).enumerate() {
            let start = ((region.y as usize + i) * *width as usize + region.x as usize) * bpp;
            data[start..start + row].copy_from_slice(src);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, handle: DeviceHandle) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&handle.0);
        if state.target == Some(handle) {
            state.target = None;
        }
    }

    fn set_render_target(&mut self, target: Option<DeviceHandle>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.commands.push(Command::SetTarget(target));
        state.target = target;
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.device_lost {
            return Err(Error::ContextInvalid);
        }
        state.commands.push(Command::Clear(color));
        state.last_clear = Some(color);
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.device_lost {
            return Err(Error::ContextInvalid);
        }
        state.commands.push(Command::Draw {
            kind: call.kind,
            positions: call.vertices.iter().map(|v| v.position).collect(),
            textured: call.texture.is_some(),
        });
        Ok(())
    }

    fn present(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.device_lost {
            return Err(Error::ContextInvalid);
        }
        state.commands.push(Command::Present);
        Ok(())
    }

    /// Render targets read back their stored pixels. The window surface reads back
    /// as the last clear color.
    fn read_pixels(&mut self) -> Result<DecodedImage> {
        let state = self.state.borrow();
        if state.device_lost {
            return Err(Error::ContextInvalid);
        }
        if let Some(handle) = state.target {
            let (width, height, format, pixels) = state
                .textures
                .get(&handle.0)
                .ok_or_else(|| Error::ResourceInvalid("unknown handle".into()))?;
            return Ok(DecodedImage {
                width: *width,
                height: *height,
                format: *format,
                pixels: pixels.clone(),
            });
        }
        let (width, height) = state.surface;
        let rgba = state.last_clear.unwrap_or(Color::TRANSPARENT).to_rgba8();
        Ok(DecodedImage {
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels: rgba.iter().copied().cycle().take(width as usize * height as usize * 4).collect(),
        })
    }

    fn release_device(&mut self) {
        let mut state = self.state.borrow_mut();
        state.textures.clear();
        state.target = None;
        state.releases += 1;
    }

    fn restore_device(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.refuse_restore {
            return Err(Error::ContextInvalid);
        }
        state.device_lost = false;
        state.restores += 1;
        Ok(())
    }

    fn shutdown(&mut self) {
        let mut state = self.state.borrow_mut();
        state.textures.clear();
        state.shut_down = true;
    }
}

/// What the scripted window does on one pump.
#[derive(Debug, Clone)]
pub enum Pump {
    Events(Vec<PlatformEvent>),
    Fail(PumpError),
}

#[derive(Debug, Default)]
pub struct ScriptState {
    pub script: VecDeque<Pump>,
    pub size: (u32, u32),
    pub pumps: usize,
    pub presents: usize,
    pub cursor: Option<CursorImage>,
    pub destroyed: bool,
    pub fail_create: bool,
}

/// A window whose pump replays a script, then reports nothing.
#[derive(Debug, Clone, Default)]
pub struct ScriptedWindow {
    pub state: Rc<RefCell<ScriptState>>,
}

impl ScriptedWindow {
    pub fn new(script: Vec<Pump>) -> Self {
        let window = Self::default();
        window.state.borrow_mut().script = script.into();
        window
    }

    pub fn set_size(&self, width: u32, height: u32) {
        self.state.borrow_mut().size = (width, height);
    }
}

impl WindowBackend for ScriptedWindow {
    fn name(&self) -> &str {
        "scripted"
    }

    fn create(&mut self, desc: &WindowDescriptor) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(Error::WindowCreationFailed("no display".into()));
        }
        state.size = (desc.width, desc.height);
        Ok(())
    }

    fn surface_handle(&self) -> Option<SurfaceHandle> {
        None
    }

    fn inner_size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    fn display_resolution(&self) -> (u32, u32) {
        (1920, 1080)
    }

    fn pump_events(&mut self, events: &mut Vec<PlatformEvent>) -> std::result::Result<(), PumpError> {
        let mut state = self.state.borrow_mut();
        state.pumps += 1;
        match state.script.pop_front() {
            Some(Pump::Events(batch)) => {
                for event in &batch {
                    if let PlatformEvent::Resized { width, height } = *event {
                        state.size = (width, height);
                    }
                }
                events.extend(batch);
                Ok(())
            }
            Some(Pump::Fail(err)) => Err(err),
            None => Ok(()),
        }
    }

    fn set_title(&mut self, _title: &str) {}

    fn set_fullscreen(&mut self, _fullscreen: bool) -> Result<()> {
        Ok(())
    }

    fn set_cursor_visible(&mut self, _visible: bool) {}

    fn set_cursor(&mut self, cursor: Option<&CursorImage>) -> Result<()> {
        self.state.borrow_mut().cursor = cursor.cloned();
        Ok(())
    }

    fn pre_present(&mut self) {
        self.state.borrow_mut().presents += 1;
    }

    fn destroy(&mut self) {
        self.state.borrow_mut().destroyed = true;
    }
}
