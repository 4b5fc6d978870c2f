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

//! A `winit`-based implementation of the [`WindowBackend`] trait.
//!
//! The event loop is driven with `pump_app_events` and a zero timeout, so the
//! frame loop keeps control of the thread. winit allows one event loop per
//! process, which bounds this backend to one window per process as well.

use lumen_core::platform::{
    CursorImage, Key, MouseButton, PlatformEvent, PumpError, SurfaceHandle, TouchPhase,
    WindowBackend, WindowDescriptor,
};
use lumen_core::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key as WinitKey, NamedKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::platform::scancode::PhysicalKeyExtScancode;
use winit::window::{CursorIcon, CustomCursor, CustomCursorSource, Fullscreen, Window, WindowId};

/// How many pumps `create` waits for the platform to hand out a window.
const CREATE_ATTEMPTS: u32 = 64;
const CREATE_PUMP_TIMEOUT: Duration = Duration::from_millis(5);

/// A native desktop window.
pub struct WinitWindow {
    event_loop: Option<EventLoop<()>>,
    app: WinitApp,
}

impl std::fmt::Debug for WinitWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WinitWindow")
            .field("window", &self.app.window.as_ref().map(|w| w.id()))
            .field("suspended", &self.app.suspended)
            .finish_non_exhaustive()
    }
}

/// State shared with the winit callbacks. Window and cursor creation need an
/// `ActiveEventLoop`, so they happen inside the callbacks.
#[derive(Default)]
struct WinitApp {
    descriptor: Option<WindowDescriptor>,
    window: Option<Arc<Window>>,
    creation_error: Option<String>,
    pending_cursor: Option<CustomCursorSource>,
    events: Vec<PlatformEvent>,
    suspended: bool,
    destroyed: bool,
}

impl WinitApp {
    fn create_window(&mut self, event_loop: &ActiveEventLoop) {
        let Some(desc) = self.descriptor.as_ref() else {
            return;
        };
        let fullscreen = desc.fullscreen.then_some(Fullscreen::Borderless(None));
        let attributes = Window::default_attributes()
            .with_title(desc.title.clone())
            .with_inner_size(PhysicalSize::new(desc.width, desc.height))
            .with_fullscreen(fullscreen)
            .with_visible(true);

        match event_loop.create_window(attributes) {
            Ok(window) => {
                log::info!("Winit window created successfully (id: {:?}).", window.id());
                self.window = Some(Arc::new(window));
            }
            Err(err) => self.creation_error = Some(err.to_string()),
        }
    }
}

impl ApplicationHandler for WinitApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            self.create_window(event_loop);
            return;
        }
        if self.suspended {
            self.suspended = false;
            self.events.push(PlatformEvent::Resumed);
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.suspended = true;
        self.events.push(PlatformEvent::Suspended);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.events.push(PlatformEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::Focused(focused) => self.events.push(PlatformEvent::FocusChanged(focused)),
            WindowEvent::CloseRequested => self.events.push(PlatformEvent::CloseRequested),
            WindowEvent::Destroyed => self.destroyed = true,
            WindowEvent::KeyboardInput { event, .. } => {
                let pressed = event.state == ElementState::Pressed;
                let key = convert_key(&event.logical_key)
                    .unwrap_or_else(|| Key::Other(event.physical_key.to_scancode().unwrap_or(0)));
                self.events.push(PlatformEvent::Key { key, pressed });
                if pressed {
                    if let Some(text) = event.text.as_ref() {
                        self.events.extend(text.chars().map(PlatformEvent::Char));
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => self.events.push(PlatformEvent::MouseMoved {
                x: position.x as f32,
                y: position.y as f32,
            }),
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    winit::event::MouseButton::Left => MouseButton::Left,
                    winit::event::MouseButton::Right => MouseButton::Right,
                    winit::event::MouseButton::Middle => MouseButton::Middle,
                    winit::event::MouseButton::Back => MouseButton::Other(3),
                    winit::event::MouseButton::Forward => MouseButton::Other(4),
                    winit::event::MouseButton::Other(id) => MouseButton::Other(id),
                };
                self.events.push(PlatformEvent::MouseButton {
                    button,
                    pressed: state == ElementState::Pressed,
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (x, y),
                    MouseScrollDelta::PixelDelta(p) => (p.x as f32, p.y as f32),
                };
                self.events.push(PlatformEvent::Scroll { dx, dy });
            }
            WindowEvent::Touch(touch) => {
                let phase = match touch.phase {
                    winit::event::TouchPhase::Started => TouchPhase::Started,
                    winit::event::TouchPhase::Moved => TouchPhase::Moved,
                    winit::event::TouchPhase::Ended => TouchPhase::Ended,
                    winit::event::TouchPhase::Cancelled => TouchPhase::Cancelled,
                };
                self.events.push(PlatformEvent::Touch {
                    id: touch.id,
                    phase,
                    x: touch.location.x as f32,
                    y: touch.location.y as f32,
                });
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if let (Some(source), Some(window)) = (self.pending_cursor.take(), self.window.as_ref()) {
            let cursor: CustomCursor = event_loop.create_custom_cursor(source);
            window.set_cursor(cursor);
        }
    }

    fn memory_warning(&mut self, _event_loop: &ActiveEventLoop) {
        self.events.push(PlatformEvent::LowMemory);
    }
}

fn convert_key(key: &WinitKey) -> Option<Key> {
    Some(match key {
        WinitKey::Named(NamedKey::Escape) => Key::Escape,
        WinitKey::Named(NamedKey::Enter) => Key::Enter,
        WinitKey::Named(NamedKey::Space) => Key::Space,
        WinitKey::Named(NamedKey::Backspace) => Key::Backspace,
        WinitKey::Named(NamedKey::Tab) => Key::Tab,
        WinitKey::Named(NamedKey::ArrowLeft) => Key::Left,
        WinitKey::Named(NamedKey::ArrowRight) => Key::Right,
        WinitKey::Named(NamedKey::ArrowUp) => Key::Up,
        WinitKey::Named(NamedKey::ArrowDown) => Key::Down,
        WinitKey::Character(text) => Key::Character(text.chars().next()?.to_ascii_lowercase()),
        _ => return None,
    })
}

impl WinitWindow {
    /// Prepares a window backend. The native window is opened by
    /// [`WindowBackend::create`].
    pub fn new() -> Self {
        Self {
            event_loop: None,
            app: WinitApp::default(),
        }
    }

    fn pump(&mut self, timeout: Duration) -> Option<i32> {
        let event_loop = self.event_loop.as_mut()?;
        match event_loop.pump_app_events(Some(timeout), &mut self.app) {
            PumpStatus::Continue => None,
            PumpStatus::Exit(code) => Some(code),
        }
    }
}

impl Default for WinitWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowBackend for WinitWindow {
    fn name(&self) -> &str {
        "winit"
    }

    fn create(&mut self, desc: &WindowDescriptor) -> Result<()> {
        if self.event_loop.is_none() {
            let event_loop = EventLoop::new()
                .map_err(|e| Error::WindowCreationFailed(format!("event loop: {e}")))?;
            self.event_loop = Some(event_loop);
        }
        self.app.descriptor = Some(desc.clone());
        self.app.creation_error = None;
        self.app.destroyed = false;

        for _ in 0..CREATE_ATTEMPTS {
            if let Some(code) = self.pump(CREATE_PUMP_TIMEOUT) {
                return Err(Error::WindowCreationFailed(format!(
                    "event loop exited with code {code} before a window was created"
                )));
            }
            if let Some(err) = self.app.creation_error.take() {
                return Err(Error::WindowCreationFailed(err));
            }
            if self.app.window.is_some() {
                // Events produced while opening are not replayed to the frame loop.
                self.app.events.clear();
                return Ok(());
            }
        }
        Err(Error::WindowCreationFailed(
            "the platform did not provide a window".to_string(),
        ))
    }

    fn surface_handle(&self) -> Option<SurfaceHandle> {
        self.app
            .window
            .as_ref()
            .map(|window| window.clone() as SurfaceHandle)
    }

    fn inner_size(&self) -> (u32, u32) {
        self.app
            .window
            .as_ref()
            .map(|w| {
                let size = w.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    fn display_resolution(&self) -> (u32, u32) {
        self.app
            .window
            .as_ref()
            .and_then(|w| w.current_monitor())
            .map(|monitor| {
                let size = monitor.size();
                (size.width, size.height)
            })
            .unwrap_or_else(|| self.inner_size())
    }

    fn pump_events(&mut self, events: &mut Vec<PlatformEvent>) -> std::result::Result<(), PumpError> {
        if let Some(code) = self.pump(Duration::ZERO) {
            return Err(PumpError::Fatal(format!("event loop exited with code {code}")));
        }
        events.append(&mut self.app.events);
        if self.app.destroyed {
            return Err(PumpError::Fatal("native window destroyed".to_string()));
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        if let Some(window) = self.app.window.as_ref() {
            window.set_title(title);
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        let window = self.app.window.as_ref().ok_or(Error::NotInitialized)?;
        window.set_fullscreen(fullscreen.then_some(Fullscreen::Borderless(None)));
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        if let Some(window) = self.app.window.as_ref() {
            window.set_cursor_visible(visible);
        }
    }

    fn set_cursor(&mut self, cursor: Option<&CursorImage>) -> Result<()> {
        let window = self.app.window.as_ref().ok_or(Error::NotInitialized)?;
        let Some(cursor) = cursor else {
            self.app.pending_cursor = None;
            window.set_cursor(CursorIcon::Default);
            return Ok(());
        };
        let dim = |v: u32| {
            u16::try_from(v)
                .map_err(|_| Error::InvalidParameter(format!("cursor dimension {v} is too large")))
        };
        let source = CustomCursor::from_rgba(
            cursor.rgba.clone(),
            dim(cursor.width)?,
            dim(cursor.height)?,
            dim(cursor.hotspot_x)?,
            dim(cursor.hotspot_y)?,
        )
        .map_err(|e| Error::InvalidParameter(format!("invalid cursor image: {e}")))?;
        // Custom cursors are created from inside the event loop on the next pump.
        self.app.pending_cursor = Some(source);
        Ok(())
    }

    fn pre_present(&mut self) {
        if let Some(window) = self.app.window.as_ref() {
            window.pre_present_notify();
        }
    }

    fn destroy(&mut self) {
        if let Some(window) = self.app.window.take() {
            log::info!("Closing winit window (id: {:?})", window.id());
        }
        self.app.pending_cursor = None;
        self.app.events.clear();
    }
}
