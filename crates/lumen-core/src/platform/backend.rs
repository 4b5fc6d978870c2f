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

//! The contract every windowing backend implements.

use super::event::{PlatformEvent, PumpError};
use crate::error::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::sync::Arc;

/// Combines the windowing handle traits graphics backends need to create a surface.
pub trait WindowHandle: HasWindowHandle + HasDisplayHandle {}

impl<T: HasWindowHandle + HasDisplayHandle> WindowHandle for T {}

/// A shareable handle to a native window, handed to render backends.
pub type SurfaceHandle = Arc<dyn WindowHandle + Send + Sync>;

/// Geometry and mode of a window to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    /// Window title. May be empty.
    pub title: String,
    /// Inner width in physical pixels.
    pub width: u32,
    /// Inner height in physical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
}

/// A decoded cursor image, RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Hotspot x.
    pub hotspot_x: u32,
    /// Hotspot y.
    pub hotspot_y: u32,
    /// RGBA8 pixels, tightly packed.
    pub rgba: Vec<u8>,
}

/// A native window and its event pump.
///
/// Implementations never block: [`pump_events`](Self::pump_events) drains what is
/// pending and returns.
pub trait WindowBackend: std::fmt::Debug {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Creates the native window.
    ///
    /// # Errors
    /// [`Error::WindowCreationFailed`](crate::Error::WindowCreationFailed) if no
    /// surface can be obtained.
    fn create(&mut self, desc: &WindowDescriptor) -> Result<()>;

    /// The native handle for surface creation, or `None` for windows without one.
    fn surface_handle(&self) -> Option<SurfaceHandle>;

    /// Current inner size in physical pixels.
    fn inner_size(&self) -> (u32, u32);

    /// Resolution of the display the window lives on.
    fn display_resolution(&self) -> (u32, u32);

    /// Appends pending events to `events` without blocking.
    fn pump_events(&mut self, events: &mut Vec<PlatformEvent>) -> std::result::Result<(), PumpError>;

    /// Sets the title.
    fn set_title(&mut self, title: &str);

    /// Switches between fullscreen and windowed mode.
    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()>;

    /// Shows or hides the cursor.
    fn set_cursor_visible(&mut self, visible: bool);

    /// Sets a custom cursor, or restores the system cursor with `None`.
    fn set_cursor(&mut self, cursor: Option<&CursorImage>) -> Result<()>;

    /// Called right before the render system presents a frame.
    fn pre_present(&mut self) {}

    /// Closes the native window.
    fn destroy(&mut self);
}
