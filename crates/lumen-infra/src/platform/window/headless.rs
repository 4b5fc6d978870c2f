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

//! A window backend without a native window.
//!
//! Events are injected through a [`HeadlessControl`], which also exposes what the
//! frame loop did to the window. Used for offscreen rendering and tests.

use lumen_core::platform::{
    CursorImage, PlatformEvent, PumpError, SurfaceHandle, WindowBackend, WindowDescriptor,
};
use lumen_core::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug)]
struct HeadlessState {
    created: bool,
    destroyed: bool,
    fail_create: bool,
    fullscreen_supported: bool,
    title: String,
    size: (u32, u32),
    display: (u32, u32),
    fullscreen: bool,
    cursor_visible: bool,
    cursor: Option<CursorImage>,
    queue: VecDeque<PlatformEvent>,
    pending_error: Option<PumpError>,
    pumps: u64,
    presents: u64,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            created: false,
            destroyed: false,
            fail_create: false,
            fullscreen_supported: true,
            title: String::new(),
            size: (0, 0),
            display: (1920, 1080),
            fullscreen: false,
            cursor_visible: true,
            cursor: None,
            queue: VecDeque::new(),
            pending_error: None,
            pumps: 0,
            presents: 0,
        }
    }
}

/// A window that lives in memory only.
#[derive(Debug, Default)]
pub struct HeadlessWindow {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessWindow {
    /// Creates a headless window backend on a 1920x1080 display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resolution reported for the display.
    pub fn with_display_resolution(self, width: u32, height: u32) -> Self {
        self.state.borrow_mut().display = (width, height);
        self
    }

    /// Returns a control handle for this window.
    pub fn control(&self) -> HeadlessControl {
        HeadlessControl {
            state: self.state.clone(),
        }
    }
}

impl WindowBackend for HeadlessWindow {
    fn name(&self) -> &str {
        "headless"
    }

    fn create(&mut self, desc: &WindowDescriptor) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_create {
            return Err(Error::WindowCreationFailed(
                "headless window creation was refused".to_string(),
            ));
        }
        state.created = true;
        state.destroyed = false;
        state.title = desc.title.clone();
        state.size = (desc.width, desc.height);
        state.fullscreen = desc.fullscreen;
        log::debug!(
            "Headless window '{}' created at {}x{}",
            desc.title,
            desc.width,
            desc.height
        );
        Ok(())
    }

    fn surface_handle(&self) -> Option<SurfaceHandle> {
        None
    }

    fn inner_size(&self) -> (u32, u32) {
        self.state.borrow().size
    }

    fn display_resolution(&self) -> (u32, u32) {
        self.state.borrow().display
    }

    fn pump_events(&mut self, events: &mut Vec<PlatformEvent>) -> std::result::Result<(), PumpError> {
        let mut state = self.state.borrow_mut();
        state.pumps += 1;
        if let Some(err) = state.pending_error.take() {
            return Err(err);
        }
        events.extend(state.queue.drain(..));
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        self.state.borrow_mut().title = title.to_string();
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if fullscreen && !state.fullscreen_supported {
            return Err(Error::InvalidParameter(
                "fullscreen is not supported by this window".to_string(),
            ));
        }
        state.fullscreen = fullscreen;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) {
        self.state.borrow_mut().cursor_visible = visible;
    }

    fn set_cursor(&mut self, cursor: Option<&CursorImage>) -> Result<()> {
        self.state.borrow_mut().cursor = cursor.cloned();
        Ok(())
    }

    fn pre_present(&mut self) {
        self.state.borrow_mut().presents += 1;
    }

    fn destroy(&mut self) {
        let mut state = self.state.borrow_mut();
        state.destroyed = true;
        state.created = false;
        state.queue.clear();
    }
}

/// Drives a [`HeadlessWindow`] from the outside.
#[derive(Debug, Clone)]
pub struct HeadlessControl {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessControl {
    /// Queues an event for the next pump.
    pub fn push_event(&self, event: PlatformEvent) {
        self.state.borrow_mut().queue.push_back(event);
    }

    /// Changes the inner size and queues the matching resize event.
    pub fn resize(&self, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        state.size = (width, height);
        state.queue.push_back(PlatformEvent::Resized { width, height });
    }

    /// Changes the inner size without an event, as a rotation the platform has
    /// not reported yet.
    pub fn set_size_silently(&self, width: u32, height: u32) {
        self.state.borrow_mut().size = (width, height);
    }

    /// Queues a suspend.
    pub fn suspend(&self) {
        self.push_event(PlatformEvent::Suspended);
    }

    /// Queues a resume.
    pub fn resume(&self) {
        self.push_event(PlatformEvent::Resumed);
    }

    /// Queues a close request.
    pub fn request_close(&self) {
        self.push_event(PlatformEvent::CloseRequested);
    }

    /// Makes the next pump fail with `err`.
    pub fn fail_next_pump(&self, err: PumpError) {
        self.state.borrow_mut().pending_error = Some(err);
    }

    /// Makes window creation fail.
    pub fn refuse_creation(&self) {
        self.state.borrow_mut().fail_create = true;
    }

    /// Controls whether fullscreen requests are accepted.
    pub fn set_fullscreen_supported(&self, supported: bool) {
        self.state.borrow_mut().fullscreen_supported = supported;
    }

    /// The current title.
    pub fn title(&self) -> String {
        self.state.borrow().title.clone()
    }

    /// Returns `true` in fullscreen mode.
    pub fn is_fullscreen(&self) -> bool {
        self.state.borrow().fullscreen
    }

    /// Returns `true` while the cursor is visible.
    pub fn is_cursor_visible(&self) -> bool {
        self.state.borrow().cursor_visible
    }

    /// The custom cursor, if one is set.
    pub fn cursor(&self) -> Option<CursorImage> {
        self.state.borrow().cursor.clone()
    }

    /// Number of pumps so far.
    pub fn pump_count(&self) -> u64 {
        self.state.borrow().pumps
    }

    /// Number of `pre_present` notifications so far.
    pub fn present_count(&self) -> u64 {
        self.state.borrow().presents
    }

    /// Returns `true` between creation and destruction.
    pub fn is_open(&self) -> bool {
        self.state.borrow().created
    }

    /// Returns `true` once the window was destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.state.borrow().destroyed
    }
}
