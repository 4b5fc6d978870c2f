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

//! The window dispatcher and its main loop.
//!
//! One iteration of the loop is:
//! 1. observe a pending stop request,
//! 2. measure the elapsed time,
//! 3. pump platform events and dispatch them (suspend and resume become context
//!    loss and texture recreation on the render system),
//! 4. call the update delegate,
//! 5. present if the delegate asked to continue.
//!
//! While the window is unfocused or suspended each iteration first sleeps for
//! the inactive frame delay, so a background application does not spin.

use super::backend::{CursorImage, WindowBackend, WindowDescriptor};
use super::delegate::{InputDelegate, SystemDelegate, UpdateDelegate};
use super::event::{PlatformEvent, PumpError};
use super::timer::{FpsCounter, FrameTimer};
use crate::error::{Error, Result};
use crate::renderer::format::expand_to_rgba8;
use crate::renderer::{ContextState, RenderSystem};
use crate::resource::ResourceLoader;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default pause per iteration while the window is unfocused or suspended.
pub const INACTIVE_FRAME_DELAY: Duration = Duration::from_millis(40);

/// A cloneable, thread-safe request to leave the main loop.
///
/// The request is observed at the top of the next iteration. A frame in progress
/// always completes.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Creates a handle with no pending request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the loop to stop.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns `true` if a stop is pending.
    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Consumes a pending request.
    fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

/// Why [`Window::enter_main_loop`] returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// The update delegate returned `false`.
    DelegateFinished,
    /// A [`StopHandle`] or [`Window::terminate_main_loop`] asked to stop.
    StopRequested,
    /// A close request was accepted.
    CloseRequested,
    /// The platform surface was destroyed.
    PlatformTerminated(String),
}

/// Current surface and display geometry, re-derived on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemInfo {
    /// Surface width in physical pixels.
    pub surface_width: u32,
    /// Surface height in physical pixels.
    pub surface_height: u32,
    /// Display width in physical pixels.
    pub display_width: u32,
    /// Display height in physical pixels.
    pub display_height: u32,
}

/// A window driving the frame loop of one render system.
pub struct Window {
    backend: Box<dyn WindowBackend>,
    render_system: Option<Rc<RefCell<RenderSystem>>>,
    resources: Option<Rc<dyn ResourceLoader>>,
    update_delegate: Option<Box<dyn UpdateDelegate>>,
    system_delegate: Option<Box<dyn SystemDelegate>>,
    input_delegate: Option<Box<dyn InputDelegate>>,
    title: String,
    fullscreen: bool,
    focused: bool,
    suspended: bool,
    running: bool,
    created: bool,
    close_accepted: bool,
    cursor_visible: bool,
    cursor_name: Option<String>,
    cursor_position: (f32, f32),
    stop: StopHandle,
    timer: FrameTimer,
    fps: FpsCounter,
    events: Vec<PlatformEvent>,
    update_count: u64,
    inactive_frame_delay: Duration,
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("backend", &self.backend)
            .field("title", &self.title)
            .field("fullscreen", &self.fullscreen)
            .field("focused", &self.focused)
            .field("suspended", &self.suspended)
            .field("running", &self.running)
            .field("has_update_delegate", &self.update_delegate.is_some())
            .field("update_count", &self.update_count)
            .finish_non_exhaustive()
    }
}

impl Window {
    /// Creates the native window through `backend`.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if `width` or `height` is zero.
    /// - [`Error::WindowCreationFailed`] if the backend cannot obtain a surface.
    pub fn create(
        mut backend: Box<dyn WindowBackend>,
        width: u32,
        height: u32,
        fullscreen: bool,
        title: &str,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidParameter(format!(
                "window size must be positive, got {width}x{height}"
            )));
        }
        log::info!(
            "Creating window with title: '{}', size {}x{}, fullscreen {} on backend '{}'",
            title,
            width,
            height,
            fullscreen,
            backend.name()
        );
        backend.create(&WindowDescriptor {
            title: title.to_string(),
            width,
            height,
            fullscreen,
        })?;

        Ok(Self {
            backend,
            render_system: None,
            resources: None,
            update_delegate: None,
            system_delegate: None,
            input_delegate: None,
            title: title.to_string(),
            fullscreen,
            focused: true,
            suspended: false,
            running: false,
            created: true,
            close_accepted: false,
            cursor_visible: true,
            cursor_name: None,
            cursor_position: (0.0, 0.0),
            stop: StopHandle::new(),
            timer: FrameTimer::new(),
            fps: FpsCounter::default(),
            events: Vec::new(),
            update_count: 0,
            inactive_frame_delay: INACTIVE_FRAME_DELAY,
        })
    }

    fn ensure_created(&self) -> Result<()> {
        if self.created {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Attaches the render system frames are presented through, and binds it to
    /// this window's surface.
    pub fn attach_render_system(&mut self, render_system: Rc<RefCell<RenderSystem>>) -> Result<()> {
        self.ensure_created()?;
        let (width, height) = self.backend.inner_size();
        render_system
            .borrow_mut()
            .attach_surface(self.backend.surface_handle(), width, height)?;
        if self.resources.is_none() {
            self.resources = render_system.borrow().resources();
        }
        self.render_system = Some(render_system);
        Ok(())
    }

    /// Detaches and returns the render system.
    pub fn detach_render_system(&mut self) -> Option<Rc<RefCell<RenderSystem>>> {
        self.render_system.take()
    }

    /// The attached render system.
    pub fn render_system(&self) -> Option<Rc<RefCell<RenderSystem>>> {
        self.render_system.clone()
    }

    /// Sets the loader cursors are resolved through.
    pub fn set_resource_loader(&mut self, resources: Option<Rc<dyn ResourceLoader>>) {
        self.resources = resources;
    }

    // --- Delegates ---

    /// Replaces the update delegate and returns the previous one.
    ///
    /// With `None` the loop keeps pumping events but renders and presents nothing.
    pub fn set_update_delegate(
        &mut self,
        delegate: Option<Box<dyn UpdateDelegate>>,
    ) -> Option<Box<dyn UpdateDelegate>> {
        std::mem::replace(&mut self.update_delegate, delegate)
    }

    /// Returns `true` if an update delegate is attached.
    pub fn has_update_delegate(&self) -> bool {
        self.update_delegate.is_some()
    }

    /// Replaces the system delegate and returns the previous one.
    pub fn set_system_delegate(
        &mut self,
        delegate: Option<Box<dyn SystemDelegate>>,
    ) -> Option<Box<dyn SystemDelegate>> {
        std::mem::replace(&mut self.system_delegate, delegate)
    }

    /// Replaces the input delegate and returns the previous one.
    pub fn set_input_delegate(
        &mut self,
        delegate: Option<Box<dyn InputDelegate>>,
    ) -> Option<Box<dyn InputDelegate>> {
        std::mem::replace(&mut self.input_delegate, delegate)
    }

    // --- Cursor ---

    /// Sets the cursor to the named image resource. `None` restores the system
    /// cursor.
    ///
    /// # Errors
    /// [`Error::ResourceNotFound`] if the name does not resolve, or no resource
    /// loader is available.
    pub fn set_cursor_filename(&mut self, name: Option<&str>) -> Result<()> {
        self.ensure_created()?;
        let Some(name) = name else {
            self.backend.set_cursor(None)?;
            self.cursor_name = None;
            return Ok(());
        };

        let resources = self.resources.as_ref().ok_or_else(|| {
            Error::ResourceNotFound(format!("{name} (no resource loader configured)"))
        })?;
        let image = resources.load_image(name)?;
        let cursor = CursorImage {
            width: image.width,
            height: image.height,
            hotspot_x: 0,
            hotspot_y: 0,
            rgba: expand_to_rgba8(image.format, &image.pixels)?,
        };
        self.backend.set_cursor(Some(&cursor))?;
        log::debug!("Cursor set to '{name}'");
        self.cursor_name = Some(name.to_string());
        Ok(())
    }

    /// The name of the custom cursor, if one is set.
    pub fn cursor_filename(&self) -> Option<&str> {
        self.cursor_name.as_deref()
    }

    /// Shows or hides the cursor.
    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor_visible = visible;
        self.backend.set_cursor_visible(visible);
    }

    /// Returns `true` if the cursor is visible.
    pub fn is_cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    /// The last cursor position reported by the platform.
    pub fn cursor_position(&self) -> (f32, f32) {
        self.cursor_position
    }

    // --- Window state ---

    /// The title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Sets the title.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.backend.set_title(title);
    }

    /// Returns `true` in fullscreen mode.
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Switches between fullscreen and windowed mode.
    pub fn set_fullscreen(&mut self, fullscreen: bool) -> Result<()> {
        self.ensure_created()?;
        self.backend.set_fullscreen(fullscreen)?;
        self.fullscreen = fullscreen;
        Ok(())
    }

    /// Returns `true` while the window has focus.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Returns `true` while the application is in the background.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Returns `true` while [`enter_main_loop`](Self::enter_main_loop) runs.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current inner size, queried from the backend.
    pub fn size(&self) -> (u32, u32) {
        self.backend.inner_size()
    }

    /// Width over height of the current surface.
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = self.size();
        if h == 0 {
            return 1.0;
        }
        w as f32 / h as f32
    }

    /// Current surface and display geometry. Never cached.
    pub fn system_info(&self) -> SystemInfo {
        let (surface_width, surface_height) = self.backend.inner_size();
        let (display_width, display_height) = self.backend.display_resolution();
        SystemInfo {
            surface_width,
            surface_height,
            display_width,
            display_height,
        }
    }

    /// The last frames-per-second figure.
    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }

    /// How many times the update delegate has been called.
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// The pause per iteration while unfocused or suspended.
    pub fn inactive_frame_delay(&self) -> Duration {
        self.inactive_frame_delay
    }

    /// Replaces the pause per iteration while unfocused or suspended. Zero
    /// disables it.
    pub fn set_inactive_frame_delay(&mut self, delay: Duration) {
        self.inactive_frame_delay = delay;
    }

    /// A handle that stops the main loop, usable from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Asks the main loop to stop at the top of its next iteration.
    pub fn terminate_main_loop(&mut self) {
        self.stop.request_stop();
    }

    // --- Main loop ---

    /// Runs frames until the delegate returns `false`, a stop is requested, a close
    /// is accepted, or the platform surface is destroyed.
    ///
    /// # Errors
    /// [`Error::NotInitialized`] if the window was destroyed or has no render system.
    pub fn enter_main_loop(&mut self) -> Result<LoopExit> {
        self.ensure_created()?;
        if self.render_system.is_none() {
            return Err(Error::NotInitialized);
        }

        log::info!("Entering main loop of window '{}'", self.title);
        self.running = true;
        self.close_accepted = false;
        self.timer.reset();

        let exit = loop {
            if self.stop.take() {
                break LoopExit::StopRequested;
            }
            match self.run_iteration() {
                Ok(None) => continue,
                Ok(Some(exit)) => break exit,
                Err(err) => {
                    self.running = false;
                    return Err(err);
                }
            }
        };

        self.running = false;
        log::info!(
            "Main loop exited ({:?}) after {} updates",
            exit,
            self.update_count
        );
        Ok(exit)
    }

    /// Runs a single iteration outside [`enter_main_loop`](Self::enter_main_loop).
    ///
    /// Returns `false` once the loop would have ended.
    pub fn update_one_frame(&mut self) -> Result<bool> {
        self.ensure_created()?;
        if self.stop.take() {
            return Ok(false);
        }
        Ok(self.run_iteration()?.is_none())
    }

    fn run_iteration(&mut self) -> Result<Option<LoopExit>> {
        let render_system = self.render_system.clone().ok_or(Error::NotInitialized)?;

        let mut elapsed = self.timer.tick();
        if !self.focused {
            elapsed = 0.0;
        }

        let mut events = std::mem::take(&mut self.events);
        events.clear();
        match self.backend.pump_events(&mut events) {
            Ok(()) => {}
            Err(PumpError::Recoverable(msg)) => {
                log::warn!("Recoverable platform error: {msg}");
            }
            Err(PumpError::Fatal(msg)) => {
                log::error!("Platform surface lost, leaving main loop: {msg}");
                self.events = events;
                return Ok(Some(LoopExit::PlatformTerminated(msg)));
            }
        }
        for event in &events {
            self.dispatch_event(event, &render_system);
        }
        self.events = events;

        if self.close_accepted {
            return Ok(Some(LoopExit::CloseRequested));
        }
        if (self.suspended || !self.focused) && !self.inactive_frame_delay.is_zero() {
            std::thread::sleep(self.inactive_frame_delay);
        }
        if self.suspended {
            return Ok(None);
        }

        if render_system.borrow().context_state() == ContextState::Lost {
            self.recover(&render_system);
        }

        let Some(delegate) = self.update_delegate.as_mut() else {
            return Ok(None);
        };
        let keep_running = delegate.on_update(elapsed, &mut render_system.borrow_mut());
        self.update_count += 1;
        if !keep_running {
            return Ok(Some(LoopExit::DelegateFinished));
        }

        self.backend.pre_present();
        if let Err(err) = render_system.borrow_mut().present() {
            if err.is_recoverable() {
                log::warn!("Frame not presented: {err}");
            } else {
                log::error!("Frame not presented: {err}");
            }
        }
        self.fps.frame(elapsed);
        Ok(None)
    }

    fn recover(&mut self, render_system: &Rc<RefCell<RenderSystem>>) {
        match render_system.borrow_mut().recreate_textures() {
            Ok(report) if report.is_complete() => {}
            Ok(report) => log::warn!(
                "{} textures could not be restored and must be recreated",
                report.failed.len()
            ),
            Err(err) => log::warn!("Context recovery failed, retrying next frame: {err}"),
        }
    }

    fn dispatch_event(&mut self, event: &PlatformEvent, render_system: &Rc<RefCell<RenderSystem>>) {
        log::trace!("Platform event: {event:?}");
        match *event {
            PlatformEvent::Resized { width, height } => {
                if let Err(err) = render_system.borrow_mut().resize(width, height) {
                    log::warn!("Resize to {width}x{height} failed: {err}");
                }
                let fullscreen = self.fullscreen;
                if let Some(delegate) = self.system_delegate.as_mut() {
                    delegate.on_window_size_changed(width, height, fullscreen);
                }
            }
            PlatformEvent::FocusChanged(focused) => {
                self.focused = focused;
                if let Some(delegate) = self.system_delegate.as_mut() {
                    delegate.on_window_focus_changed(focused);
                }
            }
            PlatformEvent::Suspended => {
                if self.suspended {
                    return;
                }
                log::info!("Application suspended");
                self.suspended = true;
                if let Err(err) = render_system.borrow_mut().notify_context_lost() {
                    log::warn!("Could not mark the render context lost: {err}");
                }
                if let Some(delegate) = self.system_delegate.as_mut() {
                    delegate.on_suspend();
                }
            }
            PlatformEvent::Resumed => {
                if !self.suspended {
                    return;
                }
                log::info!("Application resumed");
                self.suspended = false;
                let (width, height) = self.backend.inner_size();
                if let Err(err) = render_system.borrow_mut().attach_surface(
                    self.backend.surface_handle(),
                    width,
                    height,
                ) {
                    log::warn!("Could not reattach the surface: {err}");
                }
                self.recover(render_system);
                self.timer.reset();
                if let Some(delegate) = self.system_delegate.as_mut() {
                    delegate.on_resume();
                }
            }
            PlatformEvent::ContextLost => {
                if let Err(err) = render_system.borrow_mut().notify_context_lost() {
                    log::warn!("Could not mark the render context lost: {err}");
                }
            }
            PlatformEvent::CloseRequested => {
                let accepted = self
                    .system_delegate
                    .as_mut()
                    .map_or(true, |delegate| delegate.on_quit(true));
                if accepted {
                    self.close_accepted = true;
                } else {
                    log::info!("Close request vetoed by the system delegate");
                }
            }
            PlatformEvent::LowMemory => {
                if let Some(delegate) = self.system_delegate.as_mut() {
                    delegate.on_low_memory_warning();
                }
            }
            PlatformEvent::MouseMoved { x, y } => {
                self.cursor_position = (x, y);
                if let Some(delegate) = self.input_delegate.as_mut() {
                    delegate.on_mouse_move(x, y);
                }
            }
            _ => self.dispatch_input(event),
        }
    }

    fn dispatch_input(&mut self, event: &PlatformEvent) {
        let (x, y) = self.cursor_position;
        let Some(delegate) = self.input_delegate.as_mut() else {
            return;
        };
        match *event {
            PlatformEvent::Key { key, pressed: true } => delegate.on_key_down(key),
            PlatformEvent::Key { key, pressed: false } => delegate.on_key_up(key),
            PlatformEvent::Char(c) => delegate.on_char(c),
            PlatformEvent::MouseButton {
                button,
                pressed: true,
            } => delegate.on_mouse_down(button, x, y),
            PlatformEvent::MouseButton {
                button,
                pressed: false,
            } => delegate.on_mouse_up(button, x, y),
            PlatformEvent::Scroll { dx, dy } => delegate.on_scroll(dx, dy),
            PlatformEvent::Touch { id, phase, x, y } => delegate.on_touch(id, phase, x, y),
            _ => {}
        }
    }

    /// Stops the loop, detaches every delegate and the render system, then closes
    /// the native window. Idempotent.
    ///
    /// Delegates are dropped while the render system is still alive, so textures
    /// they own release their device handles normally.
    pub fn destroy(&mut self) {
        if !self.created {
            return;
        }
        self.stop.request_stop();
        self.running = false;
        self.update_delegate = None;
        self.system_delegate = None;
        self.input_delegate = None;
        self.render_system = None;
        self.backend.destroy();
        self.created = false;
        log::info!("Window '{}' destroyed", self.title);
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        self.destroy();
    }
}
