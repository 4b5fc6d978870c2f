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

//! Caller-supplied callbacks driven by the [`Window`](super::window::Window).

use super::event::{Key, MouseButton, TouchPhase};
use crate::renderer::RenderSystem;

/// The per-frame callback.
///
/// The render system is passed by reference, never looked up globally.
/// Closures of the matching shape implement the trait.
pub trait UpdateDelegate {
    /// Renders one frame. `elapsed_seconds` is the time since the previous frame.
    ///
    /// Returning `false` ends the main loop after this call. The frame is then not
    /// presented.
    fn on_update(&mut self, elapsed_seconds: f32, render_system: &mut RenderSystem) -> bool;
}

impl<F> UpdateDelegate for F
where
    F: FnMut(f32, &mut RenderSystem) -> bool,
{
    fn on_update(&mut self, elapsed_seconds: f32, render_system: &mut RenderSystem) -> bool {
        self(elapsed_seconds, render_system)
    }
}

/// Application lifecycle notifications. Every method has a no-op default.
pub trait SystemDelegate {
    /// A close was requested. Return `false` to veto when `can_cancel` is `true`.
    fn on_quit(&mut self, can_cancel: bool) -> bool {
        let _ = can_cancel;
        true
    }

    /// The surface was resized.
    fn on_window_size_changed(&mut self, width: u32, height: u32, fullscreen: bool) {
        let _ = (width, height, fullscreen);
    }

    /// Focus changed.
    fn on_window_focus_changed(&mut self, focused: bool) {
        let _ = focused;
    }

    /// The system is low on memory.
    fn on_low_memory_warning(&mut self) {}

    /// The application went to the background.
    fn on_suspend(&mut self) {}

    /// The application came back. Lost textures have been recreated at this point.
    fn on_resume(&mut self) {}
}

/// Input notifications. Every method has a no-op default.
pub trait InputDelegate {
    /// A key was pressed.
    fn on_key_down(&mut self, key: Key) {
        let _ = key;
    }

    /// A key was released.
    fn on_key_up(&mut self, key: Key) {
        let _ = key;
    }

    /// Text input.
    fn on_char(&mut self, c: char) {
        let _ = c;
    }

    /// A mouse button was pressed at `(x, y)`.
    fn on_mouse_down(&mut self, button: MouseButton, x: f32, y: f32) {
        let _ = (button, x, y);
    }

    /// A mouse button was released at `(x, y)`.
    fn on_mouse_up(&mut self, button: MouseButton, x: f32, y: f32) {
        let _ = (button, x, y);
    }

    /// The cursor moved.
    fn on_mouse_move(&mut self, x: f32, y: f32) {
        let _ = (x, y);
    }

    /// Scroll input.
    fn on_scroll(&mut self, dx: f32, dy: f32) {
        let _ = (dx, dy);
    }

    /// A touch contact changed.
    fn on_touch(&mut self, id: u64, phase: TouchPhase, x: f32, y: f32) {
        let _ = (id, phase, x, y);
    }
}
