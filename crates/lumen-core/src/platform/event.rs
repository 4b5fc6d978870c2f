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

//! Events produced by a window backend's pump.

use thiserror::Error;

/// A keyboard key, reduced to what the frame loop and delegates distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Escape.
    Escape,
    /// Enter / Return.
    Enter,
    /// Space bar.
    Space,
    /// Backspace.
    Backspace,
    /// Tab.
    Tab,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// A key producing a printable character, lowercased.
    Character(char),
    /// Any other key, by platform scan code.
    Other(u32),
}

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Wheel button.
    Middle,
    /// Any other button.
    Other(u16),
}

/// Phase of a touch contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// The contact started.
    Started,
    /// The contact moved.
    Moved,
    /// The contact ended.
    Ended,
    /// The platform cancelled the contact.
    Cancelled,
}

/// A platform event, already translated from the native representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformEvent {
    /// The inner size changed.
    Resized {
        /// New width in physical pixels.
        width: u32,
        /// New height in physical pixels.
        height: u32,
    },
    /// The window gained (`true`) or lost (`false`) focus.
    FocusChanged(bool),
    /// The application was sent to the background. Graphics contexts die here on
    /// mobile platforms.
    Suspended,
    /// The application came back to the foreground.
    Resumed,
    /// The graphics device or surface was lost while the application kept running.
    ContextLost,
    /// The user or the system asked the window to close.
    CloseRequested,
    /// The system is running low on memory.
    LowMemory,
    /// A key was pressed or released.
    Key {
        /// The key.
        key: Key,
        /// `true` on press.
        pressed: bool,
    },
    /// Text input.
    Char(char),
    /// A mouse button was pressed or released.
    MouseButton {
        /// The button.
        button: MouseButton,
        /// `true` on press.
        pressed: bool,
    },
    /// The cursor moved, in physical pixels relative to the window.
    MouseMoved {
        /// Cursor x.
        x: f32,
        /// Cursor y.
        y: f32,
    },
    /// Wheel or trackpad scroll.
    Scroll {
        /// Horizontal delta.
        dx: f32,
        /// Vertical delta.
        dy: f32,
    },
    /// A touch contact changed.
    Touch {
        /// Contact identifier.
        id: u64,
        /// Phase.
        phase: TouchPhase,
        /// Contact x.
        x: f32,
        /// Contact y.
        y: f32,
    },
}

/// A failure of the event pump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PumpError {
    /// Transient. The frame loop logs it and continues.
    #[error("Recoverable platform error: {0}")]
    Recoverable(String),
    /// The surface is gone. The frame loop terminates.
    #[error("Unrecoverable platform error: {0}")]
    Fatal(String),
}
