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

//! Platform abstractions: the window backend contract, platform events,
//! caller delegates and the frame-loop dispatcher.

pub mod backend;
pub mod delegate;
pub mod event;
pub mod timer;
pub mod window;

pub use self::backend::{
    CursorImage, SurfaceHandle, WindowBackend, WindowDescriptor, WindowHandle,
};
pub use self::event::{Key, MouseButton, PlatformEvent, PumpError, TouchPhase};
