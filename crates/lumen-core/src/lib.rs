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

//! # Lumen Core
//!
//! Foundational crate containing the render and window contracts, the texture
//! lifecycle model, and the dispatchers that sit between client code and a
//! concrete backend.
//!
//! Concrete backends (GPU, software rasterizer, native windows) live in
//! `lumen-infra`. Backend selection and process lifecycle live in `lumen-sdk`.

#![warn(missing_docs)]

pub mod error;
pub mod math;
pub mod platform;
pub mod renderer;
pub mod resource;

pub use error::{Error, Result};
pub use platform::{
    delegate::{InputDelegate, SystemDelegate, UpdateDelegate},
    window::{LoopExit, StopHandle, SystemInfo, Window, INACTIVE_FRAME_DELAY},
};
pub use renderer::{
    render_system::{RecreateReport, RenderSystem},
    texture::Texture,
};
