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

//! A CPU rasterizer implementing [`RenderBackend`](lumen_core::renderer::RenderBackend).
//!
//! Used when no GPU is available and by tests, which inspect the framebuffer and
//! allocations through a [`SoftwareProbe`]. The framebuffer is RGBA8 and is not
//! presented to the native window.

mod device;
mod raster;

pub use self::device::{SoftwareBackend, SoftwareProbe};
