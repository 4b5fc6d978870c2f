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

//! # Lumen Infra
//!
//! Concrete implementations of the `lumen-core` contracts: render backends,
//! window backends and resource loaders.

pub mod graphics;
pub mod platform;
pub mod resources;

pub use graphics::software::{SoftwareBackend, SoftwareProbe};
#[cfg(feature = "hardware")]
pub use graphics::wgpu::WgpuBackend;
pub use platform::window::headless::{HeadlessControl, HeadlessWindow};
#[cfg(feature = "native-window")]
pub use platform::window::winit::WinitWindow;
pub use resources::filesystem::FileSystemResources;
