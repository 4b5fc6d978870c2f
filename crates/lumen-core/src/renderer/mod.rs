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

//! The rendering contract: the backend trait, the render system dispatcher and
//! the texture lifecycle.

pub mod backend;
pub mod format;
pub mod primitive;
pub mod render_system;
pub mod state;
pub mod texture;

pub use self::backend::{
    BackendInfo, BackendKind, DeviceHandle, DrawCall, RenderBackend, TextureBinding,
    TextureDescriptor, TextureRegion,
};
pub use self::format::PixelFormat;
pub use self::primitive::{ClipVertex, PrimitiveKind, TexturedVertex};
pub use self::render_system::{RecreateReport, RenderSystem};
pub use self::state::{BlendMode, ContextState};
pub use self::texture::{AddressMode, Filter, Texture, TextureKey, TextureSource, TextureType};
