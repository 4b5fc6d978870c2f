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

//! A hardware render backend on `wgpu`.
//!
//! Adapter selection tries native backends in order of preference and falls
//! back to the next one when an adapter cannot be obtained. Device loss is
//! detected through the device-lost callback and `SurfaceError::Lost`, and is
//! reported to the render system as `Error::ContextInvalid`.

mod context;
mod conversions;
mod device;
mod pipeline;
mod selector;

pub use self::device::WgpuBackend;
pub use self::selector::{backend_name, WgpuAdapterSelector, PREFERRED_BACKENDS};
