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

//! Graphics adapter selection with fallback support.
//!
//! Backends are tried in order of preference (Vulkan, Metal, DX12, then OpenGL).
//! Adapters of CPU type are skipped: a software rasterizer exposed through a
//! graphics API is not a hardware backend, and Lumen has its own.

use lumen_core::{Error, Result};
use std::time::Instant;
use wgpu::{Adapter, Backend, Backends, DeviceType, Instance};

/// Native backends in order of preference.
pub const PREFERRED_BACKENDS: [Backend; 4] =
    [Backend::Vulkan, Backend::Metal, Backend::Dx12, Backend::Gl];

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    #[allow(unreachable_patterns)]
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        _ => "Unknown",
    }
}

fn backend_flags(backend: Backend) -> Backends {
    #[allow(unreachable_patterns)]
    match backend {
        Backend::Vulkan => Backends::VULKAN,
        Backend::Metal => Backends::METAL,
        Backend::Dx12 => Backends::DX12,
        Backend::Gl => Backends::GL,
        Backend::BrowserWebGpu => Backends::BROWSER_WEBGPU,
        _ => Backends::empty(),
    }
}

/// Picks a hardware adapter from a shared instance.
#[derive(Debug)]
pub struct WgpuAdapterSelector<'a> {
    instance: &'a Instance,
    preferred: Vec<Backend>,
}

impl<'a> WgpuAdapterSelector<'a> {
    /// Creates a selector using [`PREFERRED_BACKENDS`].
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            preferred: PREFERRED_BACKENDS.to_vec(),
        }
    }

    /// Replaces the backend preference order.
    pub fn with_preferred_backends(mut self, backends: impl IntoIterator<Item = Backend>) -> Self {
        self.preferred = backends.into_iter().collect();
        self
    }

    /// Returns `true` if `backend` can exist on the current platform.
    pub fn is_backend_supported(backend: Backend) -> bool {
        match backend {
            Backend::Vulkan => cfg!(any(target_os = "windows", target_os = "linux", target_os = "android")),
            Backend::Dx12 => cfg!(target_os = "windows"),
            Backend::Metal => cfg!(any(target_os = "macos", target_os = "ios")),
            Backend::Gl => true,
            _ => false,
        }
    }

    /// Ranks adapters of one backend: discrete before integrated before virtual.
    fn try_backend(&self, backend: Backend) -> Result<Adapter> {
        let mut adapters: Vec<Adapter> = self
            .instance
            .enumerate_adapters(backend_flags(backend))
            .into_iter()
            .filter(|adapter| adapter.get_info().device_type != DeviceType::Cpu)
            .collect();
        adapters.sort_by_key(|adapter| match adapter.get_info().device_type {
            DeviceType::DiscreteGpu => 0,
            DeviceType::IntegratedGpu => 1,
            DeviceType::VirtualGpu => 2,
            _ => 3,
        });
        let adapter = adapters.into_iter().next().ok_or_else(|| {
            Error::BackendUnavailable(format!(
                "no hardware adapter for {}",
                backend_name(backend)
            ))
        })?;
        log::info!(
            "{} backend succeeded with adapter: \"{}\"",
            backend_name(backend),
            adapter.get_info().name
        );
        Ok(adapter)
    }

    /// Returns the first hardware adapter found in preference order.
    ///
    /// # Errors
    /// [`Error::BackendUnavailable`] if every backend failed.
    pub fn select(&self) -> Result<Adapter> {
        let start_time = Instant::now();
        let mut attempted_backends = Vec::new();

        log::info!("Starting WGPU backend selection process...");

        for &backend in &self.preferred {
            if !Self::is_backend_supported(backend) {
                continue;
            }
            attempted_backends.push(backend_name(backend));
            log::info!("Attempting to initialize {} backend...", backend_name(backend));

            match self.try_backend(backend) {
                Ok(adapter) => {
                    let info = adapter.get_info();
                    log::info!(
                        "Successfully selected {} backend with adapter: \"{}\" (Device: {:?}) in {} ms",
                        backend_name(backend),
                        info.name,
                        info.device_type,
                        start_time.elapsed().as_millis()
                    );
                    return Ok(adapter);
                }
                Err(err) => {
                    log::warn!("Failed to initialize {} backend: {err}", backend_name(backend));
                }
            }
        }

        Err(Error::BackendUnavailable(format!(
            "All backend attempts failed. Attempted: {attempted_backends:?}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_names() {
        assert_eq!(backend_name(Backend::Vulkan), "Vulkan");
        assert_eq!(backend_name(Backend::Gl), "OpenGL");
    }

    #[test]
    fn test_gl_is_always_a_candidate() {
        assert!(WgpuAdapterSelector::is_backend_supported(Backend::Gl));
        assert!(!WgpuAdapterSelector::is_backend_supported(Backend::BrowserWebGpu));
    }
}
