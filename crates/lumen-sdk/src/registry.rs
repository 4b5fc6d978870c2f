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

//! Backend registration and hint resolution.
//!
//! A [`BackendRegistry`] holds named factories for render backends and window
//! backends. Hints pick which candidates are tried and in which order; every
//! candidate that fails is logged and the next one is tried.

use lumen_core::platform::WindowBackend;
use lumen_core::renderer::{BackendKind, RenderBackend, TextureType};
use lumen_core::resource::ResourceLoader;
use lumen_core::{Error, RenderSystem, Result, Window};
use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// Which render backends may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RenderSystemHint {
    /// Hardware backends first, then software.
    #[default]
    Default,
    /// Hardware backends only.
    PreferHardware,
    /// The software backend only.
    SoftwareFallback,
}

impl RenderSystemHint {
    fn kinds(self) -> &'static [BackendKind] {
        match self {
            Self::Default => &[BackendKind::Hardware, BackendKind::Software],
            Self::PreferHardware => &[BackendKind::Hardware],
            Self::SoftwareFallback => &[BackendKind::Software],
        }
    }
}

/// Which window backends may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WindowSystemHint {
    /// The native backend, then headless if the fallback is allowed.
    #[default]
    Default,
    /// The native winit backend only.
    Winit,
    /// The headless backend only.
    Headless,
}

/// The capability class of a window backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// A native, displayable window.
    Native,
    /// A window without a display.
    Headless,
}

/// Options applied to a created render system.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Synchronize presentation with the display refresh.
    pub vsync: bool,
    /// Texture type used by the creation calls that don't take one.
    pub default_texture_type: TextureType,
    /// Loader for resource textures.
    pub resources: Option<Rc<dyn ResourceLoader>>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            vsync: true,
            default_texture_type: TextureType::Managed,
            resources: None,
        }
    }
}

/// Geometry and title of a window to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    /// Inner width in pixels.
    pub width: u32,
    /// Inner height in pixels.
    pub height: u32,
    /// Borderless fullscreen.
    pub fullscreen: bool,
    /// Title, may be empty.
    pub title: String,
    /// Let [`WindowSystemHint::Default`] fall back to a headless window.
    pub allow_headless_fallback: bool,
}

/// Builds a render backend.
pub type RenderBackendFactory = Box<dyn Fn(&RenderOptions) -> Result<Box<dyn RenderBackend>>>;

/// Builds a window backend. The native window is opened afterwards by
/// [`Window::create`].
pub type WindowBackendFactory = Box<dyn Fn() -> Result<Box<dyn WindowBackend>>>;

struct RenderCandidate {
    name: String,
    kind: BackendKind,
    factory: RenderBackendFactory,
}

struct WindowCandidate {
    name: String,
    kind: WindowKind,
    factory: WindowBackendFactory,
}

/// Named backend factories, tried in registration order.
#[derive(Default)]
pub struct BackendRegistry {
    render: Vec<RenderCandidate>,
    window: Vec<WindowCandidate>,
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("render", &self.render_backend_names())
            .field("window", &self.window_backend_names())
            .finish()
    }
}

impl BackendRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in backends enabled by cargo features.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        #[cfg(feature = "hardware")]
        registry.register_render_backend("wgpu", BackendKind::Hardware, |options| {
            let backend = lumen_infra::WgpuBackend::new(options.vsync)?;
            Ok(Box::new(backend) as Box<dyn RenderBackend>)
        });
        registry.register_render_backend("software", BackendKind::Software, |_| {
            Ok(Box::new(lumen_infra::SoftwareBackend::new()) as Box<dyn RenderBackend>)
        });

        #[cfg(feature = "native-window")]
        registry.register_window_backend("winit", WindowKind::Native, || {
            Ok(Box::new(lumen_infra::WinitWindow::new()) as Box<dyn WindowBackend>)
        });
        registry.register_window_backend("headless", WindowKind::Headless, || {
            Ok(Box::new(lumen_infra::HeadlessWindow::new()) as Box<dyn WindowBackend>)
        });

        registry
    }

    /// Adds a render backend factory after the existing ones.
    pub fn register_render_backend<F>(&mut self, name: &str, kind: BackendKind, factory: F) -> &mut Self
    where
        F: Fn(&RenderOptions) -> Result<Box<dyn RenderBackend>> + 'static,
    {
        log::debug!("Registered render backend '{name}' ({kind:?})");
        self.render.push(RenderCandidate {
            name: name.to_string(),
            kind,
            factory: Box::new(factory),
        });
        self
    }

    /// Adds a window backend factory after the existing ones.
    pub fn register_window_backend<F>(&mut self, name: &str, kind: WindowKind, factory: F) -> &mut Self
    where
        F: Fn() -> Result<Box<dyn WindowBackend>> + 'static,
    {
        log::debug!("Registered window backend '{name}' ({kind:?})");
        self.window.push(WindowCandidate {
            name: name.to_string(),
            kind,
            factory: Box::new(factory),
        });
        self
    }

    /// Names of the registered render backends, in registration order.
    pub fn render_backend_names(&self) -> Vec<&str> {
        self.render.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of the registered window backends, in registration order.
    pub fn window_backend_names(&self) -> Vec<&str> {
        self.window.iter().map(|c| c.name.as_str()).collect()
    }

    /// Creates a render system on the first candidate `hint` allows that succeeds.
    ///
    /// # Errors
    /// [`Error::BackendUnavailable`] if no candidate satisfies the hint.
    pub fn create_render_system(
        &self,
        hint: RenderSystemHint,
        options: &RenderOptions,
    ) -> Result<RenderSystem> {
        let mut attempted = Vec::new();
        for &kind in hint.kinds() {
            for candidate in self.render.iter().filter(|c| c.kind == kind) {
                attempted.push(candidate.name.as_str());
                match (candidate.factory)(options) {
                    Ok(backend) => {
                        log::info!("Render backend '{}' selected", candidate.name);
                        let mut render_system = RenderSystem::new(backend)
                            .with_default_texture_type(options.default_texture_type);
                        if let Some(resources) = options.resources.clone() {
                            render_system = render_system.with_resources(resources);
                        }
                        return Ok(render_system);
                    }
                    Err(err) => {
                        log::warn!("Render backend '{}' unavailable: {err}", candidate.name);
                    }
                }
            }
        }
        Err(Error::BackendUnavailable(format!(
            "no render backend satisfies {hint:?}. Attempted: {attempted:?}"
        )))
    }

    /// Opens a window on the first candidate `hint` allows that succeeds.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if the size is zero.
    /// - [`Error::BackendUnavailable`] if no registered backend satisfies the hint.
    /// - The last creation error, typically [`Error::WindowCreationFailed`], if every
    ///   candidate failed.
    pub fn create_window(&self, hint: WindowSystemHint, options: &WindowOptions) -> Result<Window> {
        if options.width == 0 || options.height == 0 {
            return Err(Error::InvalidParameter(format!(
                "window size must be positive, got {}x{}",
                options.width, options.height
            )));
        }
        let kinds: &[WindowKind] = match hint {
            WindowSystemHint::Default if options.allow_headless_fallback => {
                &[WindowKind::Native, WindowKind::Headless]
            }
            WindowSystemHint::Default | WindowSystemHint::Winit => &[WindowKind::Native],
            WindowSystemHint::Headless => &[WindowKind::Headless],
        };

        let mut last_error = None;
        for &kind in kinds {
            for candidate in self.window.iter().filter(|c| c.kind == kind) {
                let created = (candidate.factory)().and_then(|backend| {
                    Window::create(
                        backend,
                        options.width,
                        options.height,
                        options.fullscreen,
                        &options.title,
                    )
                });
                match created {
                    Ok(window) => {
                        log::info!("Window backend '{}' selected", candidate.name);
                        return Ok(window);
                    }
                    Err(err) => {
                        log::warn!("Window backend '{}' failed: {err}", candidate.name);
                        last_error = Some(err);
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            Error::BackendUnavailable(format!("no window backend satisfies {hint:?}"))
        }))
    }
}
