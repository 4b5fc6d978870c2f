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

//! The [`Lumen`] context object: one render system and one window, created as a
//! matched pair and torn down in reverse order.

use crate::config::EngineConfig;
use crate::registry::{
    BackendRegistry, RenderOptions, RenderSystemHint, WindowOptions, WindowSystemHint,
};
use lumen_core::resource::ResourceLoader;
use lumen_core::{Error, RenderSystem, Result, Window};
use lumen_infra::FileSystemResources;
use std::cell::RefCell;
use std::rc::Rc;

/// Owns the render system and window of an application.
///
/// Pass it by reference to whatever needs them; there is no global instance.
/// Accessors fail with [`Error::NotInitialized`] before the objects are created
/// and after [`destroy`](Self::destroy).
#[derive(Debug)]
pub struct Lumen {
    registry: BackendRegistry,
    render_hint: RenderSystemHint,
    window_hint: WindowSystemHint,
    allow_headless_fallback: bool,
    resources: Option<Rc<dyn ResourceLoader>>,
    render_system: Option<Rc<RefCell<RenderSystem>>>,
    window: Option<Window>,
    destroyed: bool,
}

impl Lumen {
    /// Creates a context over the built-in backends.
    pub fn init(render_hint: RenderSystemHint, window_hint: WindowSystemHint) -> Self {
        Self::with_registry(BackendRegistry::with_defaults(), render_hint, window_hint)
    }

    /// Creates a context over the backends of `registry`.
    pub fn with_registry(
        registry: BackendRegistry,
        render_hint: RenderSystemHint,
        window_hint: WindowSystemHint,
    ) -> Self {
        log::info!("Lumen initialized (render hint {render_hint:?}, window hint {window_hint:?})");
        Self {
            registry,
            render_hint,
            window_hint,
            allow_headless_fallback: false,
            resources: None,
            render_system: None,
            window: None,
            destroyed: false,
        }
    }

    /// Creates a context configured from `config`, over the backends of `registry`.
    pub fn from_config(config: &EngineConfig, registry: BackendRegistry) -> Self {
        let mut lumen = Self::with_registry(registry, config.render_hint, config.window_hint)
            .with_headless_fallback(config.allow_headless_fallback);
        if let Some(root) = &config.resource_root {
            let loader = FileSystemResources::new(root).with_extensions(&config.texture_extensions);
            lumen = lumen.with_resources(Rc::new(loader));
        }
        lumen
    }

    /// Sets the loader textures and cursors are resolved through.
    pub fn with_resources(mut self, resources: Rc<dyn ResourceLoader>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Allows the default window hint to fall back to a headless window.
    pub fn with_headless_fallback(mut self, allow: bool) -> Self {
        self.allow_headless_fallback = allow;
        self
    }

    /// The backend registry.
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            Err(Error::NotInitialized)
        } else {
            Ok(())
        }
    }

    /// Creates the render system. Resources configured on the context are used
    /// unless `options` names its own.
    ///
    /// # Errors
    /// - [`Error::BackendUnavailable`] if no backend satisfies the render hint.
    /// - [`Error::InvalidParameter`] if a render system already exists.
    /// - [`Error::NotInitialized`] after [`destroy`](Self::destroy).
    pub fn create_render_system(
        &mut self,
        mut options: RenderOptions,
    ) -> Result<Rc<RefCell<RenderSystem>>> {
        self.ensure_alive()?;
        if self.render_system.is_some() {
            return Err(Error::InvalidParameter(
                "a render system was already created".to_string(),
            ));
        }
        if options.resources.is_none() {
            options.resources = self.resources.clone();
        }
        let render_system = self
            .registry
            .create_render_system(self.render_hint, &options)?;
        let render_system = Rc::new(RefCell::new(render_system));
        self.render_system = Some(render_system.clone());
        Ok(render_system)
    }

    /// Creates the window and pairs it with the render system, creating one with
    /// default options if needed.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if the size is zero or a window already exists.
    /// - [`Error::WindowCreationFailed`] if no surface can be obtained.
    /// - [`Error::BackendUnavailable`] if no backend satisfies a hint.
    /// - [`Error::NotInitialized`] after [`destroy`](Self::destroy).
    pub fn create_window(
        &mut self,
        width: u32,
        height: u32,
        fullscreen: bool,
        title: &str,
    ) -> Result<&mut Window> {
        self.ensure_alive()?;
        if self.window.is_some() {
            return Err(Error::InvalidParameter("a window was already created".to_string()));
        }
        let options = WindowOptions {
            width,
            height,
            fullscreen,
            title: title.to_string(),
            allow_headless_fallback: self.allow_headless_fallback,
        };
        let mut window = self.registry.create_window(self.window_hint, &options)?;

        let render_system = match self.render_system.clone() {
            Some(render_system) => render_system,
            None => self.create_render_system(RenderOptions::default())?,
        };
        window.set_resource_loader(self.resources.clone());
        window.attach_render_system(render_system)?;
        Ok(self.window.insert(window))
    }

    /// The render system.
    pub fn render_system(&self) -> Result<Rc<RefCell<RenderSystem>>> {
        self.ensure_alive()?;
        self.render_system.clone().ok_or(Error::NotInitialized)
    }

    /// The window.
    pub fn window(&mut self) -> Result<&mut Window> {
        self.ensure_alive()?;
        self.window.as_mut().ok_or(Error::NotInitialized)
    }

    /// Returns `true` until [`destroy`](Self::destroy) has run.
    pub fn is_initialized(&self) -> bool {
        !self.destroyed
    }

    /// Stops the loop, detaches the delegates, destroys the window, then shuts
    /// the render system down. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(mut window) = self.window.take() {
            window.destroy();
        }
        if let Some(render_system) = self.render_system.take() {
            match render_system.try_borrow_mut() {
                Ok(mut render_system) => render_system.shutdown(),
                Err(_) => log::warn!("Render system busy during destroy; it shuts down when dropped"),
            }
        }
        log::info!("Lumen destroyed");
    }
}

impl Drop for Lumen {
    fn drop(&mut self) {
        self.destroy();
    }
}
