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

//! # Lumen SDK
//!
//! The public entry point of Lumen: backend selection, configuration, logger
//! setup and the [`Lumen`] context object that owns a window and its render
//! system.
//!
//! ```no_run
//! use lumen_sdk::prelude::*;
//!
//! fn main() -> std::process::ExitCode {
//!     let config = EngineConfig::default();
//!     lumen_sdk::run(&config, |_elapsed: f32, rs: &mut RenderSystem| {
//!         rs.draw_filled_rect(Rect::new(-0.5, -0.5, 1.0, 1.0), Color::RED).is_ok()
//!     })
//! }
//! ```

pub mod config;
pub mod context;
pub mod logging;
pub mod registry;

pub use config::EngineConfig;
pub use context::Lumen;
pub use registry::{
    BackendRegistry, RenderOptions, RenderSystemHint, WindowKind, WindowOptions,
    WindowSystemHint,
};

use lumen_core::{LoopExit, RenderSystem, Result, UpdateDelegate};
use std::process::ExitCode;

/// The types most applications need.
pub mod prelude {
    pub use crate::{EngineConfig, Lumen, RenderSystemHint, WindowSystemHint};
    pub use lumen_core::math::{Color, Mat4, Rect, Vec3};
    pub use lumen_core::renderer::{BlendMode, PixelFormat, PrimitiveKind, TexturedVertex};
    pub use lumen_core::{
        Error, InputDelegate, LoopExit, RenderSystem, SystemDelegate, Texture, UpdateDelegate,
        Window,
    };
}

/// Clears to the configured color before handing the frame to the caller.
struct ClearingDelegate<D> {
    clear_color: lumen_core::math::Color,
    inner: D,
}

impl<D: UpdateDelegate> UpdateDelegate for ClearingDelegate<D> {
    fn on_update(&mut self, elapsed_seconds: f32, render_system: &mut RenderSystem) -> bool {
        if let Err(err) = render_system.clear_with(self.clear_color) {
            log::trace!("Frame not cleared: {err}");
        }
        self.inner.on_update(elapsed_seconds, render_system)
    }
}

/// Creates the window described by `config` over `registry` and runs `delegate`
/// until the loop ends. Everything is torn down before returning.
///
/// # Errors
/// Any setup failure from window or render system creation.
pub fn launch(
    config: &EngineConfig,
    registry: BackendRegistry,
    delegate: impl UpdateDelegate + 'static,
) -> Result<LoopExit> {
    let mut lumen = Lumen::from_config(config, registry);
    lumen.create_render_system(RenderOptions {
        vsync: config.vsync,
        ..Default::default()
    })?;
    let window = lumen.create_window(config.width, config.height, config.fullscreen, &config.title)?;
    window.set_update_delegate(Some(Box::new(ClearingDelegate {
        clear_color: config.clear_color,
        inner: delegate,
    })));
    let exit = window.enter_main_loop();
    lumen.destroy();
    exit
}

/// Initializes logging, then [`launch`]es over the built-in backends.
///
/// Setup failures are logged and reported as a failing exit code.
pub fn run(config: &EngineConfig, delegate: impl UpdateDelegate + 'static) -> ExitCode {
    logging::init(&config.log_filter);
    match launch(config, BackendRegistry::with_defaults(), delegate) {
        Ok(exit) => {
            log::info!("Application finished ({exit:?})");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("Application failed to start: {err}");
            ExitCode::FAILURE
        }
    }
}
