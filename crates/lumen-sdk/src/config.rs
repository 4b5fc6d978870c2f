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

//! Engine configuration, loadable from RON.

use crate::registry::{RenderSystemHint, WindowSystemHint};
use anyhow::Context;
use lumen_core::math::Color;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Startup configuration of a Lumen application.
///
/// Every field has a default, so a RON file only needs the fields it changes:
///
/// ```ron
/// (
///     title: "Sprites",
///     width: 1280,
///     height: 720,
///     render_hint: SoftwareFallback,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window title.
    pub title: String,
    /// Window inner width in pixels.
    pub width: u32,
    /// Window inner height in pixels.
    pub height: u32,
    /// Start in borderless fullscreen.
    pub fullscreen: bool,
    /// Which render backends may be used.
    pub render_hint: RenderSystemHint,
    /// Which window backends may be used.
    pub window_hint: WindowSystemHint,
    /// Let the default window hint fall back to a headless window.
    pub allow_headless_fallback: bool,
    /// Directory resource names are resolved against. `None` disables resource loading.
    pub resource_root: Option<PathBuf>,
    /// Extensions tried when a texture name has none that resolves.
    pub texture_extensions: Vec<String>,
    /// Color the frame is cleared to before each update.
    pub clear_color: Color,
    /// Synchronize presentation with the display refresh.
    pub vsync: bool,
    /// `env_logger` filter used when `RUST_LOG` is not set.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Lumen".to_string(),
            width: 800,
            height: 600,
            fullscreen: false,
            render_hint: RenderSystemHint::Default,
            window_hint: WindowSystemHint::Default,
            allow_headless_fallback: false,
            resource_root: None,
            texture_extensions: lumen_infra::resources::filesystem::DEFAULT_TEXTURE_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            clear_color: Color::BLACK,
            vsync: true,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from RON text.
    pub fn from_ron_str(text: &str) -> anyhow::Result<Self> {
        ron::from_str(text).context("Failed to parse engine configuration")
    }

    /// Reads and parses the RON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine configuration {}", path.display()))?;
        Self::from_ron_str(&text)
            .with_context(|| format!("Invalid engine configuration {}", path.display()))
    }

    /// Serializes the configuration as pretty RON.
    pub fn to_ron_string(&self) -> anyhow::Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Failed to serialize engine configuration")
    }
}
