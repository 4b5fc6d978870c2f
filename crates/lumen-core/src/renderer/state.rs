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

//! Render context states and fixed-function render state.

use serde::{Deserialize, Serialize};

/// The lifecycle state of a render context.
///
/// ```text
///   Active --loss--> Lost --recreate_textures--> Recreating --done--> Active
///      \______________\_________shutdown____________________________> Destroyed
/// ```
///
/// Loss is routine on mobile backends. It never ends the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextState {
    /// The device is usable and every restored texture is valid.
    Active,
    /// The device was lost. Texture handles are invalid until recreation.
    Lost,
    /// Textures are being restored.
    Recreating,
    /// The render system was shut down. Terminal.
    Destroyed,
}

impl ContextState {
    /// Returns `true` if draw and texture operations are allowed.
    pub fn is_valid(self) -> bool {
        self == ContextState::Active
    }
}

/// How drawn fragments combine with the render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    /// Standard `src * a + dst * (1 - a)`.
    #[default]
    Alpha,
    /// Additive `src * a + dst`.
    Add,
    /// Subtractive `dst - src * a`.
    Subtract,
    /// No blending, the source replaces the destination.
    Overwrite,
}

impl BlendMode {
    /// All blend modes, in declaration order.
    pub const ALL: [BlendMode; 4] = [
        BlendMode::Alpha,
        BlendMode::Add,
        BlendMode::Subtract,
        BlendMode::Overwrite,
    ];
}
