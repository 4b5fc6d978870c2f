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

//! The error taxonomy shared by every Lumen crate.
//!
//! Errors fall into three families:
//! - setup failures ([`Error::BackendUnavailable`], [`Error::WindowCreationFailed`],
//!   [`Error::NotInitialized`]) are surfaced immediately and never retried;
//! - per-frame failures ([`Error::ContextInvalid`], [`Error::ResourceInvalid`]) are
//!   expected after a context loss and are recovered from by the frame loop;
//! - everything else is a caller bug reported synchronously.

use thiserror::Error;

/// A specialized `Result` type for Lumen operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the render system, textures, windows and the backend registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No registered backend satisfies the requested hint on this platform.
    #[error("No backend available: {0}")]
    BackendUnavailable(String),

    /// The platform surface could not be obtained.
    #[error("Window creation failed: {0}")]
    WindowCreationFailed(String),

    /// The render context is lost, being recreated, or otherwise not active.
    #[error("Render context is not valid")]
    ContextInvalid,

    /// A texture's device handle is not valid (context lost or texture destroyed).
    #[error("Resource is not valid: {0}")]
    ResourceInvalid(String),

    /// A named resource could not be resolved.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// A pixel format or encoding is not supported by the active backend or decoder.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A parameter violated an operation's precondition.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A rectangle exceeds the bounds of the resource it addresses.
    #[error(
        "Rectangle ({x}, {y}, {width}x{height}) is out of bounds for a {bounds_width}x{bounds_height} resource"
    )]
    OutOfBounds {
        /// Left edge of the offending rectangle.
        x: u32,
        /// Top edge of the offending rectangle.
        y: u32,
        /// Width of the offending rectangle.
        width: u32,
        /// Height of the offending rectangle.
        height: u32,
        /// Width of the addressed resource.
        bounds_width: u32,
        /// Height of the addressed resource.
        bounds_height: u32,
    },

    /// The operation was called outside the init/destroy window.
    #[error("Lumen is not initialized")]
    NotInitialized,
}

impl Error {
    /// Returns `true` for failures that belong to the setup phase and end the program.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Error::BackendUnavailable(_) | Error::WindowCreationFailed(_) | Error::NotInitialized
        )
    }

    /// Returns `true` for per-frame failures the frame loop recovers from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ContextInvalid | Error::ResourceInvalid(_))
    }
}
