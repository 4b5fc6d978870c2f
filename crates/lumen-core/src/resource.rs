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

//! Resolution and decoding of named image resources.
//!
//! The render system and the window never touch files. They ask a
//! [`ResourceLoader`] for decoded pixels by logical name.

use crate::error::{Error, Result};
use crate::renderer::format::PixelFormat;
use std::collections::HashMap;

/// A decoded image, tightly packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Layout of `pixels`.
    pub format: PixelFormat,
    /// Raw pixel bytes.
    pub pixels: Vec<u8>,
}

/// Resolves logical resource names to decoded images.
pub trait ResourceLoader: std::fmt::Debug {
    /// Loads and decodes the image called `name`.
    ///
    /// # Errors
    /// [`Error::ResourceNotFound`] if the name resolves to nothing,
    /// [`Error::UnsupportedFormat`] if the data cannot be decoded.
    fn load_image(&self, name: &str) -> Result<DecodedImage>;

    /// Returns `true` if `name` resolves to an existing resource.
    fn exists(&self, name: &str) -> bool;
}

/// A loader backed by images held in memory.
#[derive(Debug, Default)]
pub struct MemoryResources {
    images: HashMap<String, DecodedImage>,
}

impl MemoryResources {
    /// Creates an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `image` under `name`, replacing any previous entry.
    pub fn insert(&mut self, name: impl Into<String>, image: DecodedImage) {
        self.images.insert(name.into(), image);
    }

    /// Removes the entry called `name`.
    pub fn remove(&mut self, name: &str) -> Option<DecodedImage> {
        self.images.remove(name)
    }
}

impl ResourceLoader for MemoryResources {
    fn load_image(&self, name: &str) -> Result<DecodedImage> {
        self.images
            .get(name)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))
    }

    fn exists(&self, name: &str) -> bool {
        self.images.contains_key(name)
    }
}
