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

//! A [`ResourceLoader`] that reads image files below a root directory.

use lumen_core::renderer::PixelFormat;
use lumen_core::resource::{DecodedImage, ResourceLoader};
use lumen_core::{Error, Result};
use std::path::{Path, PathBuf};

/// Extensions tried, in order, when a name does not resolve as given.
pub const DEFAULT_TEXTURE_EXTENSIONS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// Resolves names against a root directory and decodes the files with `image`.
///
/// A name is looked up as given, then with each extension appended, then with
/// its own extension replaced by each extension. The first existing file wins.
#[derive(Debug, Clone)]
pub struct FileSystemResources {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FileSystemResources {
    /// Creates a loader rooted at `root` with the default texture extensions.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_TEXTURE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    /// Replaces the extension list. Extensions include the leading dot.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The extension list.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Returns the file `name` resolves to.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        let base = self.root.join(name);
        if base.is_file() {
            return Some(base);
        }
        let appended = self.extensions.iter().map(|ext| with_suffix(&base, ext));
        let replaced = base
            .extension()
            .map(|_| base.with_extension(""))
            .into_iter()
            .flat_map(|stem| {
                self.extensions
                    .iter()
                    .map(move |ext| with_suffix(&stem, ext))
            });
        appended.chain(replaced).find(|path| path.is_file())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(suffix);
    PathBuf::from(raw)
}

impl ResourceLoader for FileSystemResources {
    fn load_image(&self, name: &str) -> Result<DecodedImage> {
        let path = self
            .find(name)
            .ok_or_else(|| Error::ResourceNotFound(name.to_string()))?;
        let bytes = std::fs::read(&path)
            .map_err(|e| Error::ResourceNotFound(format!("{}: {e}", path.display())))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| Error::UnsupportedFormat(format!("{}: {e}", path.display())))?
            .to_rgba8();
        let (width, height) = image.dimensions();
        log::debug!(
            "Decoded '{}' from {} ({}x{})",
            name,
            path.display(),
            width,
            height
        );
        Ok(DecodedImage {
            width,
            height,
            format: PixelFormat::Rgba8,
            pixels: image.into_raw(),
        })
    }

    fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn write_png(dir: &Path, file: &str, color: [u8; 4]) {
        // PNG content whatever the extension, so lookups can be checked by name.
        let image = RgbaImage::from_pixel(2, 1, Rgba(color));
        image
            .save_with_format(dir.join(file), ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_lookup_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "exact.png", [1, 2, 3, 255]);
        write_png(dir.path(), "appended.png", [4, 5, 6, 255]);
        write_png(dir.path(), "replaced.jpeg", [7, 8, 9, 255]);
        let resources = FileSystemResources::new(dir.path());

        assert_eq!(resources.find("exact.png"), Some(dir.path().join("exact.png")));
        assert_eq!(resources.find("appended"), Some(dir.path().join("appended.png")));
        assert_eq!(
            resources.find("replaced.tga"),
            Some(dir.path().join("replaced.jpeg"))
        );
        assert_eq!(resources.find("missing"), None);
        assert!(!resources.exists("missing.png"));
    }

    #[test]
    fn test_load_decodes_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("ui")).unwrap();
        write_png(&dir.path().join("ui"), "arrow.png", [10, 20, 30, 40]);
        let resources = FileSystemResources::new(dir.path());

        let image = resources.load_image("ui/arrow").unwrap();
        assert_eq!((image.width, image.height), (2, 1));
        assert_eq!(image.format, PixelFormat::Rgba8);
        assert_eq!(image.pixels, vec![10, 20, 30, 40, 10, 20, 30, 40]);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not an image").unwrap();
        let resources = FileSystemResources::new(dir.path());

        assert_eq!(
            resources.load_image("nothing"),
            Err(Error::ResourceNotFound("nothing".to_string()))
        );
        assert!(matches!(
            resources.load_image("broken"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_custom_extensions() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "tile.tex", [0, 0, 0, 255]);
        let resources = FileSystemResources::new(dir.path()).with_extensions([".tex"]);
        assert_eq!(resources.extensions(), [".tex".to_string()]);
        assert!(resources.exists("tile"));
        assert!(!FileSystemResources::new(dir.path()).exists("tile"));
    }
}
