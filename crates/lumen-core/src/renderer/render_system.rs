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

//! The render system: the dispatcher between client code and one [`RenderBackend`].
//!
//! It owns the context state machine, the transform state and a weak registry
//! of live textures. Every call is validated here and forwarded to the backend
//! immediately, in issue order.

use super::backend::{
    BackendInfo, DeviceHandle, DrawCall, RenderBackend, TextureBinding, TextureDescriptor,
    TextureRegion,
};
use super::format::PixelFormat;
use super::primitive::{ClipVertex, PrimitiveKind, TexturedVertex};
use super::state::{BlendMode, ContextState};
use super::texture::{
    AddressMode, Filter, Texture, TextureKey, TextureRecord, TextureSource, TextureType,
};
use crate::error::{Error, Result};
use crate::math::{degrees_to_radians, Color, Mat4, Rect, Vec3};
use crate::platform::backend::SurfaceHandle;
use crate::resource::{DecodedImage, ResourceLoader};
use slotmap::SlotMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Device state shared between the render system and the textures it created.
#[derive(Debug)]
pub(crate) struct DeviceCore {
    pub(crate) backend: Box<dyn RenderBackend>,
    pub(crate) state: ContextState,
    pub(crate) textures: SlotMap<TextureKey, Weak<RefCell<TextureRecord>>>,
    pub(crate) resources: Option<Rc<dyn ResourceLoader>>,
    pub(crate) render_target: Option<TextureKey>,
}

impl DeviceCore {
    fn live_records(&self) -> Vec<Rc<RefCell<TextureRecord>>> {
        self.textures.values().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        match self.state {
            ContextState::Active => Ok(()),
            ContextState::Destroyed => Err(Error::NotInitialized),
            ContextState::Lost | ContextState::Recreating => Err(Error::ContextInvalid),
        }
    }

    /// Enters [`ContextState::Lost`]: every texture handle is cleared and the
    /// backend drops its device objects.
    ///
    /// No texture record may be borrowed by the caller.
    pub(crate) fn mark_lost(&mut self) {
        let records = self.live_records();
        for record in &records {
            record.borrow_mut().handle = None;
        }
        self.backend.release_device();
        self.state = ContextState::Lost;
        self.render_target = None;
        log::warn!(
            "Render context lost; {} textures invalidated",
            records.len()
        );
    }

    pub(crate) fn check_dimensions(&self, width: u32, height: u32) -> Result<()> {
        let max = self.backend.info().max_texture_size;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(Error::InvalidParameter(format!(
                "texture size {width}x{height} must be within 1..={max}"
            )));
        }
        Ok(())
    }

    pub(crate) fn check_format(&self, format: PixelFormat) -> Result<()> {
        if !self.backend.supports_format(format) {
            return Err(Error::UnsupportedFormat(format!(
                "{format:?} is not supported by backend '{}'",
                self.backend.info().name
            )));
        }
        Ok(())
    }

    /// Allocates device memory for `record` and fills it from its pixel source.
    ///
    /// A resource texture that was never loaded takes its size and format from
    /// the decoded image. Managed textures keep that image as their CPU copy.
    pub(crate) fn load_record(&mut self, record: &mut TextureRecord) -> Result<DeviceHandle> {
        let mut desc = TextureDescriptor {
            label: record.label.clone(),
            width: record.width,
            height: record.height,
            format: record.format,
            render_target: record.source == TextureSource::RenderTarget,
        };

        if let Some(pixels) = &record.pixels {
            return upload_new(self.backend.as_mut(), &desc, pixels);
        }

        match &record.source {
            TextureSource::RenderTarget => self.backend.create_texture(&desc),
            TextureSource::Resource { name } => {
                let resources = self.resources.clone().ok_or_else(|| {
                    Error::ResourceNotFound(format!("{name} (no resource loader configured)"))
                })?;
                let image = resources.load_image(name)?;
                let first_load = record.width == 0;
                if first_load {
                    self.check_dimensions(image.width, image.height)?;
                    self.check_format(image.format)?;
                    if image.format.buffer_len(image.width, image.height) != Some(image.pixels.len())
                    {
                        return Err(Error::UnsupportedFormat(format!(
                            "resource '{name}' decoded to a truncated image"
                        )));
                    }
                    desc.width = image.width;
                    desc.height = image.height;
                    desc.format = image.format;
                } else if (image.width, image.height, image.format)
                    != (record.width, record.height, record.format)
                {
                    return Err(Error::ResourceInvalid(format!(
                        "resource '{name}' changed shape since the texture was created"
                    )));
                }
                let handle = upload_new(self.backend.as_mut(), &desc, &image.pixels)?;
                if first_load {
                    record.width = image.width;
                    record.height = image.height;
                    record.format = image.format;
                    if record.texture_type == TextureType::Managed {
                        record.pixels = Some(image.pixels);
                    }
                }
                Ok(handle)
            }
            TextureSource::Buffer => Err(Error::ResourceInvalid(
                "volatile texture has no pixel data left to restore".to_string(),
            )),
        }
    }
}

/// Outcome of a [`RenderSystem::recreate_textures`] pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecreateReport {
    /// Number of textures whose device state was restored.
    pub restored: usize,
    /// Labels of textures that stayed invalid, with the reason.
    pub failed: Vec<(String, Error)>,
}

impl RecreateReport {
    /// Returns `true` if every lost texture was restored.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Validates and dispatches rendering work to the active backend.
///
/// Transforms compose as `projection * view * model`. `rotate`, `translate` and
/// `scale` post-multiply the model matrix, so the last call applies to vertices
/// first.
#[derive(Debug)]
pub struct RenderSystem {
    core: Rc<RefCell<DeviceCore>>,
    projection: Mat4,
    view: Mat4,
    model: Mat4,
    model_stack: Vec<Mat4>,
    bound_texture: Option<TextureKey>,
    blend_mode: BlendMode,
    color: Color,
    clear_color: Color,
    viewport: Option<Rect>,
    default_texture_type: TextureType,
    texture_counter: u64,
}

impl RenderSystem {
    /// Wraps a ready-to-use backend. The context starts out [`ContextState::Active`].
    pub fn new(backend: Box<dyn RenderBackend>) -> Self {
        let info = backend.info();
        log::info!(
            "Render system created on backend '{}' ({:?}, max texture size {})",
            info.name,
            info.kind,
            info.max_texture_size
        );
        Self {
            core: Rc::new(RefCell::new(DeviceCore {
                backend,
                state: ContextState::Active,
                textures: SlotMap::with_key(),
                resources: None,
                render_target: None,
            })),
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            model: Mat4::IDENTITY,
            model_stack: Vec::new(),
            bound_texture: None,
            blend_mode: BlendMode::default(),
            color: Color::WHITE,
            clear_color: Color::BLACK,
            viewport: None,
            default_texture_type: TextureType::Managed,
            texture_counter: 0,
        }
    }

    /// Sets the loader used by [`create_texture_from_resource`](Self::create_texture_from_resource)
    /// and by recreation of resource textures.
    pub fn with_resources(self, resources: Rc<dyn ResourceLoader>) -> Self {
        self.core.borrow_mut().resources = Some(resources);
        self
    }

    /// Sets the texture type used by the creation calls that don't take one.
    pub fn with_default_texture_type(mut self, texture_type: TextureType) -> Self {
        self.default_texture_type = texture_type;
        self
    }

    /// The resource loader, if one was configured.
    pub fn resources(&self) -> Option<Rc<dyn ResourceLoader>> {
        self.core.borrow().resources.clone()
    }

    // --- State queries ---

    /// Static information about the active backend.
    pub fn backend_info(&self) -> BackendInfo {
        self.core.borrow().backend.info()
    }

    /// The current context state.
    pub fn context_state(&self) -> ContextState {
        self.core.borrow().state
    }

    /// Returns `true` while draw and texture operations are allowed.
    pub fn is_context_valid(&self) -> bool {
        self.context_state().is_valid()
    }

    /// Number of textures created by this render system and not yet destroyed.
    pub fn live_texture_count(&self) -> usize {
        self.core
            .borrow()
            .textures
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// The current projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// The current view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    /// The current model matrix.
    pub fn model_matrix(&self) -> Mat4 {
        self.model
    }

    /// `projection * view * model`, the matrix applied to every vertex.
    pub fn combined_matrix(&self) -> Mat4 {
        self.projection * self.view * self.model
    }

    /// Returns `true` while drawing is redirected into a render-target texture.
    pub fn has_render_target(&self) -> bool {
        self.core.borrow().render_target.is_some()
    }

    /// The current blend mode.
    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// The current modulation color.
    pub fn color(&self) -> Color {
        self.color
    }

    fn ensure_active(&self) -> Result<()> {
        self.core.borrow().ensure_active()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.core.borrow().state == ContextState::Destroyed {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    /// Runs `f` on the backend, entering the lost state if it reports a lost device.
    fn forward<T>(&mut self, f: impl FnOnce(&mut dyn RenderBackend) -> Result<T>) -> Result<T> {
        self.ensure_active()?;
        let result = f(self.core.borrow_mut().backend.as_mut());
        if let Err(Error::ContextInvalid) = result {
            self.core.borrow_mut().mark_lost();
        }
        result
    }

    // --- Surface ---

    /// Binds the backend to a window surface (or an offscreen target for `None`).
    pub fn attach_surface(
        &mut self,
        surface: Option<SurfaceHandle>,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.ensure_alive()?;
        self.core
            .borrow_mut()
            .backend
            .attach_surface(surface, width, height)
    }

    /// Resizes the presentation target. Allowed while the context is lost.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        self.ensure_alive()?;
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {width}x{height}");
            return Ok(());
        }
        self.core.borrow_mut().backend.resize_surface(width, height);
        Ok(())
    }

    // --- Frame ---

    /// Sets the color used by [`clear`](Self::clear).
    pub fn set_clear_color(&mut self, color: Color) -> Result<()> {
        self.ensure_active()?;
        self.clear_color = color;
        Ok(())
    }

    /// Clears the current target to the clear color.
    pub fn clear(&mut self) -> Result<()> {
        let color = self.clear_color;
        self.clear_with(color)
    }

    /// Clears the current target to `color`.
    pub fn clear_with(&mut self, color: Color) -> Result<()> {
        self.forward(|backend| backend.clear(color))
    }

    /// Presents the current frame.
    pub fn present(&mut self) -> Result<()> {
        self.forward(|backend| backend.present())
    }

    /// Restricts drawing to a pixel rectangle of the current target; `None` resets it.
    pub fn set_viewport(&mut self, viewport: Option<Rect>) -> Result<()> {
        self.ensure_active()?;
        if let Some(rect) = viewport {
            if rect.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "viewport {rect:?} has no area"
                )));
            }
        }
        self.viewport = viewport;
        Ok(())
    }

    /// Sets the blend mode for subsequent draws.
    pub fn set_blend_mode(&mut self, mode: BlendMode) -> Result<()> {
        self.ensure_active()?;
        self.blend_mode = mode;
        Ok(())
    }

    /// Sets the color subsequent draws are modulated with.
    pub fn set_color(&mut self, color: Color) -> Result<()> {
        self.ensure_active()?;
        self.color = color;
        Ok(())
    }

    /// Reads the current target back as RGBA8: the bound render target, or the
    /// presentation target.
    ///
    /// # Errors
    /// [`Error::UnsupportedFormat`] if the backend cannot read this target back.
    pub fn take_screenshot(&mut self) -> Result<DecodedImage> {
        let image = self.forward(|backend| backend.read_pixels())?;
        log::debug!("Screenshot taken ({}x{})", image.width, image.height);
        Ok(image)
    }

    // --- Projection and view ---

    /// Replaces the projection with a perspective projection.
    ///
    /// `fov_degrees` is the vertical field of view.
    pub fn set_perspective(&mut self, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Result<()> {
        self.ensure_active()?;
        if !(fov_degrees > 0.0 && fov_degrees < 180.0) {
            return Err(Error::InvalidParameter(format!(
                "field of view must be in (0, 180) degrees, got {fov_degrees}"
            )));
        }
        if !(aspect > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "aspect ratio must be positive, got {aspect}"
            )));
        }
        if !(near > 0.0 && near < far) {
            return Err(Error::InvalidParameter(format!(
                "perspective planes need 0 < near < far, got near {near}, far {far}"
            )));
        }
        self.projection =
            Mat4::perspective_rh_zo(degrees_to_radians(fov_degrees), aspect, near, far);
        Ok(())
    }

    /// Replaces the projection with an orthographic projection.
    pub fn set_orthographic(
        &mut self,
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    ) -> Result<()> {
        self.ensure_active()?;
        if !(near < far) {
            return Err(Error::InvalidParameter(format!(
                "orthographic planes need near < far, got near {near}, far {far}"
            )));
        }
        if left == right || bottom == top {
            return Err(Error::InvalidParameter(format!(
                "orthographic volume is degenerate: left {left}, right {right}, bottom {bottom}, top {top}"
            )));
        }
        self.projection = Mat4::orthographic_rh_zo(left, right, bottom, top, near, far);
        Ok(())
    }

    /// A 2D projection mapping `rect` to the target, with y growing downwards.
    pub fn set_ortho_projection(&mut self, rect: Rect) -> Result<()> {
        self.set_orthographic(rect.x, rect.x + rect.w, rect.y + rect.h, rect.y, -1.0, 1.0)
    }

    /// Replaces the projection matrix as is.
    pub fn set_projection_matrix(&mut self, projection: Mat4) -> Result<()> {
        self.ensure_active()?;
        self.projection = projection;
        Ok(())
    }

    /// Replaces the view matrix with a camera at `eye` looking at `target`.
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) -> Result<()> {
        self.ensure_active()?;
        self.view = Mat4::look_at_rh(eye, target, up).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "look_at from {eye:?} to {target:?} with up {up:?} has no basis"
            ))
        })?;
        Ok(())
    }

    /// Replaces the view matrix as is.
    pub fn set_view_matrix(&mut self, view: Mat4) -> Result<()> {
        self.ensure_active()?;
        self.view = view;
        Ok(())
    }

    // --- Model transform ---

    /// Resets the model matrix to identity.
    pub fn set_identity_transform(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.model = Mat4::IDENTITY;
        Ok(())
    }

    /// Replaces the model matrix as is.
    pub fn set_model_matrix(&mut self, model: Mat4) -> Result<()> {
        self.ensure_active()?;
        self.model = model;
        Ok(())
    }

    /// Post-multiplies the model matrix by a rotation of `angle_degrees` around
    /// `(x, y, z)`.
    ///
    /// A zero-length axis has no direction to rotate around. The call is then a
    /// no-op: the model matrix is left unchanged and `Ok` is returned.
    pub fn rotate(&mut self, angle_degrees: f32, x: f32, y: f32, z: f32) -> Result<()> {
        self.ensure_active()?;
        match Mat4::from_axis_angle(Vec3::new(x, y, z), degrees_to_radians(angle_degrees)) {
            Some(rotation) => self.model = self.model * rotation,
            None => log::debug!("rotate around zero-length axis ({x}, {y}, {z}) ignored"),
        }
        Ok(())
    }

    /// Post-multiplies the model matrix by a translation.
    pub fn translate(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.ensure_active()?;
        self.model = self.model * Mat4::from_translation(Vec3::new(x, y, z));
        Ok(())
    }

    /// Post-multiplies the model matrix by a scale.
    pub fn scale(&mut self, x: f32, y: f32, z: f32) -> Result<()> {
        self.ensure_active()?;
        self.model = self.model * Mat4::from_scale(Vec3::new(x, y, z));
        Ok(())
    }

    /// Saves the model matrix.
    pub fn push_transform(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.model_stack.push(self.model);
        Ok(())
    }

    /// Restores the model matrix saved by the matching [`push_transform`](Self::push_transform).
    pub fn pop_transform(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.model = self
            .model_stack
            .pop()
            .ok_or_else(|| Error::InvalidParameter("transform stack is empty".to_string()))?;
        Ok(())
    }

    // --- Binding ---

    fn check_owned(&self, texture: &Texture) -> Result<()> {
        if !Weak::ptr_eq(&texture.core, &Rc::downgrade(&self.core)) {
            return Err(Error::InvalidParameter(format!(
                "texture '{}' belongs to another render system",
                texture.label()
            )));
        }
        if !texture.is_valid() {
            return Err(Error::ResourceInvalid(format!(
                "texture '{}' has no valid device handle",
                texture.label()
            )));
        }
        Ok(())
    }

    /// Binds `texture` for subsequent draws, or unbinds with `None`.
    pub fn set_texture(&mut self, texture: Option<&Texture>) -> Result<()> {
        self.ensure_active()?;
        match texture {
            Some(texture) => {
                self.check_owned(texture)?;
                self.bound_texture = Some(texture.key);
            }
            None => self.bound_texture = None,
        }
        Ok(())
    }

    /// Redirects drawing into a render-target texture, or back to the window with `None`.
    pub fn set_render_target(&mut self, target: Option<&Texture>) -> Result<()> {
        self.ensure_active()?;
        let handle = match target {
            Some(texture) => {
                self.check_owned(texture)?;
                if texture.source() != TextureSource::RenderTarget {
                    return Err(Error::InvalidParameter(format!(
                        "texture '{}' is not a render target",
                        texture.label()
                    )));
                }
                texture.record.borrow().handle
            }
            None => None,
        };
        self.forward(|backend| backend.set_render_target(handle))?;
        self.core.borrow_mut().render_target = target.map(|t| t.key);
        Ok(())
    }

    fn resolve_binding(&self, key: TextureKey) -> Result<TextureBinding> {
        let core = self.core.borrow();
        core.textures
            .get(key)
            .and_then(Weak::upgrade)
            .and_then(|record| record.borrow().binding())
            .ok_or_else(|| {
                Error::ResourceInvalid("bound texture is no longer valid".to_string())
            })
    }

    // --- Drawing ---

    /// Draws the first `count` vertices as `kind` primitives with the bound texture.
    ///
    /// # Errors
    /// - [`Error::InvalidParameter`] if `count` does not fit the topology or exceeds
    ///   `vertices.len()`.
    /// - [`Error::ResourceInvalid`] if the bound texture lost its device handle.
    pub fn render(&mut self, kind: PrimitiveKind, vertices: &[TexturedVertex], count: usize) -> Result<()> {
        self.ensure_active()?;
        let texture = self.bound_texture.map(|key| self.resolve_binding(key)).transpose()?;
        self.draw(kind, vertices, count, texture, self.color)
    }

    fn draw(
        &mut self,
        kind: PrimitiveKind,
        vertices: &[TexturedVertex],
        count: usize,
        texture: Option<TextureBinding>,
        color: Color,
    ) -> Result<()> {
        self.ensure_active()?;
        if count > vertices.len() {
            return Err(Error::InvalidParameter(format!(
                "count {count} exceeds the {} vertices supplied",
                vertices.len()
            )));
        }
        kind.validate_count(count)?;

        let mvp = self.combined_matrix();
        let clip: Vec<ClipVertex> = vertices[..count]
            .iter()
            .map(|v| {
                let p = mvp.transform_point(v.position());
                ClipVertex {
                    position: [p.x, p.y, p.z, p.w],
                    uv: [v.u, v.v],
                }
            })
            .collect();

        let call = DrawCall {
            kind,
            vertices: &clip,
            texture,
            color,
            blend: self.blend_mode,
            viewport: self.viewport,
        };
        log::trace!("Drawing {count} vertices as {kind:?}");
        self.forward(|backend| backend.draw(&call))
    }

    /// Draws the outline of `rect` in `color`, without texture.
    pub fn draw_rect(&mut self, rect: Rect, color: Color) -> Result<()> {
        let (x0, y0, x1, y1) = (rect.x, rect.y, rect.x + rect.w, rect.y + rect.h);
        let vertices = [
            TexturedVertex::new(x0, y0, 0.0, 0.0, 0.0),
            TexturedVertex::new(x1, y0, 0.0, 0.0, 0.0),
            TexturedVertex::new(x1, y1, 0.0, 0.0, 0.0),
            TexturedVertex::new(x0, y1, 0.0, 0.0, 0.0),
            TexturedVertex::new(x0, y0, 0.0, 0.0, 0.0),
        ];
        self.draw(PrimitiveKind::LineStrip, &vertices, 5, None, color)
    }

    /// Fills `rect` with `color`, without texture.
    pub fn draw_filled_rect(&mut self, rect: Rect, color: Color) -> Result<()> {
        let vertices = quad(rect, Rect::UNIT);
        self.draw(PrimitiveKind::TriangleStrip, &vertices, 4, None, color)
    }

    /// Draws `rect` with the bound texture, sampling the `src` UV rectangle.
    pub fn draw_textured_rect(&mut self, rect: Rect, src: Rect) -> Result<()> {
        self.ensure_active()?;
        let texture = self.bound_texture.map(|key| self.resolve_binding(key)).transpose()?;
        let vertices = quad(rect, src);
        self.draw(PrimitiveKind::TriangleStrip, &vertices, 4, texture, self.color)
    }

    // --- Texture creation ---

    fn next_label(&mut self, hint: &str) -> String {
        self.texture_counter += 1;
        format!("{hint}#{}", self.texture_counter)
    }

    /// Creates a texture from tightly packed `pixels`.
    ///
    /// # Errors
    /// - [`Error::UnsupportedFormat`] if the backend cannot store `format`.
    /// - [`Error::InvalidParameter`] for zero or oversized dimensions, or a buffer of
    ///   the wrong length.
    pub fn create_texture_from_buffer(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Texture> {
        let texture_type = self.default_texture_type;
        self.create_texture_from_buffer_with(pixels, width, height, format, texture_type)
    }

    /// Like [`create_texture_from_buffer`](Self::create_texture_from_buffer) with an
    /// explicit [`TextureType`].
    pub fn create_texture_from_buffer_with(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        texture_type: TextureType,
    ) -> Result<Texture> {
        let label = self.next_label("buffer");
        self.create_texture(
            label,
            TextureSource::Buffer,
            DecodedImage {
                width,
                height,
                format,
                pixels: pixels.to_vec(),
            },
            texture_type,
        )
    }

    /// Creates a `width x height` RGBA texture filled with `color`.
    pub fn create_filled_texture(&mut self, width: u32, height: u32, color: Color) -> Result<Texture> {
        let len = PixelFormat::Rgba8.buffer_len(width, height).ok_or_else(|| {
            Error::InvalidParameter(format!("{width}x{height} texture is too large"))
        })?;
        let pixels: Vec<u8> = color.to_rgba8().iter().copied().cycle().take(len).collect();
        let texture_type = self.default_texture_type;
        self.create_texture_from_buffer_with(&pixels, width, height, PixelFormat::Rgba8, texture_type)
    }

    /// Creates a texture from the named resource.
    ///
    /// # Errors
    /// - [`Error::ResourceNotFound`] if no loader is configured or `name` does not
    ///   resolve.
    /// - [`Error::UnsupportedFormat`] if the image cannot be decoded or stored.
    pub fn create_texture_from_resource(&mut self, name: &str) -> Result<Texture> {
        let texture_type = self.default_texture_type;
        self.create_texture_from_resource_with(name, texture_type)
    }

    /// Like [`create_texture_from_resource`](Self::create_texture_from_resource) with
    /// an explicit [`TextureType`].
    pub fn create_texture_from_resource_with(
        &mut self,
        name: &str,
        texture_type: TextureType,
    ) -> Result<Texture> {
        self.ensure_active()?;
        let resources = self.resources().ok_or_else(|| {
            Error::ResourceNotFound(format!("{name} (no resource loader configured)"))
        })?;
        let image = resources.load_image(name)?;
        self.create_texture(
            name.to_string(),
            TextureSource::Resource {
                name: name.to_string(),
            },
            image,
            texture_type,
        )
    }

    /// Creates a texture for the named resource without decoding or uploading it.
    ///
    /// The texture reports a `0x0` size until [`Texture::load`] succeeds. Context
    /// recreation skips it while it is unloaded.
    ///
    /// # Errors
    /// [`Error::ResourceNotFound`] if no loader is configured or `name` does not
    /// resolve.
    pub fn create_texture_from_resource_deferred(
        &mut self,
        name: &str,
        texture_type: TextureType,
    ) -> Result<Texture> {
        self.ensure_active()?;
        let resources = self.resources().ok_or_else(|| {
            Error::ResourceNotFound(format!("{name} (no resource loader configured)"))
        })?;
        if !resources.exists(name) {
            return Err(Error::ResourceNotFound(name.to_string()));
        }
        log::debug!("Registered texture '{name}' for deferred loading ({texture_type:?})");
        Ok(self.register(TextureRecord {
            label: name.to_string(),
            width: 0,
            height: 0,
            format: PixelFormat::Rgba8,
            source: TextureSource::Resource {
                name: name.to_string(),
            },
            texture_type,
            filter: Filter::default(),
            address_mode: AddressMode::default(),
            handle: None,
            pixels: None,
            unloaded: true,
            destroyed: false,
        }))
    }

    /// Creates a render-target texture.
    pub fn create_render_target(&mut self, width: u32, height: u32) -> Result<Texture> {
        self.ensure_active()?;
        self.core.borrow().check_dimensions(width, height)?;
        let label = self.next_label("target");
        let desc = TextureDescriptor {
            label: label.clone(),
            width,
            height,
            format: PixelFormat::Rgba8,
            render_target: true,
        };
        let handle = self.forward(|backend| backend.create_texture(&desc))?;
        log::debug!("Created render target '{label}' ({width}x{height})");
        Ok(self.register(TextureRecord {
            label,
            width,
            height,
            format: PixelFormat::Rgba8,
            source: TextureSource::RenderTarget,
            texture_type: TextureType::Volatile,
            filter: Filter::default(),
            address_mode: AddressMode::default(),
            handle: Some(handle),
            pixels: None,
            unloaded: false,
            destroyed: false,
        }))
    }

    fn create_texture(
        &mut self,
        label: String,
        source: TextureSource,
        image: DecodedImage,
        texture_type: TextureType,
    ) -> Result<Texture> {
        self.ensure_active()?;
        let DecodedImage {
            width,
            height,
            format,
            pixels,
        } = image;
        {
            let core = self.core.borrow();
            core.check_dimensions(width, height)?;
            core.check_format(format)?;
        }
        if format.buffer_len(width, height) != Some(pixels.len()) {
            return Err(Error::InvalidParameter(format!(
                "{width}x{height} {format:?} texture needs {:?} bytes, got {}",
                format.buffer_len(width, height),
                pixels.len()
            )));
        }

        let desc = TextureDescriptor {
            label: label.clone(),
            width,
            height,
            format,
            render_target: false,
        };
        let handle = self.forward(|backend| upload_new(backend, &desc, &pixels))?;
        log::debug!("Created texture '{label}' ({width}x{height} {format:?}, {texture_type:?})");

        let pixels = match texture_type {
            TextureType::Managed => Some(pixels),
            TextureType::Volatile => None,
        };
        Ok(self.register(TextureRecord {
            label,
            width,
            height,
            format,
            source,
            texture_type,
            filter: Filter::default(),
            address_mode: AddressMode::default(),
            handle: Some(handle),
            pixels,
            unloaded: false,
            destroyed: false,
        }))
    }

    fn register(&mut self, record: TextureRecord) -> Texture {
        let record = Rc::new(RefCell::new(record));
        let key = self.core.borrow_mut().textures.insert(Rc::downgrade(&record));
        Texture {
            key,
            record,
            core: Rc::downgrade(&self.core),
        }
    }

    // --- Context loss ---

    /// Reports a context loss. Every texture handle becomes invalid.
    ///
    /// Calling this while already lost does nothing.
    pub fn notify_context_lost(&mut self) -> Result<()> {
        match self.context_state() {
            ContextState::Destroyed => Err(Error::NotInitialized),
            ContextState::Active | ContextState::Recreating => {
                self.core.borrow_mut().mark_lost();
                Ok(())
            }
            ContextState::Lost => Ok(()),
        }
    }

    /// Releases the device memory of every texture without destroying it.
    ///
    /// Unloaded textures keep their metadata and CPU copy and come back through
    /// [`Texture::load`]. Context recreation skips them. Allowed while the context
    /// is lost. Returns the number of textures unloaded.
    pub fn unload_textures(&mut self) -> Result<usize> {
        self.ensure_alive()?;
        let mut core = self.core.borrow_mut();
        let mut count = 0;
        for record in core.live_records() {
            let mut record = record.borrow_mut();
            if record.destroyed || record.unloaded {
                continue;
            }
            if let Some(handle) = record.handle.take() {
                core.backend.destroy_texture(handle);
            }
            record.unloaded = true;
            count += 1;
        }
        core.render_target = None;
        log::info!("Unloaded {count} textures");
        Ok(count)
    }

    /// Restores every texture invalidated by a context loss.
    ///
    /// Textures with no remaining pixel source stay invalid. They are logged and
    /// listed in the returned report, and do not block the return to
    /// [`ContextState::Active`]. Calling this while active is a no-op.
    ///
    /// # Errors
    /// [`Error::ContextInvalid`] if the backend cannot reacquire its device. The state
    /// then stays [`ContextState::Lost`] and the call can be retried.
    pub fn recreate_textures(&mut self) -> Result<RecreateReport> {
        match self.context_state() {
            ContextState::Destroyed => return Err(Error::NotInitialized),
            ContextState::Active => return Ok(RecreateReport::default()),
            ContextState::Lost | ContextState::Recreating => {}
        }

        let mut core = self.core.borrow_mut();
        let core = &mut *core;
        core.state = ContextState::Recreating;
        if let Err(err) = core.backend.restore_device() {
            core.state = ContextState::Lost;
            log::warn!("Could not reacquire the render device: {err}");
            return Err(Error::ContextInvalid);
        }

        core.textures.retain(|_, w| w.strong_count() > 0);
        let records = core.live_records();
        let mut report = RecreateReport::default();
        for record in records {
            let mut record = record.borrow_mut();
            if record.destroyed || record.unloaded || record.handle.is_some() {
                continue;
            }
            match core.load_record(&mut record) {
                Ok(handle) => {
                    record.handle = Some(handle);
                    report.restored += 1;
                }
                Err(err) => {
                    log::warn!("Texture '{}' could not be restored: {err}", record.label);
                    report.failed.push((record.label.clone(), err));
                }
            }
        }

        core.state = ContextState::Active;
        log::info!(
            "Render context restored: {} textures recreated, {} left invalid",
            report.restored,
            report.failed.len()
        );
        Ok(report)
    }

    // --- Shutdown ---

    /// Releases every texture handle and the device. Terminal.
    ///
    /// Live textures stay readable but invalid, and destroying them afterwards is a
    /// no-op.
    pub fn shutdown(&mut self) {
        let mut core = self.core.borrow_mut();
        if core.state == ContextState::Destroyed {
            return;
        }
        let records = core.live_records();
        for record in &records {
            if let Some(handle) = record.borrow_mut().handle.take() {
                core.backend.destroy_texture(handle);
            }
        }
        core.textures.clear();
        core.backend.shutdown();
        core.state = ContextState::Destroyed;
        core.render_target = None;
        self.bound_texture = None;
        log::info!(
            "Render system shut down ({} live textures invalidated)",
            records.len()
        );
    }
}

impl Drop for RenderSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn quad(rect: Rect, uv: Rect) -> [TexturedVertex; 4] {
    let (x0, y0, x1, y1) = (rect.x, rect.y, rect.x + rect.w, rect.y + rect.h);
    let (u0, v0, u1, v1) = (uv.x, uv.y, uv.x + uv.w, uv.y + uv.h);
    [
        TexturedVertex::new(x0, y0, 0.0, u0, v0),
        TexturedVertex::new(x1, y0, 0.0, u1, v0),
        TexturedVertex::new(x0, y1, 0.0, u0, v1),
        TexturedVertex::new(x1, y1, 0.0, u1, v1),
    ]
}

/// Allocates a texture and uploads its full contents, freeing it again on failure.
fn upload_new(
    backend: &mut dyn RenderBackend,
    desc: &TextureDescriptor,
    pixels: &[u8],
) -> Result<DeviceHandle> {
    let handle = backend.create_texture(desc)?;
    let region = TextureRegion::full(desc.width, desc.height);
    if let Err(err) = backend.upload_texture(handle, region, desc.format, pixels) {
        backend.destroy_texture(handle);
        return Err(err);
    }
    Ok(handle)
}
