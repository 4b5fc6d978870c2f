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

//! Scanline-free rasterization over an RGBA8 canvas.
//!
//! Triangles are filled with edge functions and the top-left rule, so two
//! triangles sharing an edge never touch the same pixel twice. Lines are walked
//! with a DDA after clipping to the scissor box. Nothing is depth tested: draws
//! land in submission order.

use lumen_core::math::{Color, Rect};
use lumen_core::renderer::{AddressMode, BlendMode, ClipVertex, Filter, PrimitiveKind};

/// Primitives with a vertex at or behind this `w` are discarded.
const NEAR_W: f32 = 1e-6;

/// A mutable RGBA8 pixel buffer.
pub(crate) struct Canvas<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: &'a mut [u8],
}

impl Canvas<'_> {
    pub(crate) fn clear(&mut self, color: Color) {
        let rgba = color.to_rgba8();
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

/// An RGBA8 texture with its sampling state.
pub(crate) struct Sampler<'a> {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) pixels: &'a [u8],
    pub(crate) filter: Filter,
    pub(crate) address_mode: AddressMode,
}

impl Sampler<'_> {
    fn address(&self, i: i64, n: u32) -> usize {
        let n = i64::from(n);
        match self.address_mode {
            AddressMode::Wrap => i.rem_euclid(n) as usize,
            AddressMode::Clamp => i.clamp(0, n - 1) as usize,
        }
    }

    fn texel(&self, x: i64, y: i64) -> [f32; 4] {
        let x = self.address(x, self.width);
        let y = self.address(y, self.height);
        let i = (y * self.width as usize + x) * 4;
        let p = &self.pixels[i..i + 4];
        [
            f32::from(p[0]) / 255.0,
            f32::from(p[1]) / 255.0,
            f32::from(p[2]) / 255.0,
            f32::from(p[3]) / 255.0,
        ]
    }

    fn sample(&self, u: f32, v: f32) -> Color {
        let fx = texel_coord(u, self.width);
        let fy = texel_coord(v, self.height);
        let texel = match self.filter {
            Filter::Nearest => self.texel(fx.floor() as i64, fy.floor() as i64),
            Filter::Linear => {
                let (fx, fy) = (fx - 0.5, fy - 0.5);
                let (x0, y0) = (fx.floor(), fy.floor());
                let (tx, ty) = (fx - x0, fy - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);
                let t00 = self.texel(x0, y0);
                let (x1, y1) = (x0.saturating_add(1), y0.saturating_add(1));
                let t10 = self.texel(x1, y0);
                let t01 = self.texel(x0, y1);
                let t11 = self.texel(x1, y1);
                std::array::from_fn(|c| {
                    let top = t00[c] + (t10[c] - t00[c]) * tx;
                    let bottom = t01[c] + (t11[c] - t01[c]) * tx;
                    top + (bottom - top) * ty
                })
            }
        };
        Color::new(texel[0], texel[1], texel[2], texel[3])
    }
}

/// Scales a normalized coordinate to texels. Non-finite input maps to the
/// first texel, and the result stays in the range an `i64` can hold.
fn texel_coord(t: f32, n: u32) -> f32 {
    const LIMIT: f32 = (1u64 << 52) as f32;
    let x = t * n as f32;
    if x.is_finite() {
        x.clamp(-LIMIT, LIMIT)
    } else {
        0.0
    }
}

/// A vertex in target pixel space, with perspective-divided attributes.
#[derive(Debug, Clone, Copy)]
struct ScreenVertex {
    x: f32,
    y: f32,
    inv_w: f32,
    u_w: f32,
    v_w: f32,
}

impl ScreenVertex {
    fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        Self {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            inv_w: a.inv_w + (b.inv_w - a.inv_w) * t,
            u_w: a.u_w + (b.u_w - a.u_w) * t,
            v_w: a.v_w + (b.v_w - a.v_w) * t,
        }
    }

    fn uv(&self) -> (f32, f32) {
        (self.u_w / self.inv_w, self.v_w / self.inv_w)
    }
}

/// Everything fixed for the duration of one draw call.
pub(crate) struct Raster<'a, 'b> {
    canvas: &'a mut Canvas<'b>,
    sampler: Option<&'a Sampler<'a>>,
    color: Color,
    blend: BlendMode,
    viewport: Rect,
    // Scissor box in whole pixels, `[min, max)` on both axes.
    min_x: i64,
    min_y: i64,
    max_x: i64,
    max_y: i64,
}

impl<'a, 'b> Raster<'a, 'b> {
    pub(crate) fn new(
        canvas: &'a mut Canvas<'b>,
        sampler: Option<&'a Sampler<'a>>,
        color: Color,
        blend: BlendMode,
        viewport: Option<Rect>,
    ) -> Self {
        let viewport = viewport
            .unwrap_or_else(|| Rect::new(0.0, 0.0, canvas.width as f32, canvas.height as f32));
        let min_x = (viewport.x.floor() as i64).max(0);
        let min_y = (viewport.y.floor() as i64).max(0);
        let max_x = ((viewport.x + viewport.w).ceil() as i64).min(i64::from(canvas.width));
        let max_y = ((viewport.y + viewport.h).ceil() as i64).min(i64::from(canvas.height));
        Self {
            canvas,
            sampler,
            color,
            blend,
            viewport,
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Rasterizes `vertices` assembled as `kind`.
    pub(crate) fn draw(&mut self, kind: PrimitiveKind, vertices: &[ClipVertex]) {
        if self.min_x >= self.max_x || self.min_y >= self.max_y {
            return;
        }
        let projected: Vec<Option<ScreenVertex>> =
            vertices.iter().map(|v| self.project(v)).collect();
        let get = |i: usize| projected[i];

        match kind {
            PrimitiveKind::TriangleList => {
                for i in (0..projected.len() / 3 * 3).step_by(3) {
                    self.triangle_opt(get(i), get(i + 1), get(i + 2));
                }
            }
            PrimitiveKind::TriangleStrip => {
                for i in 0..projected.len().saturating_sub(2) {
                    self.triangle_opt(get(i), get(i + 1), get(i + 2));
                }
            }
            PrimitiveKind::TriangleFan => {
                for i in 1..projected.len().saturating_sub(1) {
                    self.triangle_opt(get(0), get(i), get(i + 1));
                }
            }
            PrimitiveKind::LineList => {
                for i in (0..projected.len() / 2 * 2).step_by(2) {
                    if let (Some(a), Some(b)) = (get(i), get(i + 1)) {
                        self.line(a, b);
                    }
                }
            }
            PrimitiveKind::LineStrip => {
                for i in 0..projected.len().saturating_sub(1) {
                    if let (Some(a), Some(b)) = (get(i), get(i + 1)) {
                        self.line(a, b);
                    }
                }
            }
            PrimitiveKind::PointList => {
                for v in projected.iter().flatten() {
                    self.plot(v.x.floor() as i64, v.y.floor() as i64, v.uv());
                }
            }
        }
    }

    fn project(&self, v: &ClipVertex) -> Option<ScreenVertex> {
        let [x, y, _, w] = v.position;
        if w.is_nan() || w <= NEAR_W || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let inv_w = 1.0 / w;
        let (ndc_x, ndc_y) = (x * inv_w, y * inv_w);
        Some(ScreenVertex {
            x: self.viewport.x + (ndc_x + 1.0) * 0.5 * self.viewport.w,
            y: self.viewport.y + (1.0 - ndc_y) * 0.5 * self.viewport.h,
            inv_w,
            u_w: v.uv[0] * inv_w,
            v_w: v.uv[1] * inv_w,
        })
    }

    fn triangle_opt(
        &mut self,
        a: Option<ScreenVertex>,
        b: Option<ScreenVertex>,
        c: Option<ScreenVertex>,
    ) {
        if let (Some(a), Some(b), Some(c)) = (a, b, c) {
            self.triangle(a, b, c);
        }
    }

    fn triangle(&mut self, a: ScreenVertex, b: ScreenVertex, c: ScreenVertex) {
        let area = edge(&a, &b, c.x, c.y);
        if area.abs() <= f32::EPSILON {
            return;
        }
        // Counter-clockwise in edge-function terms from here on.
        let (b, c) = if area < 0.0 { (c, b) } else { (b, c) };
        let area = area.abs();

        let min_x = (a.x.min(b.x).min(c.x).floor() as i64).max(self.min_x);
        let min_y = (a.y.min(b.y).min(c.y).floor() as i64).max(self.min_y);
        let max_x = (a.x.max(b.x).max(c.x).ceil() as i64).min(self.max_x);
        let max_y = (a.y.max(b.y).max(c.y).ceil() as i64).min(self.max_y);

        for py in min_y..max_y {
            let cy = py as f32 + 0.5;
            for px in min_x..max_x {
                let cx = px as f32 + 0.5;
                let w0 = edge(&b, &c, cx, cy);
                let w1 = edge(&c, &a, cx, cy);
                let w2 = edge(&a, &b, cx, cy);
                if !(covers(w0, &b, &c) && covers(w1, &c, &a) && covers(w2, &a, &b)) {
                    continue;
                }
                let (l0, l1, l2) = (w0 / area, w1 / area, w2 / area);
                let inv_w = l0 * a.inv_w + l1 * b.inv_w + l2 * c.inv_w;
                let u = (l0 * a.u_w + l1 * b.u_w + l2 * c.u_w) / inv_w;
                let v = (l0 * a.v_w + l1 * b.v_w + l2 * c.v_w) / inv_w;
                self.plot(px, py, (u, v));
            }
        }
    }

    fn line(&mut self, a: ScreenVertex, b: ScreenVertex) {
        let Some((t0, t1)) = self.clip_segment(&a, &b) else {
            return;
        };
        let start = ScreenVertex::lerp(&a, &b, t0);
        let end = ScreenVertex::lerp(&a, &b, t1);
        let steps = (end.x - start.x).abs().max((end.y - start.y).abs()).ceil() as usize;
        let steps = steps.max(1);
        for i in 0..=steps {
            let p = ScreenVertex::lerp(&start, &end, i as f32 / steps as f32);
            self.plot(p.x.floor() as i64, p.y.floor() as i64, p.uv());
        }
    }

    /// Liang-Barsky clip of `a -> b` against the scissor box.
    fn clip_segment(&self, a: &ScreenVertex, b: &ScreenVertex) -> Option<(f32, f32)> {
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let mut t0 = 0.0_f32;
        let mut t1 = 1.0_f32;
        let checks = [
            (-dx, a.x - self.min_x as f32),
            (dx, self.max_x as f32 - a.x),
            (-dy, a.y - self.min_y as f32),
            (dy, self.max_y as f32 - a.y),
        ];
        for (p, q) in checks {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }
        Some((t0, t1))
    }

    fn plot(&mut self, x: i64, y: i64, (u, v): (f32, f32)) {
        if x < self.min_x || x >= self.max_x || y < self.min_y || y >= self.max_y {
            return;
        }
        let src = match self.sampler {
            Some(sampler) => sampler.sample(u, v).modulate(self.color),
            None => self.color,
        };
        let i = (y as usize * self.canvas.width as usize + x as usize) * 4;
        blend(&mut self.canvas.pixels[i..i + 4], src, self.blend);
    }
}

fn edge(a: &ScreenVertex, b: &ScreenVertex, px: f32, py: f32) -> f32 {
    (b.x - a.x) * (py - a.y) - (b.y - a.y) * (px - a.x)
}

/// Top-left fill rule: a pixel center exactly on an edge belongs to the
/// triangle only if the edge is a top or left edge.
fn covers(w: f32, from: &ScreenVertex, to: &ScreenVertex) -> bool {
    if w != 0.0 {
        return w > 0.0;
    }
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    dy < 0.0 || (dy == 0.0 && dx > 0.0)
}

fn blend(dst: &mut [u8], src: Color, mode: BlendMode) {
    let d = [
        f32::from(dst[0]) / 255.0,
        f32::from(dst[1]) / 255.0,
        f32::from(dst[2]) / 255.0,
        f32::from(dst[3]) / 255.0,
    ];
    let s = [src.r, src.g, src.b];
    let a = src.a;
    let out = match mode {
        BlendMode::Alpha => [
            s[0] * a + d[0] * (1.0 - a),
            s[1] * a + d[1] * (1.0 - a),
            s[2] * a + d[2] * (1.0 - a),
            a + d[3] * (1.0 - a),
        ],
        BlendMode::Add => [
            d[0] + s[0] * a,
            d[1] + s[1] * a,
            d[2] + s[2] * a,
            d[3] + a,
        ],
        BlendMode::Subtract => [d[0] - s[0] * a, d[1] - s[1] * a, d[2] - s[2] * a, d[3]],
        BlendMode::Overwrite => [s[0], s[1], s[2], a],
    };
    for (dst, value) in dst.iter_mut().zip(out) {
        *dst = (value.clamp(0.0, 1.0) * 255.0).round() as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(x: f32, y: f32) -> ClipVertex {
        ClipVertex {
            position: [x, y, 0.0, 1.0],
            uv: [(x + 1.0) * 0.5, (1.0 - y) * 0.5],
        }
    }

    fn canonical_quad() -> Vec<ClipVertex> {
        vec![clip(-1.0, 1.0), clip(1.0, 1.0), clip(-1.0, -1.0), clip(1.0, -1.0)]
    }

    fn draw(
        pixels: &mut [u8],
        size: u32,
        kind: PrimitiveKind,
        vertices: &[ClipVertex],
        color: Color,
        blend: BlendMode,
        viewport: Option<Rect>,
    ) {
        let mut canvas = Canvas {
            width: size,
            height: size,
            pixels,
        };
        Raster::new(&mut canvas, None, color, blend, viewport).draw(kind, vertices);
    }

    fn pixel(pixels: &[u8], size: u32, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * size + x) * 4) as usize;
        [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
    }

    #[test]
    fn test_canonical_quad_covers_target() {
        for size in [1, 2, 7, 16, 33] {
            let mut pixels = vec![0; (size * size * 4) as usize];
            draw(
                &mut pixels,
                size,
                PrimitiveKind::TriangleStrip,
                &canonical_quad(),
                Color::RED,
                BlendMode::Alpha,
                None,
            );
            assert!(
                pixels.chunks_exact(4).all(|p| p == [255, 0, 0, 255]),
                "uncovered pixels at size {size}"
            );
        }
    }

    #[test]
    fn test_shared_edge_is_filled_once() {
        let size = 8;
        let mut pixels = vec![0; (size * size * 4) as usize];
        draw(
            &mut pixels,
            size,
            PrimitiveKind::TriangleStrip,
            &canonical_quad(),
            Color::new(1.0, 1.0, 1.0, 0.4),
            BlendMode::Add,
            None,
        );
        let first = pixel(&pixels, size, 0, 0);
        assert!(pixels.chunks_exact(4).all(|p| p == first));
    }

    #[test]
    fn test_fan_and_list_match_strip() {
        let size = 12;
        let quad = canonical_quad();
        let fan = [quad[0], quad[1], quad[3], quad[2]];
        let list = [quad[0], quad[1], quad[2], quad[1], quad[3], quad[2]];
        for (kind, verts) in [
            (PrimitiveKind::TriangleFan, &fan[..]),
            (PrimitiveKind::TriangleList, &list[..]),
        ] {
            let mut pixels = vec![0; (size * size * 4) as usize];
            draw(&mut pixels, size, kind, verts, Color::GREEN, BlendMode::Overwrite, None);
            assert!(pixels.chunks_exact(4).all(|p| p == [0, 255, 0, 255]), "{kind:?}");
        }
    }

    #[test]
    fn test_vertex_behind_eye_discards_triangle() {
        let size = 4;
        let mut pixels = vec![0; (size * size * 4) as usize];
        let mut quad = canonical_quad();
        quad[0].position[3] = -1.0;
        draw(
            &mut pixels,
            size,
            PrimitiveKind::TriangleList,
            &quad[..3],
            Color::WHITE,
            BlendMode::Overwrite,
            None,
        );
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_viewport_restricts_coverage() {
        let size = 8;
        let mut pixels = vec![0; (size * size * 4) as usize];
        draw(
            &mut pixels,
            size,
            PrimitiveKind::TriangleStrip,
            &canonical_quad(),
            Color::WHITE,
            BlendMode::Overwrite,
            Some(Rect::new(0.0, 0.0, 4.0, 4.0)),
        );
        assert_eq!(pixel(&pixels, size, 3, 3), [255; 4]);
        assert_eq!(pixel(&pixels, size, 4, 3), [0; 4]);
        assert_eq!(pixel(&pixels, size, 3, 4), [0; 4]);
    }

    #[test]
    fn test_line_and_points() {
        let size = 5;
        let mut pixels = vec![0; (size * size * 4) as usize];
        // A horizontal line through the middle row, pixel centers to pixel centers.
        let y = 1.0 - 2.5 / 5.0 * 2.0;
        let x0 = 0.5 / 5.0 * 2.0 - 1.0;
        let x1 = 4.5 / 5.0 * 2.0 - 1.0;
        draw(
            &mut pixels,
            size,
            PrimitiveKind::LineList,
            &[clip(x0, y), clip(x1, y)],
            Color::BLUE,
            BlendMode::Overwrite,
            None,
        );
        for x in 0..size {
            assert_eq!(pixel(&pixels, size, x, 2), [0, 0, 255, 255]);
        }
        assert_eq!(pixel(&pixels, size, 2, 1), [0; 4]);

        draw(
            &mut pixels,
            size,
            PrimitiveKind::PointList,
            &[clip(x0, 1.0 - 0.5 / 5.0 * 2.0)],
            Color::RED,
            BlendMode::Overwrite,
            None,
        );
        assert_eq!(pixel(&pixels, size, 0, 0), [255, 0, 0, 255]);
    }

    #[test]
    fn test_blend_modes() {
        let mut dst = [100, 100, 100, 255];
        blend(&mut dst, Color::new(1.0, 1.0, 1.0, 0.4), BlendMode::Add);
        assert_eq!(dst, [202, 202, 202, 255]);

        let mut dst = [100, 100, 100, 255];
        blend(&mut dst, Color::new(1.0, 1.0, 1.0, 0.2), BlendMode::Subtract);
        assert_eq!(dst, [49, 49, 49, 255]);

        let mut dst = [0, 0, 0, 0];
        blend(&mut dst, Color::new(1.0, 0.0, 0.0, 0.6), BlendMode::Alpha);
        assert_eq!(dst, [153, 0, 0, 153]);

        let mut dst = [9, 9, 9, 9];
        blend(&mut dst, Color::TRANSPARENT, BlendMode::Overwrite);
        assert_eq!(dst, [0; 4]);
    }

    #[test]
    fn test_sampler_nearest_and_wrap() {
        // 2x1: red, blue.
        let pixels = [255, 0, 0, 255, 0, 0, 255, 255];
        let mut sampler = Sampler {
            width: 2,
            height: 1,
            pixels: &pixels,
            filter: Filter::Nearest,
            address_mode: AddressMode::Clamp,
        };
        assert_eq!(sampler.sample(0.25, 0.5), Color::RED);
        assert_eq!(sampler.sample(0.75, 0.5), Color::BLUE);
        assert_eq!(sampler.sample(1.25, 0.5), Color::BLUE);

        sampler.address_mode = AddressMode::Wrap;
        assert_eq!(sampler.sample(1.25, 0.5), Color::RED);

        sampler.filter = Filter::Linear;
        sampler.address_mode = AddressMode::Clamp;
        let mid = sampler.sample(0.5, 0.5);
        assert!((mid.r - 0.5).abs() < 1e-6 && (mid.b - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_sampler_survives_extreme_coordinates() {
        let pixels = [255, 0, 0, 255, 0, 0, 255, 255];
        for (filter, address_mode) in [
            (Filter::Linear, AddressMode::Clamp),
            (Filter::Linear, AddressMode::Wrap),
            (Filter::Nearest, AddressMode::Wrap),
        ] {
            let sampler = Sampler {
                width: 2,
                height: 1,
                pixels: &pixels,
                filter,
                address_mode,
            };
            for t in [1e30, -1e30, f32::MAX, f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
                let c = sampler.sample(t, t);
                assert!(c.r.is_finite() && c.b.is_finite(), "{filter:?} {t}");
            }
        }
        // Clamping pins a huge coordinate to the last texel.
        let sampler = Sampler {
            width: 2,
            height: 1,
            pixels: &pixels,
            filter: Filter::Linear,
            address_mode: AddressMode::Clamp,
        };
        assert_eq!(sampler.sample(1e30, 0.5), Color::BLUE);
    }
}
