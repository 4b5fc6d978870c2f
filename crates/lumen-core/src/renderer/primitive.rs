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

//! Primitive topologies and the vertex layouts consumed by `render`.

use crate::error::{Error, Result};
use crate::math::Vec3;

/// How a vertex sequence is assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Every three vertices form an independent triangle.
    TriangleList,
    /// Each vertex after the first two forms a triangle with the previous two.
    TriangleStrip,
    /// Each vertex after the first two forms a triangle with the previous one and the first.
    TriangleFan,
    /// Every two vertices form an independent line.
    LineList,
    /// Each vertex after the first forms a line with the previous one.
    LineStrip,
    /// Every vertex is a point.
    PointList,
}

impl PrimitiveKind {
    /// All primitive kinds, in declaration order.
    pub const ALL: [PrimitiveKind; 6] = [
        PrimitiveKind::TriangleList,
        PrimitiveKind::TriangleStrip,
        PrimitiveKind::TriangleFan,
        PrimitiveKind::LineList,
        PrimitiveKind::LineStrip,
        PrimitiveKind::PointList,
    ];

    /// The smallest vertex count that yields one primitive.
    pub const fn min_vertices(self) -> usize {
        match self {
            PrimitiveKind::TriangleList
            | PrimitiveKind::TriangleStrip
            | PrimitiveKind::TriangleFan => 3,
            PrimitiveKind::LineList | PrimitiveKind::LineStrip => 2,
            PrimitiveKind::PointList => 1,
        }
    }

    /// Number of primitives `count` vertices produce.
    pub const fn primitive_count(self, count: usize) -> usize {
        match self {
            PrimitiveKind::TriangleList => count / 3,
            PrimitiveKind::TriangleStrip | PrimitiveKind::TriangleFan => count.saturating_sub(2),
            PrimitiveKind::LineList => count / 2,
            PrimitiveKind::LineStrip => count.saturating_sub(1),
            PrimitiveKind::PointList => count,
        }
    }

    /// Checks that `count` vertices form a whole number of primitives.
    pub fn validate_count(self, count: usize) -> Result<()> {
        let whole = match self {
            PrimitiveKind::TriangleList => count % 3 == 0,
            PrimitiveKind::LineList => count % 2 == 0,
            _ => true,
        };
        if count < self.min_vertices() || !whole {
            return Err(Error::InvalidParameter(format!(
                "{count} vertices is not a valid {self:?} count"
            )));
        }
        Ok(())
    }
}

/// A vertex as supplied by callers: position plus texture coordinate, tightly packed.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct TexturedVertex {
    /// Position x.
    pub x: f32,
    /// Position y.
    pub y: f32,
    /// Position z.
    pub z: f32,
    /// Texture coordinate u.
    pub u: f32,
    /// Texture coordinate v.
    pub v: f32,
}

impl TexturedVertex {
    /// Creates a new vertex.
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, u: f32, v: f32) -> Self {
        Self { x, y, z, u, v }
    }

    /// The position part of the vertex.
    #[inline]
    pub const fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// A vertex after the projection, view and model transforms, as handed to backends.
#[derive(Debug, Clone, Copy, PartialEq, Default, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct ClipVertex {
    /// Homogeneous clip-space position.
    pub position: [f32; 4],
    /// Texture coordinate.
    pub uv: [f32; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_counts() {
        assert_eq!(PrimitiveKind::TriangleList.primitive_count(9), 3);
        assert_eq!(PrimitiveKind::TriangleStrip.primitive_count(4), 2);
        assert_eq!(PrimitiveKind::TriangleFan.primitive_count(6), 4);
        assert_eq!(PrimitiveKind::LineList.primitive_count(6), 3);
        assert_eq!(PrimitiveKind::LineStrip.primitive_count(5), 4);
        assert_eq!(PrimitiveKind::PointList.primitive_count(7), 7);
    }

    #[test]
    fn test_validate_count_minimums() {
        assert!(PrimitiveKind::TriangleStrip.validate_count(2).is_err());
        assert!(PrimitiveKind::TriangleStrip.validate_count(3).is_ok());
        assert!(PrimitiveKind::TriangleFan.validate_count(2).is_err());
        assert!(PrimitiveKind::LineStrip.validate_count(1).is_err());
        assert!(PrimitiveKind::LineStrip.validate_count(2).is_ok());
        assert!(PrimitiveKind::PointList.validate_count(0).is_err());
        assert!(PrimitiveKind::PointList.validate_count(1).is_ok());
    }

    #[test]
    fn test_validate_count_whole_primitives() {
        assert!(PrimitiveKind::TriangleList.validate_count(6).is_ok());
        assert!(PrimitiveKind::TriangleList.validate_count(7).is_err());
        assert!(PrimitiveKind::LineList.validate_count(4).is_ok());
        assert!(PrimitiveKind::LineList.validate_count(5).is_err());
        // Strips accept any count past the minimum.
        assert!(PrimitiveKind::TriangleStrip.validate_count(7).is_ok());
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<TexturedVertex>(), 5 * 4);
        assert_eq!(std::mem::size_of::<ClipVertex>(), 6 * 4);
    }
}
