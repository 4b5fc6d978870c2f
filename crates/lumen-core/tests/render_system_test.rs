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

mod common;

use approx::assert_abs_diff_eq;
use common::{Command, RecordingBackend};
use lumen_core::math::{degrees_to_radians, Color, Mat4, Rect, Vec3};
use lumen_core::renderer::{BlendMode, ContextState, PixelFormat, PrimitiveKind, TexturedVertex};
use lumen_core::{Error, RenderSystem};

fn render_system() -> (RenderSystem, RecordingBackend) {
    let backend = RecordingBackend::new();
    (RenderSystem::new(Box::new(backend.clone())), backend)
}

fn canonical_quad() -> [TexturedVertex; 4] {
    [
        TexturedVertex::new(-1.0, 1.0, 0.0, 0.0, 0.0),
        TexturedVertex::new(1.0, 1.0, 0.0, 1.0, 0.0),
        TexturedVertex::new(-1.0, -1.0, 0.0, 0.0, 1.0),
        TexturedVertex::new(1.0, -1.0, 0.0, 1.0, 1.0),
    ]
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Rotate(f32, f32, f32, f32),
    Translate(f32, f32, f32),
    Scale(f32, f32, f32),
}

fn apply(rs: &mut RenderSystem, op: Op) {
    match op {
        Op::Rotate(a, x, y, z) => rs.rotate(a, x, y, z).unwrap(),
        Op::Translate(x, y, z) => rs.translate(x, y, z).unwrap(),
        Op::Scale(x, y, z) => rs.scale(x, y, z).unwrap(),
    }
}

fn matrix_of(op: Op) -> Mat4 {
    match op {
        Op::Rotate(a, x, y, z) => {
            Mat4::from_axis_angle(Vec3::new(x, y, z), degrees_to_radians(a)).unwrap()
        }
        Op::Translate(x, y, z) => Mat4::from_translation(Vec3::new(x, y, z)),
        Op::Scale(x, y, z) => Mat4::from_scale(Vec3::new(x, y, z)),
    }
}

#[test]
fn test_model_transform_follows_call_order() {
    let sequences = [
        vec![Op::Translate(1.0, 2.0, 3.0), Op::Rotate(90.0, 0.0, 0.0, 1.0)],
        vec![Op::Rotate(90.0, 0.0, 0.0, 1.0), Op::Translate(1.0, 2.0, 3.0)],
        vec![
            Op::Scale(2.0, 1.0, 0.5),
            Op::Rotate(33.0, 1.0, 1.0, 0.0),
            Op::Translate(-4.0, 0.0, 7.0),
            Op::Rotate(-12.0, 0.0, 1.0, 0.0),
        ],
        vec![
            Op::Rotate(45.0, 0.0, 1.0, 0.0),
            Op::Rotate(45.0, 1.0, 0.0, 0.0),
            Op::Scale(3.0, 3.0, 3.0),
        ],
    ];

    for ops in sequences {
        let (mut rs, _) = render_system();
        let mut expected = Mat4::IDENTITY;
        for op in &ops {
            apply(&mut rs, *op);
            expected = expected * matrix_of(*op);
        }
        assert_abs_diff_eq!(rs.model_matrix(), expected, epsilon = 1e-4);
    }
}

#[test]
fn test_transform_order_is_observable() {
    let (mut a, _) = render_system();
    a.translate(1.0, 0.0, 0.0).unwrap();
    a.rotate(90.0, 0.0, 0.0, 1.0).unwrap();

    let (mut b, _) = render_system();
    b.rotate(90.0, 0.0, 0.0, 1.0).unwrap();
    b.translate(1.0, 0.0, 0.0).unwrap();

    let pa = a.model_matrix().transform_point(Vec3::X).truncate();
    let pb = b.model_matrix().transform_point(Vec3::X).truncate();
    assert_abs_diff_eq!(pa, Vec3::new(1.0, 1.0, 0.0), epsilon = 1e-5);
    assert_abs_diff_eq!(pb, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-5);
}

#[test]
fn test_rotate_with_zero_axis_is_a_noop() {
    let (mut rs, _) = render_system();
    rs.translate(1.0, 2.0, 3.0).unwrap();
    let before = rs.model_matrix();
    assert!(rs.rotate(45.0, 0.0, 0.0, 0.0).is_ok());
    assert_eq!(rs.model_matrix(), before);
}

#[test]
fn test_push_pop_restores_model() {
    let (mut rs, _) = render_system();
    rs.translate(1.0, 0.0, 0.0).unwrap();
    let saved = rs.model_matrix();
    rs.push_transform().unwrap();
    rs.scale(5.0, 5.0, 5.0).unwrap();
    rs.pop_transform().unwrap();
    assert_eq!(rs.model_matrix(), saved);
    assert!(matches!(rs.pop_transform(), Err(Error::InvalidParameter(_))));
}

#[test]
fn test_projection_preconditions() {
    let (mut rs, _) = render_system();
    assert!(rs.set_perspective(60.0, 4.0 / 3.0, 0.1, 100.0).is_ok());

    let invalid = [
        (0.0, 1.0, 0.1, 100.0),
        (-10.0, 1.0, 0.1, 100.0),
        (60.0, 0.0, 0.1, 100.0),
        (60.0, -1.0, 0.1, 100.0),
        (60.0, 1.0, 100.0, 0.1),
        (60.0, 1.0, 1.0, 1.0),
    ];
    for (fov, aspect, near, far) in invalid {
        let before = rs.projection_matrix();
        let err = rs.set_perspective(fov, aspect, near, far).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)), "{fov} {aspect} {near} {far}");
        assert_eq!(rs.projection_matrix(), before);
    }

    assert!(rs.set_orthographic(0.0, 800.0, 600.0, 0.0, -1.0, 1.0).is_ok());
    assert!(matches!(
        rs.set_orthographic(0.0, 800.0, 600.0, 0.0, 1.0, -1.0),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        rs.set_orthographic(5.0, 5.0, 600.0, 0.0, -1.0, 1.0),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_look_at_rejects_parallel_up() {
    let (mut rs, _) = render_system();
    assert!(rs
        .look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y)
        .is_ok());
    let err = rs
        .look_at(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, Vec3::Y)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
}

#[test]
fn test_render_validates_count() {
    let (mut rs, backend) = render_system();
    let quad = canonical_quad();

    assert!(rs.render(PrimitiveKind::TriangleStrip, &quad, 4).is_ok());
    assert!(matches!(
        rs.render(PrimitiveKind::TriangleStrip, &quad, 2),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        rs.render(PrimitiveKind::TriangleList, &quad, 4),
        Err(Error::InvalidParameter(_))
    ));
    assert!(matches!(
        rs.render(PrimitiveKind::TriangleStrip, &quad, 5),
        Err(Error::InvalidParameter(_))
    ));
    // Only the valid call reached the backend.
    assert_eq!(backend.commands().len(), 1);
}

#[test]
fn test_render_forwards_clip_space_vertices() {
    let (mut rs, backend) = render_system();
    rs.translate(0.5, 0.0, 0.0).unwrap();
    rs.render(PrimitiveKind::PointList, &[TexturedVertex::new(0.0, 0.0, 0.0, 0.0, 0.0)], 1)
        .unwrap();

    match &backend.commands()[0] {
        Command::Draw {
            kind, positions, ..
        } => {
            assert_eq!(*kind, PrimitiveKind::PointList);
            assert_eq!(positions, &vec![[0.5, 0.0, 0.0, 1.0]]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_calls_reach_backend_in_issue_order() {
    let (mut rs, backend) = render_system();
    let quad = canonical_quad();
    rs.clear_with(Color::RED).unwrap();
    rs.render(PrimitiveKind::TriangleStrip, &quad, 4).unwrap();
    rs.clear_with(Color::BLUE).unwrap();
    rs.draw_rect(Rect::new(-0.5, -0.5, 1.0, 1.0), Color::GREEN).unwrap();
    rs.present().unwrap();

    let kinds: Vec<String> = backend
        .commands()
        .iter()
        .map(|c| match c {
            Command::Clear(color) if *color == Color::RED => "clear-red".to_string(),
            Command::Clear(_) => "clear".to_string(),
            Command::Draw { kind, .. } => format!("{kind:?}"),
            Command::Present => "present".to_string(),
            Command::SetTarget(_) => "target".to_string(),
        })
        .collect();
    assert_eq!(
        kinds,
        ["clear-red", "TriangleStrip", "clear", "LineStrip", "present"]
    );
}

#[test]
fn test_bound_texture_is_sampled() {
    let (mut rs, backend) = render_system();
    let texture = rs
        .create_texture_from_buffer(&[255; 16], 2, 2, PixelFormat::Rgba8)
        .unwrap();
    rs.set_texture(Some(&texture)).unwrap();
    rs.render(PrimitiveKind::TriangleStrip, &canonical_quad(), 4).unwrap();
    rs.set_texture(None).unwrap();
    rs.render(PrimitiveKind::TriangleStrip, &canonical_quad(), 4).unwrap();

    let textured: Vec<bool> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::Draw { textured, .. } => Some(*textured),
            _ => None,
        })
        .collect();
    assert_eq!(textured, [true, false]);
}

#[test]
fn test_operations_fail_while_context_is_lost() {
    let (mut rs, _) = render_system();
    rs.notify_context_lost().unwrap();
    assert_eq!(rs.context_state(), ContextState::Lost);

    assert_eq!(rs.clear(), Err(Error::ContextInvalid));
    assert_eq!(rs.translate(1.0, 0.0, 0.0), Err(Error::ContextInvalid));
    assert_eq!(
        rs.render(PrimitiveKind::TriangleStrip, &canonical_quad(), 4),
        Err(Error::ContextInvalid)
    );
    assert!(matches!(
        rs.create_texture_from_buffer(&[0; 4], 1, 1, PixelFormat::Rgba8),
        Err(Error::ContextInvalid)
    ));

    rs.recreate_textures().unwrap();
    assert_eq!(rs.context_state(), ContextState::Active);
    assert!(rs.clear().is_ok());
}

#[test]
fn test_state_setters_fail_while_context_is_lost() {
    let (mut rs, _) = render_system();
    rs.set_color(Color::RED).unwrap();
    rs.notify_context_lost().unwrap();

    assert_eq!(
        rs.set_viewport(Some(Rect::new(0.0, 0.0, 2.0, 2.0))),
        Err(Error::ContextInvalid)
    );
    assert_eq!(rs.set_clear_color(Color::BLUE), Err(Error::ContextInvalid));
    assert_eq!(rs.set_blend_mode(BlendMode::Add), Err(Error::ContextInvalid));
    assert_eq!(rs.set_color(Color::GREEN), Err(Error::ContextInvalid));
    assert_eq!(rs.color(), Color::RED);
    assert_eq!(rs.blend_mode(), BlendMode::default());

    rs.shutdown();
    assert_eq!(rs.set_color(Color::GREEN), Err(Error::NotInitialized));
    assert_eq!(rs.set_viewport(None), Err(Error::NotInitialized));
}

#[test]
fn test_loss_reported_during_texture_write_enters_lost_state() {
    let (mut rs, backend) = render_system();
    let mut texture = rs
        .create_texture_from_buffer(&[0; 16], 2, 2, PixelFormat::Rgba8)
        .unwrap();
    backend.lose_device();

    assert_eq!(
        texture.write(0, 0, 1, 1, &[1, 2, 3, 4]),
        Err(Error::ContextInvalid)
    );
    assert_eq!(rs.context_state(), ContextState::Lost);
    assert!(!texture.is_valid());
    assert_eq!(backend.state.borrow().releases, 1);
    assert_eq!(
        rs.look_at(Vec3::new(0.0, 0.0, 1.0), Vec3::ZERO, Vec3::new(0.0, 1.0, 0.0)),
        Err(Error::ContextInvalid)
    );
    // The CPU copy is untouched and restores the texture.
    assert_eq!(texture.pixels(), Some(vec![0; 16]));
    assert_eq!(rs.recreate_textures().unwrap().restored, 1);
    assert!(texture.is_valid());
}

#[test]
fn test_screenshot_reads_current_target() {
    let (mut rs, _) = render_system();
    rs.attach_surface(None, 3, 2).unwrap();
    rs.clear_with(Color::BLUE).unwrap();
    let shot = rs.take_screenshot().unwrap();
    assert_eq!((shot.width, shot.height, shot.format), (3, 2, PixelFormat::Rgba8));
    assert!(shot.pixels.chunks_exact(4).all(|p| p == [0, 0, 255, 255]));

    let target = rs.create_render_target(2, 2).unwrap();
    rs.set_render_target(Some(&target)).unwrap();
    let shot = rs.take_screenshot().unwrap();
    assert_eq!((shot.width, shot.height), (2, 2));
    assert_eq!(shot.pixels, vec![0; 16]);

    rs.notify_context_lost().unwrap();
    assert!(matches!(rs.take_screenshot(), Err(Error::ContextInvalid)));
}

#[test]
fn test_unload_textures_releases_device_memory() {
    let (mut rs, backend) = render_system();
    let mut managed = rs
        .create_texture_from_buffer(&[5; 4], 1, 1, PixelFormat::Rgba8)
        .unwrap();
    let target = rs.create_render_target(4, 4).unwrap();
    rs.set_render_target(Some(&target)).unwrap();
    assert_eq!(backend.live_textures(), 2);

    assert_eq!(rs.unload_textures().unwrap(), 2);
    assert_eq!(backend.live_textures(), 0);
    assert!(!managed.is_loaded() && !target.is_loaded());
    assert!(!rs.has_render_target());
    assert_eq!(rs.live_texture_count(), 2);
    // Already unloaded textures are not counted twice.
    assert_eq!(rs.unload_textures().unwrap(), 0);

    // Recreation after a loss leaves unloaded textures alone.
    rs.notify_context_lost().unwrap();
    let report = rs.recreate_textures().unwrap();
    assert_eq!(report.restored, 0);
    assert!(report.is_complete());
    assert_eq!(backend.live_textures(), 0);

    managed.load().unwrap();
    assert!(managed.is_loaded());
    assert_eq!(backend.texture_pixels(), vec![vec![5; 4]]);
}

#[test]
fn test_backend_reported_loss_enters_lost_state() {
    let (mut rs, backend) = render_system();
    backend.lose_device();
    assert_eq!(rs.present(), Err(Error::ContextInvalid));
    assert_eq!(rs.context_state(), ContextState::Lost);
    assert_eq!(backend.state.borrow().releases, 1);
}

#[test]
fn test_failed_device_restore_stays_lost() {
    let (mut rs, backend) = render_system();
    rs.notify_context_lost().unwrap();
    backend.state.borrow_mut().refuse_restore = true;
    assert_eq!(rs.recreate_textures(), Err(Error::ContextInvalid));
    assert_eq!(rs.context_state(), ContextState::Lost);

    backend.state.borrow_mut().refuse_restore = false;
    assert!(rs.recreate_textures().is_ok());
    assert_eq!(rs.context_state(), ContextState::Active);
}

#[test]
fn test_recreate_while_active_is_a_noop() {
    let (mut rs, backend) = render_system();
    let report = rs.recreate_textures().unwrap();
    assert_eq!(report.restored, 0);
    assert!(report.is_complete());
    assert_eq!(backend.state.borrow().restores, 0);
}

#[test]
fn test_unsupported_format_is_rejected() {
    let (mut rs, _) = render_system();
    let err = rs
        .create_texture_from_buffer(&[0; 8], 1, 1, PixelFormat::Rgba16Float)
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_buffer_size_must_match_dimensions() {
    let (mut rs, _) = render_system();
    for (len, w, h) in [(15, 2, 2), (17, 2, 2), (0, 0, 4), (4, 2000, 1)] {
        let err = rs
            .create_texture_from_buffer(&vec![0; len], w, h, PixelFormat::Rgba8)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)), "{len} {w}x{h}");
    }
}

#[test]
fn test_resource_creation_without_loader() {
    let (mut rs, _) = render_system();
    match rs.create_texture_from_resource("logo") {
        Err(Error::ResourceNotFound(_)) => {}
        other => panic!("expected ResourceNotFound, got {other:?}"),
    }
}

#[test]
fn test_operations_after_shutdown_are_not_initialized() {
    let (mut rs, backend) = render_system();
    rs.shutdown();
    assert_eq!(rs.context_state(), ContextState::Destroyed);
    assert!(backend.state.borrow().shut_down);
    assert_eq!(rs.clear(), Err(Error::NotInitialized));
    assert_eq!(rs.notify_context_lost(), Err(Error::NotInitialized));
    assert_eq!(rs.recreate_textures(), Err(Error::NotInitialized));
    // Shutting down twice is harmless.
    rs.shutdown();
}

#[test]
fn test_render_target_binding() {
    let (mut rs, backend) = render_system();
    let target = rs.create_render_target(64, 32).unwrap();
    let plain = rs
        .create_texture_from_buffer(&[0; 4], 1, 1, PixelFormat::Rgba8)
        .unwrap();

    assert!(matches!(
        rs.set_render_target(Some(&plain)),
        Err(Error::InvalidParameter(_))
    ));
    rs.set_render_target(Some(&target)).unwrap();
    assert!(rs.has_render_target());
    rs.set_render_target(None).unwrap();
    assert!(!rs.has_render_target());

    let targets: Vec<bool> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::SetTarget(t) => Some(t.is_some()),
            _ => None,
        })
        .collect();
    assert_eq!(targets, [true, false]);
}
