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

use common::{Command, Pump, RecordingBackend, ScriptedWindow};
use lumen_core::platform::{Key, PlatformEvent, PumpError};
use lumen_core::renderer::{ContextState, PixelFormat};
use lumen_core::resource::{DecodedImage, MemoryResources};
use lumen_core::{
    Error, InputDelegate, LoopExit, RenderSystem, SystemDelegate, Texture, UpdateDelegate, Window,
    INACTIVE_FRAME_DELAY,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

struct Fixture {
    window: Window,
    render_system: Rc<RefCell<RenderSystem>>,
    backend: RecordingBackend,
    platform: ScriptedWindow,
}

fn fixture(script: Vec<Pump>) -> Fixture {
    let backend = RecordingBackend::new();
    let platform = ScriptedWindow::new(script);
    let render_system = Rc::new(RefCell::new(RenderSystem::new(Box::new(backend.clone()))));
    let mut window = Window::create(Box::new(platform.clone()), 320, 240, false, "test").unwrap();
    window.attach_render_system(render_system.clone()).unwrap();
    Fixture {
        window,
        render_system,
        backend,
        platform,
    }
}

fn presents(backend: &RecordingBackend) -> usize {
    backend
        .commands()
        .iter()
        .filter(|c| matches!(c, Command::Present))
        .count()
}

/// Stops on iteration `stop_at` and counts its calls.
struct CountingDelegate {
    calls: Rc<Cell<u32>>,
    stop_at: u32,
}

impl UpdateDelegate for CountingDelegate {
    fn on_update(&mut self, elapsed: f32, rs: &mut RenderSystem) -> bool {
        assert!(elapsed >= 0.0);
        self.calls.set(self.calls.get() + 1);
        rs.clear().unwrap();
        self.calls.get() < self.stop_at
    }
}

#[test]
fn test_loop_terminates_after_exactly_k_updates() {
    for k in [1, 2, 5, 17] {
        let mut f = fixture(Vec::new());
        let calls = Rc::new(Cell::new(0));
        f.window.set_update_delegate(Some(Box::new(CountingDelegate {
            calls: calls.clone(),
            stop_at: k,
        })));

        let exit = f.window.enter_main_loop().unwrap();
        assert_eq!(exit, LoopExit::DelegateFinished);
        assert_eq!(calls.get(), k);
        assert_eq!(f.window.update_count(), k as u64);
        // The final frame is not presented.
        assert_eq!(presents(&f.backend), (k - 1) as usize);
        assert!(!f.window.is_running());
    }
}

#[test]
fn test_closures_are_update_delegates() {
    let mut f = fixture(Vec::new());
    let mut frames = 0;
    f.window
        .set_update_delegate(Some(Box::new(move |_elapsed: f32, _rs: &mut RenderSystem| {
            frames += 1;
            frames < 3
        })));
    f.window.enter_main_loop().unwrap();
    assert_eq!(f.window.update_count(), 3);
}

#[test]
fn test_without_delegate_events_are_pumped_but_nothing_renders() {
    let mut f = fixture(Vec::new());
    let stop = f.window.stop_handle();
    for _ in 0..4 {
        assert!(f.window.update_one_frame().unwrap());
    }
    assert_eq!(f.platform.state.borrow().pumps, 4);
    assert!(f.backend.commands().is_empty());

    stop.request_stop();
    assert_eq!(f.window.enter_main_loop().unwrap(), LoopExit::StopRequested);
}

#[test]
fn test_stop_request_is_observed_before_the_next_frame() {
    let mut f = fixture(Vec::new());
    let stop = f.window.stop_handle();
    let calls = Rc::new(Cell::new(0u32));
    let counter = calls.clone();
    f.window
        .set_update_delegate(Some(Box::new(move |_: f32, _: &mut RenderSystem| {
            counter.set(counter.get() + 1);
            if counter.get() == 3 {
                stop.request_stop();
            }
            true
        })));

    assert_eq!(f.window.enter_main_loop().unwrap(), LoopExit::StopRequested);
    assert_eq!(calls.get(), 3);
    // The frame during which the stop was requested still completed.
    assert_eq!(presents(&f.backend), 3);
}

#[test]
fn test_replacing_delegate_returns_previous() {
    let mut f = fixture(Vec::new());
    let first = f
        .window
        .set_update_delegate(Some(Box::new(|_: f32, _: &mut RenderSystem| false)));
    assert!(first.is_none());
    let previous = f
        .window
        .set_update_delegate(Some(Box::new(|_: f32, _: &mut RenderSystem| false)));
    assert!(previous.is_some());
    assert!(f.window.set_update_delegate(None).is_some());
    assert!(!f.window.has_update_delegate());
}

#[test]
fn test_inactive_window_yields_between_iterations() {
    let script = vec![
        Pump::Events(vec![PlatformEvent::Suspended]),
        Pump::Events(vec![]),
        Pump::Events(vec![]),
        Pump::Events(vec![PlatformEvent::Resumed, PlatformEvent::FocusChanged(false)]),
        Pump::Events(vec![]),
    ];
    let mut f = fixture(script);
    assert_eq!(f.window.inactive_frame_delay(), INACTIVE_FRAME_DELAY);
    let delay = Duration::from_millis(5);
    f.window.set_inactive_frame_delay(delay);

    let calls = Rc::new(Cell::new(0u32));
    let seen = calls.clone();
    f.window
        .set_update_delegate(Some(Box::new(move |_: f32, _: &mut RenderSystem| {
            seen.set(seen.get() + 1);
            true
        })));

    let start = Instant::now();
    for _ in 0..3 {
        assert!(f.window.update_one_frame().unwrap());
    }
    assert!(start.elapsed() >= delay * 3);
    assert_eq!(calls.get(), 0);
    assert_eq!(presents(&f.backend), 0);

    // Resumed but unfocused: the delegate runs, still after a pause.
    let start = Instant::now();
    for _ in 0..2 {
        assert!(f.window.update_one_frame().unwrap());
    }
    assert!(start.elapsed() >= delay * 2);
    assert_eq!(calls.get(), 2);
}

#[test]
fn test_suspend_and_resume_round_trip_textures() {
    let script = vec![
        Pump::Events(vec![]),
        Pump::Events(vec![PlatformEvent::Suspended]),
        Pump::Events(vec![]),
        Pump::Events(vec![PlatformEvent::Resumed]),
    ];
    let mut f = fixture(script);
    let texture = Rc::new(RefCell::new(None::<Texture>));
    let states = Rc::new(RefCell::new(Vec::new()));

    let slot = texture.clone();
    let log = states.clone();
    f.window
        .set_update_delegate(Some(Box::new(move |_: f32, rs: &mut RenderSystem| {
            let mut slot = slot.borrow_mut();
            if slot.is_none() {
                *slot = Some(
                    rs.create_texture_from_buffer(&[7; 16], 2, 2, PixelFormat::Rgba8)
                        .unwrap(),
                );
            }
            log.borrow_mut()
                .push(slot.as_ref().map(|t| t.is_valid()).unwrap_or(false));
            log.borrow().len() < 2
        })));

    let exit = f.window.enter_main_loop().unwrap();
    assert_eq!(exit, LoopExit::DelegateFinished);
    // Frames 2 and 3 were suspended: the delegate was not called.
    assert_eq!(f.platform.state.borrow().pumps, 4);
    assert_eq!(*states.borrow(), vec![true, true]);
    assert_eq!(f.render_system.borrow().context_state(), ContextState::Active);
    assert_eq!(f.backend.state.borrow().releases, 1);
    assert_eq!(f.backend.state.borrow().restores, 1);
    assert_eq!(f.backend.texture_pixels(), vec![vec![7; 16]]);
}

#[test]
fn test_context_lost_event_recovers_before_update() {
    let mut f = fixture(vec![Pump::Events(vec![PlatformEvent::ContextLost])]);
    let state_seen = Rc::new(Cell::new(None));
    let seen = state_seen.clone();
    f.window
        .set_update_delegate(Some(Box::new(move |_: f32, rs: &mut RenderSystem| {
            seen.set(Some(rs.context_state()));
            false
        })));
    f.window.enter_main_loop().unwrap();
    assert_eq!(state_seen.get(), Some(ContextState::Active));
    assert_eq!(f.backend.state.borrow().releases, 1);
}

#[test]
fn test_recoverable_pump_error_keeps_running() {
    let mut f = fixture(vec![Pump::Fail(PumpError::Recoverable(
        "joystick read timed out".into(),
    ))]);
    f.window
        .set_update_delegate(Some(Box::new(CountingDelegate {
            calls: Rc::new(Cell::new(0)),
            stop_at: 3,
        })));
    assert_eq!(f.window.enter_main_loop().unwrap(), LoopExit::DelegateFinished);
    assert_eq!(f.window.update_count(), 3);
}

#[test]
fn test_fatal_pump_error_terminates_like_delegate_false() {
    let mut f = fixture(vec![
        Pump::Events(vec![]),
        Pump::Fail(PumpError::Fatal("surface destroyed".into())),
    ]);
    let calls = Rc::new(Cell::new(0));
    f.window.set_update_delegate(Some(Box::new(CountingDelegate {
        calls: calls.clone(),
        stop_at: 100,
    })));
    assert_eq!(
        f.window.enter_main_loop().unwrap(),
        LoopExit::PlatformTerminated("surface destroyed".into())
    );
    assert_eq!(calls.get(), 1);
}

struct Quitter {
    allow: bool,
    asked: Rc<Cell<u32>>,
}

impl SystemDelegate for Quitter {
    fn on_quit(&mut self, can_cancel: bool) -> bool {
        assert!(can_cancel);
        self.asked.set(self.asked.get() + 1);
        self.allow
    }
}

#[test]
fn test_close_request_honors_system_delegate() {
    let asked = Rc::new(Cell::new(0));
    let mut f = fixture(vec![Pump::Events(vec![PlatformEvent::CloseRequested])]);
    f.window.set_system_delegate(Some(Box::new(Quitter {
        allow: false,
        asked: asked.clone(),
    })));
    f.window.set_update_delegate(Some(Box::new(CountingDelegate {
        calls: Rc::new(Cell::new(0)),
        stop_at: 2,
    })));
    assert_eq!(f.window.enter_main_loop().unwrap(), LoopExit::DelegateFinished);
    assert_eq!(asked.get(), 1);

    let mut f = fixture(vec![Pump::Events(vec![PlatformEvent::CloseRequested])]);
    f.window.set_system_delegate(Some(Box::new(Quitter {
        allow: true,
        asked: asked.clone(),
    })));
    assert_eq!(f.window.enter_main_loop().unwrap(), LoopExit::CloseRequested);
    assert_eq!(asked.get(), 2);
}

#[derive(Default)]
struct KeyLog(Rc<RefCell<Vec<(Key, bool)>>>);

impl InputDelegate for KeyLog {
    fn on_key_down(&mut self, key: Key) {
        self.0.borrow_mut().push((key, true));
    }

    fn on_key_up(&mut self, key: Key) {
        self.0.borrow_mut().push((key, false));
    }
}

#[test]
fn test_input_events_reach_input_delegate() {
    let mut f = fixture(vec![Pump::Events(vec![
        PlatformEvent::Key {
            key: Key::Escape,
            pressed: true,
        },
        PlatformEvent::MouseMoved { x: 10.0, y: 20.0 },
        PlatformEvent::Key {
            key: Key::Escape,
            pressed: false,
        },
    ])]);
    let log = KeyLog::default();
    let keys = log.0.clone();
    f.window.set_input_delegate(Some(Box::new(log)));
    assert!(f.window.update_one_frame().unwrap());
    assert_eq!(*keys.borrow(), vec![(Key::Escape, true), (Key::Escape, false)]);
    assert_eq!(f.window.cursor_position(), (10.0, 20.0));
}

#[test]
fn test_system_info_is_rederived_every_query() {
    let mut f = fixture(vec![Pump::Events(vec![PlatformEvent::Resized {
        width: 640,
        height: 480,
    }])]);
    assert_eq!(f.window.system_info().surface_width, 320);
    f.window.update_one_frame().unwrap();
    assert_eq!(f.window.size(), (640, 480));

    // A rotation seen by the platform without an event is still picked up.
    f.platform.set_size(480, 640);
    let info = f.window.system_info();
    assert_eq!((info.surface_width, info.surface_height), (480, 640));
    assert_eq!((info.display_width, info.display_height), (1920, 1080));
    assert!((f.window.aspect_ratio() - 0.75).abs() < 1e-6);
}

#[test]
fn test_cursor_filename() {
    let mut f = fixture(Vec::new());
    assert!(f.window.set_cursor_filename(None).is_ok());
    assert!(matches!(
        f.window.set_cursor_filename(Some("arrow")),
        Err(Error::ResourceNotFound(_))
    ));

    let mut resources = MemoryResources::new();
    resources.insert(
        "arrow",
        DecodedImage {
            width: 1,
            height: 1,
            format: PixelFormat::Alpha8,
            pixels: vec![128],
        },
    );
    f.window.set_resource_loader(Some(Rc::new(resources)));
    f.window.set_cursor_filename(Some("arrow")).unwrap();
    assert_eq!(f.window.cursor_filename(), Some("arrow"));
    assert_eq!(
        f.platform.state.borrow().cursor.as_ref().map(|c| c.rgba.clone()),
        Some(vec![255, 255, 255, 128])
    );

    f.window.set_cursor_filename(None).unwrap();
    assert!(f.platform.state.borrow().cursor.is_none());
    assert_eq!(f.window.cursor_filename(), None);
}

#[test]
fn test_window_rejects_zero_size() {
    for (w, h) in [(0, 10), (10, 0), (0, 0)] {
        let err = Window::create(Box::new(ScriptedWindow::default()), w, h, false, "").unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}

#[test]
fn test_window_creation_failure_is_reported() {
    let platform = ScriptedWindow::default();
    platform.state.borrow_mut().fail_create = true;
    let err = Window::create(Box::new(platform), 10, 10, false, "").unwrap_err();
    assert!(matches!(err, Error::WindowCreationFailed(_)));
}

#[test]
fn test_destroy_releases_delegate_textures_first() {
    let mut f = fixture(Vec::new());
    let texture = f
        .render_system
        .borrow_mut()
        .create_texture_from_buffer(&[0; 4], 1, 1, PixelFormat::Rgba8)
        .unwrap();
    f.window
        .set_update_delegate(Some(Box::new(move |_: f32, _: &mut RenderSystem| {
            texture.is_valid()
        })));
    assert_eq!(f.backend.live_textures(), 1);

    f.window.destroy();
    assert!(f.platform.state.borrow().destroyed);
    assert_eq!(f.backend.live_textures(), 0);
    assert_eq!(f.render_system.borrow().live_texture_count(), 0);
    assert_eq!(f.window.enter_main_loop(), Err(Error::NotInitialized));
    // Destroying twice is harmless.
    f.window.destroy();
}
