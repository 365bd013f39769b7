//! End-to-end tests of the dispatch loop: event routing, guards, shutdown
//! and the IR pulse widening, driven tick by tick without the pacing sleep.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use wavedeck::app::App;
use wavedeck::catalog::StaticCatalog;
use wavedeck::config::Config;
use wavedeck::event::sources::{channel, IrReceiver};
use wavedeck::event::{Event, EventLoop, EventSender, EventSource, Key, KeyAction, PointerAction};
use wavedeck::player::{NullPlayer, PlayerState};
use wavedeck::saver::{DisabledScreensaver, Screensaver};
use wavedeck::screens::{NavigationState, Region, ScreenId};

struct Fixture {
    event_loop: EventLoop,
    app: App,
    events: EventSender,
    config: Rc<RefCell<Config>>,
    shutdowns: Rc<Cell<u32>>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_ir(None)
    }

    fn with_ir(ir: Option<Box<dyn IrReceiver>>) -> Self {
        let config = Rc::new(RefCell::new(Config::default()));
        let (events, queue) = channel();
        let event_loop = EventLoop::new(&config.borrow(), Some(queue), None, ir).unwrap();
        let catalog = Rc::new(StaticCatalog);
        let mut app = App::new(
            config.clone(),
            NullPlayer::new().handle(),
            Box::new(DisabledScreensaver),
            catalog.clone(),
            catalog.clone(),
            catalog.clone(),
            catalog,
        );
        app.start();
        Self { event_loop, app, events, config, shutdowns: Rc::new(Cell::new(0)) }
    }

    fn tick(&mut self) {
        let shutdowns = self.shutdowns.clone();
        self.event_loop
            .tick(&mut self.app, &mut |_app: &mut App| shutdowns.set(shutdowns.get() + 1));
    }

    fn send_key_up(&self, key: Key) {
        self.events.send(Event::signal(key, KeyAction::Down, EventSource::Synthetic));
        self.events.send(Event::signal(key, KeyAction::Up, EventSource::Synthetic));
    }
}

#[test]
fn quit_invokes_shutdown_exactly_once() {
    let mut fx = Fixture::new();
    fx.events.send(Event::quit());
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 1);
    assert!(!fx.event_loop.is_running());

    // a stopped loop ignores further events
    fx.events.send(Event::quit());
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 1);
}

#[test]
fn kill_switch_combination_stops_the_loop() {
    let mut fx = Fixture::new();
    fx.events.send(Event::key(Key::LeftCtrl, KeyAction::Down, EventSource::Keyboard));
    fx.events.send(Event::key(Key::Char('c'), KeyAction::Down, EventSource::Keyboard));
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 1);
    assert!(!fx.event_loop.is_running());
}

#[test]
fn plain_c_key_does_not_stop_the_loop() {
    let mut fx = Fixture::new();
    fx.events.send(Event::key(Key::Char('c'), KeyAction::Down, EventSource::Keyboard));
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 0);
    assert!(fx.event_loop.is_running());
}

#[test]
fn double_power_press_confirms_poweroff() {
    let mut fx = Fixture::new();
    fx.send_key_up(Key::Power);
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 0);

    fx.send_key_up(Key::Power);
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 1);
    assert!(!fx.event_loop.is_running());
}

#[test]
fn intervening_event_resets_the_poweroff_guard() {
    let mut fx = Fixture::new();
    fx.send_key_up(Key::Power);
    fx.events.send(Event::pointer((3, 3), PointerAction::Up, EventSource::Touch));
    fx.send_key_up(Key::Power);
    fx.tick();
    // second press only re-armed: nothing shut down
    assert_eq!(fx.shutdowns.get(), 0);
    assert!(fx.event_loop.is_running());
}

#[test]
fn volume_keys_adjust_the_persisted_level() {
    let mut fx = Fixture::new();
    assert_eq!(fx.config.borrow().player_settings.volume, 30);
    fx.send_key_up(Key::VolumeUp);
    fx.tick();
    assert_eq!(fx.config.borrow().player_settings.volume, 40);
    fx.send_key_up(Key::VolumeDown);
    fx.send_key_up(Key::VolumeDown);
    fx.tick();
    assert_eq!(fx.config.borrow().player_settings.volume, 20);
}

#[test]
fn screen_commands_flow_back_through_the_loop() {
    let mut fx = Fixture::new();
    // default mode is radio, so the player screen is current after start
    assert_eq!(fx.app.nav.current(), Some(ScreenId::Stations));
    fx.send_key_up(Key::Home);
    fx.tick();
    assert_eq!(fx.app.nav.current(), Some(ScreenId::Home));
    assert_eq!(fx.app.nav.previous(), Some(ScreenId::Stations));
}

#[test]
fn timer_directives_sleep_and_wake_the_appliance() {
    let mut fx = Fixture::new();
    fx.send_key_up(Key::Home);
    fx.tick();

    fx.events.send(Event::signal(Key::Sleep, KeyAction::Up, EventSource::Synthetic));
    fx.tick();
    assert_eq!(fx.app.shared.lock().unwrap().player_state, PlayerState::Sleeping);

    fx.events.send(Event::signal(Key::WakeUp, KeyAction::Up, EventSource::Synthetic));
    fx.tick();
    assert_eq!(fx.app.shared.lock().unwrap().player_state, PlayerState::Running);
    // the screen from before sleep is current again
    assert_eq!(fx.app.nav.current(), Some(ScreenId::Stations));
}

struct FakeIr {
    codes: VecDeque<&'static str>,
}

impl FakeIr {
    fn new(codes: &[&'static str]) -> Box<dyn IrReceiver> {
        Box::new(Self { codes: codes.iter().copied().collect() })
    }
}

impl IrReceiver for FakeIr {
    fn read_code(&mut self) -> Option<String> {
        self.codes.pop_front().map(str::to_string)
    }
}

#[test]
fn ir_power_pulses_widen_and_confirm_poweroff() {
    let mut fx = Fixture::with_ir(Some(FakeIr::new(&["power", "power"])));
    // tick 1: first code arrives; Down routes now, Up is deferred
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 0);
    // tick 2: deferred Up arms the guard, second code routes its Down
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 0);
    // tick 3: second deferred Up confirms
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 1);
    assert!(!fx.event_loop.is_running());
}

#[test]
fn unmapped_ir_code_has_no_effect() {
    let mut fx = Fixture::with_ir(Some(FakeIr::new(&["eject"])));
    fx.tick();
    fx.tick();
    assert_eq!(fx.shutdowns.get(), 0);
    assert!(fx.event_loop.is_running());
}

/// Always-running saver that records the pointer positions it is handed.
struct RecordingSaver {
    positions: Rc<RefCell<Vec<(i32, i32)>>>,
}

impl Screensaver for RecordingSaver {
    fn saver_running(&self) -> bool {
        true
    }

    fn handle_event(&mut self, event: &Event) {
        if let Some(pos) = event.position() {
            self.positions.borrow_mut().push(pos);
        }
    }

    fn refresh(&mut self) -> Option<Region> {
        None
    }

    fn update(&mut self) -> Vec<Region> {
        Vec::new()
    }

    fn cancel(&mut self, _event: Option<&Event>) {}

    fn start(&mut self, _name: &str) {}

    fn change_image(&mut self, _state: &NavigationState) {}

    fn change_image_folder(&mut self, _state: &NavigationState) {}
}

#[test]
fn rotated_display_flips_touch_pointer_exactly_once() {
    let mut config = Config::default();
    config.screen.flip_touch_xy = true;
    let config = Rc::new(RefCell::new(config));
    let (events, queue) = channel();
    let mut event_loop = EventLoop::new(&config.borrow(), Some(queue), None, None).unwrap();

    let positions = Rc::new(RefCell::new(Vec::new()));
    let catalog = Rc::new(StaticCatalog);
    let mut app = App::new(
        config.clone(),
        NullPlayer::new().handle(),
        Box::new(RecordingSaver { positions: positions.clone() }),
        catalog.clone(),
        catalog.clone(),
        catalog.clone(),
        catalog,
    );
    app.start();

    events.send(Event::pointer((10, 20), PointerAction::Down, EventSource::Touch));
    events.send(Event::pointer((10, 20), PointerAction::Down, EventSource::Browser));
    event_loop.tick(&mut app, &mut |_app: &mut App| {});

    // touch coordinates are flipped once; browser coordinates never are
    assert_eq!(
        *positions.borrow(),
        vec![(480 - 10 - 1, 320 - 20 - 1), (10, 20)]
    );
}

#[test]
fn ir_navigation_reaches_the_active_screen() {
    let mut fx = Fixture::with_ir(Some(FakeIr::new(&["home"])));
    assert_eq!(fx.app.nav.current(), Some(ScreenId::Stations));
    fx.tick(); // Down now
    fx.tick(); // widened Up on the following tick triggers the action
    assert_eq!(fx.app.nav.current(), Some(ScreenId::Home));
}
