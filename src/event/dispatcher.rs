//! The cooperative dispatch loop.
//!
//! One thread drives the whole pipeline: drain pending events, route them
//! through the guards to the active screen, poll the IR receiver, present
//! the dirty region, then sleep out the rest of the frame. There is no
//! catch-up compensation: a late tick simply runs late, never fast-forwards.

use std::time::{Duration, Instant};

use anyhow::{bail, Result};
use log::{debug, info, warn};

use crate::app::{App, Outcome};
use crate::config::Config;

use super::guards::{self, PoweroffGuard};
use super::normalizer::Normalizer;
use super::sources::{EventQueue, IrReceiver, TouchPanel};
use super::{Event, EventKind, EventSource, Key, KeyAction, PointerAction};

const TOUCH_SLOTS: usize = 10;

/// Deferred constructor for the multi-touch controller; probing happens
/// once at startup and failure forces the single-touch fallback.
pub type TouchProbe = Box<dyn FnOnce() -> Result<Box<dyn TouchPanel>>>;

enum TouchHandler {
    /// Generic queue polling only.
    Single,
    /// Slot polling plus generic queue polling.
    Multi(Box<dyn TouchPanel>),
}

pub struct EventLoop {
    queue: Option<EventQueue>,
    touch: TouchHandler,
    ir: Option<Box<dyn IrReceiver>>,
    normalizer: Normalizer,
    poweroff: PoweroffGuard,
    slots: [bool; TOUCH_SLOTS],
    move_enabled: bool,
    ctrl_down: bool,
    /// Widened IR key-up waiting for the next tick.
    pending_ir_up: Option<Event>,
    running: bool,
    frame_period: Duration,
    show_input_events: bool,
}

impl EventLoop {
    /// Choose the event-obtaining strategy once and build the loop.
    ///
    /// Multi-touch is attempted only when configured; a failed probe logs a
    /// warning and falls back to single-touch. With no queue and no panel
    /// there is no viable input path, which is fatal.
    pub fn new(
        config: &Config,
        queue: Option<EventQueue>,
        touch_probe: Option<TouchProbe>,
        ir: Option<Box<dyn IrReceiver>>,
    ) -> Result<Self> {
        let touch = if config.screen.multi_touch {
            match touch_probe {
                Some(probe) => match probe() {
                    Ok(panel) => {
                        info!("Multi-touch controller initialized");
                        TouchHandler::Multi(panel)
                    }
                    Err(e) => {
                        warn!("Multi-touch init failed, falling back to single-touch: {e:#}");
                        TouchHandler::Single
                    }
                },
                None => {
                    warn!("Multi-touch configured but no controller present");
                    TouchHandler::Single
                }
            }
        } else {
            TouchHandler::Single
        };

        if matches!(touch, TouchHandler::Single) && queue.is_none() {
            bail!("No usable input handler (neither single- nor multi-touch)");
        }

        let frame_rate = config.screen.frame_rate.max(1);
        Ok(Self {
            queue,
            touch,
            ir,
            normalizer: Normalizer::new(&config.screen),
            poweroff: PoweroffGuard::new(),
            slots: [false; TOUCH_SLOTS],
            move_enabled: false,
            ctrl_down: false,
            pending_ir_up: None,
            running: true,
            frame_period: Duration::from_secs_f64(1.0 / f64::from(frame_rate)),
            show_input_events: config.usage.show_input_events,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frame_period(&self) -> Duration {
        self.frame_period
    }

    /// Remaining sleep for this frame: `max(0, period - elapsed)`.
    pub fn pacing_sleep(&self, elapsed: Duration) -> Duration {
        self.frame_period.checked_sub(elapsed).unwrap_or(Duration::ZERO)
    }

    /// Run the loop until shutdown. The callback is invoked exactly once,
    /// on Quit, the kill switch, or a confirmed poweroff, and completes
    /// before the running flag is observed cleared.
    pub async fn dispatch(
        &mut self,
        app: &mut App,
        mut shutdown: impl FnMut(&mut App),
    ) -> Result<()> {
        info!(
            "Dispatch loop started ({:.0} fps)",
            1.0 / self.frame_period.as_secs_f64()
        );
        while self.running {
            let frame_start = Instant::now();
            self.tick(app, &mut shutdown);
            if self.running {
                let remaining = self.pacing_sleep(frame_start.elapsed());
                if !remaining.is_zero() {
                    tokio::time::sleep(remaining).await;
                }
            }
        }
        info!("Dispatch loop stopped");
        Ok(())
    }

    /// One loop iteration without the pacing sleep.
    pub fn tick(&mut self, app: &mut App, shutdown: &mut impl FnMut(&mut App)) {
        if let Some(up) = self.pending_ir_up.take() {
            self.route(app, up, shutdown);
        }

        let mut pending = self.poll_slots();
        while let Some(event) = self.queue.as_mut().and_then(|q| q.poll()) {
            pending.push(event);
        }
        for event in pending {
            if !self.running {
                return;
            }
            self.route(app, event, shutdown);
        }

        if !self.running {
            return;
        }

        if let Some(code) = self.ir.as_mut().and_then(|ir| ir.read_code()) {
            self.handle_ir(app, code, shutdown);
        }

        if self.running {
            self.present(app);
        }
    }

    /// Multi-touch slot scan. A slot flipping invalid->valid is a pointer
    /// down and enables motion tracking; valid->invalid is a pointer up and
    /// disables it; an unchanged valid slot reports motion only while
    /// tracking is enabled.
    fn poll_slots(&mut self) -> Vec<Event> {
        let TouchHandler::Multi(panel) = &mut self.touch else {
            return Vec::new();
        };
        let mut events = Vec::new();
        for contact in panel.poll() {
            if contact.slot >= TOUCH_SLOTS {
                continue;
            }
            let pos = (contact.x, contact.y);
            if self.slots[contact.slot] != contact.valid {
                if contact.valid {
                    events.push(Event::pointer(pos, PointerAction::Down, EventSource::Touch));
                    self.move_enabled = true;
                } else {
                    events.push(Event::pointer(pos, PointerAction::Up, EventSource::Touch));
                    self.move_enabled = false;
                }
                self.slots[contact.slot] = contact.valid;
            } else if contact.valid && self.move_enabled {
                events.push(Event::pointer(pos, PointerAction::Move, EventSource::Touch));
            }
        }
        events
    }

    fn route(&mut self, app: &mut App, mut event: Event, shutdown: &mut impl FnMut(&mut App)) {
        if self.show_input_events {
            debug!("Received event: {event:?}");
        }

        if let EventKind::Finger { x, y, action } = event.kind {
            event = self.normalizer.finger_to_pointer(x, y, action);
        }
        self.normalizer.normalize(&mut event);

        match event.kind {
            EventKind::Quit => self.trigger_shutdown(app, shutdown),
            EventKind::Key { key, action } => {
                if matches!(key, Key::LeftCtrl | Key::RightCtrl) {
                    self.ctrl_down = action == KeyAction::Down;
                }
                if self.ctrl_down && key == Key::Char('c') && action == KeyAction::Down {
                    self.trigger_shutdown(app, shutdown);
                    return;
                }
                if app.saver.saver_running() {
                    if action == KeyAction::Up {
                        app.saver.cancel(Some(&event));
                    }
                    return;
                }
                if app.forward(&event) == Outcome::ShutdownRequested {
                    self.trigger_shutdown(app, shutdown);
                    return;
                }
                // re-emit in the uniform shape the guards consume
                let signal = Event::signal(key, action, event.source);
                self.route_signal(app, signal, shutdown);
            }
            EventKind::Pointer { .. } | EventKind::Signal { .. } => {
                self.route_signal(app, event, shutdown);
            }
            EventKind::Select => {
                if app.forward(&event) == Outcome::ShutdownRequested {
                    self.trigger_shutdown(app, shutdown);
                }
            }
            // converted above
            EventKind::Finger { .. } => {}
        }
    }

    fn route_signal(&mut self, app: &mut App, event: Event, shutdown: &mut impl FnMut(&mut App)) {
        // wall-clock timer directives
        if let EventKind::Signal { key: key @ (Key::Sleep | Key::WakeUp), action } = event.kind {
            if action == KeyAction::Up {
                match key {
                    Key::Sleep => app.sleep(),
                    _ => app.wake_up(),
                }
            }
            return;
        }

        if self.poweroff.observe(&event) {
            self.trigger_shutdown(app, shutdown);
            return;
        }
        guards::route_volume(&event, app.volume.as_mut());
        if app.forward(&event) == Outcome::ShutdownRequested {
            self.trigger_shutdown(app, shutdown);
        }
    }

    fn handle_ir(&mut self, app: &mut App, code: String, shutdown: &mut impl FnMut(&mut App)) {
        // any remote activity while the saver runs only cancels it
        if app.saver.saver_running() {
            app.saver.cancel(None);
            return;
        }
        if let Some([down, up]) = self.normalizer.ir_to_events(&code) {
            self.route(app, down, shutdown);
            self.pending_ir_up = Some(up);
        }
    }

    /// Redraw step: the saver's refresh advances its idle counter every
    /// tick; while it runs it owns the display, otherwise the active screen
    /// presents its dirty region.
    fn present(&mut self, app: &mut App) {
        let saver_area = app.saver.refresh();
        if app.saver.saver_running() {
            if saver_area.is_none() {
                app.saver.update();
            }
        } else if let Some(screen) = app.nav.current_screen_mut() {
            if let Some(region) = screen.refresh() {
                screen.clean_draw_update(Some(region));
            }
        }
    }

    fn trigger_shutdown(&mut self, app: &mut App, shutdown: &mut impl FnMut(&mut App)) {
        if !self.running {
            return;
        }
        info!("Shutdown requested");
        // blocking cleanup completes before the flag is observed cleared
        shutdown(app);
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::sources::{channel, TouchContact};

    struct FakePanel {
        frames: Vec<Vec<TouchContact>>,
    }

    impl TouchPanel for FakePanel {
        fn poll(&mut self) -> Vec<TouchContact> {
            if self.frames.is_empty() {
                Vec::new()
            } else {
                self.frames.remove(0)
            }
        }
    }

    fn multi_loop(frames: Vec<Vec<TouchContact>>) -> EventLoop {
        let mut config = Config::default();
        config.screen.multi_touch = true;
        let (_tx, queue) = channel();
        let probe: TouchProbe =
            Box::new(move || Ok(Box::new(FakePanel { frames }) as Box<dyn TouchPanel>));
        EventLoop::new(&config, Some(queue), Some(probe), None).unwrap()
    }

    fn contact(slot: usize, valid: bool) -> TouchContact {
        TouchContact { slot, valid, x: 100, y: 50 }
    }

    #[test]
    fn slot_transitions_emit_down_move_up() {
        let mut event_loop = multi_loop(vec![
            vec![contact(0, true)],
            vec![contact(0, true)],
            vec![contact(0, false)],
        ]);

        let down = event_loop.poll_slots();
        assert_eq!(down.len(), 1);
        assert!(matches!(down[0].kind, EventKind::Pointer { action: PointerAction::Down, .. }));

        let moved = event_loop.poll_slots();
        assert_eq!(moved.len(), 1);
        assert!(matches!(moved[0].kind, EventKind::Pointer { action: PointerAction::Move, .. }));

        let up = event_loop.poll_slots();
        assert_eq!(up.len(), 1);
        assert!(matches!(up[0].kind, EventKind::Pointer { action: PointerAction::Up, .. }));
        assert!(!event_loop.move_enabled);
    }

    #[test]
    fn unchanged_valid_slot_without_tracking_is_silent() {
        let mut event_loop = multi_loop(vec![vec![contact(3, true)]]);
        // slot already valid while motion tracking is off: no transition was
        // observed, so no motion is reported either
        event_loop.slots[3] = true;
        assert!(event_loop.poll_slots().is_empty());
    }

    #[test]
    fn failed_multi_touch_probe_falls_back_to_single() {
        let mut config = Config::default();
        config.screen.multi_touch = true;
        let (_tx, queue) = channel();
        let probe: TouchProbe = Box::new(|| anyhow::bail!("controller absent"));
        let event_loop = EventLoop::new(&config, Some(queue), Some(probe), None).unwrap();
        assert!(matches!(event_loop.touch, TouchHandler::Single));
    }

    #[test]
    fn no_input_path_is_fatal() {
        let config = Config::default();
        assert!(EventLoop::new(&config, None, None, None).is_err());
    }

    #[test]
    fn pacing_clamps_at_zero() {
        let config = Config::default(); // 30 fps
        let (_tx, queue) = channel();
        let event_loop = EventLoop::new(&config, Some(queue), None, None).unwrap();
        let period = event_loop.frame_period();
        assert_eq!(period, Duration::from_secs_f64(1.0 / 30.0));
        assert_eq!(event_loop.pacing_sleep(Duration::ZERO), period);
        assert_eq!(
            event_loop.pacing_sleep(Duration::from_millis(10)),
            period - Duration::from_millis(10)
        );
        assert_eq!(event_loop.pacing_sleep(Duration::from_secs(1)), Duration::ZERO);
    }
}
