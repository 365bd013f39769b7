//! Input channels feeding the canonical event queue.
//!
//! The queue is a plain mpsc pair: every channel that produces occurrences
//! outside the dispatch loop (terminal reader thread, GPIO edge callbacks,
//! rotary encoder detents, the wall-clock timer) pushes through a cloned
//! [`EventSender`], and the loop drains the [`EventQueue`] non-blockingly
//! once per tick. Polled channels (multi-touch slots, the IR socket) are
//! traits the loop queries directly instead.

use std::io::Read;
use std::os::unix::net::UnixStream;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::config::GpioConfig;

use super::{Event, EventSource, Key, KeyAction, PointerAction};

/// Create the canonical event queue.
pub fn channel() -> (EventSender, EventQueue) {
    let (tx, rx) = mpsc::channel();
    (EventSender(tx), EventQueue(rx))
}

/// Cloneable producer handle to the canonical event queue.
#[derive(Debug, Clone)]
pub struct EventSender(mpsc::Sender<Event>);

impl EventSender {
    /// Push one event. Producers outlive shutdown, so a send after the loop
    /// has gone away is silently dropped.
    pub fn send(&self, event: Event) {
        let _ = self.0.send(event);
    }

    /// Push a widened Down/Up signal pair for one discrete occurrence.
    pub fn send_key_pulse(&self, key: Key, source: EventSource) {
        self.send(Event::signal(key, KeyAction::Down, source));
        self.send(Event::signal(key, KeyAction::Up, source));
    }
}

/// Consumer end of the canonical event queue; owned by the dispatch loop.
#[derive(Debug)]
pub struct EventQueue(mpsc::Receiver<Event>);

impl EventQueue {
    /// Non-blocking poll for the next pending event.
    pub fn poll(&mut self) -> Option<Event> {
        self.0.try_recv().ok()
    }
}

/// One reported multi-touch contact point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TouchContact {
    pub slot: usize,
    pub valid: bool,
    pub x: i32,
    pub y: i32,
}

/// Multi-touch controller contract: report the current state of every
/// hardware contact slot. Constructors may fail when the controller is
/// absent, which forces the single-touch fallback.
pub trait TouchPanel {
    fn poll(&mut self) -> Vec<TouchContact>;
}

/// IR receiver contract: at most one pending code per call, never blocking.
pub trait IrReceiver {
    fn read_code(&mut self) -> Option<String>;
}

/// IR receiver backed by the lircd Unix socket.
///
/// lircd writes one line per decoded pulse: `<hex> <repeat> <name> <remote>`.
/// The socket is switched to non-blocking mode so a quiet remote costs the
/// dispatch loop nothing.
pub struct LircSocket {
    stream: UnixStream,
    buf: Vec<u8>,
}

impl LircSocket {
    pub const DEFAULT_PATH: &'static str = "/var/run/lirc/lircd";

    pub fn connect(path: &str) -> Result<Self> {
        let stream = UnixStream::connect(path)
            .with_context(|| format!("Failed to connect to lircd socket: {path}"))?;
        stream
            .set_nonblocking(true)
            .context("Failed to switch lircd socket to non-blocking mode")?;
        Ok(Self { stream, buf: Vec::new() })
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.buf.iter().position(|b| *b == b'\n')?;
        let line: Vec<u8> = self.buf.drain(..=end).collect();
        Some(String::from_utf8_lossy(&line).trim().to_string())
    }
}

impl IrReceiver for LircSocket {
    fn read_code(&mut self) -> Option<String> {
        let mut chunk = [0u8; 256];
        match self.stream.read(&mut chunk) {
            Ok(0) => {}
            Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => {
                debug!("lircd socket read failed: {e}");
                return None;
            }
        }
        // Third field of the lircd line is the decoded key name.
        self.take_line()?
            .split_whitespace()
            .nth(2)
            .map(|code| code.to_string())
    }
}

/// A GPIO-wrapped hardware button. The platform's edge callback calls
/// [`GpioButton::pulse`], which widens the press into a Down/Up signal pair
/// on the canonical queue.
#[derive(Debug, Clone)]
pub struct GpioButton {
    pub pin: u8,
    pub key: Key,
    events: EventSender,
}

impl GpioButton {
    pub fn new(pin: u8, key: Key, events: EventSender) -> Self {
        Self { pin, key, events }
    }

    pub fn pulse(&self) {
        self.events.send_key_pulse(self.key, EventSource::Synthetic);
    }
}

/// A rotary encoder wrapped into three keys: one per rotation direction and
/// one for the push button. Each detent or push is widened into a Down/Up
/// signal pair, exactly like a GPIO button press.
#[derive(Debug, Clone)]
pub struct RotaryEncoder {
    cw_key: Key,
    ccw_key: Key,
    push_key: Key,
    events: EventSender,
}

impl RotaryEncoder {
    pub fn new(cw_key: Key, ccw_key: Key, push_key: Key, events: EventSender) -> Self {
        Self { cw_key, ccw_key, push_key, events }
    }

    pub fn clockwise(&self) {
        self.events.send_key_pulse(self.cw_key, EventSource::Synthetic);
    }

    pub fn counter_clockwise(&self) {
        self.events.send_key_pulse(self.ccw_key, EventSource::Synthetic);
    }

    pub fn pushed(&self) {
        self.events.send_key_pulse(self.push_key, EventSource::Synthetic);
    }
}

fn player_button_key(action: &str) -> Option<Key> {
    let key = match action {
        "left" => Key::Left,
        "right" => Key::Right,
        "up" => Key::Up,
        "down" => Key::Down,
        "select" => Key::Select,
        "volume-up" => Key::VolumeUp,
        "volume-down" => Key::VolumeDown,
        "mute" => Key::Mute,
        "play-pause" => Key::PlayPause,
        "next" => Key::PageUp,
        "previous" => Key::PageDown,
        "home" => Key::Home,
        "poweroff" => Key::Power,
        _ => return None,
    };
    Some(key)
}

/// Build the configured GPIO button bank. Unknown action names are logged
/// and skipped; the channel is simply absent for the session.
pub fn init_gpio_buttons(gpio: &GpioConfig, events: &EventSender) -> Vec<GpioButton> {
    let mut buttons = Vec::new();

    if gpio.use_player_buttons {
        for (action, pin) in &gpio.player_buttons {
            match player_button_key(action) {
                Some(key) => buttons.push(GpioButton::new(*pin, key, events.clone())),
                None => warn!("Unknown GPIO button action: {action}"),
            }
        }
    }

    if gpio.use_menu_buttons {
        for (index, pin) in gpio.menu_buttons.iter().enumerate().take(10) {
            let digit = ((index + 1) % 10) as u8;
            buttons.push(GpioButton::new(*pin, Key::Digit(digit), events.clone()));
        }
    }

    buttons
}

/// Build the configured rotary encoders: one trio for volume, one for menu
/// navigation. A trio is skipped unless all three of its pins are set and a
/// jitter filter is configured.
pub fn init_rotary_encoders(gpio: &GpioConfig, events: &EventSender) -> Vec<RotaryEncoder> {
    let mut encoders = Vec::new();
    if !gpio.use_rotary_encoders || gpio.jitter_filter == 0 {
        return encoders;
    }

    if let (Some(_), Some(_), Some(_)) =
        (gpio.rotary_volume_up, gpio.rotary_volume_down, gpio.rotary_volume_mute)
    {
        encoders.push(RotaryEncoder::new(
            Key::VolumeUp,
            Key::VolumeDown,
            Key::Mute,
            events.clone(),
        ));
    }

    if let (Some(_), Some(_), Some(_)) =
        (gpio.rotary_move_right, gpio.rotary_move_left, gpio.rotary_move_select)
    {
        encoders.push(RotaryEncoder::new(
            Key::Right,
            Key::Left,
            Key::Select,
            events.clone(),
        ));
    }

    encoders
}

fn term_key(code: crossterm::event::KeyCode) -> Option<Key> {
    use crossterm::event::KeyCode;
    let key = match code {
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Enter => Key::Select,
        KeyCode::Esc => Key::Back,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::Power,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Char(' ') => Key::PlayPause,
        KeyCode::Char('+') => Key::VolumeUp,
        KeyCode::Char('-') => Key::VolumeDown,
        KeyCode::Char('x') => Key::Mute,
        KeyCode::Char('m') => Key::Menu,
        KeyCode::Char(c) if c.is_ascii_digit() => Key::Digit(c as u8 - b'0'),
        KeyCode::Char(c) => Key::Char(c),
        _ => return None,
    };
    Some(key)
}

/// Desktop input channel: a reader thread converting crossterm key and mouse
/// occurrences into canonical raw events. Terminal key presses are discrete,
/// so each one is widened into a Down/Up pair; a Ctrl modifier is rendered
/// as a bracketing LeftCtrl Down/Up so the kill-switch tracker sees it.
pub struct TermInput;

impl TermInput {
    pub fn spawn(events: EventSender) -> thread::JoinHandle<()> {
        thread::spawn(move || Self::run(events))
    }

    fn run(events: EventSender) {
        use crossterm::event::{self, Event as TermEvent, KeyEventKind, MouseEventKind};

        loop {
            match event::poll(Duration::from_millis(100)) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!("Terminal input channel failed: {e}");
                    return;
                }
            }
            let read = match event::read() {
                Ok(read) => read,
                Err(e) => {
                    warn!("Terminal input channel failed: {e}");
                    return;
                }
            };
            match read {
                TermEvent::Key(key_event) if key_event.kind == KeyEventKind::Press => {
                    let Some(key) = term_key(key_event.code) else { continue };
                    let ctrl = key_event
                        .modifiers
                        .contains(crossterm::event::KeyModifiers::CONTROL);
                    if ctrl {
                        events.send(Event::key(Key::LeftCtrl, KeyAction::Down, EventSource::Keyboard));
                    }
                    events.send(Event::key(key, KeyAction::Down, EventSource::Keyboard));
                    events.send(Event::key(key, KeyAction::Up, EventSource::Keyboard));
                    if ctrl {
                        events.send(Event::key(Key::LeftCtrl, KeyAction::Up, EventSource::Keyboard));
                    }
                }
                TermEvent::Mouse(mouse) => {
                    let pos = (mouse.column as i32, mouse.row as i32);
                    let action = match mouse.kind {
                        MouseEventKind::Down(_) => PointerAction::Down,
                        MouseEventKind::Up(_) => PointerAction::Up,
                        MouseEventKind::Moved | MouseEventKind::Drag(_) => PointerAction::Move,
                        _ => continue,
                    };
                    events.send(Event::pointer(pos, action, EventSource::Touch));
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn queue_preserves_order() {
        let (tx, mut rx) = channel();
        tx.send(Event::select(EventSource::Synthetic));
        tx.send(Event::quit());
        assert_eq!(rx.poll().map(|e| e.kind), Some(EventKind::Select));
        assert_eq!(rx.poll().map(|e| e.kind), Some(EventKind::Quit));
        assert!(rx.poll().is_none());
    }

    #[test]
    fn gpio_button_pulse_widens_to_pair() {
        let (tx, mut rx) = channel();
        let button = GpioButton::new(17, Key::Home, tx);
        button.pulse();
        let down = rx.poll().expect("down event");
        let up = rx.poll().expect("up event");
        assert_eq!(down.kind, EventKind::Signal { key: Key::Home, action: KeyAction::Down });
        assert_eq!(up.kind, EventKind::Signal { key: Key::Home, action: KeyAction::Up });
        assert_eq!(down.source, EventSource::Synthetic);
        assert!(rx.poll().is_none());
    }

    #[test]
    fn rotary_detents_map_to_configured_keys() {
        let (tx, mut rx) = channel();
        let encoder = RotaryEncoder::new(Key::VolumeUp, Key::VolumeDown, Key::Mute, tx);
        encoder.clockwise();
        encoder.counter_clockwise();
        encoder.pushed();
        let keys: Vec<Key> = std::iter::from_fn(|| rx.poll())
            .filter_map(|e| match e.kind {
                EventKind::Signal { key, action: KeyAction::Up } => Some(key),
                _ => None,
            })
            .collect();
        assert_eq!(keys, vec![Key::VolumeUp, Key::VolumeDown, Key::Mute]);
    }

    #[test]
    fn gpio_bank_skips_unknown_actions() {
        let mut gpio = GpioConfig::default();
        gpio.use_player_buttons = true;
        gpio.player_buttons.insert("left".into(), 4);
        gpio.player_buttons.insert("warp".into(), 5);
        let (tx, _rx) = channel();
        let buttons = init_gpio_buttons(&gpio, &tx);
        assert_eq!(buttons.len(), 1);
        assert_eq!(buttons[0].key, Key::Left);
    }

    #[test]
    fn rotary_trio_requires_all_three_pins() {
        let mut gpio = GpioConfig::default();
        gpio.use_rotary_encoders = true;
        gpio.rotary_volume_up = Some(5);
        gpio.rotary_volume_down = Some(6);
        // mute pin left unset
        let (tx, _rx) = channel();
        assert!(init_rotary_encoders(&gpio, &tx).is_empty());

        gpio.rotary_volume_mute = Some(13);
        assert_eq!(init_rotary_encoders(&gpio, &tx).len(), 1);
    }
}
