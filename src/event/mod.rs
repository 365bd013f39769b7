//! Canonical input events.
//!
//! Every hardware channel (touchscreen, multi-touch panel, keyboard, mouse,
//! IR remote, GPIO buttons, rotary encoders) is funneled into the single
//! [`Event`] shape defined here, so everything downstream of the dispatch
//! loop handles one vocabulary regardless of where an occurrence came from.

pub mod dispatcher;
pub mod guards;
pub mod normalizer;
pub mod sources;

pub use dispatcher::EventLoop;
pub use normalizer::Normalizer;
pub use sources::{EventQueue, EventSender};

/// Origin channel of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// The appliance touchscreen (single- or multi-touch).
    Touch,
    /// The remote web UI; positions arrive pre-oriented and are never flipped.
    Browser,
    /// The IR remote receiver.
    Ir,
    /// A physical keyboard.
    Keyboard,
    /// Generated internally (GPIO wrappers, rotary encoders, timers).
    Synthetic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerAction {
    Down,
    Up,
    Move,
}

/// Appliance key vocabulary. Hardware scancodes, IR codes and GPIO pins are
/// all mapped into this one enum before routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Select,
    Back,
    Home,
    Menu,
    Power,
    PlayPause,
    /// Next track / next page.
    PageUp,
    /// Previous track / previous page.
    PageDown,
    VolumeUp,
    VolumeDown,
    Mute,
    Setup,
    Root,
    Parent,
    Audio,
    Digit(u8),
    LeftCtrl,
    RightCtrl,
    /// Wall-clock timer asked the appliance to go to sleep.
    Sleep,
    /// Wall-clock timer asked the appliance to wake up.
    WakeUp,
    Char(char),
}

/// Event payload. The variant structure carries the model invariants:
/// positions exist only on pointer-class variants, keys only on key-class
/// ones, so an event can never be both or neither.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Window close / poweroff timer; always routes to shutdown.
    Quit,
    /// Raw keyboard occurrence, before re-emission as a [`EventKind::Signal`].
    Key { key: Key, action: KeyAction },
    /// Pointer occurrence in screen coordinates.
    Pointer { pos: (i32, i32), action: PointerAction },
    /// Raw finger gesture with normalized 0..1 coordinates; converted to a
    /// `Pointer` event by the normalizer before any routing.
    Finger { x: f32, y: f32, action: PointerAction },
    /// A key occurrence re-emitted in uniform shape: keyboard, IR, GPIO and
    /// rotary input all end up here, which is the shape the guards and the
    /// screens consume.
    Signal { key: Key, action: KeyAction },
    /// Screen-originated selection signal; forwarded straight to the active
    /// screen.
    Select,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub source: EventSource,
}

impl Event {
    pub fn quit() -> Self {
        Self { kind: EventKind::Quit, source: EventSource::Synthetic }
    }

    pub fn key(key: Key, action: KeyAction, source: EventSource) -> Self {
        Self { kind: EventKind::Key { key, action }, source }
    }

    pub fn pointer(pos: (i32, i32), action: PointerAction, source: EventSource) -> Self {
        Self { kind: EventKind::Pointer { pos, action }, source }
    }

    pub fn finger(x: f32, y: f32, action: PointerAction) -> Self {
        Self { kind: EventKind::Finger { x, y, action }, source: EventSource::Touch }
    }

    pub fn signal(key: Key, action: KeyAction, source: EventSource) -> Self {
        Self { kind: EventKind::Signal { key, action }, source }
    }

    pub fn select(source: EventSource) -> Self {
        Self { kind: EventKind::Select, source }
    }

    /// Pointer-class events carry a position.
    pub fn is_pointer_class(&self) -> bool {
        matches!(self.kind, EventKind::Pointer { .. } | EventKind::Finger { .. })
    }

    /// Key-class events carry a key.
    pub fn is_key_class(&self) -> bool {
        matches!(self.kind, EventKind::Key { .. } | EventKind::Signal { .. })
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        match self.kind {
            EventKind::Pointer { pos, .. } => Some(pos),
            _ => None,
        }
    }

    /// Key-up of the given key, in either the raw or the signal shape.
    pub fn is_key_up(&self, key: Key) -> bool {
        matches!(
            self.kind,
            EventKind::Key { key: k, action: KeyAction::Up }
            | EventKind::Signal { key: k, action: KeyAction::Up } if k == key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_predicates_are_exclusive() {
        let pointer = Event::pointer((10, 20), PointerAction::Down, EventSource::Touch);
        assert!(pointer.is_pointer_class());
        assert!(!pointer.is_key_class());
        assert_eq!(pointer.position(), Some((10, 20)));

        let key = Event::key(Key::Select, KeyAction::Up, EventSource::Keyboard);
        assert!(key.is_key_class());
        assert!(!key.is_pointer_class());
        assert_eq!(key.position(), None);
    }

    #[test]
    fn key_up_matches_both_shapes() {
        let raw = Event::key(Key::Power, KeyAction::Up, EventSource::Keyboard);
        let signal = Event::signal(Key::Power, KeyAction::Up, EventSource::Ir);
        let down = Event::signal(Key::Power, KeyAction::Down, EventSource::Ir);
        assert!(raw.is_key_up(Key::Power));
        assert!(signal.is_key_up(Key::Power));
        assert!(!down.is_key_up(Key::Power));
        assert!(!signal.is_key_up(Key::Mute));
    }
}
