//! Conversion of raw platform occurrences into canonical events.
//!
//! Three jobs live here: the rotated-display coordinate flip, the finger
//! gesture to pointer translation, and the IR code to key mapping with its
//! single-pulse widening into a Down/Up pair.

use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;

use crate::config::ScreenInfo;

use super::{Event, EventKind, EventSource, Key, KeyAction, PointerAction};

/// Fixed IR code -> key table. Codes not present here are dropped.
static IR_KEY_MAP: Lazy<HashMap<&'static str, Key>> = Lazy::new(|| {
    HashMap::from([
        ("options", Key::Menu),
        ("power", Key::Power),
        ("home", Key::Home),
        ("pause", Key::PlayPause),
        ("play", Key::PlayPause),
        ("ok", Key::Select),
        ("left", Key::Left),
        ("right", Key::Right),
        ("up", Key::Up),
        ("down", Key::Down),
        ("next", Key::PageUp),
        ("previous", Key::PageDown),
        ("next_page", Key::VolumeUp),
        ("previous_page", Key::VolumeDown),
        ("mute", Key::Mute),
        ("back", Key::Back),
        ("setup", Key::Setup),
        ("root", Key::Root),
        ("parent", Key::Parent),
        ("audio", Key::Audio),
        ("0", Key::Digit(0)),
        ("1", Key::Digit(1)),
        ("2", Key::Digit(2)),
        ("3", Key::Digit(3)),
        ("4", Key::Digit(4)),
        ("5", Key::Digit(5)),
        ("6", Key::Digit(6)),
        ("7", Key::Digit(7)),
        ("8", Key::Digit(8)),
        ("9", Key::Digit(9)),
    ])
});

/// Stateless event normalizer, configured once from screen geometry.
#[derive(Debug, Clone)]
pub struct Normalizer {
    width: i32,
    height: i32,
    flip_touch_xy: bool,
}

impl Normalizer {
    pub fn new(screen: &ScreenInfo) -> Self {
        Self {
            width: screen.width,
            height: screen.height,
            flip_touch_xy: screen.flip_touch_xy,
        }
    }

    /// Apply the rotated-display coordinate flip to a pointer event.
    ///
    /// Browser events arrive pre-oriented and are exempt. The dispatch loop
    /// calls this from exactly one place, so the flip can never be applied
    /// twice to the same event.
    pub fn normalize(&self, event: &mut Event) {
        if !self.flip_touch_xy || event.source == EventSource::Browser {
            return;
        }
        if let EventKind::Pointer { pos, .. } = &mut event.kind {
            *pos = (self.width - pos.0 - 1, self.height - pos.1 - 1);
        }
    }

    /// Translate a finger gesture (normalized 0..1 coordinates) into the
    /// equivalent pointer event in screen coordinates.
    pub fn finger_to_pointer(&self, x: f32, y: f32, action: PointerAction) -> Event {
        let pos = ((x * self.width as f32) as i32, (y * self.height as f32) as i32);
        Event::pointer(pos, action, EventSource::Touch)
    }

    /// Map one IR code into its widened Down/Up signal pair.
    ///
    /// A remote pulse is a single discrete occurrence, but the key state
    /// machine downstream expects paired transitions, so every accepted code
    /// yields two events sharing the mapped key. Unmapped codes are dropped.
    pub fn ir_to_events(&self, code: &str) -> Option<[Event; 2]> {
        let key = match IR_KEY_MAP.get(code) {
            Some(key) => *key,
            None => {
                debug!("Received unsupported IR code: {code}");
                return None;
            }
        };
        debug!("Received IR key: {key:?}");
        Some([
            Event::signal(key, KeyAction::Down, EventSource::Ir),
            Event::signal(key, KeyAction::Up, EventSource::Ir),
        ])
    }
}
