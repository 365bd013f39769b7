//! Stateful detectors layered on the event stream: poweroff confirmation
//! and volume/transport key routing.

use log::debug;

use crate::player::VolumeControl;

use super::{Event, EventKind, Key, KeyAction, PointerAction};

/// One-bit poweroff debounce.
///
/// A power key-up arms the guard; a second power key-up with nothing else
/// observed in between confirms shutdown. Any other key-up or any pointer-up
/// disarms it. There is no timeout window: only the presence of an
/// intervening event matters, never elapsed time.
#[derive(Debug, Default)]
pub struct PoweroffGuard {
    armed: bool,
}

impl PoweroffGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Observe one routed event. Returns true when shutdown is confirmed.
    pub fn observe(&mut self, event: &Event) -> bool {
        match event.kind {
            EventKind::Signal { key: Key::Power, action: KeyAction::Up } => {
                if self.armed {
                    return true;
                }
                debug!("Poweroff armed, waiting for confirmation");
                self.armed = true;
            }
            EventKind::Signal { action: KeyAction::Up, .. } => self.armed = false,
            EventKind::Pointer { action: PointerAction::Up, .. } => self.armed = false,
            _ => {}
        }
        false
    }
}

/// Route volume and transport key-ups to the volume-control collaborator.
/// Pointer-class events bypass this guard entirely.
pub fn route_volume(event: &Event, volume: &mut dyn VolumeControl) {
    if event.is_pointer_class() {
        return;
    }
    let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
        return;
    };
    match key {
        Key::VolumeUp => volume.increase(),
        Key::VolumeDown => volume.decrease(),
        Key::Mute => volume.mute(event),
        Key::PlayPause => volume.play_pause(event),
        Key::PageUp | Key::PageDown => volume.previous_next(event),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;
    use crate::player::VolumeControl;

    fn power_up() -> Event {
        Event::signal(Key::Power, KeyAction::Up, EventSource::Ir)
    }

    #[test]
    fn two_power_ups_confirm_shutdown() {
        let mut guard = PoweroffGuard::new();
        assert!(!guard.observe(&power_up()));
        assert!(guard.armed());
        assert!(guard.observe(&power_up()));
    }

    #[test]
    fn intervening_key_up_disarms() {
        let mut guard = PoweroffGuard::new();
        assert!(!guard.observe(&power_up()));
        assert!(!guard.observe(&Event::signal(Key::Select, KeyAction::Up, EventSource::Keyboard)));
        assert!(!guard.armed());
        // next power key-up only re-arms
        assert!(!guard.observe(&power_up()));
        assert!(guard.observe(&power_up()));
    }

    #[test]
    fn pointer_up_disarms_but_key_down_does_not() {
        let mut guard = PoweroffGuard::new();
        guard.observe(&power_up());
        assert!(!guard.observe(&Event::signal(Key::Select, KeyAction::Down, EventSource::Ir)));
        assert!(guard.armed());
        guard.observe(&Event::pointer((5, 5), PointerAction::Up, EventSource::Touch));
        assert!(!guard.armed());
    }

    #[derive(Default)]
    struct RecordingVolume {
        calls: Vec<&'static str>,
    }

    impl VolumeControl for RecordingVolume {
        fn increase(&mut self) {
            self.calls.push("increase");
        }
        fn decrease(&mut self) {
            self.calls.push("decrease");
        }
        fn mute(&mut self, _event: &Event) {
            self.calls.push("mute");
        }
        fn play_pause(&mut self, _event: &Event) {
            self.calls.push("play_pause");
        }
        fn previous_next(&mut self, _event: &Event) {
            self.calls.push("previous_next");
        }
        fn set_volume(&mut self, _volume: u8) {
            self.calls.push("set_volume");
        }
    }

    #[test]
    fn volume_keys_reach_the_collaborator() {
        let mut volume = RecordingVolume::default();
        for key in [Key::VolumeUp, Key::VolumeDown, Key::Mute, Key::PlayPause, Key::PageUp] {
            route_volume(&Event::signal(key, KeyAction::Up, EventSource::Synthetic), &mut volume);
        }
        assert_eq!(
            volume.calls,
            vec!["increase", "decrease", "mute", "play_pause", "previous_next"]
        );
    }

    #[test]
    fn pointer_events_bypass_volume_routing() {
        let mut volume = RecordingVolume::default();
        route_volume(
            &Event::pointer((1, 1), PointerAction::Up, EventSource::Touch),
            &mut volume,
        );
        route_volume(
            &Event::signal(Key::VolumeUp, KeyAction::Down, EventSource::Ir),
            &mut volume,
        );
        assert!(volume.calls.is_empty());
    }
}
