//! Wall-clock sleep/wake/poweroff timer.
//!
//! Runs on its own thread at a 2 second cadence and never touches UI state
//! directly: it reads the shared player state under its mutex and asks the
//! dispatch loop to act by pushing synthetic events through the canonical
//! queue.

use std::thread;
use std::time::Duration;

use chrono::Local;
use log::{debug, info};

use crate::config::TimerConfig;
use crate::event::{Event, EventSource, Key, KeyAction, EventSender};
use crate::player::{PlayerState, Shared};

const CADENCE: Duration = Duration::from_secs(2);

/// "HH:MM" -> "HHMM"; empty stays empty.
fn normalize(time: &str) -> String {
    time.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when `current` ("HHMMSS") falls in the first 3 seconds of the
/// target minute ("HHMM"). The window is wider than the thread cadence, so
/// a tick can never skip past it.
pub fn is_time_in_range(current: &str, target: &str) -> bool {
    let (Some(current_hm), Some(target_hm), Some(seconds)) =
        (current.get(0..4), target.get(0..4), current.get(4..6))
    else {
        return false;
    };
    if current_hm != target_hm {
        return false;
    }
    seconds.parse::<u8>().map(|sec| sec < 3).unwrap_or(false)
}

/// Start the timer thread if the configuration asks for one.
pub fn start(config: &TimerConfig, shared: Shared, events: EventSender) -> Option<thread::JoinHandle<()>> {
    let sleep_time = normalize(&config.sleep_time);
    let wake_time = normalize(&config.wake_up_time);
    let sleep_selected = config.sleep && !sleep_time.is_empty();
    let poweroff_selected = config.poweroff && !sleep_time.is_empty();
    if !sleep_selected && !poweroff_selected {
        return None;
    }
    let wake_selected = config.wake_up && !wake_time.is_empty();

    info!("Timer thread started (sleep: {sleep_selected}, poweroff: {poweroff_selected})");
    Some(thread::spawn(move || {
        loop {
            thread::sleep(CADENCE);
            let now = Local::now().format("%H%M%S").to_string();

            if sleep_selected {
                let state = shared
                    .lock()
                    .map(|s| s.player_state)
                    .unwrap_or(PlayerState::Running);
                if wake_selected
                    && state == PlayerState::Sleeping
                    && is_time_in_range(&now, &wake_time)
                {
                    debug!("Timer: wake up");
                    events.send(Event::signal(Key::WakeUp, KeyAction::Up, EventSource::Synthetic));
                }
                if !is_time_in_range(&now, &sleep_time) {
                    continue;
                }
                if state == PlayerState::Running {
                    debug!("Timer: sleep");
                    events.send(Event::signal(Key::Sleep, KeyAction::Up, EventSource::Synthetic));
                }
            } else if poweroff_selected && is_time_in_range(&now, &sleep_time) {
                debug!("Timer: poweroff");
                events.send(Event::quit());
                return;
            }
        }
    }))
}
