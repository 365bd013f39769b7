//! Contracts for the audio backend and volume control collaborators, plus
//! the one piece of state shared across threads.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::config::{Config, Mode};
use crate::event::Event;

/// One playlist entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub url: String,
}

impl Track {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self { title: title.into(), url: url.into() }
    }
}

/// Metadata pushed by the audio backend from its own callback thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackInfo {
    pub title: String,
}

pub type PlayerListener = Box<dyn FnMut(&TrackInfo) + Send>;
pub type EndOfTrackListener = Box<dyn FnMut() + Send>;

/// Audio backend contract. Implementations wrap an external player process;
/// listener callbacks arrive on the backend's own thread and must only touch
/// [`SharedState`] or push events through an
/// [`EventSender`](crate::event::EventSender).
pub trait Player {
    fn play(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn seek(&mut self, position: u64);
    fn set_volume(&mut self, volume: u8);
    fn mute(&mut self, muted: bool);
    fn next(&mut self);
    fn previous(&mut self);
    fn load_playlist(&mut self, tracks: Vec<Track>);
    fn current_playlist(&self) -> &[Track];
    fn add_player_listener(&mut self, listener: PlayerListener);
    fn add_end_of_track_listener(&mut self, listener: EndOfTrackListener);
}

/// All UI-side consumers share the player single-threadedly.
pub type PlayerHandle = Rc<RefCell<dyn Player>>;

/// Playback lifecycle as seen by the wall-clock timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Running,
    Sleeping,
}

/// The only true multi-thread shared state in the system: the wake/sleep
/// timer task and the backend metadata callback read these two fields, the
/// UI thread writes them. Everything else is single-threaded by
/// construction.
#[derive(Debug)]
pub struct SharedState {
    pub mode: Mode,
    pub player_state: PlayerState,
}

pub type Shared = Arc<Mutex<SharedState>>;

pub fn shared_state(mode: Mode) -> Shared {
    Arc::new(Mutex::new(SharedState { mode, player_state: PlayerState::Running }))
}

/// Volume-control collaborator contract; the event guards route volume and
/// transport key-ups here.
pub trait VolumeControl {
    fn increase(&mut self);
    fn decrease(&mut self);
    fn mute(&mut self, event: &Event);
    fn play_pause(&mut self, event: &Event);
    fn previous_next(&mut self, event: &Event);
    fn set_volume(&mut self, volume: u8);
}

const VOLUME_STEP: u8 = 10;

/// Default volume control: adjusts the backend and mirrors the level into
/// the persisted player settings.
pub struct PlayerVolume {
    player: PlayerHandle,
    config: Rc<RefCell<Config>>,
}

impl PlayerVolume {
    pub fn new(player: PlayerHandle, config: Rc<RefCell<Config>>) -> Self {
        Self { player, config }
    }

    fn apply(&mut self, volume: u8) {
        self.config.borrow_mut().player_settings.volume = volume;
        self.player.borrow_mut().set_volume(volume);
    }
}

impl VolumeControl for PlayerVolume {
    fn increase(&mut self) {
        let volume = self.config.borrow().player_settings.volume;
        self.apply(volume.saturating_add(VOLUME_STEP).min(100));
    }

    fn decrease(&mut self) {
        let volume = self.config.borrow().player_settings.volume;
        self.apply(volume.saturating_sub(VOLUME_STEP));
    }

    fn mute(&mut self, _event: &Event) {
        let muted = {
            let mut config = self.config.borrow_mut();
            config.player_settings.mute = !config.player_settings.mute;
            config.player_settings.mute
        };
        self.player.borrow_mut().mute(muted);
    }

    fn play_pause(&mut self, _event: &Event) {
        let paused = {
            let mut config = self.config.borrow_mut();
            config.player_settings.pause = !config.player_settings.pause;
            config.player_settings.pause
        };
        let mut player = self.player.borrow_mut();
        if paused {
            player.pause();
        } else {
            player.resume();
        }
    }

    fn previous_next(&mut self, event: &Event) {
        use crate::event::Key;
        let mut player = self.player.borrow_mut();
        if event.is_key_up(Key::PageUp) {
            player.next();
        } else if event.is_key_up(Key::PageDown) {
            player.previous();
        }
    }

    fn set_volume(&mut self, volume: u8) {
        self.apply(volume.min(100));
    }
}

/// Backend stub used until a real player is wired in: records every command
/// so the UI layer stays fully drivable (and observable in tests).
#[derive(Default)]
pub struct NullPlayer {
    playlist: Vec<Track>,
    pub playing: bool,
    pub paused: bool,
    pub muted: bool,
    pub volume: u8,
    pub position: u64,
    pub current_index: usize,
    listeners: Vec<PlayerListener>,
    end_listeners: Vec<EndOfTrackListener>,
}

impl NullPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(self) -> PlayerHandle {
        Rc::new(RefCell::new(self))
    }
}

impl Player for NullPlayer {
    fn play(&mut self) {
        debug!("player: play");
        self.playing = true;
        self.paused = false;
    }

    fn stop(&mut self) {
        debug!("player: stop");
        self.playing = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn seek(&mut self, position: u64) {
        self.position = position;
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
    }

    fn mute(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn next(&mut self) {
        if !self.playlist.is_empty() {
            self.current_index = (self.current_index + 1) % self.playlist.len();
        }
    }

    fn previous(&mut self) {
        if !self.playlist.is_empty() {
            self.current_index = self.current_index.checked_sub(1).unwrap_or(self.playlist.len() - 1);
        }
    }

    fn load_playlist(&mut self, tracks: Vec<Track>) {
        debug!("player: load playlist with {} tracks", tracks.len());
        self.playlist = tracks;
        self.current_index = 0;
    }

    fn current_playlist(&self) -> &[Track] {
        &self.playlist
    }

    fn add_player_listener(&mut self, listener: PlayerListener) {
        self.listeners.push(listener);
    }

    fn add_end_of_track_listener(&mut self, listener: EndOfTrackListener) {
        self.end_listeners.push(listener);
    }
}
