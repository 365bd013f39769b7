//! Player-role screens: one per playback mode, each owning the live
//! transport and a progress timer. The navigator guarantees at most one of
//! them is active at a time.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, warn};

use crate::catalog::{CollectionCatalog, Episode, PodcastCatalog, Station};
use crate::config::Config;
use crate::event::{Event, EventKind, Key, KeyAction};
use crate::player::{PlayerHandle, Track};

use super::navigator::ScreenDeps;
use super::{NavSource, NavigationState, Region, Screen, ScreenCommand, ScreenId};

/// Elapsed-position counter for a player screen. Only ticks while the
/// owning screen is the active player.
#[derive(Debug, Default)]
pub struct ProgressTimer {
    elapsed_ms: u128,
    running: bool,
    last_tick: Option<Instant>,
}

impl ProgressTimer {
    pub fn start(&mut self) {
        self.running = true;
        self.last_tick = None;
    }

    /// Stop ticking; the elapsed position is kept for persistence.
    pub fn stop(&mut self) {
        self.running = false;
        self.last_tick = None;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        let now = Instant::now();
        if let Some(prev) = self.last_tick {
            self.elapsed_ms += now.duration_since(prev).as_millis();
        }
        self.last_tick = Some(now);
    }

    pub fn seek(&mut self, seconds: u64) {
        self.elapsed_ms = u128::from(seconds) * 1000;
        self.last_tick = None;
    }

    pub fn elapsed_secs(&self) -> u64 {
        (self.elapsed_ms / 1000) as u64
    }
}

/// State every player screen shares: visibility, the progress timer, the
/// loaded playlist and the player handle.
pub(crate) struct PlaybackCore {
    player: PlayerHandle,
    playlist: Vec<Track>,
    current: usize,
    pub(crate) timer: ProgressTimer,
    visible: bool,
    dirty: bool,
    bounds: Region,
    last_reported_second: u64,
}

impl PlaybackCore {
    pub fn new(player: PlayerHandle, bounds: Region) -> Self {
        Self {
            player,
            playlist: Vec::new(),
            current: 0,
            timer: ProgressTimer::default(),
            visible: false,
            dirty: false,
            bounds,
            last_reported_second: 0,
        }
    }

    pub fn load(&mut self, tracks: Vec<Track>, start_index: usize) {
        self.current = start_index.min(tracks.len().saturating_sub(1));
        self.playlist = tracks.clone();
        self.player.borrow_mut().load_playlist(tracks);
        self.dirty = true;
    }

    pub fn play_current(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        self.player.borrow_mut().play();
        self.timer.seek(0);
        self.dirty = true;
    }

    pub fn select(&mut self, index: usize) {
        if index < self.playlist.len() && index != self.current {
            self.current = index;
            self.play_current();
        }
    }

    pub fn step(&mut self, forward: bool) {
        if self.playlist.is_empty() {
            return;
        }
        self.current = if forward {
            (self.current + 1) % self.playlist.len()
        } else {
            self.current.checked_sub(1).unwrap_or(self.playlist.len() - 1)
        };
        self.play_current();
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    /// Advance the timer and report a dirty region once per elapsed second.
    pub fn refresh(&mut self) -> Option<Region> {
        self.timer.tick();
        let second = self.timer.elapsed_secs();
        if second != self.last_reported_second {
            self.last_reported_second = second;
            self.dirty = true;
        }
        self.dirty.then_some(self.bounds)
    }

    pub fn clean(&mut self) {
        self.dirty = false;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.dirty = true;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_active(&mut self, active: bool) {
        if active {
            self.timer.start();
        } else {
            self.timer.stop();
        }
    }

    /// Back/Home key-ups shared by every player screen; Left/Right step the
    /// playlist.
    pub fn handle_common(&mut self, event: &Event) -> Option<ScreenCommand> {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return None;
        };
        match key {
            Key::Back => Some(ScreenCommand::Back),
            Key::Home => Some(ScreenCommand::Home),
            Key::Left => {
                self.step(false);
                Some(ScreenCommand::None)
            }
            Key::Right => {
                self.step(true);
                Some(ScreenCommand::None)
            }
            _ => None,
        }
    }
}

fn fresh_selection(state: &NavigationState) -> bool {
    !matches!(
        state.source,
        NavSource::Resume | NavSource::Home | NavSource::Back | NavSource::Player
    )
}

/// Radio player ("stations"). Live source: no persisted position.
pub struct RadioPlayerScreen {
    core: PlaybackCore,
    stations: Vec<Station>,
}

impl RadioPlayerScreen {
    pub fn new(deps: &ScreenDeps) -> anyhow::Result<Self> {
        let language = deps.config.borrow().current.language.clone();
        let stations = deps.stations.stations(&language)?;
        let tracks = stations
            .iter()
            .map(|s| Track::new(s.name.clone(), s.url.clone()))
            .collect();
        let mut core = PlaybackCore::new(deps.player.clone(), deps.bounds());
        core.load(tracks, 0);
        core.play_current();
        Ok(Self { core, stations })
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }
}

impl Screen for RadioPlayerScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        self.core.handle_common(event).unwrap_or_default()
    }

    fn refresh(&mut self) -> Option<Region> {
        self.core.refresh()
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.core.clean();
    }

    fn set_visible(&mut self, visible: bool) {
        self.core.set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.core.is_visible()
    }

    fn set_current(&mut self, state: &NavigationState) {
        if !fresh_selection(state) {
            return;
        }
        if let Some(index) = state.index {
            self.core.select(index);
        }
    }

    fn is_player_screen(&self) -> bool {
        true
    }

    fn enable_player_screen(&mut self, enabled: bool) {
        self.core.set_active(enabled);
    }

    fn stop_timer(&mut self) {
        self.core.timer.stop();
    }

    fn timer_enabled(&self) -> bool {
        self.core.timer.is_running()
    }
}

/// File player; resumes the persisted folder/file/position on construction.
pub struct FilePlayerScreen {
    core: PlaybackCore,
    folder: String,
    file: Option<String>,
}

impl FilePlayerScreen {
    pub fn new(deps: &ScreenDeps) -> anyhow::Result<Self> {
        let (folder, file, track_time) = {
            let config = deps.config.borrow();
            (
                config.file_playback.folder.clone(),
                config.file_playback.file.clone(),
                config.file_playback.track_time,
            )
        };
        let tracks = deps.files.tracks(&folder)?;
        let start = tracks.iter().position(|t| t.title == file).unwrap_or(0);
        let mut core = PlaybackCore::new(deps.player.clone(), deps.bounds());
        core.load(tracks, start);
        core.timer.seek(track_time);
        deps.player.borrow_mut().seek(track_time);
        let file = (!file.is_empty()).then_some(file);
        Ok(Self { core, folder, file })
    }

    fn select_file(&mut self, file: &str) {
        if self.file.as_deref() == Some(file) {
            return;
        }
        if let Some(index) = self.core.playlist().iter().position(|t| t.title == file) {
            self.file = Some(file.to_string());
            self.core.select(index);
        } else {
            warn!("Selected file not in playlist: {file}");
        }
    }
}

impl Screen for FilePlayerScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        if event.is_key_up(Key::Menu) {
            let mut state = NavigationState::with_source(NavSource::UserSelection);
            state.folder = Some(self.folder.clone());
            return ScreenCommand::Navigate(ScreenId::FileBrowser, state);
        }
        self.core.handle_common(event).unwrap_or_default()
    }

    fn refresh(&mut self) -> Option<Region> {
        self.core.refresh()
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.core.clean();
    }

    fn set_visible(&mut self, visible: bool) {
        self.core.set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.core.is_visible()
    }

    fn set_current(&mut self, state: &NavigationState) {
        if !fresh_selection(state) {
            return;
        }
        if let Some(file) = &state.file {
            self.select_file(file);
        }
    }

    fn is_player_screen(&self) -> bool {
        true
    }

    fn enable_player_screen(&mut self, enabled: bool) {
        self.core.set_active(enabled);
    }

    fn stop_timer(&mut self) {
        self.core.timer.stop();
    }

    fn timer_enabled(&self) -> bool {
        self.core.timer.is_running()
    }

    fn elapsed_time(&self) -> Option<u64> {
        Some(self.core.timer.elapsed_secs())
    }
}

/// Podcast episode player. Episodes are fetched when a selection arrives
/// from the episodes browser, never rebuilt on plain re-entry.
pub struct PodcastPlayerScreen {
    core: PlaybackCore,
    catalog: Rc<dyn PodcastCatalog>,
    config: Rc<RefCell<Config>>,
    episodes: Vec<Episode>,
}

impl PodcastPlayerScreen {
    pub fn new(deps: &ScreenDeps) -> Self {
        Self {
            core: PlaybackCore::new(deps.player.clone(), deps.bounds()),
            catalog: deps.podcasts.clone(),
            config: deps.config.clone(),
            episodes: Vec::new(),
        }
    }

    fn load_episodes(&mut self, podcast: usize, episode: usize) {
        self.episodes = match self.catalog.episodes(podcast) {
            Ok(episodes) => episodes,
            Err(e) => {
                warn!("Failed to fetch podcast episodes: {e:#}");
                return;
            }
        };
        let tracks = self
            .episodes
            .iter()
            .map(|e| Track::new(e.name.clone(), e.url.clone()))
            .collect();
        self.core.load(tracks, episode);
        self.core.play_current();

        let mut config = self.config.borrow_mut();
        if let Some(selected) = self.episodes.get(episode) {
            if config.podcasts.episode == selected.name {
                // resuming the persisted episode: restore its position
                let t = config.podcasts.episode_time;
                self.core.timer.seek(t);
                self.core.player.borrow_mut().seek(t);
            } else {
                config.podcasts.episode = selected.name.clone();
                config.podcasts.episode_time = 0;
            }
        }
    }
}

impl Screen for PodcastPlayerScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        if event.is_key_up(Key::Menu) {
            return ScreenCommand::Navigate(
                ScreenId::Podcasts,
                NavigationState::with_source(NavSource::UserSelection),
            );
        }
        self.core.handle_common(event).unwrap_or_default()
    }

    fn refresh(&mut self) -> Option<Region> {
        self.core.refresh()
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.core.clean();
    }

    fn set_visible(&mut self, visible: bool) {
        self.core.set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.core.is_visible()
    }

    fn set_current(&mut self, state: &NavigationState) {
        if !fresh_selection(state) {
            return;
        }
        if let (Some(podcast), Some(episode)) = (state.podcast, state.index) {
            self.load_episodes(podcast, episode);
        }
    }

    fn is_player_screen(&self) -> bool {
        true
    }

    fn enable_player_screen(&mut self, enabled: bool) {
        self.core.set_active(enabled);
    }

    fn stop_timer(&mut self) {
        self.core.timer.stop();
    }

    fn timer_enabled(&self) -> bool {
        self.core.timer.is_running()
    }

    fn elapsed_time(&self) -> Option<u64> {
        Some(self.core.timer.elapsed_secs())
    }
}

/// Fixed-stream player fed from the config's stream list. Live source.
pub struct StreamScreen {
    core: PlaybackCore,
}

impl StreamScreen {
    pub fn new(deps: &ScreenDeps) -> Self {
        let tracks: Vec<Track> = deps
            .config
            .borrow()
            .streams
            .iter()
            .map(|s| Track::new(s.name.clone(), s.url.clone()))
            .collect();
        let mut core = PlaybackCore::new(deps.player.clone(), deps.bounds());
        if !tracks.is_empty() {
            core.load(tracks, 0);
            core.play_current();
        }
        Self { core }
    }
}

impl Screen for StreamScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        self.core.handle_common(event).unwrap_or_default()
    }

    fn refresh(&mut self) -> Option<Region> {
        self.core.refresh()
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.core.clean();
    }

    fn set_visible(&mut self, visible: bool) {
        self.core.set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.core.is_visible()
    }

    fn set_current(&mut self, state: &NavigationState) {
        if !fresh_selection(state) {
            return;
        }
        if let Some(index) = state.index {
            self.core.select(index);
        }
    }

    fn is_player_screen(&self) -> bool {
        true
    }

    fn enable_player_screen(&mut self, enabled: bool) {
        self.core.set_active(enabled);
    }

    fn stop_timer(&mut self) {
        self.core.timer.stop();
    }

    fn timer_enabled(&self) -> bool {
        self.core.timer.is_running()
    }
}

/// Collection topic player; resumes the persisted topic on construction.
pub struct CollectionPlayerScreen {
    core: PlaybackCore,
    catalog: Rc<dyn CollectionCatalog>,
    config: Rc<RefCell<Config>>,
    topic: Option<String>,
}

impl CollectionPlayerScreen {
    pub fn new(deps: &ScreenDeps) -> anyhow::Result<Self> {
        let (topic, track_time) = {
            let config = deps.config.borrow();
            (config.collection.topic.clone(), config.collection.track_time)
        };
        let mut core = PlaybackCore::new(deps.player.clone(), deps.bounds());
        let mut current_topic = None;
        if !topic.is_empty() {
            let tracks = deps.collection.tracks(&topic)?;
            core.load(tracks, 0);
            core.timer.seek(track_time);
            deps.player.borrow_mut().seek(track_time);
            current_topic = Some(topic);
        }
        Ok(Self {
            core,
            catalog: deps.collection.clone(),
            config: deps.config.clone(),
            topic: current_topic,
        })
    }

    fn select_topic(&mut self, topic: &str) {
        if self.topic.as_deref() == Some(topic) {
            return;
        }
        let tracks = match self.catalog.tracks(topic) {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!("Failed to load collection topic {topic}: {e:#}");
                return;
            }
        };
        debug!("Switching collection topic to {topic}");
        self.topic = Some(topic.to_string());
        self.config.borrow_mut().collection.topic = topic.to_string();
        self.core.load(tracks, 0);
        self.core.play_current();
    }
}

impl Screen for CollectionPlayerScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        if event.is_key_up(Key::Menu) {
            return ScreenCommand::Navigate(
                ScreenId::Collection,
                NavigationState::with_source(NavSource::UserSelection),
            );
        }
        self.core.handle_common(event).unwrap_or_default()
    }

    fn refresh(&mut self) -> Option<Region> {
        self.core.refresh()
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.core.clean();
    }

    fn set_visible(&mut self, visible: bool) {
        self.core.set_visible(visible);
    }

    fn is_visible(&self) -> bool {
        self.core.is_visible()
    }

    fn set_current(&mut self, state: &NavigationState) {
        if !fresh_selection(state) {
            return;
        }
        if let Some(topic) = state.topic.clone() {
            self.select_topic(&topic);
        }
    }

    fn is_player_screen(&self) -> bool {
        true
    }

    fn enable_player_screen(&mut self, enabled: bool) {
        self.core.set_active(enabled);
    }

    fn stop_timer(&mut self) {
        self.core.timer.stop();
    }

    fn timer_enabled(&self) -> bool {
        self.core.timer.is_running()
    }

    fn elapsed_time(&self) -> Option<u64> {
        Some(self.core.timer.elapsed_secs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_timer_keeps_elapsed_across_stop() {
        let mut timer = ProgressTimer::default();
        timer.seek(42);
        timer.start();
        timer.tick();
        timer.stop();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed_secs(), 42);
        // ticking while stopped must not advance
        timer.tick();
        assert_eq!(timer.elapsed_secs(), 42);
    }

    #[test]
    fn timer_seek_overrides_elapsed() {
        let mut timer = ProgressTimer::default();
        timer.seek(10);
        assert_eq!(timer.elapsed_secs(), 10);
        timer.seek(3);
        assert_eq!(timer.elapsed_secs(), 3);
    }
}
