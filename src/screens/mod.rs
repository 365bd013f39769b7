//! Screens and navigation.
//!
//! Screens are name-keyed, lazily constructed, and owned exclusively by the
//! [`registry::ScreenRegistry`]. They never hold a pointer back to the
//! navigator: handling an event returns a [`ScreenCommand`] which the app
//! core executes, so navigation requests flow one way and there are no
//! ownership cycles.

pub mod browser;
pub mod home;
pub mod misc;
pub mod navigator;
pub mod players;
pub mod registry;

pub use navigator::{NavigationError, Navigator, ScreenDeps};
pub use registry::ScreenRegistry;

use crate::config::Mode;
use crate::event::Event;

/// A dirty rectangle handed to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Region {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

/// Stable identity of every screen the appliance can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScreenId {
    Home,
    About,
    Language,
    /// Radio player.
    Stations,
    FileBrowser,
    FilePlayer,
    Podcasts,
    PodcastEpisodes,
    PodcastPlayer,
    Stream,
    Collection,
    CollectionPlayer,
}

impl ScreenId {
    /// Unique string name, used in config and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ScreenId::Home => "home",
            ScreenId::About => "about",
            ScreenId::Language => "language",
            ScreenId::Stations => "stations",
            ScreenId::FileBrowser => "audio.files",
            ScreenId::FilePlayer => "play.file",
            ScreenId::Podcasts => "podcasts",
            ScreenId::PodcastEpisodes => "podcast.episodes",
            ScreenId::PodcastPlayer => "podcast.player",
            ScreenId::Stream => "stream",
            ScreenId::Collection => "collection",
            ScreenId::CollectionPlayer => "play.collection",
        }
    }

    /// Player-role screens own live playback transport and a progress timer;
    /// at most one is active system-wide.
    pub fn is_player(&self) -> bool {
        matches!(
            self,
            ScreenId::Stations
                | ScreenId::FilePlayer
                | ScreenId::PodcastPlayer
                | ScreenId::Stream
                | ScreenId::CollectionPlayer
        )
    }

    /// Entry screen when a mode is selected from home.
    pub fn mode_entry(mode: Mode) -> ScreenId {
        match mode {
            Mode::Radio => ScreenId::Stations,
            Mode::AudioFiles => ScreenId::FilePlayer,
            Mode::Podcasts => ScreenId::Podcasts,
            Mode::Stream => ScreenId::Stream,
            Mode::Collection => ScreenId::Collection,
        }
    }
}

impl std::fmt::Display for ScreenId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a transition happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavSource {
    #[default]
    Init,
    Resume,
    Home,
    Back,
    UserSelection,
    Favorites,
    Player,
}

/// One-shot transition payload; consumed by the transition and not retained
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationState {
    pub source: NavSource,
    /// Selected item index in the originating browser.
    pub index: Option<usize>,
    /// Selected podcast index for episode playback.
    pub podcast: Option<usize>,
    /// Selected file name for file playback.
    pub file: Option<String>,
    /// Folder for file browsing/playback.
    pub folder: Option<String>,
    /// Selected collection topic.
    pub topic: Option<String>,
}

impl NavigationState {
    pub fn with_source(source: NavSource) -> Self {
        Self { source, ..Self::default() }
    }
}

/// Command a screen hands back from its event handler; executed by the app
/// core. Mirrors the "register once, invoke by key" listener wiring of a
/// dynamic UI as one tagged enum.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScreenCommand {
    #[default]
    None,
    Navigate(ScreenId, NavigationState),
    Back,
    Home,
    SetMode(Mode),
    ChangeLanguage(String),
    Quit,
}

/// The active-screen contract consumed by the dispatch loop and navigator.
///
/// Screens react to the uniform `Signal` shape of key input (raw `Key`
/// events are also forwarded but conventionally ignored, since every key
/// press is re-emitted as a signal).
pub trait Screen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand;

    /// Pending dirty region, if the screen changed since the last present.
    fn refresh(&mut self) -> Option<Region>;

    /// Present the given region (full screen when `None`) and clear the
    /// dirty state.
    fn clean_draw_update(&mut self, region: Option<Region>);

    fn set_visible(&mut self, visible: bool);

    fn is_visible(&self) -> bool;

    /// Hook run when the screen stops being current.
    fn exit_screen(&mut self) {}

    /// Enter hook carrying the one-shot navigation payload.
    fn set_current(&mut self, state: &NavigationState);

    /// Enter hook for back-transitions; visibility only by default.
    fn go_back(&mut self) {}

    // Player-role surface; non-player screens keep the defaults.

    fn is_player_screen(&self) -> bool {
        false
    }

    /// Toggle the progress timer / background polling of a player screen.
    fn enable_player_screen(&mut self, _enabled: bool) {}

    fn stop_timer(&mut self) {}

    fn timer_enabled(&self) -> bool {
        false
    }

    /// Elapsed playback position for the persisted-time slot; `None` for
    /// live sources.
    fn elapsed_time(&self) -> Option<u64> {
        None
    }
}
