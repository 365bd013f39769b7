//! The navigation state machine.
//!
//! Owns the screen registry and enforces the lifecycle invariants: exactly
//! one visible screen, single-level back history, lazy construction with a
//! typed failure path, language-change teardown, and exclusive player-screen
//! activation with per-mode persisted positions.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, error, info};

use crate::catalog::{CollectionCatalog, FileCatalog, PodcastCatalog, StationCatalog};
use crate::config::{Config, Mode};
use crate::player::{PlayerHandle, Shared};

use super::browser::{CollectionScreen, FileBrowserScreen, PodcastEpisodesScreen, PodcastsScreen};
use super::home::HomeScreen;
use super::misc::{AboutScreen, LanguageScreen};
use super::players::{
    CollectionPlayerScreen, FilePlayerScreen, PodcastPlayerScreen, RadioPlayerScreen, StreamScreen,
};
use super::{NavSource, NavigationState, Region, Screen, ScreenId, ScreenRegistry};

/// Construction context handed to screens: the explicit replacement for a
/// global mutable config. Everything in here is shared single-threadedly.
pub struct ScreenDeps {
    pub config: Rc<RefCell<Config>>,
    pub player: PlayerHandle,
    pub stations: Rc<dyn StationCatalog>,
    pub files: Rc<dyn FileCatalog>,
    pub podcasts: Rc<dyn PodcastCatalog>,
    pub collection: Rc<dyn CollectionCatalog>,
}

impl ScreenDeps {
    /// Full-screen bounds used as every screen's dirty region.
    pub fn bounds(&self) -> Region {
        let screen = &self.config.borrow().screen;
        Region::new(0, 0, screen.width, screen.height)
    }
}

/// Typed per-transition failure. The navigator resolves it by falling back
/// to the home screen, so a broken catalog can never leave nothing visible.
#[derive(Debug)]
pub enum NavigationError {
    Construction { screen: ScreenId, source: anyhow::Error },
}

impl std::fmt::Display for NavigationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NavigationError::Construction { screen, source } => {
                write!(f, "Failed to construct screen '{screen}': {source:#}")
            }
        }
    }
}

impl std::error::Error for NavigationError {}

pub struct Navigator {
    registry: ScreenRegistry,
    deps: ScreenDeps,
    shared: Shared,
    /// The one player-role screen whose progress timer may be enabled.
    current_player: Option<ScreenId>,
}

impl Navigator {
    pub fn new(deps: ScreenDeps, shared: Shared) -> Self {
        let mut registry = ScreenRegistry::new();
        // The about screen is built eagerly; it is the one screen that
        // survives language changes.
        let bounds = deps.bounds();
        registry.insert(ScreenId::About, Box::new(AboutScreen::new(bounds)));
        Self { registry, deps, shared, current_player: None }
    }

    pub fn registry(&self) -> &ScreenRegistry {
        &self.registry
    }

    pub fn current(&self) -> Option<ScreenId> {
        self.registry.current()
    }

    pub fn previous(&self) -> Option<ScreenId> {
        self.registry.previous()
    }

    pub fn current_player(&self) -> Option<ScreenId> {
        self.current_player
    }

    pub fn current_screen_mut(&mut self) -> Option<&mut (dyn Screen + 'static)> {
        self.registry.current_screen_mut()
    }

    /// Number of player screens whose progress timer is ticking. The
    /// activation contract keeps this at most one.
    pub fn enabled_player_timers(&self) -> usize {
        self.registry
            .ids()
            .into_iter()
            .filter_map(|id| self.registry.get(id))
            .filter(|s| s.timer_enabled())
            .count()
    }

    /// Transition to `target`, constructing it on first visit.
    ///
    /// Construction runs before the outgoing screen is touched, so a failed
    /// build leaves the current screen visible and the registry unchanged.
    pub fn navigate(
        &mut self,
        target: ScreenId,
        mut state: NavigationState,
    ) -> Result<(), NavigationError> {
        if target.is_player() {
            // Re-entering the active player without a fresh selection only
            // toggles visibility; playlists and artwork stay as they are.
            if self.current_player == Some(target)
                && !matches!(
                    state.source,
                    NavSource::UserSelection | NavSource::Favorites | NavSource::Init
                )
            {
                state.source = NavSource::Resume;
            }
            self.deactivate_players(target);
        }

        if !self.registry.contains(target) {
            let screen = self
                .build_screen(target)
                .map_err(|source| NavigationError::Construction { screen: target, source })?;
            self.registry.insert(target, screen);
            debug!("Constructed screen '{target}'");
        }

        if let Some(outgoing) = self.registry.current_screen_mut() {
            outgoing.exit_screen();
            outgoing.set_visible(false);
        }
        self.registry.record_transition(target);

        let player_role = target.is_player();
        if let Some(screen) = self.registry.get_mut(target) {
            if player_role {
                screen.enable_player_screen(true);
            }
            screen.set_visible(true);
            if state.source == NavSource::Back {
                screen.go_back();
            } else {
                screen.set_current(&state);
            }
            screen.clean_draw_update(None);
        }
        if player_role {
            self.current_player = Some(target);
        }

        info!(
            "Screen transition: {} -> {target}",
            self.registry.previous().map(|p| p.name()).unwrap_or("-")
        );
        Ok(())
    }

    /// Like [`Navigator::navigate`], resolving failure by falling back to
    /// the home screen instead of propagating.
    pub fn navigate_or_home(&mut self, target: ScreenId, state: NavigationState) {
        if let Err(e) = self.navigate(target, state) {
            error!("{e}");
            if target != ScreenId::Home {
                let fallback = NavigationState::with_source(NavSource::Init);
                if let Err(e) = self.navigate(ScreenId::Home, fallback) {
                    error!("Home fallback failed: {e}");
                }
            }
        }
    }

    /// Return to the immediately preceding screen. Single-level: a second
    /// Back without an intervening forward transition does not descend
    /// further.
    pub fn back(&mut self) {
        let Some(previous) = self.registry.previous() else {
            return;
        };
        self.navigate_or_home(previous, NavigationState::with_source(NavSource::Back));
    }

    pub fn go_home(&mut self) {
        self.navigate_or_home(ScreenId::Home, NavigationState::with_source(NavSource::Home));
    }

    /// Jump to the active player screen, if there is one.
    pub fn go_player(&mut self, mut state: NavigationState) {
        let Some(player) = self.current_player else {
            return;
        };
        state.source = NavSource::Player;
        self.navigate_or_home(player, state);
    }

    /// Switch playback mode: persist the outgoing position, stop the player
    /// when the mode actually changes, and enter the mode's entry screen.
    pub fn set_mode(&mut self, mode: Mode) {
        self.store_player_position();

        let changed = self.deps.config.borrow().current.mode != mode;
        if changed {
            self.deps.player.borrow_mut().stop();
        }

        self.navigate_or_home(
            ScreenId::mode_entry(mode),
            NavigationState::with_source(NavSource::Home),
        );

        self.deps.config.borrow_mut().current.mode = mode;
        if let Ok(mut shared) = self.shared.lock() {
            shared.mode = mode;
        }
        info!("Mode set to {mode:?}");
    }

    /// Change the UI language: tear down every cached screen except the
    /// persistent one and return home, forcing lazy reconstruction.
    pub fn change_language(&mut self, language: &str) {
        let changed = self.deps.config.borrow().current.language != language;
        if changed {
            info!("Changing language to {language}");
            self.deps.config.borrow_mut().current.language = language.to_string();
            self.registry.reset_for_language_change(ScreenId::About);
            self.current_player = None;
        }
        self.go_home();
        self.deps.player.borrow_mut().stop();
    }

    /// Persist the active player's elapsed position into its mode-specific
    /// slot. Live sources (radio, stream) have no slot and are skipped.
    pub fn store_player_position(&mut self) {
        let Some(player) = self.current_player else {
            return;
        };
        let Some(screen) = self.registry.get(player) else {
            return;
        };
        let Some(elapsed) = screen.elapsed_time() else {
            return;
        };
        let mut config = self.deps.config.borrow_mut();
        match player {
            ScreenId::FilePlayer => config.file_playback.track_time = elapsed,
            ScreenId::PodcastPlayer => config.podcasts.episode_time = elapsed,
            ScreenId::CollectionPlayer => config.collection.track_time = elapsed,
            _ => {}
        }
        debug!("Persisted '{player}' position: {elapsed}s");
    }

    /// The exclusive-activation contract: before a player screen becomes
    /// current, every other player screen's timer is disabled, and when the
    /// active player actually changes its position is persisted and its
    /// timer stopped.
    fn deactivate_players(&mut self, incoming: ScreenId) {
        for (_, screen) in self.registry.iter_mut() {
            if screen.is_player_screen() {
                screen.enable_player_screen(false);
            }
        }
        if self.current_player != Some(incoming) {
            self.store_player_position();
            if let Some(outgoing) = self.current_player {
                if let Some(screen) = self.registry.get_mut(outgoing) {
                    screen.stop_timer();
                }
            }
        }
    }

    fn build_screen(&self, id: ScreenId) -> anyhow::Result<Box<dyn Screen>> {
        let deps = &self.deps;
        let screen: Box<dyn Screen> = match id {
            ScreenId::Home => Box::new(HomeScreen::new(deps.bounds())),
            ScreenId::About => Box::new(AboutScreen::new(deps.bounds())),
            ScreenId::Language => {
                let config = deps.config.borrow();
                Box::new(LanguageScreen::new(
                    config.languages.clone(),
                    &config.current.language,
                    deps.bounds(),
                ))
            }
            ScreenId::Stations => Box::new(RadioPlayerScreen::new(deps)?),
            ScreenId::FileBrowser => Box::new(FileBrowserScreen::new(deps)?),
            ScreenId::FilePlayer => Box::new(FilePlayerScreen::new(deps)?),
            ScreenId::Podcasts => Box::new(PodcastsScreen::new(deps)?),
            ScreenId::PodcastEpisodes => Box::new(PodcastEpisodesScreen::new(deps)),
            ScreenId::PodcastPlayer => Box::new(PodcastPlayerScreen::new(deps)),
            ScreenId::Stream => Box::new(StreamScreen::new(deps)),
            ScreenId::Collection => Box::new(CollectionScreen::new(deps)?),
            ScreenId::CollectionPlayer => Box::new(CollectionPlayerScreen::new(deps)?),
        };
        Ok(screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Episode, Podcast, Station};
    use crate::player::{shared_state, NullPlayer, Track};
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeCatalog {
        station_loads: Cell<u32>,
        file_loads: Cell<u32>,
        fail_stations: bool,
    }

    impl StationCatalog for FakeCatalog {
        fn stations(&self, _language: &str) -> anyhow::Result<Vec<Station>> {
            if self.fail_stations {
                anyhow::bail!("station list unavailable");
            }
            self.station_loads.set(self.station_loads.get() + 1);
            Ok(vec![
                Station { name: "one".into(), url: "u1".into() },
                Station { name: "two".into(), url: "u2".into() },
            ])
        }
    }

    impl FileCatalog for FakeCatalog {
        fn list(&self, _folder: &str) -> anyhow::Result<Vec<String>> {
            Ok(vec!["a.mp3".into(), "b.mp3".into()])
        }

        fn tracks(&self, _folder: &str) -> anyhow::Result<Vec<Track>> {
            self.file_loads.set(self.file_loads.get() + 1);
            Ok(vec![Track::new("a.mp3", "a"), Track::new("b.mp3", "b")])
        }
    }

    impl PodcastCatalog for FakeCatalog {
        fn podcasts(&self) -> anyhow::Result<Vec<Podcast>> {
            Ok(vec![Podcast { name: "p".into(), url: "u".into() }])
        }

        fn episodes(&self, _podcast: usize) -> anyhow::Result<Vec<Episode>> {
            Ok(vec![Episode { name: "e1".into(), url: "u1".into() }])
        }
    }

    impl CollectionCatalog for FakeCatalog {
        fn topics(&self) -> anyhow::Result<Vec<String>> {
            Ok(vec!["topic".into()])
        }

        fn tracks(&self, _topic: &str) -> anyhow::Result<Vec<Track>> {
            Ok(vec![Track::new("t", "t.mp3")])
        }
    }

    fn navigator_with(catalog: Rc<FakeCatalog>) -> (Navigator, Rc<RefCell<Config>>) {
        let config = Rc::new(RefCell::new(Config::default()));
        let deps = ScreenDeps {
            config: config.clone(),
            player: Rc::new(RefCell::new(NullPlayer::new())),
            stations: catalog.clone(),
            files: catalog.clone(),
            podcasts: catalog.clone(),
            collection: catalog,
        };
        let shared = shared_state(Mode::Radio);
        (Navigator::new(deps, shared), config)
    }

    fn navigator() -> (Navigator, Rc<RefCell<Config>>) {
        navigator_with(Rc::new(FakeCatalog::default()))
    }

    #[test]
    fn navigating_from_home_records_history() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.navigate(ScreenId::Stations, NavigationState::with_source(NavSource::Init))
            .unwrap();
        assert!(nav.registry().contains(ScreenId::Stations));
        assert_eq!(nav.current(), Some(ScreenId::Stations));
        assert_eq!(nav.previous(), Some(ScreenId::Home));
        assert_eq!(nav.current().map(|s| s.name()), Some("stations"));
        assert_eq!(nav.previous().map(|s| s.name()), Some("home"));
    }

    #[test]
    fn exactly_one_screen_is_visible_after_any_sequence() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.set_mode(Mode::Radio);
        nav.set_mode(Mode::Podcasts);
        nav.back();
        nav.go_home();
        let visible: Vec<ScreenId> = nav
            .registry()
            .ids()
            .into_iter()
            .filter(|id| nav.registry().get(*id).map(|s| s.is_visible()).unwrap_or(false))
            .collect();
        assert_eq!(visible, vec![ScreenId::Home]);
    }

    #[test]
    fn back_is_single_level() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.navigate(ScreenId::Podcasts, NavigationState::with_source(NavSource::Init))
            .unwrap();
        nav.navigate(ScreenId::Language, NavigationState::with_source(NavSource::Init))
            .unwrap();

        nav.back();
        assert_eq!(nav.current(), Some(ScreenId::Podcasts));
        // second Back without a forward transition does not descend further
        nav.back();
        assert_eq!(nav.current(), Some(ScreenId::Language));
    }

    #[test]
    fn at_most_one_player_timer_after_navigation() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.set_mode(Mode::Radio);
        assert_eq!(nav.enabled_player_timers(), 1);
        nav.set_mode(Mode::AudioFiles);
        assert_eq!(nav.enabled_player_timers(), 1);
        nav.set_mode(Mode::Stream);
        assert_eq!(nav.enabled_player_timers(), 1);
        assert_eq!(nav.current_player(), Some(ScreenId::Stream));
    }

    #[test]
    fn player_timer_survives_browsing_non_player_screens() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.set_mode(Mode::Radio);
        nav.go_home();
        // radio keeps playing (and ticking) while the user browses
        assert_eq!(nav.enabled_player_timers(), 1);
        assert_eq!(nav.current_player(), Some(ScreenId::Stations));
    }

    #[test]
    fn reentering_active_player_does_not_reload_playlist() {
        let catalog = Rc::new(FakeCatalog::default());
        let (mut nav, _) = navigator_with(catalog.clone());
        nav.go_home();
        nav.set_mode(Mode::Radio);
        assert_eq!(catalog.station_loads.get(), 1);

        nav.go_home();
        nav.set_mode(Mode::Radio);
        nav.back();
        nav.go_player(NavigationState::default());
        // construction happened once; re-entries toggled visibility only
        assert_eq!(catalog.station_loads.get(), 1);
    }

    #[test]
    fn construction_failure_falls_back_to_home() {
        let catalog = Rc::new(FakeCatalog { fail_stations: true, ..Default::default() });
        let (mut nav, _) = navigator_with(catalog);
        nav.go_home();
        nav.navigate_or_home(
            ScreenId::Stations,
            NavigationState::with_source(NavSource::UserSelection),
        );
        assert_eq!(nav.current(), Some(ScreenId::Home));
        assert!(!nav.registry().contains(ScreenId::Stations));
    }

    #[test]
    fn construction_failure_reports_typed_error() {
        let catalog = Rc::new(FakeCatalog { fail_stations: true, ..Default::default() });
        let (mut nav, _) = navigator_with(catalog);
        let err = nav
            .navigate(ScreenId::Stations, NavigationState::with_source(NavSource::Init))
            .unwrap_err();
        let NavigationError::Construction { screen, .. } = err;
        assert_eq!(screen, ScreenId::Stations);
    }

    #[test]
    fn language_change_tears_down_all_but_about() {
        let (mut nav, config) = navigator();
        nav.go_home();
        nav.set_mode(Mode::Radio);
        nav.navigate(ScreenId::Language, NavigationState::with_source(NavSource::Init))
            .unwrap();
        assert!(nav.registry().len() >= 3);

        nav.change_language("German");
        assert_eq!(config.borrow().current.language, "German");
        // only the persistent screen and the freshly rebuilt home remain
        let mut ids = nav.registry().ids();
        ids.sort_by_key(|id| id.name());
        assert_eq!(ids, vec![ScreenId::About, ScreenId::Home]);
        assert_eq!(nav.current(), Some(ScreenId::Home));
        assert_eq!(nav.current_player(), None);
    }

    #[test]
    fn same_language_keeps_screens_but_goes_home() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.set_mode(Mode::Radio);
        let before = nav.registry().len();
        nav.change_language("English");
        assert_eq!(nav.registry().len(), before);
        assert_eq!(nav.current(), Some(ScreenId::Home));
    }

    #[test]
    fn mode_switch_persists_file_position() {
        let (mut nav, config) = navigator();
        config.borrow_mut().file_playback.track_time = 77;
        nav.go_home();
        nav.set_mode(Mode::AudioFiles);
        // the screen resumed at 77s; clear the slot to observe the store
        config.borrow_mut().file_playback.track_time = 0;

        nav.set_mode(Mode::Podcasts);
        assert_eq!(config.borrow().file_playback.track_time, 77);
    }

    #[test]
    fn switching_players_stops_the_outgoing_timer() {
        let (mut nav, _) = navigator();
        nav.go_home();
        nav.set_mode(Mode::AudioFiles);
        assert!(nav.registry().get(ScreenId::FilePlayer).unwrap().timer_enabled());

        nav.set_mode(Mode::Radio);
        assert!(!nav.registry().get(ScreenId::FilePlayer).unwrap().timer_enabled());
        assert!(nav.registry().get(ScreenId::Stations).unwrap().timer_enabled());
    }
}
