//! The appliance core: owns the navigator and every collaborator the
//! dispatch loop routes into, and implements the sleep/wake and shutdown
//! paths.

use std::cell::RefCell;
use std::rc::Rc;

use log::{error, info};

use crate::catalog::{CollectionCatalog, FileCatalog, PodcastCatalog, StationCatalog};
use crate::config::Config;
use crate::event::Event;
use crate::player::{
    shared_state, PlayerHandle, PlayerState, PlayerVolume, Shared, VolumeControl,
};
use crate::saver::Screensaver;
use crate::screens::{NavSource, NavigationState, Navigator, ScreenCommand, ScreenDeps};

/// What the event router should do after a command was executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    ShutdownRequested,
}

pub struct App {
    pub config: Rc<RefCell<Config>>,
    pub nav: Navigator,
    pub player: PlayerHandle,
    pub volume: Box<dyn VolumeControl>,
    pub saver: Box<dyn Screensaver>,
    pub shared: Shared,
}

impl App {
    pub fn new(
        config: Rc<RefCell<Config>>,
        player: PlayerHandle,
        saver: Box<dyn Screensaver>,
        stations: Rc<dyn StationCatalog>,
        files: Rc<dyn FileCatalog>,
        podcasts: Rc<dyn PodcastCatalog>,
        collection: Rc<dyn CollectionCatalog>,
    ) -> Self {
        let shared = shared_state(config.borrow().current.mode);
        let deps = ScreenDeps {
            config: config.clone(),
            player: player.clone(),
            stations,
            files,
            podcasts,
            collection,
        };
        let nav = Navigator::new(deps, shared.clone());
        let volume = Box::new(PlayerVolume::new(player.clone(), config.clone()));
        Self { config, nav, player, volume, saver, shared }
    }

    /// Enter the screen of the persisted mode and apply the saved volume.
    pub fn start(&mut self) {
        let (mode, volume) = {
            let config = self.config.borrow();
            (config.current.mode, config.player_settings.volume)
        };
        self.volume.set_volume(volume);
        self.nav.set_mode(mode);
    }

    /// Forward one event to the screensaver or the active screen and
    /// execute whatever command the screen hands back.
    pub fn forward(&mut self, event: &Event) -> Outcome {
        if self.saver.saver_running() {
            self.saver.handle_event(event);
            return Outcome::Continue;
        }
        let command = match self.nav.current_screen_mut() {
            Some(screen) => screen.handle_event(event),
            None => ScreenCommand::None,
        };
        self.execute(command)
    }

    pub fn execute(&mut self, command: ScreenCommand) -> Outcome {
        match command {
            ScreenCommand::None => {}
            ScreenCommand::Navigate(target, state) => self.nav.navigate_or_home(target, state),
            ScreenCommand::Back => self.nav.back(),
            ScreenCommand::Home => self.nav.go_home(),
            ScreenCommand::SetMode(mode) => self.nav.set_mode(mode),
            ScreenCommand::ChangeLanguage(language) => self.nav.change_language(&language),
            ScreenCommand::Quit => return Outcome::ShutdownRequested,
        }
        Outcome::Continue
    }

    /// Timer-driven sleep: stop playback and hand the display to the clock
    /// saver.
    pub fn sleep(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            if shared.player_state == PlayerState::Sleeping {
                return;
            }
            shared.player_state = PlayerState::Sleeping;
        }
        info!("Going to sleep");
        self.player.borrow_mut().stop();
        if self.saver.saver_running() {
            self.saver.cancel(None);
        }
        self.saver.start("clock");
    }

    /// Timer-driven wake-up: resume playback and restore the screen that
    /// was current before sleep.
    pub fn wake_up(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            if shared.player_state == PlayerState::Running {
                return;
            }
            shared.player_state = PlayerState::Running;
        }
        info!("Waking up");
        self.saver.cancel(None);
        self.player.borrow_mut().resume();
        if let Some(previous) = self.nav.previous() {
            self.nav
                .navigate_or_home(previous, NavigationState::with_source(NavSource::Resume));
        }
    }

    /// Blocking pre-exit work: persist the playback position, save the
    /// settings, stop the backend. Runs synchronously inside the dispatch
    /// loop's shutdown step.
    pub fn shutdown(&mut self) {
        info!("Shutting down");
        self.nav.store_player_position();
        if let Err(e) = self.config.borrow().save() {
            error!("Failed to save settings on shutdown: {e:#}");
        }
        self.player.borrow_mut().stop();
    }
}
