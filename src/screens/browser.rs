//! Catalog-backed browser screens: file tree, podcast directory, podcast
//! episodes and collection topics. Each one pulls its listing from the
//! injected catalog trait, which is where construction failure originates.

use std::rc::Rc;

use log::warn;

use crate::catalog::{Episode, Podcast, PodcastCatalog};
use crate::event::{Event, EventKind, Key, KeyAction};

use super::navigator::ScreenDeps;
use super::{NavSource, NavigationState, Region, Screen, ScreenCommand, ScreenId};

/// Move a list selection for the given key; returns true when it moved.
fn move_selection(selected: &mut usize, len: usize, key: Key) -> bool {
    if len == 0 {
        return false;
    }
    match key {
        Key::Up | Key::Left => {
            *selected = selected.checked_sub(1).unwrap_or(len - 1);
            true
        }
        Key::Down | Key::Right => {
            *selected = (*selected + 1) % len;
            true
        }
        _ => false,
    }
}

pub struct FileBrowserScreen {
    files: Vec<String>,
    folder: String,
    selected: usize,
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl FileBrowserScreen {
    pub fn new(deps: &ScreenDeps) -> anyhow::Result<Self> {
        let folder = deps.config.borrow().file_playback.folder.clone();
        let files = deps.files.list(&folder)?;
        Ok(Self {
            files,
            folder,
            selected: 0,
            visible: false,
            dirty: false,
            bounds: deps.bounds(),
        })
    }
}

impl Screen for FileBrowserScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return ScreenCommand::None;
        };
        if move_selection(&mut self.selected, self.files.len(), key) {
            self.dirty = true;
            return ScreenCommand::None;
        }
        match key {
            Key::Select => match self.files.get(self.selected) {
                Some(file) => {
                    let mut state = NavigationState::with_source(NavSource::UserSelection);
                    state.file = Some(file.clone());
                    state.folder = Some(self.folder.clone());
                    ScreenCommand::Navigate(ScreenId::FilePlayer, state)
                }
                None => ScreenCommand::None,
            },
            Key::Back => ScreenCommand::Back,
            Key::Home => ScreenCommand::Home,
            _ => ScreenCommand::None,
        }
    }

    fn refresh(&mut self) -> Option<Region> {
        self.dirty.then_some(self.bounds)
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.dirty = false;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.dirty = true;
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_current(&mut self, _state: &NavigationState) {
        self.dirty = true;
    }
}

pub struct PodcastsScreen {
    podcasts: Vec<Podcast>,
    selected: usize,
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl PodcastsScreen {
    pub fn new(deps: &ScreenDeps) -> anyhow::Result<Self> {
        let podcasts = deps.podcasts.podcasts()?;
        Ok(Self {
            podcasts,
            selected: 0,
            visible: false,
            dirty: false,
            bounds: deps.bounds(),
        })
    }
}

impl Screen for PodcastsScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return ScreenCommand::None;
        };
        if move_selection(&mut self.selected, self.podcasts.len(), key) {
            self.dirty = true;
            return ScreenCommand::None;
        }
        match key {
            Key::Select if !self.podcasts.is_empty() => {
                let mut state = NavigationState::with_source(NavSource::UserSelection);
                state.podcast = Some(self.selected);
                ScreenCommand::Navigate(ScreenId::PodcastEpisodes, state)
            }
            Key::Back => ScreenCommand::Back,
            Key::Home => ScreenCommand::Home,
            _ => ScreenCommand::None,
        }
    }

    fn refresh(&mut self) -> Option<Region> {
        self.dirty.then_some(self.bounds)
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.dirty = false;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.dirty = true;
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_current(&mut self, _state: &NavigationState) {
        self.dirty = true;
    }
}

/// Episode list of one podcast. The podcast arrives via the navigation
/// payload, so the screen itself is cheap to build.
pub struct PodcastEpisodesScreen {
    catalog: Rc<dyn PodcastCatalog>,
    episodes: Vec<Episode>,
    podcast: Option<usize>,
    selected: usize,
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl PodcastEpisodesScreen {
    pub fn new(deps: &ScreenDeps) -> Self {
        Self {
            catalog: deps.podcasts.clone(),
            episodes: Vec::new(),
            podcast: None,
            selected: 0,
            visible: false,
            dirty: false,
            bounds: deps.bounds(),
        }
    }
}

impl Screen for PodcastEpisodesScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return ScreenCommand::None;
        };
        if move_selection(&mut self.selected, self.episodes.len(), key) {
            self.dirty = true;
            return ScreenCommand::None;
        }
        match key {
            Key::Select => match self.podcast {
                Some(podcast) if !self.episodes.is_empty() => {
                    let mut state = NavigationState::with_source(NavSource::UserSelection);
                    state.podcast = Some(podcast);
                    state.index = Some(self.selected);
                    ScreenCommand::Navigate(ScreenId::PodcastPlayer, state)
                }
                _ => ScreenCommand::None,
            },
            Key::Back => ScreenCommand::Back,
            Key::Home => ScreenCommand::Home,
            _ => ScreenCommand::None,
        }
    }

    fn refresh(&mut self) -> Option<Region> {
        self.dirty.then_some(self.bounds)
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.dirty = false;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.dirty = true;
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_current(&mut self, state: &NavigationState) {
        self.dirty = true;
        let Some(podcast) = state.podcast else { return };
        if self.podcast == Some(podcast) {
            return;
        }
        match self.catalog.episodes(podcast) {
            Ok(episodes) => {
                self.podcast = Some(podcast);
                self.episodes = episodes;
                self.selected = 0;
            }
            Err(e) => warn!("Failed to fetch episodes for podcast {podcast}: {e:#}"),
        }
    }
}

pub struct CollectionScreen {
    topics: Vec<String>,
    selected: usize,
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl CollectionScreen {
    pub fn new(deps: &ScreenDeps) -> anyhow::Result<Self> {
        let topics = deps.collection.topics()?;
        Ok(Self {
            topics,
            selected: 0,
            visible: false,
            dirty: false,
            bounds: deps.bounds(),
        })
    }
}

impl Screen for CollectionScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return ScreenCommand::None;
        };
        if move_selection(&mut self.selected, self.topics.len(), key) {
            self.dirty = true;
            return ScreenCommand::None;
        }
        match key {
            Key::Select => match self.topics.get(self.selected) {
                Some(topic) => {
                    let mut state = NavigationState::with_source(NavSource::UserSelection);
                    state.topic = Some(topic.clone());
                    ScreenCommand::Navigate(ScreenId::CollectionPlayer, state)
                }
                None => ScreenCommand::None,
            },
            Key::Back => ScreenCommand::Back,
            Key::Home => ScreenCommand::Home,
            _ => ScreenCommand::None,
        }
    }

    fn refresh(&mut self) -> Option<Region> {
        self.dirty.then_some(self.bounds)
    }

    fn clean_draw_update(&mut self, _region: Option<Region>) {
        self.dirty = false;
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.dirty = true;
        }
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn set_current(&mut self, _state: &NavigationState) {
        self.dirty = true;
    }
}
