//! Name-keyed cache of constructed screens.

use std::collections::HashMap;

use super::{Screen, ScreenId};

/// Owns every constructed screen for the lifetime of the current language
/// selection, plus the current/previous screen names. Names are plain keys:
/// nothing here (or anywhere else) holds a second pointer to a screen.
#[derive(Default)]
pub struct ScreenRegistry {
    screens: HashMap<ScreenId, Box<dyn Screen>>,
    current: Option<ScreenId>,
    previous: Option<ScreenId>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: ScreenId) -> bool {
        self.screens.contains_key(&id)
    }

    pub fn insert(&mut self, id: ScreenId, screen: Box<dyn Screen>) {
        self.screens.insert(id, screen);
    }

    pub fn get(&self, id: ScreenId) -> Option<&dyn Screen> {
        self.screens.get(&id).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: ScreenId) -> Option<&mut (dyn Screen + 'static)> {
        self.screens.get_mut(&id).map(|s| s.as_mut())
    }

    pub fn current(&self) -> Option<ScreenId> {
        self.current
    }

    pub fn previous(&self) -> Option<ScreenId> {
        self.previous
    }

    pub fn current_screen_mut(&mut self) -> Option<&mut (dyn Screen + 'static)> {
        let id = self.current?;
        self.get_mut(id)
    }

    /// Record a completed transition: the outgoing name becomes the one-level
    /// back history.
    pub fn record_transition(&mut self, incoming: ScreenId) {
        self.previous = self.current;
        self.current = Some(incoming);
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ScreenId, &mut Box<dyn Screen>)> {
        self.screens.iter_mut().map(|(id, screen)| (*id, screen))
    }

    pub fn ids(&self) -> Vec<ScreenId> {
        self.screens.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Language change invalidates every cached screen except the designated
    /// persistent one; the rest get lazily rebuilt on next visit.
    pub fn reset_for_language_change(&mut self, keep: ScreenId) {
        self.screens.retain(|id, _| *id == keep);
        self.current = None;
        self.previous = None;
    }
}
