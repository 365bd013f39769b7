//! Home screen: the mode menu.

use crate::config::Mode;
use crate::event::{Event, EventKind, Key, KeyAction};

use super::{NavigationState, Region, Screen, ScreenCommand};

pub struct HomeScreen {
    modes: Vec<Mode>,
    selected: usize,
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl HomeScreen {
    pub fn new(bounds: Region) -> Self {
        Self {
            modes: Mode::ALL.to_vec(),
            selected: 0,
            visible: false,
            dirty: false,
            bounds,
        }
    }

    pub fn selected_mode(&self) -> Mode {
        self.modes[self.selected]
    }
}

impl Screen for HomeScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return ScreenCommand::None;
        };
        match key {
            Key::Left | Key::Up => {
                self.selected = self.selected.checked_sub(1).unwrap_or(self.modes.len() - 1);
                self.dirty = true;
                ScreenCommand::None
            }
            Key::Right | Key::Down => {
                self.selected = (self.selected + 1) % self.modes.len();
                self.dirty = true;
                ScreenCommand::None
            }
            Key::Select => ScreenCommand::SetMode(self.modes[self.selected]),
            // menu buttons jump straight to a mode
            Key::Digit(d) => {
                let index = d as usize;
                if (1..=self.modes.len()).contains(&index) {
                    ScreenCommand::SetMode(self.modes[index - 1])
                } else {
                    ScreenCommand::None
                }
            }
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
