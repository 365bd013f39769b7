//! The about screen (the one screen that survives language changes) and the
//! language selector.

use crate::event::{Event, EventKind, Key, KeyAction};

use super::{NavigationState, Region, Screen, ScreenCommand};

pub struct AboutScreen {
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl AboutScreen {
    pub fn new(bounds: Region) -> Self {
        Self { visible: false, dirty: false, bounds }
    }
}

impl Screen for AboutScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        if event.is_key_up(Key::Select) || event.is_key_up(Key::Back) {
            return ScreenCommand::Home;
        }
        ScreenCommand::None
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

pub struct LanguageScreen {
    languages: Vec<String>,
    selected: usize,
    visible: bool,
    dirty: bool,
    bounds: Region,
}

impl LanguageScreen {
    pub fn new(languages: Vec<String>, current: &str, bounds: Region) -> Self {
        let selected = languages.iter().position(|l| l == current).unwrap_or(0);
        Self { languages, selected, visible: false, dirty: false, bounds }
    }
}

impl Screen for LanguageScreen {
    fn handle_event(&mut self, event: &Event) -> ScreenCommand {
        let EventKind::Signal { key, action: KeyAction::Up } = event.kind else {
            return ScreenCommand::None;
        };
        match key {
            Key::Left | Key::Up => {
                self.selected = self.selected.checked_sub(1).unwrap_or(self.languages.len() - 1);
                self.dirty = true;
                ScreenCommand::None
            }
            Key::Right | Key::Down => {
                self.selected = (self.selected + 1) % self.languages.len();
                self.dirty = true;
                ScreenCommand::None
            }
            Key::Select => ScreenCommand::ChangeLanguage(self.languages[self.selected].clone()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventSource;

    #[test]
    fn language_selection_emits_change_command() {
        let languages = vec!["English".to_string(), "German".to_string()];
        let mut screen = LanguageScreen::new(languages, "English", Region::new(0, 0, 480, 320));
        screen.handle_event(&Event::signal(Key::Right, KeyAction::Up, EventSource::Keyboard));
        let cmd = screen.handle_event(&Event::signal(Key::Select, KeyAction::Up, EventSource::Keyboard));
        assert_eq!(cmd, ScreenCommand::ChangeLanguage("German".to_string()));
    }

    #[test]
    fn about_always_leads_home() {
        let mut about = AboutScreen::new(Region::new(0, 0, 480, 320));
        let cmd = about.handle_event(&Event::signal(Key::Back, KeyAction::Up, EventSource::Ir));
        assert_eq!(cmd, ScreenCommand::Home);
    }
}
