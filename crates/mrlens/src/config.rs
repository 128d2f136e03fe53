use std::{
    collections::HashMap,
    ops::{Deref, DerefMut},
};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::action::Action;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub keybinds: Keybinds,
}

pub type InnerKeybinds = HashMap<Vec<KeyEvent>, Action>;

#[derive(Clone, Debug)]
pub struct Keybinds(pub InnerKeybinds);

impl Keybinds {
    pub fn bind(&mut self, raw: &str, action: Action) -> anyhow::Result<()> {
        self.insert(vec![parse_key_event(raw)?], action);
        Ok(())
    }

    /// Looks up a single key press, ignoring modifiers other than those bound.
    pub fn action_for(&self, key: KeyEvent) -> Option<&Action> {
        self.get(&vec![KeyEvent::new(key.code, key.modifiers)])
    }
}

impl Deref for Keybinds {
    type Target = InnerKeybinds;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Keybinds {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl Default for Keybinds {
    fn default() -> Self {
        let defaults = [
            ("q", Action::Quit),
            ("j", Action::Down),
            ("down", Action::Down),
            ("k", Action::Up),
            ("up", Action::Up),
            ("enter", Action::Open),
            ("esc", Action::Back),
            ("f", Action::CycleFilter),
            ("i", Action::ToggleOnlyWithIssues),
            ("s", Action::CycleSort),
            ("x", Action::ResetFilters),
            ("r", Action::Refresh),
            ("a", Action::RequestReanalysis),
            ("p", Action::PostRecommendations),
            ("d", Action::DismissError),
        ];

        let mut keybinds = Self(HashMap::new());
        for (raw, action) in defaults {
            if let Err(e) = keybinds.bind(raw, action) {
                tracing::error!("invalid default keybind {raw}: {e}");
            }
        }

        keybinds
    }
}

fn parse_key_event(raw: &str) -> anyhow::Result<KeyEvent> {
    let raw_lower = raw.to_ascii_lowercase();

    let code = match raw_lower.as_str() {
        "enter" => KeyCode::Enter,
        "esc" => KeyCode::Esc,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "tab" => KeyCode::Tab,
        c if c.chars().count() == 1 => match c.chars().next() {
            Some(c) => KeyCode::Char(c),
            None => anyhow::bail!("Unable to parse {raw_lower}"),
        },
        _ => anyhow::bail!("Unable to parse {raw_lower}"),
    };

    Ok(KeyEvent::new(code, KeyModifiers::empty()))
}
