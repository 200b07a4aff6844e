//! Key-state map with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` is true every tick the key is
//!   down. Horizontal movement and side-blocking read this.
//!
//! - **Edge-triggered (just_pressed / just_released):** true only for the tick
//!   in which the transition happened. Cleared by `end_frame()`, which the
//!   runner calls after the level tick has consumed them, so a press that lands
//!   between two ticks is never lost.
//!
//! Writers are input-event callbacks; the level loop reads once at the start
//! of each tick. Both run on the same thread, so there is no locking.

use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Escape,
    A,
    D,
    W,
    R,
}

impl Key {
    /// Map a browser-style key code (`KeyboardEvent.code`) to a key.
    pub fn from_code(code: &str) -> Option<Key> {
        match code {
            "ArrowLeft" => Some(Key::Left),
            "ArrowRight" => Some(Key::Right),
            "ArrowUp" => Some(Key::Up),
            "ArrowDown" => Some(Key::Down),
            "Space" => Some(Key::Space),
            "Escape" => Some(Key::Escape),
            "KeyA" => Some(Key::A),
            "KeyD" => Some(Key::D),
            "KeyW" => Some(Key::W),
            "KeyR" => Some(Key::R),
            _ => None,
        }
    }
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    /// Feed a raw key code from the host. Unknown codes are ignored.
    pub fn handle_code(&mut self, code: &str, pressed: bool) {
        let Some(key) = Key::from_code(code) else {
            log::trace!("Ignoring unmapped key code '{code}'");
            return;
        };
        if pressed {
            self.key_down(key);
        } else {
            self.key_up(key);
        }
    }

    /// Make `keys` the exact held set, generating press/release edges for
    /// every difference against the current state.
    pub fn sync_held(&mut self, keys: &[Key]) {
        let released: Vec<Key> = self
            .held
            .iter()
            .copied()
            .filter(|k| !keys.contains(k))
            .collect();
        for key in released {
            self.key_up(key);
        }
        for &key in keys {
            self.key_down(key);
        }
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn any_held(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.held.contains(k))
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn any_just_pressed(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.just_pressed.contains(k))
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}
