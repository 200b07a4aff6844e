//! Boundaries the level session calls out to. The session never renders,
//! plays audio or navigates by itself; a host implements these traits.
//!
//! Narrative and navigation calls return `Result` so a host can report a
//! missing UI target. The session logs such failures and keeps ticking.

use chamber_core::FrameSet;

use crate::collision::Rect;
use crate::controller::Facing;
use crate::dialogue::DialogueLine;

/// Visual nodes the session creates on the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Actor,
    Platform(usize),
    Barrier(usize),
    Obstacle(usize),
    Door,
    Pickup,
    EndTrigger,
}

/// Stage graph: creates, moves and removes visual nodes.
pub trait Stage {
    fn attach(&mut self, node: NodeId, rect: Rect, asset: Option<&str>);
    fn detach(&mut self, node: NodeId);
    fn move_node(&mut self, node: NodeId, rect: Rect);
    fn swap_frame_set(&mut self, node: NodeId, frames: &FrameSet);
    fn set_playing(&mut self, node: NodeId, playing: bool);
    fn set_facing(&mut self, node: NodeId, facing: Facing);
    fn set_overlay_opacity(&mut self, opacity: f32);
    fn play_sound(&mut self, asset: &str);
}

pub trait Narrative {
    /// `has_next` controls whether the "next" affordance is shown.
    fn show_dialogue(&mut self, line: &DialogueLine, has_next: bool) -> Result<(), String>;
    fn close_dialogue(&mut self) -> Result<(), String>;
    fn show_modal(&mut self, message: &str) -> Result<(), String>;
    fn show_status(&mut self, message: &str) -> Result<(), String>;
    fn mark_inventory_slot(&mut self, index: usize, asset: Option<&str>) -> Result<(), String>;
}

pub trait Navigator {
    fn go_to_next_level(&mut self, target: &str) -> Result<(), String>;
    fn end_game(&mut self, target: &str) -> Result<(), String>;
}

/// Everything a session needs from its host.
pub trait LevelHost: Stage + Narrative + Navigator {}

impl<T: Stage + Narrative + Navigator> LevelHost for T {}

/// A navigation request recorded by [`LogHost`] for the runner to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    NextLevel(String),
    EndGame(String),
}

/// Headless host: logs every boundary call and records navigation.
#[derive(Debug)]
pub struct LogHost {
    inventory_slots: usize,
    overlay_opacity: f32,
    navigation: Option<Navigation>,
}

impl LogHost {
    pub fn new(inventory_slots: usize) -> Self {
        Self {
            inventory_slots,
            overlay_opacity: 0.0,
            navigation: None,
        }
    }

    pub fn take_navigation(&mut self) -> Option<Navigation> {
        self.navigation.take()
    }

    pub fn overlay_opacity(&self) -> f32 {
        self.overlay_opacity
    }
}

impl Stage for LogHost {
    fn attach(&mut self, node: NodeId, rect: Rect, asset: Option<&str>) {
        log::trace!("attach {node:?} at {rect:?} ({})", asset.unwrap_or("-"));
    }

    fn detach(&mut self, node: NodeId) {
        log::debug!("detach {node:?}");
    }

    fn move_node(&mut self, _node: NodeId, _rect: Rect) {}

    fn swap_frame_set(&mut self, node: NodeId, frames: &FrameSet) {
        log::trace!("{node:?} frame set -> {} frame(s)", frames.frames.len());
    }

    fn set_playing(&mut self, _node: NodeId, _playing: bool) {}

    fn set_facing(&mut self, node: NodeId, facing: Facing) {
        log::trace!("{node:?} faces {facing:?}");
    }

    fn set_overlay_opacity(&mut self, opacity: f32) {
        self.overlay_opacity = opacity;
    }

    fn play_sound(&mut self, asset: &str) {
        log::info!("Playing sound {asset}");
    }
}

impl Narrative for LogHost {
    fn show_dialogue(&mut self, line: &DialogueLine, has_next: bool) -> Result<(), String> {
        log::info!(
            "{}: {}{}",
            line.speaker,
            line.text,
            if has_next { " [next]" } else { "" }
        );
        Ok(())
    }

    fn close_dialogue(&mut self) -> Result<(), String> {
        log::info!("Dialogue closed");
        Ok(())
    }

    fn show_modal(&mut self, message: &str) -> Result<(), String> {
        log::info!("Modal: {message}");
        Ok(())
    }

    fn show_status(&mut self, message: &str) -> Result<(), String> {
        log::info!("Status: {message}");
        Ok(())
    }

    fn mark_inventory_slot(&mut self, index: usize, asset: Option<&str>) -> Result<(), String> {
        if index >= self.inventory_slots {
            return Err(format!(
                "Inventory slot {index} does not exist ({} slot(s))",
                self.inventory_slots
            ));
        }
        log::info!("Inventory slot {index} <- {}", asset.unwrap_or("item"));
        Ok(())
    }
}

impl Navigator for LogHost {
    fn go_to_next_level(&mut self, target: &str) -> Result<(), String> {
        log::info!("Navigating to {target}");
        self.navigation = Some(Navigation::NextLevel(target.to_string()));
        Ok(())
    }

    fn end_game(&mut self, target: &str) -> Result<(), String> {
        log::info!("Game over, navigating to {target}");
        self.navigation = Some(Navigation::EndGame(target.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_inventory_slot_is_reported() {
        let mut host = LogHost::new(3);
        assert!(host.mark_inventory_slot(2, Some("artefact3.png")).is_ok());
        let err = host
            .mark_inventory_slot(3, None)
            .expect_err("slot 3 is out of range");
        assert!(err.contains("does not exist"));
    }

    #[test]
    fn navigation_is_taken_once() {
        let mut host = LogHost::new(3);
        host.go_to_next_level("chamber_one.json").expect("navigate");
        assert_eq!(
            host.take_navigation(),
            Some(Navigation::NextLevel("chamber_one.json".to_string()))
        );
        assert_eq!(host.take_navigation(), None);
    }
}
