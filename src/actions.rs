use bevy::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    ShrinkRoom,
    GrowRoom,
    LowerWalls,
    RaiseWalls,
}

/// Keyboard state mapped to actions once per frame.
#[derive(Default, Resource)]
pub struct ActionState {
    held: HashSet<PlayerAction>,
    triggered: HashSet<PlayerAction>,
}

impl ActionState {
    /// Start a new frame: nothing has been triggered yet.
    pub fn begin_frame(&mut self) {
        self.triggered.clear();
    }

    pub fn set(&mut self, action: PlayerAction, is_pressed: bool) {
        if is_pressed {
            self.held.insert(action);
        } else {
            self.held.remove(&action);
        }
    }

    pub fn trigger(&mut self, action: PlayerAction) {
        self.triggered.insert(action);
    }

    pub fn pressed(&self, action: PlayerAction) -> bool {
        self.held.contains(&action)
    }

    /// True only on the frame the action's key went down.
    pub fn just_triggered(&self, action: PlayerAction) -> bool {
        self.triggered.contains(&action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_last_one_frame() {
        let mut s = ActionState::default();
        s.set(PlayerAction::MoveLeft, true);
        s.trigger(PlayerAction::GrowRoom);
        assert!(s.pressed(PlayerAction::MoveLeft));
        assert!(s.just_triggered(PlayerAction::GrowRoom));

        s.begin_frame();
        s.set(PlayerAction::MoveLeft, false);
        assert!(!s.pressed(PlayerAction::MoveLeft));
        assert!(!s.just_triggered(PlayerAction::GrowRoom));
    }
}
