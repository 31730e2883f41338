use crate::action::Action;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Symbolic key code, independent of the windowing backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    W,
    A,
    S,
    D,
}

/// Key to action table. Arrow keys look, WASD moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    map: BTreeMap<Key, Action>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let map = BTreeMap::from([
            (Key::ArrowUp, Action::LookUp),
            (Key::ArrowDown, Action::LookDown),
            (Key::ArrowLeft, Action::LookLeft),
            (Key::ArrowRight, Action::LookRight),
            (Key::W, Action::MoveForward),
            (Key::S, Action::MoveBackward),
            (Key::A, Action::StrafeLeft),
            (Key::D, Action::StrafeRight),
        ]);
        Self { map }
    }
}

impl KeyBindings {
    pub fn action_for(&self, key: Key) -> Option<Action> {
        self.map.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Action)> + '_ {
        self.map.iter().map(|(k, a)| (*k, *a))
    }
}

/// The set of actions held during one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlState {
    active: BTreeSet<Action>,
}

impl ControlState {
    /// Sample the held keys through `bindings`. Unbound keys are ignored.
    pub fn from_keys<'a>(held: impl IntoIterator<Item = &'a Key>, bindings: &KeyBindings) -> Self {
        let active = held
            .into_iter()
            .filter_map(|k| bindings.action_for(*k))
            .collect();
        Self { active }
    }

    pub fn from_actions(actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            active: actions.into_iter().collect(),
        }
    }

    pub fn is_active(&self, action: Action) -> bool {
        self.active.contains(&action)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = Action> + '_ {
        self.active.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn default_bindings_cover_every_action() {
        let bindings = KeyBindings::default();
        let bound: BTreeSet<Action> = bindings.iter().map(|(_, a)| a).collect();
        assert_eq!(bound.len(), Action::ALL.len());
        assert_eq!(bindings.action_for(Key::W), Some(Action::MoveForward));
        assert_eq!(bindings.action_for(Key::ArrowUp), Some(Action::LookUp));
    }

    #[test]
    fn held_keys_map_to_actions() {
        let held: HashSet<Key> = [Key::W, Key::ArrowLeft].into_iter().collect();
        let state = ControlState::from_keys(&held, &KeyBindings::default());
        assert!(state.is_active(Action::MoveForward));
        assert!(state.is_active(Action::LookLeft));
        assert!(!state.is_active(Action::MoveBackward));
    }

    #[test]
    fn empty_state_is_idle() {
        assert!(ControlState::default().is_idle());
        assert!(!ControlState::from_actions([Action::StrafeRight]).is_idle());
    }

    #[test]
    fn bindings_load_from_yaml() {
        let yaml = "map:\n  W: look-up\n  S: look-down\n";
        let bindings: KeyBindings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(bindings.action_for(Key::W), Some(Action::LookUp));
        assert_eq!(bindings.action_for(Key::A), None);
    }
}
