use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A camera action produced by a held key.
///
/// Look actions turn the camera at the look speed; move actions translate it
/// at the move speed along the current look or right vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
    MoveForward,
    MoveBackward,
    StrafeLeft,
    StrafeRight,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::LookUp,
        Action::LookDown,
        Action::LookLeft,
        Action::LookRight,
        Action::MoveForward,
        Action::MoveBackward,
        Action::StrafeLeft,
        Action::StrafeRight,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::LookUp => "look-up",
            Action::LookDown => "look-down",
            Action::LookLeft => "look-left",
            Action::LookRight => "look-right",
            Action::MoveForward => "move-forward",
            Action::MoveBackward => "move-backward",
            Action::StrafeLeft => "strafe-left",
            Action::StrafeRight => "strafe-right",
        }
    }

    pub fn is_look(self) -> bool {
        matches!(
            self,
            Action::LookUp | Action::LookDown | Action::LookLeft | Action::LookRight
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown action '{0}' (expected one of: look-up, look-down, look-left, look-right, move-forward, move-backward, strafe-left, strafe-right)")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Action::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseActionError(s.to_string()))
    }
}
