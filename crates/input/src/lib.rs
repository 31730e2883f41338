//! Camera controls: key symbols, the actions they drive, and the per-frame
//! snapshot of which actions are held.
//!
//! # Invariants
//! - The frame loop consumes [`ControlState`], never raw window events.
//! - Key state is sampled once per frame; holding a key is a level, not an edge.

pub mod action;
pub mod bindings;

pub use action::{Action, ParseActionError};
pub use bindings::{ControlState, Key, KeyBindings};

pub fn crate_info() -> &'static str {
    "cubelight-input v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("input"));
    }
}
