//! Shared types for the cubelight crates.
//!
//! # Invariants
//! - Types here carry no GPU handles and no window state.

mod types;

pub use types::Transform;

pub fn crate_info() -> &'static str {
    "cubelight-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
