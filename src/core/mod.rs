// FILE: src/core/mod.rs
pub mod mover;
pub mod permissions;

pub use mover::{MoveOutcome, Mover};
pub use permissions::{Identity, LibcChown, OwnershipChanger};
