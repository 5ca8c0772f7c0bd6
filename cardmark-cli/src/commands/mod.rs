//! Subcommand implementations.

pub mod inspect;
pub mod register;
pub mod verify;
