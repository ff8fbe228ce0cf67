//! CLI subcommands.

pub mod favorites;
pub mod sign;
