//! Core types for the TV Guide.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod favorites;
pub mod id;

pub use favorites::Favorites;
pub use id::*;
