//! TV Guide Core - Shared types library.
//!
//! This crate provides common types used across all TV Guide components:
//! - `server` - Web app API, Telegram webhook and catalog pass-through
//! - `cli` - Command-line tools for inspecting favorites and signing test payloads
//!
//! # Architecture
//!
//! The core crate contains only types and in-memory logic - no I/O, no file
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and the [`Favorites`] aggregate

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
