//! plugdesc: the host driver around the descriptor generator
//!
//! Discovers sources, feeds them to a backend round by round, threads the
//! deferred declarations and renders the diagnostics.

pub mod commands;
pub mod common;
pub mod driver;
pub mod logging;
pub mod render;

pub use common::GlobalOpts;
