//! Sidequest Backend Library
//!
//! Plot-first experience discovery: five generation agents coordinated
//! through a fixed dependency graph, producing a narrative itinerary.
//! This library exposes modules for testing and external use; the main
//! binary is in `src/main.rs`.

pub mod agents;
pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gemini;
pub mod state;
