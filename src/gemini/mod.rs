//! External generation service
//!
//! The five agent wrappers are the only callers of this module. The
//! `GenerationService` trait is the seam that lets coordinator tests script
//! outcomes without touching the network.

pub mod client;
pub mod types;

pub use client::{GeminiClient, GenerationError, GenerationService};
