//! Quality management for Kurt
//!
//! Provides quality scoring, IAA metrics, and evaluators.

pub mod export;
pub mod scoring;

pub use scoring::*;
