//! Pipeline execution core for Kurt.
//!
//! Runs declarative, dbt-style pipelines of registered models over
//! Postgres-backed inputs: resolves layered config, binds read-only
//! `Reference`s, executes batched LLM/provider calls with bounded
//! concurrency, and records step/event lifecycle as each model runs.

pub mod batch;
pub mod config;
pub mod filter;
pub mod interpolate;
pub mod model;
pub mod orchestrator;
pub mod reference;
pub mod runner;
pub mod tracker;
pub mod writer;

pub use batch::*;
pub use config::*;
pub use filter::*;
pub use interpolate::*;
pub use model::*;
pub use orchestrator::*;
pub use reference::*;
pub use runner::*;
pub use tracker::*;
pub use writer::*;
