//! Sprint engine: event validation, word wars and progress reactors over
//! a SQLite store.
//!
//! Commands take the pool, the current instant and a cancellation token,
//! and return [`errors::Result`]. The decisions themselves live in
//! [`sprint_rules`]; this crate loads rows, asks the rules, and makes the
//! conditional writes that keep concurrent callers from overwriting each
//! other.

pub mod bus;
pub mod config;
pub mod db;
pub mod engine;
pub mod enrollment;
pub mod errors;
pub mod guard;
pub mod reactors;
pub mod sweeper;
pub mod validation;
pub mod word_wars;

pub use config::Config;
pub use engine::Engine;
pub use errors::{EngineError, ErrorClass, Result};
