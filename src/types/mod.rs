//! Shared types for the Commons engine

mod error;

pub use error::{require_reason, EngineError, Result};
