//! Command-line boundary for the RAG service.

pub mod commands;
pub mod compose;
pub mod logging;

pub use commands::{run, Command};
pub use compose::build_service;
