//! healthchat-core
//!
//! Shared domain types, the error taxonomy, configuration, corpus loading and
//! the chunker. The embedding, vector, recommendation and RAG crates build on
//! the seams declared in `traits`.

pub mod chunker;
pub mod config;
pub mod data_processor;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
