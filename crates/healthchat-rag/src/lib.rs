//! Retrieval-augmented chat: ingestion, retrieval and request handling.

pub mod answer;
pub mod chat;
pub mod context;
pub mod ingest;
pub mod retriever;

pub use answer::{AnswerGenerator, ContextEcho};
pub use chat::{handle_chat, ChatService};
pub use context::{AppContext, HealthReport};
pub use ingest::{ingest, ingest_with, IngestOptions, IngestionReport};
pub use retriever::{Retriever, RetrieverStatus};
