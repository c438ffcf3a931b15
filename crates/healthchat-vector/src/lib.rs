//! Vector index over chunk embeddings, persisted as a self-describing bundle.

pub mod bundle;
pub mod flat;
pub mod similarity;

pub use flat::FlatIndex;
