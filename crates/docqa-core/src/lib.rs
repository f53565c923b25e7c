//! # docqa core
//!
//! Runtime-agnostic logic for the document question-answering pipeline:
//! data models, chunking, the vector index, retrieval, summarization and
//! answer synthesis, plus the traits behind which the remote services
//! (embeddings, LLM, PDF extraction) and the artifact store sit.
//!
//! This crate contains no tokio, reqwest, or filesystem I/O. Concrete
//! gateways and the on-disk artifact store live in the `docqa` app crate.
//!
//! ```text
//! Upload ─▶ Extract ─┬─▶ Summarize (map ─▶ reduce)
//!                    └─▶ Index ─▶ Ask (retrieve ─▶ synthesize)
//! ```

pub mod answer;
pub mod chunk;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod index;
pub mod llm;
pub mod models;
pub mod retrieve;
pub mod store;
pub mod summarize;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, Result};
