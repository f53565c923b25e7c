//! # docqa
//!
//! Ask questions about PDF documents. Upload a PDF, extract its text,
//! summarize it, build a semantic index over it and get answers grounded
//! in retrieved passages.
//!
//! This crate is the application shell around [`docqa_core`]: it supplies
//! the filesystem artifact store, PDF extraction, the remote embedding and
//! LLM gateways, the [`service::DocService`] that maps each operation, an
//! HTTP server and the `docqa` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐   ┌────────────────┐
//! │  upload  │──▶│ extract  │──▶│  summarize  │   │  storage root  │
//! └──────────┘   └────┬─────┘   └─────────────┘   │ uploads/ text/ │
//!                     │                           │ summaries/     │
//!                     ▼                           │ index/         │
//!                ┌──────────┐   ┌─────────────┐   └────────────────┘
//!                │  index   │──▶│     ask     │
//!                └──────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! docqa upload report.pdf           # prints the document id
//! docqa extract <id>
//! docqa index <id>
//! docqa ask <id> "What are the payment terms?"
//! docqa serve                       # HTTP API on 127.0.0.1:8000
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`artifacts`] | Filesystem artifact store |
//! | [`extract`] | PDF text extraction |
//! | [`embedding`] | Embedding gateways |
//! | [`llm`] | Chat-completion gateways |
//! | [`service`] | Document operations |
//! | [`server`] | HTTP API |

pub mod artifacts;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod llm;
pub mod logging;
mod remote;
pub mod server;
pub mod service;
