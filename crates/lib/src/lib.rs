//! # studyrag
//!
//! Core, transport-agnostic implementation of the educational RAG
//! pipeline: ingest source documents into per-project vector
//! collections, answer queries (stateless, conversation-aware, or
//! streamed) against them, and generate study-guide/quiz/summary/
//! lesson-plan artifacts. Every external dependency — the chat model,
//! the embedding provider, relational storage, vector storage, raw
//! object storage, ownership checks — is an injected trait object, so
//! this crate never talks HTTP or touches a particular database
//! directly; `studyrag-server` and `studyrag-cli` wire concrete
//! adapters on top.

pub mod ai;
pub mod config;
pub mod document_loader;
pub mod embedding;
pub mod errors;
pub mod filegen;
pub mod ingestion;
pub mod memory;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod splitter;
pub mod store;
pub mod streaming;
pub mod vector_store;

pub use config::RagConfig;
pub use errors::CoreError;
pub use filegen::FileGenerator;
pub use ingestion::IngestionCoordinator;
pub use memory::MemoryManager;
pub use rag::RagQueryEngine;
pub use streaming::StreamingSession;
