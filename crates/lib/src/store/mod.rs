//! # Relational Store and Object Storage
//!
//! These are the two external-collaborator seams deliberately left
//! outside the RAG core's scope: the relational store owns
//! Project/Document/Conversation/Message/GeneratedFile persistence, and
//! object storage owns raw source-file bytes. Both are modeled as traits
//! here with exactly one concrete adapter each, so the core stays
//! testable against an in-memory or temp-dir double without pulling in a
//! real deployment's connection pooling or bucket policies.
//!
//! The Turso adapter's connection lifecycle (`Database::connect`, WAL
//! mode, idempotent `CREATE TABLE IF NOT EXISTS` schema init) follows the
//! usual embedded-SQL-engine setup sequence.

mod object_storage;
mod relational;

pub use object_storage::{FilesystemObjectStorage, ObjectStorage};
pub use relational::{RelationalStore, TursoRelationalStore};
