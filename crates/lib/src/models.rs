//! # Domain Entities
//!
//! Plain data types keyed by stable string ids (UUIDs) with explicit
//! foreign-id fields rather than owning references — a `Document` holds
//! `project_id`, not an `Arc<Project>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    /// Set lazily on first successful ingest; never reassigned afterward.
    pub collection_handle: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub project_id: String,
    pub filename: String,
    pub content_type: String,
    pub byte_size: u64,
    pub storage_key: String,
    pub extracted_text: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn is_processed(&self) -> bool {
        self.processed_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub project_id: String,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    #[serde(default)]
    pub tokens_used: u32,
    #[serde(default)]
    pub sources: Vec<SourceAttribution>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub metadata: Option<MessageMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    StudyGuide,
    Quiz,
    Summary,
    LessonPlan,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Markdown,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Markdown => "md",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "application/pdf",
            FileFormat::Markdown => "text/markdown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Generating,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub id: String,
    pub project_id: String,
    pub owner_id: String,
    pub file_name: String,
    pub display_name: String,
    pub file_type: FileType,
    pub format: FileFormat,
    pub current_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedFileVersion {
    pub file_id: String,
    pub version: u32,
    pub prompt: String,
    pub base_version: Option<u32>,
    pub storage_key: String,
    pub byte_size: u64,
    pub page_count: Option<u32>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub generation_ms: Option<u64>,
    pub sources: Vec<SourceAttribution>,
}

/// A retrieved-chunk back-pointer attached to an assistant message or a
/// generated file version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub document_id: String,
    pub filename: String,
    pub content_preview: String,
    pub score: f64,
    pub chunk_index: u32,
}
