use async_trait::async_trait;
use chrono::Utc;
use turso::{params, Connection, Value as TursoValue};

use crate::errors::CoreError;
use crate::models::{
    Conversation, Document, FileFormat, FileType, GeneratedFile, GeneratedFileVersion, JobStatus, Message,
    MessageMetadata, MessageRole, Project, SourceAttribution,
};

pub const CREATE_TABLES_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        name TEXT NOT NULL,
        collection_handle TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id),
        filename TEXT NOT NULL,
        content_type TEXT NOT NULL,
        byte_size INTEGER NOT NULL,
        storage_key TEXT NOT NULL,
        extracted_text TEXT,
        processed_at DATETIME,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE INDEX IF NOT EXISTS idx_documents_project_id ON documents(project_id);",
    "CREATE TABLE IF NOT EXISTS conversations (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id),
        title TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE INDEX IF NOT EXISTS idx_conversations_project_id ON conversations(project_id);",
    "CREATE TABLE IF NOT EXISTS messages (
        id TEXT PRIMARY KEY,
        conversation_id TEXT NOT NULL REFERENCES conversations(id),
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        metadata TEXT,
        created_at DATETIME NOT NULL
    );",
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages(conversation_id);",
    "CREATE TABLE IF NOT EXISTS generated_files (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL REFERENCES projects(id),
        owner_id TEXT NOT NULL,
        file_name TEXT NOT NULL,
        display_name TEXT NOT NULL,
        file_type TEXT NOT NULL,
        format TEXT NOT NULL,
        current_version INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );",
    "CREATE INDEX IF NOT EXISTS idx_generated_files_project_id ON generated_files(project_id);",
    "CREATE TABLE IF NOT EXISTS generated_file_versions (
        file_id TEXT NOT NULL REFERENCES generated_files(id),
        version INTEGER NOT NULL,
        prompt TEXT NOT NULL,
        base_version INTEGER,
        storage_key TEXT NOT NULL,
        byte_size INTEGER NOT NULL,
        page_count INTEGER,
        status TEXT NOT NULL,
        error_message TEXT,
        generation_ms INTEGER,
        sources TEXT,
        PRIMARY KEY (file_id, version)
    );",
];

/// Owns Project/Document/Conversation/Message/GeneratedFile(+Version)
/// persistence. Deliberately excludes auth/ownership enforcement and
/// multi-tenant row-level security, both of which are an external
/// collaborator's concern sitting above this trait.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn create_project(&self, project: &Project) -> Result<(), CoreError>;
    async fn get_project(&self, id: &str) -> Result<Project, CoreError>;
    async fn set_collection_handle(&self, project_id: &str, handle: &str) -> Result<(), CoreError>;
    async fn list_documents(&self, project_id: &str) -> Result<Vec<Document>, CoreError>;

    async fn create_document(&self, document: &Document) -> Result<(), CoreError>;
    async fn get_document(&self, id: &str) -> Result<Document, CoreError>;
    /// Persists the Document Loader's extracted text. Does not touch
    /// `processed_at` — a document can be loaded without its chunks being
    /// indexed yet.
    async fn set_extracted_text(&self, id: &str, extracted_text: &str) -> Result<(), CoreError>;
    /// Sets `processed_at = now`, the signal that the document's chunks
    /// are present in the vector store. Call only after the upsert
    /// succeeds.
    async fn mark_document_processed(&self, id: &str) -> Result<(), CoreError>;
    async fn clear_processed_state(&self, id: &str) -> Result<(), CoreError>;
    async fn delete_document(&self, id: &str) -> Result<(), CoreError>;

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), CoreError>;
    async fn get_conversation(&self, id: &str) -> Result<Conversation, CoreError>;
    async fn append_message(&self, message: &Message) -> Result<(), CoreError>;
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, CoreError>;

    async fn create_generated_file(&self, file: &GeneratedFile) -> Result<(), CoreError>;
    async fn get_generated_file(&self, id: &str) -> Result<GeneratedFile, CoreError>;
    /// Looks up a project's generated file by its stable slug, enforcing
    /// the `(project, filename)` uniqueness invariant without a DB-level
    /// constraint (`FileGenerator::create_file` uses this to decide
    /// whether to delegate to `new_version` instead of inserting).
    async fn find_generated_file_by_name(
        &self,
        project_id: &str,
        file_name: &str,
    ) -> Result<Option<GeneratedFile>, CoreError>;
    /// Upserts on (file_id, version) — the File Generator writes a
    /// `generating` placeholder row up front, then overwrites it with the
    /// final row once generation completes.
    async fn add_file_version(&self, version: &GeneratedFileVersion) -> Result<(), CoreError>;
    async fn update_file_version_status(
        &self,
        file_id: &str,
        version: u32,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), CoreError>;
    async fn get_file_version(&self, file_id: &str, version: u32) -> Result<GeneratedFileVersion, CoreError>;
    async fn bump_current_version(&self, file_id: &str, version: u32) -> Result<(), CoreError>;
}

pub struct TursoRelationalStore {
    conn: Connection,
}

impl TursoRelationalStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub async fn initialize_schema(&self) -> Result<(), CoreError> {
        for statement in CREATE_TABLES_SQL {
            self.conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    fn text(row: &turso::Row, idx: usize) -> Result<String, CoreError> {
        match row.get_value(idx)? {
            TursoValue::Text(s) => Ok(s),
            TursoValue::Null => Ok(String::new()),
            other => Err(CoreError::VectorStoreCorrupt(format!("expected text, got {other:?}"))),
        }
    }

    fn opt_text(row: &turso::Row, idx: usize) -> Result<Option<String>, CoreError> {
        match row.get_value(idx)? {
            TursoValue::Text(s) => Ok(Some(s)),
            TursoValue::Null => Ok(None),
            other => Err(CoreError::VectorStoreCorrupt(format!("expected text, got {other:?}"))),
        }
    }

    fn int(row: &turso::Row, idx: usize) -> Result<i64, CoreError> {
        match row.get_value(idx)? {
            TursoValue::Integer(i) => Ok(i),
            other => Err(CoreError::VectorStoreCorrupt(format!("expected integer, got {other:?}"))),
        }
    }

    fn opt_int(row: &turso::Row, idx: usize) -> Result<Option<i64>, CoreError> {
        match row.get_value(idx)? {
            TursoValue::Integer(i) => Ok(Some(i)),
            TursoValue::Null => Ok(None),
            other => Err(CoreError::VectorStoreCorrupt(format!("expected integer, got {other:?}"))),
        }
    }

    fn project_from_row(row: &turso::Row) -> Result<Project, CoreError> {
        Ok(Project {
            id: Self::text(row, 0)?,
            owner_id: Self::text(row, 1)?,
            name: Self::text(row, 2)?,
            collection_handle: Self::opt_text(row, 3)?,
        })
    }

    fn document_from_row(row: &turso::Row) -> Result<Document, CoreError> {
        let processed_at = Self::opt_text(row, 7)?
            .map(|s| s.parse::<chrono::DateTime<Utc>>())
            .transpose()
            .map_err(|e| CoreError::VectorStoreCorrupt(format!("bad processed_at: {e}")))?;
        Ok(Document {
            id: Self::text(row, 0)?,
            project_id: Self::text(row, 1)?,
            filename: Self::text(row, 2)?,
            content_type: Self::text(row, 3)?,
            byte_size: Self::int(row, 4)? as u64,
            storage_key: Self::text(row, 5)?,
            extracted_text: Self::opt_text(row, 6)?,
            processed_at,
        })
    }

    fn message_from_row(row: &turso::Row) -> Result<Message, CoreError> {
        let role = match Self::text(row, 2)?.as_str() {
            "USER" => MessageRole::User,
            _ => MessageRole::Assistant,
        };
        let created_at = Self::text(row, 4)?
            .parse::<chrono::DateTime<Utc>>()
            .map_err(|e| CoreError::VectorStoreCorrupt(format!("bad created_at: {e}")))?;
        let metadata = Self::opt_text(row, 5)?
            .map(|json| serde_json::from_str::<MessageMetadata>(&json))
            .transpose()
            .map_err(|e| CoreError::VectorStoreCorrupt(format!("bad metadata: {e}")))?;
        Ok(Message {
            id: Self::text(row, 0)?,
            conversation_id: Self::text(row, 1)?,
            role,
            content: Self::text(row, 3)?,
            created_at,
            metadata,
        })
    }

    fn generated_file_from_row(row: &turso::Row) -> Result<GeneratedFile, CoreError> {
        Ok(GeneratedFile {
            id: Self::text(row, 0)?,
            project_id: Self::text(row, 1)?,
            owner_id: Self::text(row, 2)?,
            file_name: Self::text(row, 3)?,
            display_name: Self::text(row, 4)?,
            file_type: Self::parse_file_type(&Self::text(row, 5)?),
            format: Self::parse_format(&Self::text(row, 6)?),
            current_version: Self::int(row, 7)? as u32,
        })
    }

    fn file_type_str(file_type: FileType) -> &'static str {
        match file_type {
            FileType::StudyGuide => "study_guide",
            FileType::Quiz => "quiz",
            FileType::Summary => "summary",
            FileType::LessonPlan => "lesson_plan",
            FileType::Custom => "custom",
        }
    }

    fn parse_file_type(s: &str) -> FileType {
        match s {
            "study_guide" => FileType::StudyGuide,
            "quiz" => FileType::Quiz,
            "summary" => FileType::Summary,
            "lesson_plan" => FileType::LessonPlan,
            _ => FileType::Custom,
        }
    }

    fn format_str(format: FileFormat) -> &'static str {
        match format {
            FileFormat::Pdf => "pdf",
            FileFormat::Markdown => "markdown",
        }
    }

    fn parse_format(s: &str) -> FileFormat {
        match s {
            "markdown" => FileFormat::Markdown,
            _ => FileFormat::Pdf,
        }
    }

    fn status_str(status: JobStatus) -> &'static str {
        match status {
            JobStatus::Pending => "pending",
            JobStatus::Generating => "generating",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    fn parse_status(s: &str) -> JobStatus {
        match s {
            "generating" => JobStatus::Generating,
            "completed" => JobStatus::Completed,
            "failed" => JobStatus::Failed,
            _ => JobStatus::Pending,
        }
    }
}

#[async_trait]
impl RelationalStore for TursoRelationalStore {
    async fn create_project(&self, project: &Project) -> Result<(), CoreError> {
        self.conn
            .execute(
                "INSERT INTO projects (id, owner_id, name, collection_handle) VALUES (?, ?, ?, ?)",
                params![
                    project.id.clone(),
                    project.owner_id.clone(),
                    project.name.clone(),
                    project.collection_handle.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_project(&self, id: &str) -> Result<Project, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, owner_id, name, collection_handle FROM projects WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::project_from_row(&row),
            None => Err(CoreError::NotFound(format!("project {id}"))),
        }
    }

    async fn set_collection_handle(&self, project_id: &str, handle: &str) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE projects SET collection_handle = ? WHERE id = ? AND collection_handle IS NULL",
                params![handle.to_string(), project_id.to_string()],
            )
            .await?;
        Ok(())
    }

    async fn list_documents(&self, project_id: &str) -> Result<Vec<Document>, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, filename, content_type, byte_size, storage_key, extracted_text, processed_at
                 FROM documents WHERE project_id = ? ORDER BY created_at ASC",
                params![project_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::document_from_row(&row)?);
        }
        Ok(out)
    }

    async fn create_document(&self, document: &Document) -> Result<(), CoreError> {
        self.conn
            .execute(
                "INSERT INTO documents (id, project_id, filename, content_type, byte_size, storage_key, extracted_text, processed_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    document.id.clone(),
                    document.project_id.clone(),
                    document.filename.clone(),
                    document.content_type.clone(),
                    document.byte_size as i64,
                    document.storage_key.clone(),
                    document.extracted_text.clone(),
                    document.processed_at.map(|t| t.to_rfc3339()),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_document(&self, id: &str) -> Result<Document, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, filename, content_type, byte_size, storage_key, extracted_text, processed_at
                 FROM documents WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::document_from_row(&row),
            None => Err(CoreError::NotFound(format!("document {id}"))),
        }
    }

    async fn set_extracted_text(&self, id: &str, extracted_text: &str) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE documents SET extracted_text = ? WHERE id = ?",
                params![extracted_text.to_string(), id.to_string()],
            )
            .await?;
        Ok(())
    }

    async fn mark_document_processed(&self, id: &str) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE documents SET processed_at = ? WHERE id = ?",
                params![Utc::now().to_rfc3339(), id.to_string()],
            )
            .await?;
        Ok(())
    }

    async fn clear_processed_state(&self, id: &str) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE documents SET extracted_text = NULL, processed_at = NULL WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        Ok(())
    }

    async fn delete_document(&self, id: &str) -> Result<(), CoreError> {
        self.conn
            .execute("DELETE FROM documents WHERE id = ?", params![id.to_string()])
            .await?;
        Ok(())
    }

    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), CoreError> {
        self.conn
            .execute(
                "INSERT INTO conversations (id, project_id, title) VALUES (?, ?, ?)",
                params![
                    conversation.id.clone(),
                    conversation.project_id.clone(),
                    conversation.title.clone(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Conversation, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, title FROM conversations WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Conversation {
                id: Self::text(&row, 0)?,
                project_id: Self::text(&row, 1)?,
                title: Self::opt_text(&row, 2)?,
            }),
            None => Err(CoreError::NotFound(format!("conversation {id}"))),
        }
    }

    async fn append_message(&self, message: &Message) -> Result<(), CoreError> {
        let metadata_json = message
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))?;
        self.conn
            .execute(
                "INSERT INTO messages (id, conversation_id, role, content, metadata, created_at) VALUES (?, ?, ?, ?, ?, ?)",
                params![
                    message.id.clone(),
                    message.conversation_id.clone(),
                    match message.role {
                        MessageRole::User => "USER",
                        MessageRole::Assistant => "ASSISTANT",
                    },
                    message.content.clone(),
                    metadata_json,
                    message.created_at.to_rfc3339(),
                ],
            )
            .await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, conversation_id, role, content, created_at, metadata
                 FROM messages WHERE conversation_id = ? ORDER BY created_at ASC",
                params![conversation_id.to_string()],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(Self::message_from_row(&row)?);
        }
        Ok(out)
    }

    async fn create_generated_file(&self, file: &GeneratedFile) -> Result<(), CoreError> {
        self.conn
            .execute(
                "INSERT INTO generated_files (id, project_id, owner_id, file_name, display_name, file_type, format, current_version)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    file.id.clone(),
                    file.project_id.clone(),
                    file.owner_id.clone(),
                    file.file_name.clone(),
                    file.display_name.clone(),
                    Self::file_type_str(file.file_type),
                    Self::format_str(file.format),
                    file.current_version as i64,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_generated_file(&self, id: &str) -> Result<GeneratedFile, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, owner_id, file_name, display_name, file_type, format, current_version
                 FROM generated_files WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Self::generated_file_from_row(&row),
            None => Err(CoreError::NotFound(format!("generated file {id}"))),
        }
    }

    async fn find_generated_file_by_name(
        &self,
        project_id: &str,
        file_name: &str,
    ) -> Result<Option<GeneratedFile>, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, project_id, owner_id, file_name, display_name, file_type, format, current_version
                 FROM generated_files WHERE project_id = ? AND file_name = ?",
                params![project_id.to_string(), file_name.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(Self::generated_file_from_row(&row)?)),
            None => Ok(None),
        }
    }

    async fn add_file_version(&self, version: &GeneratedFileVersion) -> Result<(), CoreError> {
        let sources_json =
            serde_json::to_string(&version.sources).map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO generated_file_versions
                    (file_id, version, prompt, base_version, storage_key, byte_size, page_count, status, error_message, generation_ms, sources)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    version.file_id.clone(),
                    version.version as i64,
                    version.prompt.clone(),
                    version.base_version.map(|v| v as i64),
                    version.storage_key.clone(),
                    version.byte_size as i64,
                    version.page_count.map(|v| v as i64),
                    Self::status_str(version.status),
                    version.error_message.clone(),
                    version.generation_ms.map(|v| v as i64),
                    sources_json,
                ],
            )
            .await?;
        Ok(())
    }

    async fn update_file_version_status(
        &self,
        file_id: &str,
        version: u32,
        status: JobStatus,
        error_message: Option<&str>,
    ) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE generated_file_versions SET status = ?, error_message = ? WHERE file_id = ? AND version = ?",
                params![
                    Self::status_str(status),
                    error_message.map(|s| s.to_string()),
                    file_id.to_string(),
                    version as i64,
                ],
            )
            .await?;
        Ok(())
    }

    async fn get_file_version(&self, file_id: &str, version: u32) -> Result<GeneratedFileVersion, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT file_id, version, prompt, base_version, storage_key, byte_size, page_count, status, error_message, generation_ms, sources
                 FROM generated_file_versions WHERE file_id = ? AND version = ?",
                params![file_id.to_string(), version as i64],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("version {version} of file {file_id}")))?;

        let sources: Vec<SourceAttribution> = serde_json::from_str(&Self::text(&row, 10)?)
            .map_err(|e| CoreError::VectorStoreCorrupt(format!("bad sources json: {e}")))?;

        Ok(GeneratedFileVersion {
            file_id: Self::text(&row, 0)?,
            version: Self::int(&row, 1)? as u32,
            prompt: Self::text(&row, 2)?,
            base_version: Self::opt_int(&row, 3)?.map(|v| v as u32),
            storage_key: Self::text(&row, 4)?,
            byte_size: Self::int(&row, 5)? as u64,
            page_count: Self::opt_int(&row, 6)?.map(|v| v as u32),
            status: Self::parse_status(&Self::text(&row, 7)?),
            error_message: Self::opt_text(&row, 8)?,
            generation_ms: Self::opt_int(&row, 9)?.map(|v| v as u64),
            sources,
        })
    }

    async fn bump_current_version(&self, file_id: &str, version: u32) -> Result<(), CoreError> {
        self.conn
            .execute(
                "UPDATE generated_files SET current_version = ? WHERE id = ? AND current_version < ?",
                params![version as i64, file_id.to_string(), version as i64],
            )
            .await?;
        Ok(())
    }
}
