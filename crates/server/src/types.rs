use serde::{Deserialize, Serialize};
use serde_json::Value;
use studyrag::models::{
    Document, FileFormat, FileType, GeneratedFile, GeneratedFileVersion, JobStatus, Project,
    SourceAttribution,
};

#[derive(Debug, Deserialize, Default)]
pub struct DebugParams {
    pub debug: Option<bool>,
}

#[derive(Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<Value>,
    pub result: T,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub collection_handle: Option<String>,
}

impl From<Project> for ProjectResponse {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            owner_id: project.owner_id,
            name: project.name,
            collection_handle: project.collection_handle,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub project_id: String,
    pub filename: String,
    pub content_type: String,
    pub byte_size: u64,
    pub processed: bool,
}

impl From<Document> for DocumentResponse {
    fn from(document: Document) -> Self {
        Self {
            processed: document.is_processed(),
            id: document.id,
            project_id: document.project_id,
            filename: document.filename,
            content_type: document.content_type,
            byte_size: document.byte_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestReportResponse {
    pub document_id: String,
    pub chunks_processed: usize,
    pub collection_handle: String,
    pub processing_time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub text: String,
    pub conversation_id: Option<String>,
    pub query_type: Option<EducationalQueryTypeDto>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationalQueryTypeDto {
    Question,
    Summary,
    Quiz,
    Explanation,
}

impl From<EducationalQueryTypeDto> for studyrag::rag::EducationalQueryType {
    fn from(dto: EducationalQueryTypeDto) -> Self {
        match dto {
            EducationalQueryTypeDto::Question => studyrag::rag::EducationalQueryType::Question,
            EducationalQueryTypeDto::Summary => studyrag::rag::EducationalQueryType::Summary,
            EducationalQueryTypeDto::Quiz => studyrag::rag::EducationalQueryType::Quiz,
            EducationalQueryTypeDto::Explanation => studyrag::rag::EducationalQueryType::Explanation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
    pub tokens_used: u32,
}

#[derive(Debug, Deserialize)]
pub struct StartStreamRequest {
    pub project_id: String,
    pub message: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub display_name: String,
    pub file_type: FileTypeDto,
    pub format: FileFormatDto,
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct NewVersionRequest {
    pub prompt: String,
    pub base_version: Option<u32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileTypeDto {
    StudyGuide,
    Quiz,
    Summary,
    LessonPlan,
    Custom,
}

impl From<FileTypeDto> for FileType {
    fn from(dto: FileTypeDto) -> Self {
        match dto {
            FileTypeDto::StudyGuide => FileType::StudyGuide,
            FileTypeDto::Quiz => FileType::Quiz,
            FileTypeDto::Summary => FileType::Summary,
            FileTypeDto::LessonPlan => FileType::LessonPlan,
            FileTypeDto::Custom => FileType::Custom,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormatDto {
    Pdf,
    Markdown,
}

impl From<FileFormatDto> for FileFormat {
    fn from(dto: FileFormatDto) -> Self {
        match dto {
            FileFormatDto::Pdf => FileFormat::Pdf,
            FileFormatDto::Markdown => FileFormat::Markdown,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratedFileResponse {
    pub id: String,
    pub project_id: String,
    pub file_name: String,
    pub display_name: String,
    pub file_type: FileType,
    pub format: FileFormat,
    pub current_version: u32,
}

impl From<GeneratedFile> for GeneratedFileResponse {
    fn from(file: GeneratedFile) -> Self {
        Self {
            id: file.id,
            project_id: file.project_id,
            file_name: file.file_name,
            display_name: file.display_name,
            file_type: file.file_type,
            format: file.format,
            current_version: file.current_version,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratedFileVersionResponse {
    pub file_id: String,
    pub version: u32,
    pub status: JobStatus,
    pub byte_size: u64,
    pub page_count: Option<u32>,
    pub error_message: Option<String>,
    pub generation_ms: Option<u64>,
}

impl From<GeneratedFileVersion> for GeneratedFileVersionResponse {
    fn from(version: GeneratedFileVersion) -> Self {
        Self {
            file_id: version.file_id,
            version: version.version,
            status: version.status,
            byte_size: version.byte_size,
            page_count: version.page_count,
            error_message: version.error_message,
            generation_ms: version.generation_ms,
        }
    }
}
