//! # Vector Store Gateway
//!
//! Turso is schema-first and has no Qdrant-style named-collection
//! primitive, so a "collection" is modeled as a logical partition of one
//! shared `chunks` table, keyed by `project_id`. `create_collection` is
//! therefore an idempotent schema-ensure, and `delete_collection` a bulk
//! delete scoped to the project. Table shape and the
//! `vector32`/`vector_distance_cos` usage follow the conventional
//! embedded-vector-search pattern for this engine; the cosine-distance to
//! similarity-score conversion is `1.0 - (vector_distance_cos(..) / 2.0)`.

use async_trait::async_trait;
use turso::{params, Connection, Value as TursoValue};

use crate::errors::CoreError;

pub const CREATE_CHUNKS_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        project_id TEXT NOT NULL,
        document_id TEXT NOT NULL,
        chunk_index INTEGER NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
";

pub const CREATE_CHUNKS_PROJECT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_chunks_project_id ON chunks(project_id);";

pub const CREATE_CHUNKS_DOCUMENT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id);";

#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk_id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub content: String,
    pub score: f64,
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub chunk_count: u64,
    pub document_count: u64,
}

/// Collection-scoped vector storage and similarity search.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_collection(&self, project_id: &str) -> Result<(), CoreError>;
    async fn upsert(&self, project_id: &str, chunks: &[ChunkRecord]) -> Result<(), CoreError>;
    async fn search(
        &self,
        project_id: &str,
        query_vector: &[f32],
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<SearchHit>, CoreError>;
    async fn delete_by_document(&self, project_id: &str, document_id: &str) -> Result<(), CoreError>;
    async fn delete_collection(&self, project_id: &str) -> Result<(), CoreError>;
    async fn stats(&self, project_id: &str) -> Result<CollectionStats, CoreError>;
}

pub struct TursoVectorStore {
    conn: Connection,
}

impl TursoVectorStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn vector_literal(vector: &[f32]) -> String {
        let joined = vector.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(", ");
        format!("vector32('[{joined}]')")
    }

    fn embedding_bytes(vector: &[f32]) -> Vec<u8> {
        vector.iter().flat_map(|f| f.to_le_bytes()).collect()
    }
}

#[async_trait]
impl VectorStore for TursoVectorStore {
    async fn create_collection(&self, _project_id: &str) -> Result<(), CoreError> {
        self.conn.execute(CREATE_CHUNKS_TABLE_SQL, ()).await?;
        self.conn.execute(CREATE_CHUNKS_PROJECT_INDEX_SQL, ()).await?;
        self.conn.execute(CREATE_CHUNKS_DOCUMENT_INDEX_SQL, ()).await?;
        Ok(())
    }

    async fn upsert(&self, project_id: &str, chunks: &[ChunkRecord]) -> Result<(), CoreError> {
        for chunk in chunks {
            let bytes = Self::embedding_bytes(&chunk.embedding);
            self.conn
                .execute(
                    "INSERT INTO chunks (id, project_id, document_id, chunk_index, content, embedding, metadata)
                     VALUES (?, ?, ?, ?, ?, ?, ?)
                     ON CONFLICT(id) DO UPDATE SET
                        content = excluded.content,
                        embedding = excluded.embedding,
                        metadata = excluded.metadata,
                        chunk_index = excluded.chunk_index",
                    params![
                        chunk.id.clone(),
                        project_id.to_string(),
                        chunk.document_id.clone(),
                        chunk.chunk_index,
                        chunk.content.clone(),
                        bytes,
                        chunk.metadata.clone(),
                    ],
                )
                .await?;
        }
        Ok(())
    }

    async fn search(
        &self,
        project_id: &str,
        query_vector: &[f32],
        top_k: usize,
        similarity_threshold: f64,
    ) -> Result<Vec<SearchHit>, CoreError> {
        let vector_expr = Self::vector_literal(query_vector);
        let sql = format!(
            "SELECT id, document_id, content, metadata, chunk_index,
                    (1.0 - (vector_distance_cos(embedding, {vector_expr}) / 2.0)) AS score
             FROM chunks
             WHERE project_id = ?
             ORDER BY score DESC, chunk_index ASC, id ASC
             LIMIT ?;"
        );

        let mut rows = self
            .conn
            .query(&sql, params![project_id.to_string(), top_k as i64])
            .await?;

        let mut hits = Vec::new();
        while let Some(row) = rows.next().await? {
            let score: f64 = match row.get_value(5)? {
                TursoValue::Real(f) => f,
                TursoValue::Integer(i) => i as f64,
                _ => 0.0,
            };
            if score < similarity_threshold {
                continue;
            }
            let chunk_id: String = match row.get_value(0)? {
                TursoValue::Text(s) => s,
                _ => continue,
            };
            let document_id: String = match row.get_value(1)? {
                TursoValue::Text(s) => s,
                _ => continue,
            };
            let content: String = match row.get_value(2)? {
                TursoValue::Text(s) => s,
                _ => continue,
            };
            let metadata = match row.get_value(3)? {
                TursoValue::Text(s) => Some(s),
                _ => None,
            };
            let chunk_index = match row.get_value(4)? {
                TursoValue::Integer(i) => i,
                _ => 0,
            };
            hits.push(SearchHit {
                chunk_id,
                document_id,
                chunk_index,
                content,
                score,
                metadata,
            });
        }

        Ok(hits)
    }

    async fn delete_by_document(&self, project_id: &str, document_id: &str) -> Result<(), CoreError> {
        self.conn
            .execute(
                "DELETE FROM chunks WHERE project_id = ? AND document_id = ?",
                params![project_id.to_string(), document_id.to_string()],
            )
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, project_id: &str) -> Result<(), CoreError> {
        self.conn
            .execute("DELETE FROM chunks WHERE project_id = ?", params![project_id.to_string()])
            .await?;
        Ok(())
    }

    async fn stats(&self, project_id: &str) -> Result<CollectionStats, CoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*), COUNT(DISTINCT document_id) FROM chunks WHERE project_id = ?",
                params![project_id.to_string()],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            let chunk_count = match row.get_value(0)? {
                TursoValue::Integer(i) => i as u64,
                _ => 0,
            };
            let document_count = match row.get_value(1)? {
                TursoValue::Integer(i) => i as u64,
                _ => 0,
            };
            return Ok(CollectionStats {
                chunk_count,
                document_count,
            });
        }

        Ok(CollectionStats::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_literal_formats_as_vector32_call() {
        let literal = TursoVectorStore::vector_literal(&[1.0, 0.5, -0.25]);
        assert_eq!(literal, "vector32('[1, 0.5, -0.25]')");
    }

    #[test]
    fn embedding_bytes_round_trip_length() {
        let vector = vec![0.1_f32, 0.2, 0.3, 0.4];
        let bytes = TursoVectorStore::embedding_bytes(&vector);
        assert_eq!(bytes.len(), vector.len() * 4);
    }
}
