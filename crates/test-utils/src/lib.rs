//! Shared test scaffolding for the studyrag crates: an isolated in-memory
//! Turso database with both schemas already initialized, and deterministic
//! stand-ins for the `Embedder` and `ChatModelProvider` traits so handler
//! and engine tests never reach a real network endpoint.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream;
use studyrag::ai::{ChatMessage, ChatModelProvider, ChatStream};
use studyrag::embedding::Embedder;
use studyrag::errors::CoreError;
use studyrag::store::TursoRelationalStore;
use studyrag::vector_store::{TursoVectorStore, VectorStore};
use turso::Database;

/// An isolated in-memory database with the relational and vector schemas
/// already created, for tests that want a real `RelationalStore`/
/// `VectorStore` rather than a mock.
pub struct TestSetup {
    pub db: Database,
}

impl TestSetup {
    pub async fn new() -> Result<Self> {
        let db = turso::Builder::new_local(":memory:").build().await?;

        let relational = TursoRelationalStore::new(db.connect()?);
        relational.initialize_schema().await?;

        let vector_store = TursoVectorStore::new(db.connect()?);
        vector_store.create_collection("").await?;

        Ok(Self { db })
    }

    /// A fresh `TursoRelationalStore` handle over its own connection to the
    /// shared in-memory database.
    pub fn relational_store(&self) -> Result<TursoRelationalStore> {
        Ok(TursoRelationalStore::new(self.db.connect()?))
    }

    /// A fresh `TursoVectorStore` handle over its own connection to the
    /// shared in-memory database.
    pub fn vector_store(&self) -> Result<TursoVectorStore> {
        Ok(TursoVectorStore::new(self.db.connect()?))
    }
}

// --- Mock Chat Model Provider ---

/// A scripted `ChatModelProvider`. Responses are keyed by a substring match
/// against the joined content of every message in the request; every call
/// is recorded for later assertion.
#[derive(Default)]
pub struct MockChatModelProvider {
    responses: Mutex<HashMap<String, String>>,
    default_response: Mutex<Option<String>>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockChatModelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs a response returned whenever the joined message content
    /// contains `key`. The key should be a unique substring of the prompt
    /// (e.g. a phrase from the system instructions or the retrieved
    /// context block).
    pub fn add_response(&self, key: &str, response: &str) {
        self.responses.lock().unwrap().insert(key.to_string(), response.to_string());
    }

    /// Programs the response returned when no key matches, so a test
    /// doesn't have to script every possible prompt shape.
    pub fn set_default_response(&self, response: &str) {
        *self.default_response.lock().unwrap() = Some(response.to_string());
    }

    /// The full message lists passed to `complete`/`stream`, in call order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().unwrap().clone()
    }

    fn resolve(&self, messages: &[ChatMessage]) -> Result<String, CoreError> {
        self.calls.lock().unwrap().push(messages.to_vec());

        let joined = messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
        let responses = self.responses.lock().unwrap();
        for (key, response) in responses.iter() {
            if joined.contains(key.as_str()) {
                return Ok(response.clone());
            }
        }
        drop(responses);

        self.default_response.lock().unwrap().clone().ok_or_else(|| {
            CoreError::Internal(anyhow::anyhow!(
                "MockChatModelProvider: no response programmed for prompt: {joined}"
            ))
        })
    }
}

#[async_trait]
impl ChatModelProvider for MockChatModelProvider {
    async fn complete(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<String, CoreError> {
        self.resolve(messages)
    }

    async fn stream(&self, messages: &[ChatMessage], _max_tokens: u32) -> Result<ChatStream, CoreError> {
        let text = self.resolve(messages)?;
        let chunks: Vec<Result<String, CoreError>> =
            text.split_inclusive(' ').map(|s| Ok(s.to_string())).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

// --- Mock Embedder ---

/// A deterministic bag-of-words embedder: each text hashes its lowercase
/// alphanumeric tokens into a fixed number of buckets and L2-normalizes the
/// result, so two texts sharing vocabulary score higher under cosine
/// similarity than two that don't. Good enough to exercise retrieval and
/// threshold logic without a real embedding endpoint.
pub struct MockEmbedder {
    dim: usize,
}

impl MockEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut buckets = vec![0.0_f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let index = (bucket_hash(&token.to_lowercase()) as usize) % self.dim;
            buckets[index] += 1.0;
        }
        let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in buckets.iter_mut() {
                *v /= norm;
            }
        }
        buckets
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn bucket_hash(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

// --- Test-Specific Helpers ---
#[cfg(feature = "pdf")]
pub mod helpers {
    use anyhow::Result;
    use printpdf::{
        BuiltinFont, Layer, Mm, Op, ParsedFont, PdfDocument, PdfPage, PdfSaveOptions, Pt, TextItem,
        TextMatrix, TextRenderingMode,
    };

    /// Generates a simple, single-page PDF with the given text content, compatible with printpdf v0.8.2.
    pub fn generate_test_pdf(text: &str) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new("Test PDF");
        let mut page = PdfPage::new(Mm(210.0), Mm(297.0), vec![]);
        let layer_def = Layer::new("Layer 1");
        let layer_id = doc.add_layer(&layer_def);

        let font_bytes = BuiltinFont::Helvetica.get_subset_font().bytes;
        let font = ParsedFont::from_bytes(&font_bytes, 0, &mut Vec::new())
            .ok_or_else(|| anyhow::anyhow!("Failed to parse built-in font"))?;
        let font_id = doc.add_font(&font);

        let ops = vec![
            Op::BeginLayer {
                layer_id: layer_id.clone(),
            },
            Op::SetFontSize {
                size: Pt(12.0),
                font: font_id.clone(),
            },
            Op::StartTextSection,
            Op::SetTextMatrix {
                matrix: TextMatrix::Translate(Mm(10.0).into(), Mm(280.0).into()),
            },
            Op::SetTextRenderingMode {
                mode: TextRenderingMode::Fill,
            },
            Op::WriteText {
                items: vec![TextItem::Text(text.to_string())],
                font: font_id,
            },
            Op::EndTextSection,
            Op::EndLayer { layer_id },
        ];

        page.ops = ops;
        doc.pages.push(page);

        let mut warnings = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            eprintln!("PDF generation warnings: {warnings:?}");
        }

        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_chat_provider_matches_on_substring() {
        let provider = MockChatModelProvider::new();
        provider.add_response("capital of France", "Paris is the capital of France.");
        let messages = vec![ChatMessage::user("What is the capital of France?")];
        let answer = provider.complete(&messages, 100).await.unwrap();
        assert_eq!(answer, "Paris is the capital of France.");
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn mock_chat_provider_falls_back_to_default() {
        let provider = MockChatModelProvider::new();
        provider.set_default_response("I don't know.");
        let messages = vec![ChatMessage::user("anything")];
        let answer = provider.complete(&messages, 100).await.unwrap();
        assert_eq!(answer, "I don't know.");
    }

    #[tokio::test]
    async fn mock_chat_provider_errors_without_a_match() {
        let provider = MockChatModelProvider::new();
        let messages = vec![ChatMessage::user("anything")];
        assert!(provider.complete(&messages, 100).await.is_err());
    }

    #[tokio::test]
    async fn mock_embedder_scores_shared_vocabulary_higher() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed_query("photosynthesis converts sunlight into chemical energy").await.unwrap();
        let b = embedder.embed_query("photosynthesis is how plants use sunlight").await.unwrap();
        let c = embedder.embed_query("quantum cryptography relies on entangled particles").await.unwrap();

        let cos = |x: &[f32], y: &[f32]| -> f32 { x.iter().zip(y).map(|(p, q)| p * q).sum() };
        assert!(cos(&a, &b) > cos(&a, &c));
    }

    #[tokio::test]
    async fn test_setup_initializes_both_schemas() {
        let setup = TestSetup::new().await.unwrap();
        let store = setup.relational_store().unwrap();
        let vector_store = setup.vector_store().unwrap();

        let project = studyrag::models::Project {
            id: "p1".into(),
            owner_id: "owner".into(),
            name: "Test".into(),
            collection_handle: None,
        };
        studyrag::store::RelationalStore::create_project(&store, &project).await.unwrap();

        let stats = vector_store.stats("p1").await.unwrap();
        assert_eq!(stats.chunk_count, 0);
    }
}
