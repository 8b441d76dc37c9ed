use crate::models::Document;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// In-memory catalog of the documents seen this session, keyed by the id
/// handed back at registration. Registering the same file twice yields two
/// independent entries. Summaries are attached later, if at all, by the
/// background summarizer.
#[derive(Default)]
pub struct DocumentRegistry {
    documents: RwLock<HashMap<Uuid, Document>>,
}

impl DocumentRegistry {
    pub async fn register(&self, source_filename: &str, checksum: &str, text: &str) -> Uuid {
        let id = Uuid::new_v4();
        let document = Document {
            id,
            source_filename: source_filename.to_string(),
            checksum: checksum.to_string(),
            text: text.to_string(),
            summary: None,
            uploaded_at: Utc::now(),
        };

        self.documents.write().await.insert(id, document);
        debug!(%id, source_filename, "registered document");

        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Document> {
        self.documents.read().await.get(&id).cloned()
    }

    /// Attaches a summary to an existing document. Returns false when the
    /// id is unknown, which callers treat as the document having been
    /// dropped since registration.
    pub async fn attach_summary(&self, id: Uuid, summary: String) -> bool {
        match self.documents.write().await.get_mut(&id) {
            Some(document) => {
                document.summary = Some(summary);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}
