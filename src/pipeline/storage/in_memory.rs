use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::common::constants::{DOC_COMMENTS_FIELD, DOC_UPDATED_FIELD};
use crate::common::error::{ImportError, Result};
use crate::pipeline::merge::CommentEntry;
use crate::pipeline::storage::InteractionStore;

/// In-memory interacoes store for development and testing.
pub struct InMemoryInteractionStore {
    documents: Arc<Mutex<HashMap<String, Value>>>,
}

impl Default for InMemoryInteractionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seeds a document under a chamado id. Setup helper for tests and dev
    /// runs; the pipelines themselves never create documents.
    pub fn insert_document(&self, chamado_id: &str, document: Value) {
        let mut documents = self.documents.lock().unwrap();
        documents.insert(chamado_id.to_string(), document);
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    async fn find_by_chamado_id(&self, chamado_id: &str) -> Result<Option<Value>> {
        let documents = self.documents.lock().unwrap();
        Ok(documents.get(chamado_id).cloned())
    }

    async fn set_comments(
        &self,
        chamado_id: &str,
        comments: &[CommentEntry],
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let new_comments = serde_json::to_value(comments)?;

        let mut documents = self.documents.lock().unwrap();
        let document = match documents.get_mut(chamado_id) {
            Some(document) => document,
            None => return Ok(false),
        };

        if document.get(DOC_COMMENTS_FIELD) == Some(&new_comments) {
            debug!("Document {} already carries these comments", chamado_id);
            return Ok(false);
        }

        match document.as_object_mut() {
            Some(fields) => {
                fields.insert(DOC_COMMENTS_FIELD.to_string(), new_comments);
                fields.insert(
                    DOC_UPDATED_FIELD.to_string(),
                    serde_json::to_value(updated_at)?,
                );
                debug!("Patched comments onto document {}", chamado_id);
                Ok(true)
            }
            None => Err(ImportError::Store {
                message: format!("document {chamado_id} is not a JSON object"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(origem: &str, texto: &str, data: DateTime<Utc>) -> CommentEntry {
        CommentEntry {
            origem: origem.to_string(),
            texto: texto.to_string(),
            tipo: "comentario".to_string(),
            data,
        }
    }

    #[tokio::test]
    async fn test_set_comments_patches_existing_document() {
        let store = InMemoryInteractionStore::new();
        store.insert_document("1001", json!({"chamadoId": "1001", "mensagem": "aberto"}));

        let now = Utc::now();
        let comments = vec![entry("Comentar", "resolvido", now)];
        let modified = store.set_comments("1001", &comments, now).await.unwrap();
        assert!(modified);

        let document = store.find_by_chamado_id("1001").await.unwrap().unwrap();
        assert_eq!(document["mensagem"], "aberto");
        assert_eq!(document[DOC_COMMENTS_FIELD][0]["texto"], "resolvido");
        assert_eq!(
            document[DOC_UPDATED_FIELD],
            serde_json::to_value(now).unwrap()
        );
    }

    #[tokio::test]
    async fn test_set_comments_never_creates_documents() {
        let store = InMemoryInteractionStore::new();

        let now = Utc::now();
        let comments = vec![entry("Comentar", "qualquer", now)];
        let modified = store.set_comments("9999", &comments, now).await.unwrap();

        assert!(!modified);
        assert!(store.find_by_chamado_id("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identical_comments_do_not_count_as_modification() {
        let store = InMemoryInteractionStore::new();
        store.insert_document("1001", json!({"chamadoId": "1001"}));

        let now = Utc::now();
        let comments = vec![entry("Comentar", "resolvido", now)];

        assert!(store.set_comments("1001", &comments, now).await.unwrap());
        assert!(!store.set_comments("1001", &comments, now).await.unwrap());
    }
}
