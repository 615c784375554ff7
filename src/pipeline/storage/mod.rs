use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::common::error::Result;
use crate::pipeline::merge::CommentEntry;

#[cfg(feature = "db")]
pub mod db;
pub mod in_memory;

#[cfg(feature = "db")]
pub use db::LibsqlInteractionStore;
pub use in_memory::InMemoryInteractionStore;

/// Port onto the interacoes document store.
///
/// Implementations only ever mutate existing documents. The import flow is
/// not allowed to originate tickets, so a missing document surfaces as
/// `None` / `false` and is never upserted.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Looks up the interacoes document for an imported ticket id.
    async fn find_by_chamado_id(&self, chamado_id: &str) -> Result<Option<Value>>;

    /// Sets the comments and the update timestamp on an existing document.
    /// Returns `true` when the document was modified, `false` when there is
    /// no such document or it already carries exactly these comments.
    async fn set_comments(
        &self,
        chamado_id: &str,
        comments: &[CommentEntry],
        updated_at: DateTime<Utc>,
    ) -> Result<bool>;
}
