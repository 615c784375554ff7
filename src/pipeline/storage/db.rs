use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Builder, Connection, Database};
use serde_json::Value;
use std::env;
use tracing::info;

use crate::common::constants::{DOC_COMMENTS_FIELD, DOC_UPDATED_FIELD};
use crate::common::error::{ImportError, Result};
use crate::pipeline::merge::CommentEntry;
use crate::pipeline::storage::InteractionStore;

/// Turso/libSQL-backed interacoes store.
///
/// Holds one long-lived `Database` handle for the life of the process;
/// connections are drawn from it per call. The table is owned by the
/// upstream ticket system, so this store never creates rows or schema.
pub struct LibsqlInteractionStore {
    db: Database,
    table: String,
}

impl LibsqlInteractionStore {
    /// Connects using `LIBSQL_URL` / `LIBSQL_AUTH_TOKEN`. The table name is
    /// the configurable collection identity, `interacoes` by default.
    pub async fn connect(table: &str) -> Result<Self> {
        let url = env::var("LIBSQL_URL").map_err(|_| ImportError::Store {
            message: "LIBSQL_URL environment variable not set".to_string(),
        })?;

        let auth_token = env::var("LIBSQL_AUTH_TOKEN").map_err(|_| ImportError::Store {
            message: "LIBSQL_AUTH_TOKEN environment variable not set".to_string(),
        })?;

        info!("Connecting to interacoes store at {}", url);

        let db = Builder::new_remote(url, auth_token)
            .build()
            .await
            .map_err(|e| ImportError::Store {
                message: format!("Failed to connect to store: {e}"),
            })?;

        Ok(Self {
            db,
            table: table.to_string(),
        })
    }

    fn get_connection(&self) -> Result<Connection> {
        self.db.connect().map_err(|e| ImportError::Store {
            message: format!("Failed to get store connection: {e}"),
        })
    }
}

#[async_trait]
impl InteractionStore for LibsqlInteractionStore {
    async fn find_by_chamado_id(&self, chamado_id: &str) -> Result<Option<Value>> {
        let conn = self.get_connection()?;

        let mut rows = conn
            .query(
                &format!(
                    "SELECT data, comentarios, atualizado_em FROM {} WHERE chamado_id = ?",
                    self.table
                ),
                libsql::params![chamado_id],
            )
            .await
            .map_err(|e| ImportError::Store {
                message: format!("Failed to query document: {e}"),
            })?;

        let row = match rows.next().await.map_err(|e| ImportError::Store {
            message: format!("Failed to read row: {e}"),
        })? {
            Some(row) => row,
            None => return Ok(None),
        };

        let data: String = row.get(0).map_err(|e| ImportError::Store {
            message: format!("Failed to get data: {e}"),
        })?;
        let comments: Option<String> = row.get(1).ok();
        let updated_at: Option<String> = row.get(2).ok();

        let mut document: Value = serde_json::from_str(&data)?;
        if let Some(fields) = document.as_object_mut() {
            if let Some(raw) = comments {
                fields.insert(DOC_COMMENTS_FIELD.to_string(), serde_json::from_str(&raw)?);
            }
            if let Some(timestamp) = updated_at {
                fields.insert(DOC_UPDATED_FIELD.to_string(), Value::String(timestamp));
            }
        }

        Ok(Some(document))
    }

    async fn set_comments(
        &self,
        chamado_id: &str,
        comments: &[CommentEntry],
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.get_connection()?;
        let payload = serde_json::to_string(comments)?;

        // Update-only by construction: a missing document matches zero rows
        // and is never inserted. An identical payload is filtered out by the
        // WHERE clause so it does not count as a modification.
        let affected = conn
            .execute(
                &format!(
                    "UPDATE {} SET comentarios = ?2, atualizado_em = ?3 \
                     WHERE chamado_id = ?1 AND (comentarios IS NULL OR comentarios <> ?2)",
                    self.table
                ),
                libsql::params![chamado_id, payload, updated_at.to_rfc3339()],
            )
            .await
            .map_err(|e| ImportError::Store {
                message: format!("Failed to patch document: {e}"),
            })?;

        Ok(affected > 0)
    }
}
