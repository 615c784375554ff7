use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::common::constants::ID_COLUMN;
use crate::pipeline::classify::classify_columns;
use crate::pipeline::merge::extract_entries;
use crate::pipeline::storage::InteractionStore;
use crate::pipeline::table::{Table, TableRow};

/// Outcome of pushing one row's comments at the store.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub enum RowOutcome {
    Updated,
    NoChange,
    Skipped(SkipReason),
    Failed(String),
}

/// Reasons a row is passed over without patching anything. None of these
/// are errors.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub enum SkipReason {
    MissingId,
    NoComments,
    RecordNotFound,
}

/// Aggregated result of one record-update run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessSummary {
    pub total_rows: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped_missing_id: usize,
    pub skipped_no_comments: usize,
    pub skipped_not_found: usize,
    pub failed: usize,
}

impl ProcessSummary {
    fn record(&mut self, outcome: &RowOutcome) {
        self.total_rows += 1;
        match outcome {
            RowOutcome::Updated => self.updated += 1,
            RowOutcome::NoChange => self.unchanged += 1,
            RowOutcome::Skipped(SkipReason::MissingId) => self.skipped_missing_id += 1,
            RowOutcome::Skipped(SkipReason::NoComments) => self.skipped_no_comments += 1,
            RowOutcome::Skipped(SkipReason::RecordNotFound) => self.skipped_not_found += 1,
            RowOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_missing_id + self.skipped_no_comments + self.skipped_not_found
    }
}

/// Pushes consolidated comments from a ticket export onto existing
/// interacoes documents, row by row.
pub struct RecordUpdateProcessor {
    store: Arc<dyn InteractionStore>,
}

impl std::fmt::Debug for RecordUpdateProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordUpdateProcessor")
            .field("store", &"<Arc<dyn InteractionStore>>")
            .finish()
    }
}

impl RecordUpdateProcessor {
    pub fn new(store: Arc<dyn InteractionStore>) -> Self {
        Self { store }
    }

    /// Runs the whole table in input order. Row failures are recorded and
    /// skipped over; only problems upstream of this call fail the file.
    #[instrument(skip(self, table))]
    pub async fn run(&self, table: &Table, captured_at: DateTime<Utc>) -> ProcessSummary {
        let partition = classify_columns(table.columns());
        info!(
            "Processing {} rows with {} comment columns",
            table.row_count(),
            partition.comment_columns.len()
        );

        let mut summary = ProcessSummary::default();
        for (index, row) in table.rows().enumerate() {
            let outcome = self
                .process_row(&row, &partition.comment_columns, captured_at)
                .await;
            if let RowOutcome::Failed(message) = &outcome {
                error!("Row {} failed: {}", index, message);
            }
            summary.record(&outcome);
        }

        info!(
            "Record update finished: {} updated, {} unchanged, {} skipped, {} failed",
            summary.updated,
            summary.unchanged,
            summary.skipped(),
            summary.failed
        );
        summary
    }

    async fn process_row(
        &self,
        row: &TableRow<'_>,
        comment_columns: &[String],
        captured_at: DateTime<Utc>,
    ) -> RowOutcome {
        let chamado_id = match row.get(ID_COLUMN) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                debug!("Row without an imported id, ignoring");
                return RowOutcome::Skipped(SkipReason::MissingId);
            }
        };

        let entries = extract_entries(row, comment_columns, captured_at);
        if entries.is_empty() {
            debug!("No usable comments for chamado {}, ignoring", chamado_id);
            return RowOutcome::Skipped(SkipReason::NoComments);
        }

        match self.store.find_by_chamado_id(&chamado_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!("No interacoes document for chamado {}, row skipped", chamado_id);
                return RowOutcome::Skipped(SkipReason::RecordNotFound);
            }
            Err(e) => return RowOutcome::Failed(format!("lookup for chamado {chamado_id}: {e}")),
        }

        match self
            .store
            .set_comments(&chamado_id, &entries, captured_at)
            .await
        {
            Ok(true) => {
                debug!("Updated comments on chamado {}", chamado_id);
                RowOutcome::Updated
            }
            Ok(false) => RowOutcome::NoChange,
            Err(e) => RowOutcome::Failed(format!("patch for chamado {chamado_id}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::InMemoryInteractionStore;
    use serde_json::json;

    fn export_table(rows: &[(&str, &str)]) -> Table {
        let mut table = Table::new(vec![
            ID_COLUMN.to_string(),
            "Comentar".to_string(),
        ]);
        for (id, comment) in rows {
            let id_cell = if id.is_empty() {
                None
            } else {
                Some(id.to_string())
            };
            let comment_cell = if comment.is_empty() {
                None
            } else {
                Some(comment.to_string())
            };
            table.push_row(vec![id_cell, comment_cell]);
        }
        table
    }

    #[tokio::test]
    async fn test_rows_without_id_or_comments_are_ignored() {
        let store = Arc::new(InMemoryInteractionStore::new());
        store.insert_document("1001", json!({"chamadoId": "1001"}));

        let table = export_table(&[("", "comentado"), ("1001", ""), ("1001", "   ")]);
        let processor = RecordUpdateProcessor::new(store);
        let summary = processor.run(&table, Utc::now()).await;

        assert_eq!(summary.total_rows, 3);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped_missing_id, 1);
        assert_eq!(summary.skipped_no_comments, 2);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn test_missing_document_skips_without_creating() {
        let store = Arc::new(InMemoryInteractionStore::new());

        let table = export_table(&[("9999", "comentado")]);
        let processor = RecordUpdateProcessor::new(store.clone());
        let summary = processor.run(&table, Utc::now()).await;

        assert_eq!(summary.updated, 0);
        assert_eq!(summary.skipped_not_found, 1);
        assert!(store.find_by_chamado_id("9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_identifier_is_trimmed_before_lookup() {
        let store = Arc::new(InMemoryInteractionStore::new());
        store.insert_document("1001", json!({"chamadoId": "1001"}));

        let table = export_table(&[(" 1001 ", "comentado")]);
        let processor = RecordUpdateProcessor::new(store.clone());
        let summary = processor.run(&table, Utc::now()).await;

        assert_eq!(summary.updated, 1);
        let document = store.find_by_chamado_id("1001").await.unwrap().unwrap();
        assert_eq!(document["comentarios"][0]["texto"], "comentado");
    }

    #[tokio::test]
    async fn test_rerun_with_same_timestamp_changes_nothing() {
        let store = Arc::new(InMemoryInteractionStore::new());
        store.insert_document("1001", json!({"chamadoId": "1001"}));

        let table = export_table(&[("1001", "comentado")]);
        let processor = RecordUpdateProcessor::new(store);
        let captured_at = Utc::now();

        let first = processor.run(&table, captured_at).await;
        assert_eq!(first.updated, 1);

        let second = processor.run(&table, captured_at).await;
        assert_eq!(second.updated, 0);
        assert_eq!(second.unchanged, 1);
    }
}
