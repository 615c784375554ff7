use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::common::constants::{
    COMMENTS_COLUMN, COMMENT_COUNT_COLUMN, CONSOLIDATE_OUTPUT_PREFIX, IMPORT_OUTPUT_PREFIX,
    INPUT_DELIMITER, OUTPUT_DELIMITER,
};
use crate::common::error::Result;
use crate::config::Config;
use crate::pipeline::classify::classify_columns;
use crate::pipeline::merge::{count_non_null, merge_flat, FlatStyle};
use crate::pipeline::processor::RecordUpdateProcessor;
use crate::pipeline::schema::map_to_canonical;
use crate::pipeline::storage::InteractionStore;
use crate::pipeline::table::{read_table, unique_artifact_path, write_table};

/// Wire envelope shared by the HTTP handlers and the CLI. Field names and
/// messages are the contract the existing frontend consumes, so they stay
/// in Portuguese.
#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_atualizados: Option<usize>,
}

impl OperationResponse {
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            file: None,
            total_atualizados: None,
        }
    }

    pub fn failure(message: String) -> Self {
        Self {
            success: false,
            message,
            file: None,
            total_atualizados: None,
        }
    }

    pub fn with_file(mut self, file: &Path) -> Self {
        self.file = Some(file.to_string_lossy().to_string());
        self
    }
}

/// First-pass import: merges the comment columns into one quoted field and
/// writes the canonical eight-column artifact. Errors come back as a
/// failure envelope, never as a panic or a raw error.
#[instrument(skip(config))]
pub async fn import_file(path: &Path, config: &Config) -> OperationResponse {
    match run_import(path, config) {
        Ok(output) => {
            info!("Import artifact written to {}", output.display());
            OperationResponse::ok("Arquivo processado com sucesso").with_file(&output)
        }
        Err(e) => OperationResponse::failure(format!("Erro ao processar arquivo: {e}")),
    }
}

fn run_import(path: &Path, config: &Config) -> Result<PathBuf> {
    let mut table = read_table(path, INPUT_DELIMITER)?;
    let partition = classify_columns(table.columns());

    // With no comment columns at all this still fills every row with the
    // sentinel, matching the merge of an all-empty comment set
    let merged: Vec<Option<String>> = table
        .rows()
        .map(|row| Some(merge_flat(&row, &partition.comment_columns, FlatStyle::import())))
        .collect();
    table.set_column(COMMENTS_COLUMN, merged);

    let canonical = map_to_canonical(&table, false)?;

    let output = unique_artifact_path(&config.upload_dir, IMPORT_OUTPUT_PREFIX);
    write_table(&canonical, &output)?;
    Ok(output)
}

/// Second pass over an imported artifact: re-flattens the comment columns
/// without quoting and adds the per-row comment count.
#[instrument(skip(config))]
pub async fn consolidate_file(path: &Path, config: &Config) -> OperationResponse {
    match run_consolidate(path, config) {
        Ok(output) => {
            info!("Consolidation artifact written to {}", output.display());
            OperationResponse::ok("Comentários consolidados com sucesso").with_file(&output)
        }
        Err(e) => OperationResponse::failure(format!("Erro ao consolidar comentários: {e}")),
    }
}

fn run_consolidate(path: &Path, config: &Config) -> Result<PathBuf> {
    let mut table = read_table(path, OUTPUT_DELIMITER)?;
    let partition = classify_columns(table.columns());

    let merged: Vec<Option<String>> = table
        .rows()
        .map(|row| {
            Some(merge_flat(
                &row,
                &partition.comment_columns,
                FlatStyle::consolidation(),
            ))
        })
        .collect();
    let counts: Vec<Option<String>> = table
        .rows()
        .map(|row| Some(count_non_null(&row, &partition.comment_columns).to_string()))
        .collect();

    table.set_column(COMMENTS_COLUMN, merged);
    table.set_column(COMMENT_COUNT_COLUMN, counts);

    let canonical = map_to_canonical(&table, true)?;

    let output = unique_artifact_path(&config.upload_dir, CONSOLIDATE_OUTPUT_PREFIX);
    write_table(&canonical, &output)?;
    Ok(output)
}

/// Record-update run: consolidated comments are pushed onto existing
/// interacoes documents. Row-level problems are absorbed into the summary;
/// only a failure to read the file fails the operation.
#[instrument(skip(store))]
pub async fn process_file(path: &Path, store: Arc<dyn InteractionStore>) -> OperationResponse {
    let table = match read_table(path, INPUT_DELIMITER) {
        Ok(table) => table,
        Err(e) => return OperationResponse::failure(format!("Erro ao processar arquivo: {e}")),
    };

    let processor = RecordUpdateProcessor::new(store);
    let summary = processor.run(&table, Utc::now()).await;

    let mut response = OperationResponse::ok("Arquivo processado com sucesso");
    response.total_atualizados = Some(summary.updated);
    response
}
