use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::constants::{COMMENT_ENTRY_KIND, NO_COMMENTS_SENTINEL};
use crate::pipeline::table::TableRow;

/// Formatting profile for the flattened comments field.
///
/// The first-pass import quotes each value and separates entries with a
/// blank line; the consolidation pass joins with single newlines and no
/// quotes. Downstream consumers rely on both formats, so they are fixed
/// here rather than configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatStyle {
    pub entry_separator: &'static str,
    pub quote_values: bool,
}

impl FlatStyle {
    pub const fn import() -> Self {
        Self {
            entry_separator: "\n\n",
            quote_values: true,
        }
    }

    pub const fn consolidation() -> Self {
        Self {
            entry_separator: "\n",
            quote_values: false,
        }
    }
}

/// One comment in the shape stored on interacoes documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentEntry {
    pub origem: String,
    pub texto: String,
    pub tipo: String,
    pub data: DateTime<Utc>,
}

/// Flattens one row's comment cells into a single string.
///
/// A cell contributes an entry only when it is present and non-blank after
/// trimming; the column name labels the entry. Rows with nothing usable get
/// the sentinel value.
pub fn merge_flat(row: &TableRow<'_>, comment_columns: &[String], style: FlatStyle) -> String {
    let mut entries = Vec::new();
    for column in comment_columns {
        if let Some(value) = row.get(column) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            if style.quote_values {
                entries.push(format!("{column}: \"{trimmed}\""));
            } else {
                entries.push(format!("{column}: {trimmed}"));
            }
        }
    }

    if entries.is_empty() {
        NO_COMMENTS_SENTINEL.to_string()
    } else {
        entries.join(style.entry_separator)
    }
}

/// Structured variant of `merge_flat` for the record-update pipeline. Same
/// emission rule, no sentinel: an empty result means "nothing to update".
pub fn extract_entries(
    row: &TableRow<'_>,
    comment_columns: &[String],
    captured_at: DateTime<Utc>,
) -> Vec<CommentEntry> {
    let mut entries = Vec::new();
    for column in comment_columns {
        if let Some(value) = row.get(column) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            entries.push(CommentEntry {
                origem: column.clone(),
                texto: trimmed.to_string(),
                tipo: COMMENT_ENTRY_KIND.to_string(),
                data: captured_at,
            });
        }
    }
    entries
}

/// Counts present comment cells, blank or not. This feeds
/// `quantidade_comentarios` and uses a weaker predicate than the merge, so
/// the count can exceed the number of merged entries for the same row.
pub fn count_non_null(row: &TableRow<'_>, comment_columns: &[String]) -> usize {
    comment_columns
        .iter()
        .filter(|column| row.get(column).is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::table::Table;

    fn comment_table(cells: Vec<Option<String>>) -> Table {
        let columns = (1..=cells.len())
            .map(|i| format!("Comentario{i}"))
            .collect();
        let mut table = Table::new(columns);
        table.push_row(cells);
        table
    }

    fn cell(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_merge_trims_and_skips_blank_cells() {
        let table = comment_table(vec![cell("  a  "), cell(""), None]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();

        let merged = merge_flat(&row, &columns, FlatStyle::import());
        assert_eq!(merged, "Comentario1: \"a\"");
    }

    #[test]
    fn test_merge_import_style_quotes_and_blank_line_separator() {
        let table = comment_table(vec![cell("primeiro"), cell("segundo")]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();

        let merged = merge_flat(&row, &columns, FlatStyle::import());
        assert_eq!(
            merged,
            "Comentario1: \"primeiro\"\n\nComentario2: \"segundo\""
        );
    }

    #[test]
    fn test_merge_consolidation_style_unquoted_single_newline() {
        let table = comment_table(vec![cell("primeiro"), cell("segundo")]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();

        let merged = merge_flat(&row, &columns, FlatStyle::consolidation());
        assert_eq!(merged, "Comentario1: primeiro\nComentario2: segundo");
    }

    #[test]
    fn test_merge_sentinel_when_nothing_usable() {
        let table = comment_table(vec![None, cell("   ")]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();

        let merged = merge_flat(&row, &columns, FlatStyle::consolidation());
        assert_eq!(merged, NO_COMMENTS_SENTINEL);
    }

    #[test]
    fn test_merge_with_no_comment_columns_yields_sentinel() {
        let table = comment_table(vec![cell("ignored")]);
        let row = table.rows().next().unwrap();

        let merged = merge_flat(&row, &[], FlatStyle::import());
        assert_eq!(merged, NO_COMMENTS_SENTINEL);
    }

    #[test]
    fn test_extract_entries_keeps_order_and_fields() {
        let table = comment_table(vec![cell(" resolvido "), None, cell("fechado")]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();
        let captured_at = Utc::now();

        let entries = extract_entries(&row, &columns, captured_at);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].origem, "Comentario1");
        assert_eq!(entries[0].texto, "resolvido");
        assert_eq!(entries[0].tipo, COMMENT_ENTRY_KIND);
        assert_eq!(entries[0].data, captured_at);

        assert_eq!(entries[1].origem, "Comentario3");
        assert_eq!(entries[1].texto, "fechado");
    }

    #[test]
    fn test_extract_entries_empty_when_all_blank() {
        let table = comment_table(vec![None, cell("  ")]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();

        let entries = extract_entries(&row, &columns, Utc::now());
        assert!(entries.is_empty());
    }

    #[test]
    fn test_count_uses_null_check_only() {
        // A whitespace-only cell counts but never emits: the published count
        // and the merged string intentionally follow different predicates.
        let table = comment_table(vec![cell("  "), None, cell("texto")]);
        let columns = table.columns().to_vec();
        let row = table.rows().next().unwrap();

        assert_eq!(count_non_null(&row, &columns), 2);

        let merged = merge_flat(&row, &columns, FlatStyle::consolidation());
        assert_eq!(merged, "Comentario3: texto");
    }
}
