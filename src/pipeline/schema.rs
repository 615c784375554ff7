use crate::common::constants::{COMMENTS_COLUMN, COMMENT_COUNT_COLUMN};
use crate::common::error::Result;
use crate::pipeline::table::Table;

/// One entry of the source-to-canonical rename table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenameRule {
    pub source: &'static str,
    pub target: &'static str,
}

/// Tracker export columns and their canonical output names. Matching is
/// exact and case-sensitive; schema changes happen here, not at call sites.
pub const RENAME_RULES: &[RenameRule] = &[
    RenameRule {
        source: "Resumo",
        target: "titulo",
    },
    RenameRule {
        source: "ID da item",
        target: "id_importado",
    },
    RenameRule {
        source: "Status",
        target: "status",
    },
    RenameRule {
        source: "Criado",
        target: "data_abertura",
    },
    RenameRule {
        source: "Categoria do status alterada",
        target: "ultima_atualizacao",
    },
    RenameRule {
        source: "Responsável",
        target: "responsavel",
    },
    RenameRule {
        source: "Descrição",
        target: "mensagem",
    },
];

/// Canonical column order for output artifacts. The count column slots in
/// right before the comments on consolidation output only.
pub fn canonical_layout(with_count: bool) -> Vec<&'static str> {
    let mut layout = vec![
        "titulo",
        "id_importado",
        "status",
        "data_abertura",
        "ultima_atualizacao",
        "responsavel",
        "mensagem",
    ];
    if with_count {
        layout.push(COMMENT_COUNT_COLUMN);
    }
    layout.push(COMMENTS_COLUMN);
    layout
}

/// Renames known source columns and reorders the table into the canonical
/// layout, dropping everything else. A canonical column still missing after
/// renaming fails the whole file; nothing is fabricated in its place.
pub fn map_to_canonical(table: &Table, with_count: bool) -> Result<Table> {
    let mut renamed = table.clone();
    renamed.rename_columns(|name| {
        RENAME_RULES
            .iter()
            .find(|rule| rule.source == name)
            .map(|rule| rule.target.to_string())
    });
    renamed.select(&canonical_layout(with_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ImportError;
    use crate::pipeline::classify::classify_columns;

    fn export_table() -> Table {
        let mut table = Table::new(
            [
                "Resumo",
                "ID da item",
                "Status",
                "Criado",
                "Categoria do status alterada",
                "Responsável",
                "Descrição",
                "Coluna extra",
                "comentarios",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        );
        table.push_row(
            [
                "Impressora parada",
                "1001",
                "Aberto",
                "2024-05-01",
                "2024-05-02",
                "João",
                "Sem rede no setor",
                "descartar",
                "Comentar: \"ok\"",
            ]
            .iter()
            .map(|c| Some(c.to_string()))
            .collect(),
        );
        table
    }

    #[test]
    fn test_map_renames_reorders_and_drops_extras() {
        let mapped = map_to_canonical(&export_table(), false).unwrap();

        let columns: Vec<&str> = mapped.columns().iter().map(|c| c.as_str()).collect();
        assert_eq!(
            columns,
            vec![
                "titulo",
                "id_importado",
                "status",
                "data_abertura",
                "ultima_atualizacao",
                "responsavel",
                "mensagem",
                "comentarios",
            ]
        );

        let row = mapped.rows().next().unwrap();
        assert_eq!(row.get("titulo"), Some("Impressora parada"));
        assert_eq!(row.get("id_importado"), Some("1001"));
        assert_eq!(row.get("mensagem"), Some("Sem rede no setor"));
        assert_eq!(row.get("Coluna extra"), None);
    }

    #[test]
    fn test_map_with_count_places_count_before_comments() {
        let mut table = export_table();
        let count_values = vec![Some("2".to_string())];
        table.set_column(COMMENT_COUNT_COLUMN, count_values);

        let mapped = map_to_canonical(&table, true).unwrap();
        let columns: Vec<&str> = mapped.columns().iter().map(|c| c.as_str()).collect();
        assert_eq!(columns[7], COMMENT_COUNT_COLUMN);
        assert_eq!(columns[8], COMMENTS_COLUMN);
    }

    #[test]
    fn test_map_accepts_already_canonical_header() {
        let mut table = Table::new(
            canonical_layout(false)
                .iter()
                .map(|c| c.to_string())
                .collect(),
        );
        table.push_row(vec![None; 8]);

        let mapped = map_to_canonical(&table, false).unwrap();
        assert_eq!(mapped.columns(), table.columns());
    }

    #[test]
    fn test_map_missing_required_column_fails() {
        let mut table = export_table();
        // Drop the assignee column by selecting everything else
        let keep: Vec<&str> = table
            .columns()
            .iter()
            .map(|c| c.as_str())
            .filter(|c| *c != "Responsável")
            .collect();
        table = table.select(&keep).unwrap();

        let err = map_to_canonical(&table, false).unwrap_err();
        match err {
            ImportError::Schema { column } => assert_eq!(column, "responsavel"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mapped_output_has_no_comment_columns_left() {
        let mapped = map_to_canonical(&export_table(), false).unwrap();
        let partition = classify_columns(mapped.columns());
        assert!(partition.comment_columns.is_empty());
    }
}
