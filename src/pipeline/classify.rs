use crate::common::constants::COMMENT_COLUMN_PREFIX;

/// A header split into comment columns and everything else. Both sides keep
/// their source order, are disjoint, and together cover the input exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPartition {
    pub comment_columns: Vec<String>,
    pub other_columns: Vec<String>,
}

/// Partitions column names on the comment prefix.
///
/// Matching is case-sensitive: exports title these columns "Comentar..."
/// with arbitrary suffixes, and no canonical column starts with the prefix.
pub fn classify_columns(columns: &[String]) -> ColumnPartition {
    let (comment_columns, other_columns) = columns
        .iter()
        .cloned()
        .partition(|column| column.starts_with(COMMENT_COLUMN_PREFIX));

    ColumnPartition {
        comment_columns,
        other_columns,
    }
}
