use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::common::constants::{OUTPUT_DELIMITER, UTF8_BOM};
use crate::common::error::{ImportError, Result};

/// An in-memory CSV table: ordered header plus raw string cells.
///
/// A cell is `None` when the source cell was absent (short row) or empty,
/// which keeps "no value" distinct from a present-but-blank value such as a
/// single space. That distinction matters downstream: the comment count and
/// the comment merge apply different predicates to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

/// Borrowed view of one table row with by-name cell access.
#[derive(Debug, Clone, Copy)]
pub struct TableRow<'a> {
    columns: &'a [String],
    cells: &'a [Option<String>],
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first column with this exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Appends a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut cells: Vec<Option<String>>) {
        cells.resize(self.columns.len(), None);
        self.rows.push(cells);
    }

    pub fn rows(&self) -> impl Iterator<Item = TableRow<'_>> {
        self.rows.iter().map(|cells| TableRow {
            columns: &self.columns,
            cells,
        })
    }

    /// Assigns a full column of values. A same-named existing column is
    /// replaced in place; otherwise the column is appended on the right.
    /// Values are padded or truncated to the current row count.
    pub fn set_column(&mut self, name: &str, mut values: Vec<Option<String>>) {
        values.resize(self.rows.len(), None);

        match self.column_index(name) {
            Some(index) => {
                for (cells, value) in self.rows.iter_mut().zip(values) {
                    cells[index] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (cells, value) in self.rows.iter_mut().zip(values) {
                    cells.push(value);
                }
            }
        }
    }

    /// Renames columns through the given mapping; names the mapping returns
    /// `None` for are left untouched.
    pub fn rename_columns<F>(&mut self, mut rename: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for column in &mut self.columns {
            if let Some(new_name) = rename(column) {
                *column = new_name;
            }
        }
    }

    /// Projects the table onto the named columns, in the given order,
    /// dropping everything else. The first occurrence wins when a name is
    /// duplicated. A missing column fails the whole table.
    pub fn select(&self, wanted: &[&str]) -> Result<Table> {
        let mut indices = Vec::with_capacity(wanted.len());
        for name in wanted {
            let index = self
                .column_index(name)
                .ok_or_else(|| ImportError::Schema {
                    column: (*name).to_string(),
                })?;
            indices.push(index);
        }

        let columns = wanted.iter().map(|n| (*n).to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|cells| indices.iter().map(|&i| cells[i].clone()).collect())
            .collect();

        Ok(Table { columns, rows })
    }
}

impl<'a> TableRow<'a> {
    /// Cell value by column name; `None` when the column is missing or the
    /// cell holds no value.
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.cells[index].as_deref()
    }

    pub fn cells(&self) -> &'a [Option<String>] {
        self.cells
    }
}

/// Reads a CSV file into a `Table`, stripping a leading UTF-8 BOM when
/// present. Duplicated header names get numeric suffixes so every physical
/// column stays addressable. Rows shorter than the header are padded with
/// nulls; rows wider than the header fail the whole file. Empty cells load
/// as nulls.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table> {
    let mut raw = Vec::new();
    File::open(path)?.read_to_end(&mut raw)?;
    let content = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(content);

    let headers = reader.headers()?;
    if headers.is_empty() {
        return Err(ImportError::EmptyFile);
    }
    let columns = dedup_columns(headers.iter().map(|h| h.to_string()).collect());

    let mut table = Table::new(columns);
    for record in reader.records() {
        let record = record?;
        if record.len() > table.columns().len() {
            return Err(ImportError::RowWidth {
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: table.columns().len(),
                found: record.len(),
            });
        }
        let cells = (0..table.columns().len())
            .map(|i| match record.get(i) {
                Some("") | None => None,
                Some(value) => Some(value.to_string()),
            })
            .collect();
        table.push_row(cells);
    }

    Ok(table)
}

/// Disambiguates repeated header names with numeric suffixes: `Comentar`,
/// `Comentar.1`, `Comentar.2`. Tracker exports repeat the comment header
/// verbatim, and each physical column must keep its own cell reachable
/// through `TableRow::get`. Suffixes already taken by the header are
/// skipped.
fn dedup_columns(names: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(names.len());

    for name in names {
        let mut column = name;
        let mut seen = counts.get(&column).copied().unwrap_or(0);
        while seen > 0 {
            counts.insert(column.clone(), seen + 1);
            column = format!("{column}.{seen}");
            seen = counts.get(&column).copied().unwrap_or(0);
        }
        counts.insert(column.clone(), seen + 1);
        columns.push(column);
    }

    columns
}

/// Writes a table as semicolon-delimited CSV prefixed with a UTF-8 BOM, the
/// artifact format the downstream spreadsheet tooling expects. Null cells
/// are written as empty fields.
pub fn write_table(table: &Table, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(OUTPUT_DELIMITER)
        .from_writer(file);

    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.cells().iter().map(|c| c.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;

    Ok(())
}

/// Unique output path for an artifact: `<prefix><uuid-hex>.csv` under `dir`.
pub fn unique_artifact_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(format!("{prefix}{}.csv", Uuid::new_v4().simple()))
}
