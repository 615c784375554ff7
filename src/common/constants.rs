//! Column and format constants shared by the import and consolidation
//! pipelines. The source column names are exact and case-sensitive because
//! they come straight from the upstream tracker's export headers.

// Comment columns are matched by prefix: exports number them freely
// ("Comentar", "Comentario 2", ...) so the set is discovered per file.
pub const COMMENT_COLUMN_PREFIX: &str = "Comentar";

// Written when a row has no usable comment at all
pub const NO_COMMENTS_SENTINEL: &str = "Sem comentários";

// Derived output columns
pub const COMMENTS_COLUMN: &str = "comentarios";
pub const COMMENT_COUNT_COLUMN: &str = "quantidade_comentarios";

// Source column holding the imported ticket id; doubles as the lookup key
// against the interacoes store
pub const ID_COLUMN: &str = "ID da item";

// Fields patched onto interacoes documents
pub const DOC_COMMENTS_FIELD: &str = "comentarios";
pub const DOC_UPDATED_FIELD: &str = "atualizado_em";
pub const COMMENT_ENTRY_KIND: &str = "comentario";

// Output artifact and scratch-file name prefixes
pub const IMPORT_OUTPUT_PREFIX: &str = "chamados_completos_";
pub const CONSOLIDATE_OUTPUT_PREFIX: &str = "chamados_consolidados_";
pub const SCRATCH_PREFIX: &str = "temp_";

// Exports arrive comma-separated UTF-8; artifacts go out semicolon-separated
// with a UTF-8 BOM so spreadsheet tools pick the encoding up correctly
pub const INPUT_DELIMITER: u8 = b',';
pub const OUTPUT_DELIMITER: u8 = b';';
pub const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";
