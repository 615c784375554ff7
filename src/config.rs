use std::env;
use std::fs;
use std::path::PathBuf;

use crate::common::error::{ImportError, Result};

const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_PORT: u16 = 8002;
const DEFAULT_INTERACOES_TABLE: &str = "interacoes";

/// Runtime configuration, read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Scratch and artifact directory. Uploads land here and output
    /// artifacts are written next to them.
    pub upload_dir: PathBuf,
    /// HTTP port for `serve`.
    pub port: u16,
    /// Collection identity of the interacoes store.
    pub interacoes_table: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let upload_dir = PathBuf::from(
            env::var("CHAMADOS_UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string()),
        );

        let port = match env::var("CHAMADOS_PORT") {
            Ok(raw) => raw.parse().map_err(|_| {
                ImportError::Config(format!("invalid CHAMADOS_PORT value '{raw}'"))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let interacoes_table = env::var("CHAMADOS_INTERACOES_TABLE")
            .unwrap_or_else(|_| DEFAULT_INTERACOES_TABLE.to_string());

        Ok(Self {
            upload_dir,
            port,
            interacoes_table,
        })
    }

    /// Creates the upload directory when missing.
    pub fn ensure_upload_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir)?;
        Ok(())
    }
}
