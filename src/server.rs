use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use hyper::Server;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, warn};
use uuid::Uuid;

use crate::common::constants::SCRATCH_PREFIX;
use crate::config::Config;
use crate::pipeline::storage::InteractionStore;
use crate::pipeline::tasks::{consolidate_file, import_file, process_file, OperationResponse};

/// Upload size cap; ticket exports are small, this leaves ample headroom.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// How strict a route is about upload filenames.
#[derive(Clone, Copy)]
enum NamePolicy {
    /// A `.csv` extension is required.
    CsvOnly,
    /// `.csv` or an extensionless name; the record-update route has always
    /// accepted exports saved without an extension.
    CsvOrBare,
}

fn name_allowed(filename: &str, policy: NamePolicy) -> bool {
    let lower = filename.to_lowercase();
    match policy {
        NamePolicy::CsvOnly => lower
            .rsplit_once('.')
            .map(|(_, extension)| extension == "csv")
            .unwrap_or(false),
        NamePolicy::CsvOrBare => lower.ends_with(".csv") || !lower.contains('.'),
    }
}

/// Scratch copy of an upload. The file is removed again when this drops, so
/// every handler exit path cleans up after itself.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn write(dir: &Path, bytes: &[u8]) -> std::io::Result<Self> {
        let path = dir.join(format!("{SCRATCH_PREFIX}{}.csv", Uuid::new_v4().simple()));
        std::fs::write(&path, bytes)?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove scratch file {}: {}", self.path.display(), e);
        }
    }
}

fn reject(message: &str) -> (StatusCode, Json<OperationResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(OperationResponse::failure(message.to_string())),
    )
}

/// Pulls the `file` part out of the form and stores it under a scratch
/// name. A form the route cannot accept comes back as the 400 envelope.
async fn receive_upload(
    config: &Config,
    mut multipart: Multipart,
    policy: NamePolicy,
    bad_type_message: &str,
) -> Result<ScratchFile, (StatusCode, Json<OperationResponse>)> {
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!("Malformed multipart request: {}", e);
                return Err(reject("Nenhum arquivo enviado"));
            }
        };
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("").to_string();
            let bytes = match field.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read upload body: {}", e);
                    return Err(reject("Nenhum arquivo enviado"));
                }
            };
            upload = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) = match upload {
        Some(upload) => upload,
        None => return Err(reject("Nenhum arquivo enviado")),
    };

    if filename.is_empty() {
        return Err(reject("Nenhum arquivo selecionado"));
    }
    if !name_allowed(&filename, policy) {
        return Err(reject(bad_type_message));
    }

    ScratchFile::write(&config.upload_dir, &bytes).map_err(|e| {
        error!("Failed to persist upload: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(OperationResponse::failure(format!(
                "Erro ao processar arquivo: {e}"
            ))),
        )
    })
}

fn respond(response: OperationResponse) -> Response {
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (status, Json(response)).into_response()
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "chamados-importer",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn handle_import(config: Arc<Config>, multipart: Multipart) -> Response {
    let scratch = match receive_upload(
        &config,
        multipart,
        NamePolicy::CsvOnly,
        "Tipo de arquivo não permitido",
    )
    .await
    {
        Ok(scratch) => scratch,
        Err(rejection) => return rejection.into_response(),
    };

    respond(import_file(scratch.path(), &config).await)
}

async fn handle_consolidate(config: Arc<Config>, multipart: Multipart) -> Response {
    let scratch = match receive_upload(
        &config,
        multipart,
        NamePolicy::CsvOnly,
        "Tipo de arquivo não permitido",
    )
    .await
    {
        Ok(scratch) => scratch,
        Err(rejection) => return rejection.into_response(),
    };

    respond(consolidate_file(scratch.path(), &config).await)
}

async fn handle_process(
    config: Arc<Config>,
    store: Arc<dyn InteractionStore>,
    multipart: Multipart,
) -> Response {
    let scratch = match receive_upload(
        &config,
        multipart,
        NamePolicy::CsvOrBare,
        "Apenas arquivos CSV são permitidos",
    )
    .await
    {
        Ok(scratch) => scratch,
        Err(rejection) => return rejection.into_response(),
    };

    respond(process_file(scratch.path(), store).await)
}

/// Create the HTTP server with the upload routes
pub fn create_server(config: Arc<Config>, store: Arc<dyn InteractionStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/importar",
            post({
                let config = config.clone();
                move |multipart: Multipart| {
                    let config = config.clone();
                    async move { handle_import(config, multipart).await }
                }
            }),
        )
        .route(
            "/consolidar",
            post({
                let config = config.clone();
                move |multipart: Multipart| {
                    let config = config.clone();
                    async move { handle_consolidate(config, multipart).await }
                }
            }),
        )
        .route(
            "/processar",
            post({
                let config = config.clone();
                let store = store.clone();
                move |multipart: Multipart| {
                    let config = config.clone();
                    let store = store.clone();
                    async move { handle_process(config, store, multipart).await }
                }
            }),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the configured port
pub async fn start_server(
    config: Arc<Config>,
    store: Arc<dyn InteractionStore>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.ensure_upload_dir()?;

    let port = config.port;
    let app = create_server(config, store);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("🚀 HTTP server running on http://localhost:{port}");
    println!("💚 Health check: http://localhost:{port}/health");
    println!("📥 Import:      POST http://localhost:{port}/importar");
    println!("🧵 Consolidate: POST http://localhost:{port}/consolidar");
    println!("📤 Process:     POST http://localhost:{port}/processar");

    Server::bind(&addr).serve(app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_only_name_policy() {
        assert!(name_allowed("chamados.csv", NamePolicy::CsvOnly));
        assert!(name_allowed("CHAMADOS.CSV", NamePolicy::CsvOnly));
        assert!(name_allowed("export.2024.csv", NamePolicy::CsvOnly));
        assert!(!name_allowed("chamados.xlsx", NamePolicy::CsvOnly));
        assert!(!name_allowed("chamados", NamePolicy::CsvOnly));
        assert!(!name_allowed("chamados.csv.exe", NamePolicy::CsvOnly));
    }

    #[test]
    fn test_csv_or_bare_name_policy() {
        assert!(name_allowed("chamados.csv", NamePolicy::CsvOrBare));
        assert!(name_allowed("chamados", NamePolicy::CsvOrBare));
        assert!(!name_allowed("chamados.xlsx", NamePolicy::CsvOrBare));
    }
}
