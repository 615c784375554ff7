use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::warn;

use chamados_importer::config::Config;
use chamados_importer::logging;
use chamados_importer::pipeline::storage::{InMemoryInteractionStore, InteractionStore};
use chamados_importer::pipeline::tasks::{
    consolidate_file, import_file, process_file, OperationResponse,
};
use chamados_importer::server;

#[derive(Parser)]
#[command(name = "chamados_importer")]
#[command(about = "Support ticket CSV import and comment consolidation")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP upload server
    Serve {
        /// Port to listen on (overrides CHAMADOS_PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Consolidate comment columns of a raw export into one file
    Import {
        /// Path to the raw CSV export
        #[arg(long)]
        file: PathBuf,
    },
    /// Re-consolidate an already imported file, adding the comment count
    Consolidate {
        /// Path to the imported CSV
        #[arg(long)]
        file: PathBuf,
    },
    /// Push comments from an export into the interacoes store
    Process {
        /// Path to the raw CSV export
        #[arg(long)]
        file: PathBuf,
    },
}

#[cfg(feature = "db")]
async fn create_store(
    config: &Config,
) -> Result<Arc<dyn InteractionStore>, Box<dyn std::error::Error>> {
    use chamados_importer::pipeline::storage::LibsqlInteractionStore;

    if std::env::var("LIBSQL_URL").is_ok() {
        tracing::info!("Using libsql interacoes store");
        let store = LibsqlInteractionStore::connect(&config.interacoes_table).await?;
        Ok(Arc::new(store))
    } else {
        warn!("LIBSQL_URL not set, falling back to in-memory interacoes store");
        Ok(Arc::new(InMemoryInteractionStore::new()))
    }
}

#[cfg(not(feature = "db"))]
async fn create_store(
    _config: &Config,
) -> Result<Arc<dyn InteractionStore>, Box<dyn std::error::Error>> {
    warn!("Built without the db feature, using in-memory interacoes store");
    Ok(Arc::new(InMemoryInteractionStore::new()))
}

fn print_response(response: &OperationResponse) {
    let body =
        serde_json::to_string_pretty(response).unwrap_or_else(|_| response.message.clone());
    if response.success {
        println!("✅ {body}");
    } else {
        println!("❌ {body}");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();

    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { port } => {
            let mut config = config;
            if let Some(port) = port {
                config.port = port;
            }

            println!("🌐 Starting chamados import server...");
            let config = Arc::new(config);
            let store = create_store(&config).await?;
            server::start_server(config, store).await?;
        }
        Commands::Import { file } => {
            config.ensure_upload_dir()?;

            println!("📥 Importing {}...", file.display());
            let response = import_file(&file, &config).await;
            print_response(&response);
        }
        Commands::Consolidate { file } => {
            config.ensure_upload_dir()?;

            println!("🧵 Consolidating comments from {}...", file.display());
            let response = consolidate_file(&file, &config).await;
            print_response(&response);
        }
        Commands::Process { file } => {
            println!("📤 Processing record updates from {}...", file.display());
            let store = create_store(&config).await?;
            let response = process_file(&file, store).await;
            print_response(&response);
        }
    }
    Ok(())
}
