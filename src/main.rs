use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tower_lsp::{LspService, Server};
use tracing::info;

use appconfig_language_server::logging::init_logger;
use appconfig_language_server::lsp::Backend;
use appconfig_language_server::metadata;
use appconfig_language_server::session::ProjectSession;

/// Language server for schema-checked application configuration files
/// (YAML and `.properties`).
#[derive(Debug, Parser)]
#[command(name = "appconfig-language-server", version, about)]
struct Args {
    /// Communicate over stdio (the default transport)
    #[arg(long)]
    stdio: bool,

    /// Listen for a single client connection on --port instead of stdio
    #[arg(long)]
    tcp: bool,

    /// Port for --tcp mode
    #[arg(long, default_value_t = 9257)]
    port: u16,

    /// Path to the property metadata document; watched for changes
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Override the stderr log level (otherwise RUST_LOG or "info")
    #[arg(long)]
    log_level: Option<String>,

    /// Disable ANSI colors in stderr output
    #[arg(long)]
    no_color: bool,

    /// Also write a DEBUG session log to the user cache directory
    #[arg(long)]
    file_log: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _guard = init_logger(args.no_color, args.log_level.as_deref(), args.file_log)
        .context("failed to initialize logging")?;

    let session = match &args.metadata {
        Some(path) => metadata::load_file(path)
            .with_context(|| format!("failed to load metadata from {}", path.display()))?,
        None => {
            info!("no --metadata given; starting with an empty property index");
            ProjectSession::empty()
        }
    };

    let metadata_path = args.metadata.clone();
    let (service, socket) =
        LspService::new(move |client| Backend::new(client, session, metadata_path));

    if args.tcp {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", args.port))
            .await
            .with_context(|| format!("failed to bind 127.0.0.1:{}", args.port))?;
        info!("listening on 127.0.0.1:{}", args.port);
        let (stream, peer) = listener
            .accept()
            .await
            .context("failed to accept client connection")?;
        info!("client connected from {}", peer);
        let (read, write) = tokio::io::split(stream);
        Server::new(read, write, socket).serve(service).await;
    } else {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        Server::new(stdin, stdout, socket).serve(service).await;
    }

    Ok(())
}
