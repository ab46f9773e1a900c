//! PMOFiles - serveur HTTP de fichiers audio en lecture seule

use anyhow::{Context, Result};
use clap::Parser;
use pmoconfig::{Config, TlsFiles};
use pmofiles::{FileServerConfigExt, FileServerExt, Root};
use pmoserver::{LoggingOptions, ServerBuilder};
use std::path::PathBuf;
use tracing::info;

/// PMOFiles - navigation, écoute et téléchargement d'une arborescence musicale
#[derive(Parser, Debug)]
#[command(name = "PMOFiles")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Répertoire de configuration (contient config.yaml)
    #[arg(short, long, value_name = "DIR")]
    config: Option<String>,

    /// Répertoire partagé (remplace host.root_directory)
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Adresse d'écoute (remplace host.bind)
    #[arg(short, long)]
    bind: Option<String>,

    /// Port HTTP (remplace host.http_port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Certificat PEM pour HTTPS
    #[arg(long, value_name = "FILE", requires = "key")]
    cert: Option<PathBuf>,

    /// Clé privée PEM pour HTTPS
    #[arg(long, value_name = "FILE", requires = "cert")]
    key: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_config(cli.config.as_deref().unwrap_or(""))
        .context("Unable to load configuration")?;

    // Les options de la ligne de commande valent pour cette exécution seulement
    let root_dir = match cli.root {
        Some(dir) => dir,
        None => config.get_root_directory()?,
    };
    let root = Root::new(&root_dir)
        .with_context(|| format!("Invalid shared directory {}", root_dir.display()))?;

    let mut builder = ServerBuilder::from_config("PMOFiles", &config)?;
    if let Some(bind) = cli.bind {
        builder = builder.bind(bind);
    }
    if let Some(port) = cli.port {
        builder = builder.port(port);
    }
    if let (Some(cert), Some(key)) = (cli.cert, cli.key) {
        builder = builder.tls(Some(TlsFiles { cert, key }));
    }

    let mut server = builder.build();
    server
        .init_logging(LoggingOptions::from_config(&config))
        .await;

    info!(root = %root.path().display(), "📁 Sharing directory");

    server
        .add_route("/info", || async {
            serde_json::json!({
                "name": "PMOFiles",
                "version": env!("CARGO_PKG_VERSION"),
            })
        })
        .await;

    server
        .init_file_server(
            root,
            config.get_backgrounds()?,
            config.get_backgrounds_dir()?,
        )
        .await?;

    let addr = server.start().await?;
    info!("✅ PMOFiles listening on {} (Ctrl+C to stop)", addr);

    server.wait().await;
    info!("PMOFiles stopped");
    Ok(())
}
