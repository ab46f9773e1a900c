//! # pmoserver - Serveur web haut niveau basé sur Axum
//!
//! Cette crate fournit une abstraction simple et ergonomique pour créer des serveurs HTTP
//! avec Axum, utilisée par PMOFiles pour exposer l'arborescence partagée.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **API de haut niveau** : Interface simple pour créer des serveurs HTTP avec Axum
//! - 📁 **Fichiers statiques** : Fichiers embarqués (`RustEmbed`) ou répertoires du disque
//! - 📚 **Documentation OpenAPI** : Génération automatique de Swagger UI
//! - 🔒 **HTTPS** : Support rustls via `axum-server`
//! - 📝 **Logs** : Initialisation de `tracing` et réglage du niveau à chaud
//! - ⚡ **Arrêt gracieux** : Gestion propre de l'arrêt sur Ctrl+C
//!
//! ## Architecture
//!
//! - [`server`] : Implémentation du serveur principal et du builder
//! - [`logs`] : Initialisation du logging et API `/api/logs/log_setup`
//!
//! Les crates métier étendent [`Server`] par des traits d'extension
//! (ex: `pmofiles::FileServerExt`) sans que `pmoserver` les connaisse.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use pmoserver::{ServerBuilder, logs::LoggingOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("MyServer", "0.0.0.0", 8080).build();
//!     server.init_logging(LoggingOptions::default()).await;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod logs;
pub mod server;

pub use logs::{LogState, LoggingOptions};
pub use server::{Server, ServerBuilder, ServerInfo};
