//! # Module Server - API de haut niveau pour Axum
//!
//! Ce module fournit une abstraction simple et ergonomique pour créer des serveurs HTTP
//! avec Axum, en cachant la complexité de la configuration et du routage.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **Routes JSON simples** : Ajoutez des endpoints API avec `add_route()`
//! - 📁 **Fichiers embarqués** : Servez des assets avec `add_dir()`
//! - 🗂️ **Répertoires disque** : Servez un dossier avec `add_static_dir()`
//! - 🧩 **Sous-routers** : Montez un router complet avec `add_router()`
//! - 📚 **Documentation API** : OpenAPI/Swagger automatique avec `add_openapi()`
//! - 🔒 **HTTPS optionnel** : certificat et clé PEM via rustls
//! - ⚡ **Gestion gracieuse** : Arrêt propre sur Ctrl+C

use crate::logs::{LogState, LoggingOptions, LogsApiDoc, create_logs_router, init_logging};
use anyhow::{Result, anyhow};
use axum::routing::get;
use axum::{Json, Router};
use axum_embed::ServeEmbed;
use axum_server::{Handle, tls_rustls::RustlsConfig};
use pmoconfig::{Config, TlsFiles};
use rust_embed::RustEmbed;
use serde::Serialize;
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::{signal, sync::RwLock, task::JoinHandle};
use tower_http::services::ServeDir;
use tracing::{error, info};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Délai laissé aux connexions en cours lors d'un arrêt gracieux
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Info serveur sérialisable
#[derive(Clone, Debug, Serialize, utoipa::ToSchema)]
pub struct ServerInfo {
    pub name: String,
    pub base_url: String,
    pub http_port: u16,
    pub tls: bool,
}

/// Serveur principal
pub struct Server {
    name: String,
    bind: String,
    http_port: u16,
    tls: Option<TlsFiles>,
    router: Arc<RwLock<Router>>,
    handle: Handle,
    join_handle: Option<JoinHandle<()>>,
    log_state: Option<LogState>,
}

impl Server {
    /// Crée une nouvelle instance de serveur
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `bind` - Adresse d'écoute (ex: "0.0.0.0")
    /// * `http_port` - Port HTTP à écouter
    ///
    /// # Exemple
    ///
    /// ```rust
    /// # use pmoserver::Server;
    /// let server = Server::new("MyAPI", "127.0.0.1", 3000);
    /// ```
    pub fn new(name: impl Into<String>, bind: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            bind: bind.into(),
            http_port,
            tls: None,
            router: Arc::new(RwLock::new(Router::new())),
            handle: Handle::new(),
            join_handle: None,
            log_state: None,
        }
    }

    /// Ajoute une route JSON dynamique
    ///
    /// Crée un endpoint qui retourne du JSON. La closure fournie sera appelée
    /// à chaque requête GET sur le chemin spécifié.
    ///
    /// # Exemple
    ///
    /// ```rust,no_run
    /// # use pmoserver::Server;
    /// # #[tokio::main]
    /// # async fn main() {
    /// # let mut server = Server::new("Test", "127.0.0.1", 3000);
    /// server.add_route("/api/status", || async {
    ///     serde_json::json!({
    ///         "status": "online",
    ///         "version": "1.0.0"
    ///     })
    /// }).await;
    /// # }
    /// ```
    pub async fn add_route<F, Fut, T>(&mut self, path: &str, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        let f = Arc::new(f);
        let handler = {
            let f = f.clone();
            move || {
                let f = f.clone();
                async move { Json(f().await) }
            }
        };

        let route = Router::new().route("/", get(handler));

        let mut r = self.router.write().await;
        *r = if path == "/" {
            std::mem::take(&mut *r).merge(route)
        } else {
            std::mem::take(&mut *r).nest(path, route)
        };
    }

    /// Ajoute un répertoire de fichiers embarqués (`RustEmbed`)
    pub async fn add_dir<E>(&mut self, path: &str)
    where
        E: RustEmbed + Clone + Send + Sync + 'static,
    {
        let serve = ServeEmbed::<E>::new();
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest_service(path, serve);
    }

    /// Ajoute un répertoire du disque servi en lecture seule
    ///
    /// Les requêtes `Range` et les en-têtes conditionnels sont gérés par
    /// `tower_http::services::ServeDir`.
    pub async fn add_static_dir(&mut self, path: &str, directory: impl AsRef<Path>) {
        let serve = ServeDir::new(directory.as_ref());
        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest_service(path, serve);
    }

    /// Ajoute une API documentée avec OpenAPI et Swagger UI
    ///
    /// Cette méthode fusionne le `api_router` fourni avec le router principal du serveur.
    /// Chaque appel peut ajouter une nouvelle API distincte, avec sa propre documentation Swagger.
    ///
    /// # Arguments
    ///
    /// * `api_router` - Router Axum contenant les routes API
    /// * `openapi` - Spécification OpenAPI générée par `utoipa`
    /// * `name` - Nom unique pour cette API
    ///
    /// Résultat pour `name = "files"` :
    ///
    /// - les routes sont montées sous `/api/files`
    /// - `/swagger-ui/files` affiche la documentation Swagger
    /// - `/api-docs/files.json` fournit la spécification OpenAPI
    pub async fn add_openapi(
        &mut self,
        api_router: Router,
        openapi: utoipa::openapi::OpenApi,
        name: &str,
    ) {
        let swagger_path = format!("/swagger-ui/{}", name);
        let swagger_path_static: &'static str = Box::leak(swagger_path.into_boxed_str());

        let openapi_json_path = format!("/api-docs/{}.json", name);
        let openapi_json_path_static: &'static str = Box::leak(openapi_json_path.into_boxed_str());

        let swagger = SwaggerUi::new(swagger_path_static).url(openapi_json_path_static, openapi);

        let base_path = format!("/api/{}", name);
        let nested_router = Router::new().nest(&base_path, api_router);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).merge(nested_router).merge(swagger);
    }

    /// Ajoute un sous-router au serveur
    ///
    /// - Si `path` est "/", merge directement au router principal
    /// - Sinon, nest le router sous le chemin donné
    pub async fn add_router(&mut self, path: &str, sub_router: Router) {
        let mut r = self.router.write().await;

        let combined = if path == "/" {
            std::mem::take(&mut *r).merge(sub_router)
        } else {
            let normalized = format!("/{}", path.trim_matches('/'));
            std::mem::take(&mut *r).nest(&normalized, sub_router)
        };

        *r = combined;
    }

    /// Copie du router courant (utile pour les tests via `tower::ServiceExt::oneshot`)
    pub async fn router(&self) -> Router {
        self.router.read().await.clone()
    }

    /// Démarre le serveur HTTP(S)
    ///
    /// Lance le serveur sur l'adresse configurée et met en place la gestion
    /// de Ctrl+C pour un arrêt gracieux. Retourne l'adresse effectivement
    /// écoutée (utile avec le port 0).
    pub async fn start(&mut self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| anyhow!("Invalid bind address '{}': {}", self.bind, e))?;
        let addr = SocketAddr::new(ip, self.http_port);

        let tls = match &self.tls {
            Some(files) => Some(RustlsConfig::from_pem_file(&files.cert, &files.key).await?),
            None => None,
        };

        let router = self.router.read().await.clone();
        let service = router.into_make_service();
        let server_handle = self.handle.clone();
        let server_task = tokio::spawn(async move {
            let result = match tls {
                Some(config) => {
                    axum_server::bind_rustls(addr, config)
                        .handle(server_handle)
                        .serve(service)
                        .await
                }
                None => {
                    axum_server::bind(addr)
                        .handle(server_handle)
                        .serve(service)
                        .await
                }
            };
            if let Err(e) = result {
                error!("HTTP server stopped with an error: {}", e);
            }
        });

        let local_addr = self
            .handle
            .listening()
            .await
            .ok_or_else(|| anyhow!("Unable to listen on {}", addr))?;

        info!(
            "Server {} running at {}",
            self.name,
            self.base_url_for(local_addr.port())
        );

        let shutdown_handle = self.handle.clone();
        let shutdown_task = tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C: {}", e);
                return;
            }
            info!("Ctrl+C reçu, arrêt gracieux");
            shutdown_handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
        });

        self.join_handle = Some(tokio::spawn(async move {
            let _ = server_task.await;
            shutdown_task.abort();
        }));

        Ok(local_addr)
    }

    /// Demande un arrêt gracieux sans attendre Ctrl+C
    pub fn shutdown(&self) {
        self.handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN_TIMEOUT));
    }

    /// Attend la fin du serveur
    pub async fn wait(&mut self) {
        if let Some(h) = self.join_handle.take() {
            let _ = h.await;
        }
    }

    fn base_url_for(&self, port: u16) -> String {
        let scheme = if self.tls.is_some() { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.bind, port)
    }

    /// Récupère les infos du serveur
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url_for(self.http_port),
            http_port: self.http_port,
            tls: self.tls.is_some(),
        }
    }

    /// Initialise le système de logging et enregistre les routes de logs
    ///
    /// Configure `tracing` avec un filtre de niveau rechargeable et
    /// optionnellement la console, puis enregistre `GET/POST /api/logs/log_setup`.
    pub async fn init_logging(&mut self, options: LoggingOptions) {
        let log_state = init_logging(options);

        self.add_openapi(
            create_logs_router(log_state.clone()),
            LogsApiDoc::openapi(),
            "logs",
        )
        .await;

        self.log_state = Some(log_state);
    }

    /// État du logging, si [`Server::init_logging`] a été appelé
    pub fn log_state(&self) -> Option<&LogState> {
        self.log_state.as_ref()
    }
}

/// Builder pattern
pub struct ServerBuilder {
    name: String,
    bind: String,
    http_port: u16,
    tls: Option<TlsFiles>,
}

impl ServerBuilder {
    /// Crée un nouveau builder
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur
    /// * `bind` - Adresse d'écoute (ex: "0.0.0.0")
    /// * `http_port` - Port HTTP
    pub fn new(name: impl Into<String>, bind: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            bind: bind.into(),
            http_port,
            tls: None,
        }
    }

    /// Crée un builder à partir de la configuration chargée au démarrage
    pub fn from_config(name: impl Into<String>, config: &Config) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            bind: config.get_bind_address(),
            http_port: config.get_http_port(),
            tls: config.get_tls_files()?,
        })
    }

    /// Remplace l'adresse d'écoute
    pub fn bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    /// Remplace le port HTTP
    pub fn port(mut self, http_port: u16) -> Self {
        self.http_port = http_port;
        self
    }

    /// Active HTTPS avec la paire certificat / clé fournie
    pub fn tls(mut self, tls: Option<TlsFiles>) -> Self {
        self.tls = tls;
        self
    }

    /// Construit le serveur
    ///
    /// Consomme le builder et retourne une instance de `Server` prête à l'emploi.
    ///
    /// # Exemple
    ///
    /// ```rust
    /// # use pmoserver::ServerBuilder;
    /// let mut server = ServerBuilder::new("MyAPI", "127.0.0.1", 3000).build();
    /// ```
    pub fn build(self) -> Server {
        let mut server = Server::new(self.name, self.bind, self.http_port);
        server.tls = self.tls;
        server
    }
}
