//! Extension pmoserver : exposition HTTP de l'arborescence partagée
//!
//! Ce module enrichit `pmoserver::Server` avec le trait [`FileServerExt`].
//! `pmofiles` étend le serveur sans que `pmoserver` connaisse `pmofiles`.
//!
//! ## Routes enregistrées
//!
//! - `GET /download/file/{path}` : téléchargement (`Content-Disposition: attachment`)
//! - `GET /stream/{path}` : lecture en ligne, type MIME selon l'extension
//! - `GET /cover/{path}` : pochette JPEG ou image grise par défaut
//! - `GET /download/zip/{path}` : archive zip construite à la volée
//! - `GET /api/files/...` : API JSON (voir [`api`](crate::api))
//! - `/assets/*` : feuille de style et lecteur embarqués
//! - `/backgrounds/*` : images de fond, si un répertoire est configuré
//! - tout autre chemin : page de listing pour un répertoire, téléchargement
//!   pour un fichier
//!
//! Les plages d'octets (`Range`) et les en-têtes conditionnels sont gérés
//! par `tower_http::services::ServeFile`.

use crate::archive::{ZIP_CONTENT_TYPE, archive_file_name, stream_archive};
use crate::audio::stream_content_type;
use crate::config_ext::FileServerConfigExt;
use crate::{Backgrounds, FilesError, ResolvedPath, Root, api, html, listing, metadata};
use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use pmoconfig::Config;
use pmoserver::Server;
use rust_embed::RustEmbed;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::{debug, error, info};
use utoipa::OpenApi;

const DOWNLOAD_PREFIX: &str = "/download/file";
const STREAM_PREFIX: &str = "/stream";
const COVER_PREFIX: &str = "/cover";
const ZIP_PREFIX: &str = "/download/zip";

/// Feuille de style et lecteur audio de la page de listing
#[derive(RustEmbed, Clone)]
#[folder = "assets/"]
pub struct Assets;

/// État partagé par tous les handlers
#[derive(Clone)]
pub struct FileServerState {
    pub root: Root,
    pub backgrounds: Arc<Backgrounds>,
}

impl FileServerState {
    pub fn new(root: Root, backgrounds: Backgrounds) -> Self {
        Self {
            root,
            backgrounds: Arc::new(backgrounds),
        }
    }
}

impl IntoResponse for FilesError {
    fn into_response(self) -> Response {
        match self {
            FilesError::Traversal => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            e if e.is_not_found() => (StatusCode::NOT_FOUND, "Not found").into_response(),
            e => {
                error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

/// Exécute un travail bloquant (résolution, listing, tags) hors du runtime
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, FilesError>
where
    F: FnOnce() -> Result<T, FilesError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| FilesError::Io(io::Error::other(e)))?
}

/// Partie du chemin brut située après `prefix`
pub(crate) fn raw_tail<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or(path)
}

/// Chemin brut (encodé) de la requête, avant tout `nest`
fn original_path(request: &Request) -> String {
    request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

async fn resolve_file(root: &Root, rel: String) -> Result<ResolvedPath, FilesError> {
    let root = root.clone();
    blocking(move || root.resolve(&rel)?.into_file()).await
}

async fn resolve_dir(root: &Root, rel: String) -> Result<ResolvedPath, FilesError> {
    let root = root.clone();
    blocking(move || root.resolve(&rel)?.into_dir()).await
}

/// `attachment; filename="..."`, avec `filename*` pour les noms non ASCII
pub fn content_disposition(name: &str) -> HeaderValue {
    let ascii: String = name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    let value = if ascii == name {
        format!("attachment; filename=\"{}\"", ascii)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            ascii,
            utf8_percent_encode(name, NON_ALPHANUMERIC)
        )
    };

    HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("attachment"))
}

/// Sert un fichier via `ServeFile` (plages d'octets, `HEAD`, conditionnels)
async fn serve_file(
    file: &ResolvedPath,
    request: Request,
    content_type: Option<&'static str>,
    attachment: bool,
) -> Response {
    let response = ServeFile::new(file.as_path())
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {});
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        let headers = response.headers_mut();
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        if attachment {
            headers.insert(header::CONTENT_DISPOSITION, content_disposition(&file.name()));
        }
    }
    response
}

/// Handler pour GET /download/file/{path}
async fn download_file(State(state): State<FileServerState>, request: Request) -> Response {
    let path = original_path(&request);
    let rel = raw_tail(&path, DOWNLOAD_PREFIX).to_string();
    match resolve_file(&state.root, rel).await {
        Ok(file) => {
            debug!(path = %file, "Download");
            serve_file(&file, request, None, true).await
        }
        Err(e) => e.into_response(),
    }
}

/// Handler pour GET /stream/{path}
async fn stream_file(State(state): State<FileServerState>, request: Request) -> Response {
    let path = original_path(&request);
    let rel = raw_tail(&path, STREAM_PREFIX).to_string();
    match resolve_file(&state.root, rel).await {
        Ok(file) => {
            let content_type = stream_content_type(&file.name());
            debug!(path = %file, content_type, "Stream");
            serve_file(&file, request, Some(content_type), false).await
        }
        Err(e) => e.into_response(),
    }
}

/// Handler pour GET /cover/{path}
async fn cover_image(
    State(state): State<FileServerState>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let rel = raw_tail(uri.path(), COVER_PREFIX).to_string();
    let root = state.root.clone();
    let result = blocking(move || {
        let file = root.resolve(&rel)?.into_file()?;
        Ok(metadata::cover(&file))
    })
    .await;

    match result {
        Ok(cover) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, cover.content_type())],
            cover.bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Handler pour GET /download/zip/{path}
async fn download_zip(
    State(state): State<FileServerState>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let rel = raw_tail(uri.path(), ZIP_PREFIX).to_string();
    let dir = match resolve_dir(&state.root, rel).await {
        Ok(dir) => dir,
        Err(e) => return e.into_response(),
    };

    info!(path = %dir, "Streaming zip archive");
    let disposition = content_disposition(&archive_file_name(&dir));
    let body = Body::from_stream(stream_archive(dir));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(ZIP_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Fallback : page de listing pour un répertoire, téléchargement pour un fichier
async fn browse(State(state): State<FileServerState>, request: Request) -> Response {
    if request.method() != &Method::GET && request.method() != &Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let rel = original_path(&request);
    let root = state.root.clone();
    let target = match blocking(move || root.resolve(&rel)).await {
        Ok(target) => target,
        Err(e) => return e.into_response(),
    };

    if target.is_file() {
        return serve_file(&target, request, None, true).await;
    }

    let backgrounds = state.backgrounds.clone();
    let page = blocking(move || {
        let dir = target.into_dir()?;
        let listing = listing::list(&dir)?;
        let background = backgrounds.select(&listing.path);
        Ok(html::render_listing(&listing, background))
    })
    .await;

    match page {
        Ok(page) => Html(page).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Crée le router des fichiers (téléchargement, streaming, pochettes, zip, listing)
///
/// Le router porte un fallback : il doit être le seul du serveur à en définir un.
pub fn create_file_router(state: FileServerState) -> Router {
    Router::new()
        .route("/download/file/{*path}", get(download_file))
        .route("/download/zip/{*path}", get(download_zip))
        .route("/stream/{*path}", get(stream_file))
        .route("/cover/{*path}", get(cover_image))
        .fallback(browse)
        .with_state(state)
}

/// Trait d'extension pour ajouter le serveur de fichiers à pmoserver
#[async_trait::async_trait]
pub trait FileServerExt {
    /// Enregistre toutes les routes du serveur de fichiers
    ///
    /// # Arguments
    ///
    /// * `root` - Racine partagée, déjà canonicalisée
    /// * `backgrounds` - Table des images de fond
    /// * `backgrounds_dir` - Répertoire servi sous `/backgrounds`, optionnel
    async fn init_file_server(
        &mut self,
        root: Root,
        backgrounds: Backgrounds,
        backgrounds_dir: Option<PathBuf>,
    ) -> anyhow::Result<FileServerState>;

    /// Initialise le serveur de fichiers à partir de la configuration
    async fn init_file_server_configured(
        &mut self,
        config: &Config,
    ) -> anyhow::Result<FileServerState>;
}

#[async_trait::async_trait]
impl FileServerExt for Server {
    async fn init_file_server(
        &mut self,
        root: Root,
        backgrounds: Backgrounds,
        backgrounds_dir: Option<PathBuf>,
    ) -> anyhow::Result<FileServerState> {
        let state = FileServerState::new(root, backgrounds);

        self.add_dir::<Assets>("/assets").await;

        if let Some(dir) = backgrounds_dir {
            if dir.is_dir() {
                self.add_static_dir("/backgrounds", &dir).await;
            } else {
                tracing::warn!("Backgrounds directory {} not found, skipping", dir.display());
            }
        }

        // Routes finales : /api/files/list, /api/files/album/{path}
        self.add_openapi(
            api::create_api_router(state.clone()),
            crate::ApiDoc::openapi(),
            "files",
        )
        .await;

        self.add_router("/", create_file_router(state.clone())).await;

        info!(root = %state.root.path().display(), "File server ready");
        Ok(state)
    }

    async fn init_file_server_configured(
        &mut self,
        config: &Config,
    ) -> anyhow::Result<FileServerState> {
        let root = Root::new(config.get_root_directory()?)?;
        let backgrounds = config.get_backgrounds()?;
        let backgrounds_dir = config.get_backgrounds_dir()?;
        self.init_file_server(root, backgrounds, backgrounds_dir).await
    }
}
