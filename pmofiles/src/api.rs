//! API REST JSON du serveur de fichiers
//!
//! Routes montées sous `/api/files` :
//! - `GET /api/files/list` : contenu de la racine
//! - `GET /api/files/list/{path}` : contenu d'un répertoire
//! - `GET /api/files/album/{path}` : tag album d'un fichier audio
//!
//! Le chemin est lu brut (encodé) dans l'URI d'origine ; le seul décodage
//! est fait par [`Root::resolve`](crate::Root::resolve).

use crate::pmoserver_ext::{FileServerState, blocking, raw_tail};
use crate::{listing, metadata};
use axum::{
    Json, Router,
    extract::{OriginalUri, State},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;

const LIST_PREFIX: &str = "/api/files/list";
const ALBUM_PREFIX: &str = "/api/files/album";

/// Tag album d'un fichier
#[derive(Debug, Serialize, ToSchema)]
pub struct AlbumResponse {
    /// Nom de l'album, vide si absent ou illisible
    #[schema(example = "Greatest Hits")]
    pub album: String,
}

/// Liste le contenu de la racine partagée
#[utoipa::path(
    get,
    path = "/list",
    responses(
        (status = 200, description = "Directory listing", body = crate::listing::Listing),
    ),
    tag = "files"
)]
pub async fn list_root(State(state): State<FileServerState>) -> Response {
    list_rel(state, String::new()).await
}

/// Liste le contenu d'un répertoire
///
/// Les répertoires précèdent les fichiers, chaque groupe étant trié par nom
/// sans tenir compte de la casse.
#[utoipa::path(
    get,
    path = "/list/{path}",
    params(
        ("path" = String, Path, description = "Directory path relative to the shared root")
    ),
    responses(
        (status = 200, description = "Directory listing", body = crate::listing::Listing),
        (status = 403, description = "Path escapes the shared root"),
        (status = 404, description = "No such directory")
    ),
    tag = "files"
)]
pub async fn list_directory(
    State(state): State<FileServerState>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let rel = raw_tail(uri.path(), LIST_PREFIX).to_string();
    list_rel(state, rel).await
}

async fn list_rel(state: FileServerState, rel: String) -> Response {
    let result = blocking(move || {
        let dir = state.root.resolve(&rel)?.into_dir()?;
        listing::list(&dir)
    })
    .await;

    match result {
        Ok(listing) => Json(listing).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Retourne le tag album d'un fichier audio
#[utoipa::path(
    get,
    path = "/album/{path}",
    params(
        ("path" = String, Path, description = "File path relative to the shared root")
    ),
    responses(
        (status = 200, description = "Album tag, empty when missing", body = AlbumResponse),
        (status = 403, description = "Path escapes the shared root"),
        (status = 404, description = "No such file")
    ),
    tag = "files"
)]
pub async fn album_tag(
    State(state): State<FileServerState>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let rel = raw_tail(uri.path(), ALBUM_PREFIX).to_string();
    let result = blocking(move || {
        let file = state.root.resolve(&rel)?.into_file()?;
        Ok(metadata::album(&file))
    })
    .await;

    match result {
        Ok(album) => Json(AlbumResponse { album }).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Router de l'API, à monter sous `/api/files` via `Server::add_openapi`
pub fn create_api_router(state: FileServerState) -> Router {
    Router::new()
        .route("/list", get(list_root))
        .route("/list/{*path}", get(list_directory))
        .route("/album/{*path}", get(album_tag))
        .with_state(state)
}
