//! Documentation OpenAPI de l'API du serveur de fichiers

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API de PMOFiles
///
/// Disponible via Swagger UI sous `/swagger-ui/files` une fois enregistrée
/// par [`FileServerExt`](crate::FileServerExt).
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::list_root,
        crate::api::list_directory,
        crate::api::album_tag,
    ),
    components(
        schemas(
            crate::listing::Listing,
            crate::listing::DirEntry,
            crate::listing::EntryKind,
            crate::api::AlbumResponse,
        )
    ),
    tags(
        (name = "files", description = "Navigation dans l'arborescence partagée")
    ),
    info(
        title = "PMOFiles API",
        version = "0.1.0",
        description = "Listings JSON et métadonnées des fichiers audio partagés",
        contact(
            name = "PMOMusic",
        ),
        license(
            name = "MIT",
        ),
    )
)]
pub struct ApiDoc;
