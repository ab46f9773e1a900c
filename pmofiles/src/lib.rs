//! # pmofiles - Serveur de fichiers audio en lecture seule
//!
//! Cette crate expose une arborescence de fichiers (une seule racine, lecture
//! seule) : navigation, lecture des fichiers audio, extraction des pochettes
//! et téléchargement de répertoires sous forme d'archives zip construites à la
//! volée.
//!
//! ## Architecture
//!
//! - [`path`] : résolution sûre des chemins clients ([`Root`], [`ResolvedPath`])
//! - [`listing`] : contenu d'un répertoire, trié et enrichi
//! - [`metadata`] : tag album et pochette (JPEG, ou image grise par défaut)
//! - [`archive`] : archive zip en streaming, sans fichier temporaire
//! - [`background`] : choix de l'image de fond selon le chemin
//! - [`html`] : rendu de la page de listing
//! - [`config_ext`] : lecture des réglages dans `pmoconfig`
//! - `pmoserver_ext`, `api`, `openapi` : routes HTTP (feature `pmoserver`)
//!
//! Toutes les opérations en aval de [`Root::resolve`] n'acceptent qu'un
//! [`ResolvedPath`] : un chemin sortant de la racine ne peut pas les atteindre.
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use pmofiles::{FileServerExt, Root, Backgrounds};
//! use pmoserver::ServerBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new("PMOFiles", "0.0.0.0", 8080).build();
//!     let root = Root::new("/srv/music")?;
//!     server.init_file_server(root, Backgrounds::default(), None).await?;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod archive;
pub mod audio;
pub mod background;
pub mod config_ext;
pub mod error;
pub mod html;
pub mod listing;
pub mod metadata;
pub mod path;

#[cfg(feature = "pmoserver")]
pub mod api;
#[cfg(feature = "pmoserver")]
pub mod openapi;
#[cfg(feature = "pmoserver")]
pub mod pmoserver_ext;

pub use archive::{ArchiveEntry, ArchiveWalker, spawn_archive, stream_archive, write_archive};
pub use audio::AudioFormat;
pub use background::Backgrounds;
pub use config_ext::FileServerConfigExt;
pub use error::{ArchiveError, FilesError};
pub use listing::{DirEntry, EntryKind, Listing, human_size, list};
pub use metadata::{CoverImage, album, cover, placeholder_cover};
pub use path::{ResolvedPath, Root};

#[cfg(feature = "pmoserver")]
pub use openapi::ApiDoc;
#[cfg(feature = "pmoserver")]
pub use pmoserver_ext::{FileServerExt, FileServerState, create_file_router};
