//! Extension pour lire les réglages du serveur de fichiers dans pmoconfig
//!
//! Ce module fournit le trait `FileServerConfigExt` qui ajoute à
//! `pmoconfig::Config` les accesseurs propres à PMOFiles : racine partagée,
//! table des images de fond et répertoire qui les contient.

use crate::background::Backgrounds;
use anyhow::{Result, anyhow};
use pmoconfig::Config;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

const DEFAULT_ROOT_DIRECTORY: &str = ".";

/// Trait d'extension pour les réglages du serveur de fichiers
///
/// # Exemple
///
/// ```rust,no_run
/// use pmoconfig::Config;
/// use pmofiles::FileServerConfigExt;
///
/// let config = Config::load_config("")?;
/// let root = config.get_root_directory()?;
/// let backgrounds = config.get_backgrounds()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub trait FileServerConfigExt {
    /// Répertoire partagé (`host.root_directory`, défaut `.`)
    ///
    /// Un chemin relatif est interprété par rapport au répertoire courant.
    fn get_root_directory(&self) -> Result<PathBuf>;

    /// Définit le répertoire partagé
    fn set_root_directory(&self, directory: String) -> Result<()>;

    /// Table `backgrounds` : fragment de chemin -> nom d'image
    fn get_backgrounds(&self) -> Result<Backgrounds>;

    /// Répertoire servi sous `/backgrounds` (`host.backgrounds_dir`), absent si vide
    fn get_backgrounds_dir(&self) -> Result<Option<PathBuf>>;
}

impl FileServerConfigExt for Config {
    fn get_root_directory(&self) -> Result<PathBuf> {
        match self.get_value(&["host", "root_directory"]) {
            Ok(Value::String(s)) if !s.trim().is_empty() => Ok(PathBuf::from(s.trim())),
            Ok(Value::String(_)) | Ok(Value::Null) | Err(_) => {
                Ok(PathBuf::from(DEFAULT_ROOT_DIRECTORY))
            }
            Ok(other) => Err(anyhow!(
                "host.root_directory must be a string, found {:?}",
                other
            )),
        }
    }

    fn set_root_directory(&self, directory: String) -> Result<()> {
        self.set_value(&["host", "root_directory"], Value::String(directory))
    }

    fn get_backgrounds(&self) -> Result<Backgrounds> {
        let map = match self.get_value(&["backgrounds"]) {
            Ok(Value::Mapping(map)) => map,
            Ok(Value::Null) | Err(_) => return Ok(Backgrounds::default()),
            Ok(other) => return Err(anyhow!("backgrounds must be a mapping, found {:?}", other)),
        };

        let mut table = BTreeMap::new();
        for (key, value) in map {
            match (key, value) {
                (Value::String(k), Value::String(v)) => {
                    table.insert(k, v);
                }
                (k, v) => warn!("Ignoring background entry {:?}: {:?}", k, v),
            }
        }
        Ok(Backgrounds::new(table))
    }

    fn get_backgrounds_dir(&self) -> Result<Option<PathBuf>> {
        self.get_config_path(&["host", "backgrounds_dir"])
    }
}
