//! XDG-compliant path resolution for authlink.
//!
//! The CLI uses these as defaults for the config file, the graph store
//! directory, and the two cache files. Every path can be overridden.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors from path resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum PathError {
    #[error("cannot determine home directory")]
    #[diagnostic(
        code(authlink::paths::no_home),
        help("Set the HOME environment variable or pass --data-dir explicitly.")
    )]
    NoHome,

    #[error("failed to create directory: {path}")]
    #[diagnostic(
        code(authlink::paths::create_dir),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type PathResult<T> = std::result::Result<T, PathError>;

/// Global XDG-compliant directories for authlink.
#[derive(Debug, Clone)]
pub struct AuthlinkPaths {
    /// `$XDG_CONFIG_HOME/authlink/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/authlink/`
    pub data_dir: PathBuf,
    /// `$XDG_CACHE_HOME/authlink/`
    pub cache_dir: PathBuf,
}

impl AuthlinkPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> PathResult<Self> {
        let home = std::env::var("HOME")
            .map(PathBuf::from)
            .map_err(|_| PathError::NoHome)?;

        let config_dir = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".config"))
            .join("authlink");

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".local/share"))
            .join("authlink");

        let cache_dir = std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(".cache"))
            .join("authlink");

        Ok(Self {
            config_dir,
            data_dir,
            cache_dir,
        })
    }

    /// Rooted layout under a single directory (`--data-dir`).
    pub fn rooted(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.clone(),
            data_dir: root.clone(),
            cache_dir: root.join("cache"),
        }
    }

    /// Create all base directories. Idempotent.
    pub fn ensure_dirs(&self) -> PathResult<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.cache_dir] {
            std::fs::create_dir_all(dir).map_err(|e| PathError::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Path to the job config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Directory of the on-disk oxigraph store.
    pub fn graph_dir(&self) -> PathBuf {
        self.data_dir.join("graph")
    }

    /// Generic string memo store.
    pub fn memo_file(&self) -> PathBuf {
        self.cache_dir.join("data.redb")
    }

    /// Pairwise distance store.
    pub fn distance_file(&self) -> PathBuf {
        self.cache_dir.join("distance.redb")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_paths_use_xdg_layout() {
        // No env mutation here: set_var is unsafe in edition 2024.
        let paths = AuthlinkPaths::resolve().unwrap();
        assert!(
            paths.config_dir.to_string_lossy().contains("authlink"),
            "config_dir should contain 'authlink': {}",
            paths.config_dir.display()
        );
        assert!(paths.memo_file().starts_with(&paths.cache_dir));
        assert!(paths.graph_dir().starts_with(&paths.data_dir));
    }

    #[test]
    fn rooted_layout() {
        let paths = AuthlinkPaths::rooted("/srv/authlink");
        assert_eq!(paths.config_file(), PathBuf::from("/srv/authlink/config.toml"));
        assert_eq!(paths.graph_dir(), PathBuf::from("/srv/authlink/graph"));
        assert_eq!(
            paths.distance_file(),
            PathBuf::from("/srv/authlink/cache/distance.redb")
        );
    }

    #[test]
    fn ensure_dirs_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = AuthlinkPaths::rooted(dir.path().join("root"));
        paths.ensure_dirs().unwrap();
        paths.ensure_dirs().unwrap();
        assert!(paths.cache_dir.is_dir());
    }
}
