//! Data directory management
//!
//! Resolves where dstasky keeps its repository and tracks whether that
//! directory has been initialized.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use log::info;
use thiserror::Error;

use super::git::GitRepository;
use super::store::ObjectStore;

/// Explicit data directory override
pub const HOME_ENV: &str = "DSTASKY_HOME";

/// XDG base directory override
pub const XDG_DATA_HOME_ENV: &str = "XDG_DATA_HOME";

/// Folder created under the base data directory
pub const DATA_SUBDIR: &str = "dstasky";

/// Holds one YAML file per object
pub const OBJECTS_DIR: &str = "objects";

/// Reserved for namespaces
pub const NAMESPACES_DIR: &str = "namespaces";

#[derive(Debug, Error)]
pub enum DataDirError {
    #[error("Please run/rerun 'dstasky init' first!")]
    NotInitialized(PathBuf),
}

/// Resolves the data directory from the process environment
pub fn data_directory() -> PathBuf {
    resolve_data_directory(|key| std::env::var(key).ok())
}

/// Resolves the data directory from an environment lookup
///
/// `DSTASKY_HOME` wins, then `$XDG_DATA_HOME/dstasky`, then the platform
/// data directory joined with `dstasky`. Empty values count as unset.
pub fn resolve_data_directory<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let path = if let Some(home) = var(HOME_ENV) {
        PathBuf::from(home)
    } else if let Some(base) = var(XDG_DATA_HOME_ENV) {
        PathBuf::from(base).join(DATA_SUBDIR)
    } else {
        default_data_base().join(DATA_SUBDIR)
    };

    absolutize(&path)
}

fn default_data_base() -> PathBuf {
    let Some(dirs) = BaseDirs::new() else {
        return PathBuf::from(".local").join("share");
    };

    if cfg!(any(target_os = "macos", target_os = "windows")) {
        dirs.data_dir().to_path_buf()
    } else {
        dirs.home_dir().join(".local").join("share")
    }
}

/// Makes `path` absolute with symlinks resolved
///
/// Paths that do not exist yet get their nearest existing ancestor
/// canonicalized and the missing components appended.
pub fn absolutize(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => return path.to_path_buf(),
        }
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    resolved
}

/// Result of running `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    AlreadyInitialized,
    Initialized,
}

/// The dstasky data directory
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data directory for the current environment
    pub fn from_env() -> Self {
        Self::new(data_directory())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    pub fn namespaces_dir(&self) -> PathBuf {
        self.root.join(NAMESPACES_DIR)
    }

    fn git_dir(&self) -> PathBuf {
        self.root.join(".git")
    }

    /// True when the directory exists and holds a usable repository
    pub fn is_initialized(&self) -> bool {
        self.root.is_dir()
            && self.git_dir().is_dir()
            && GitRepository::is_repository(&self.git_dir())
    }

    /// Creates the directory, repository and subfolders as needed
    ///
    /// Running this on an initialized directory changes nothing.
    pub fn init(&self) -> Result<InitOutcome> {
        if self.is_initialized() {
            info!("dstasky is already initialized!");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        if !self.root.is_dir() {
            info!("Creating '{}'", self.root.display());
            fs::create_dir_all(&self.root).with_context(|| {
                format!("Failed to create data directory: {}", self.root.display())
            })?;
        }

        if !GitRepository::is_repository(&self.git_dir()) {
            info!("Initializing an empty git repo at '{}'", self.root.display());
            GitRepository::init(&self.root).with_context(|| {
                format!("Failed to initialize git repository: {}", self.root.display())
            })?;
        }

        self.ensure_folders()?;

        info!("Done");
        Ok(InitOutcome::Initialized)
    }

    /// Fails unless initialized, recreating missing subfolders otherwise
    pub fn ensure_initialized(&self) -> Result<()> {
        if !self.is_initialized() {
            return Err(DataDirError::NotInitialized(self.root.clone()).into());
        }
        self.ensure_folders()
    }

    fn ensure_folders(&self) -> Result<()> {
        for dir in [self.objects_dir(), self.namespaces_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Opens the object store backed by this directory's repository
    pub fn object_store(&self) -> Result<ObjectStore<GitRepository>> {
        self.ensure_initialized()?;
        let repo = GitRepository::discover(&self.root)?;
        Ok(ObjectStore::new(&self.root, repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn explicit_home_wins() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("custom");
        let xdg = dir.path().join("xdg");

        let resolved = resolve_data_directory(env(&[
            (HOME_ENV, home.to_str().unwrap()),
            (XDG_DATA_HOME_ENV, xdg.to_str().unwrap()),
        ]));

        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("custom"));
    }

    #[test]
    fn xdg_base_gets_subfolder() {
        let dir = TempDir::new().unwrap();
        let resolved =
            resolve_data_directory(env(&[(XDG_DATA_HOME_ENV, dir.path().to_str().unwrap())]));

        assert_eq!(resolved, dir.path().canonicalize().unwrap().join(DATA_SUBDIR));
    }

    #[test]
    fn empty_values_are_ignored() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_data_directory(env(&[
            (HOME_ENV, ""),
            (XDG_DATA_HOME_ENV, dir.path().to_str().unwrap()),
        ]));

        assert!(resolved.ends_with(DATA_SUBDIR));
    }

    #[test]
    fn platform_default_is_absolute() {
        let resolved = resolve_data_directory(env(&[]));
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with(DATA_SUBDIR));
    }

    #[test]
    fn absolutize_keeps_missing_components() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a").join("b");
        assert_eq!(
            absolutize(&path),
            dir.path().canonicalize().unwrap().join("a").join("b")
        );
    }

    #[test]
    fn init_creates_structure() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path().join("data"));
        assert!(!data.is_initialized());

        assert_eq!(data.init().unwrap(), InitOutcome::Initialized);

        assert!(data.is_initialized());
        assert!(data.objects_dir().is_dir());
        assert!(data.namespaces_dir().is_dir());
        assert!(data.root().join(".git").is_dir());
    }

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path().join("data"));

        data.init().unwrap();
        assert_eq!(data.init().unwrap(), InitOutcome::AlreadyInitialized);
        assert!(data.is_initialized());
    }

    #[test]
    fn init_reuses_existing_directory() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path());

        assert_eq!(data.init().unwrap(), InitOutcome::Initialized);
        assert!(data.is_initialized());
    }

    #[test]
    fn uninitialized_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path().join("missing"));

        let err = data.ensure_initialized().unwrap_err();
        assert!(err.downcast_ref::<DataDirError>().is_some());
        assert!(!data.root().exists());
    }

    #[test]
    fn ensure_initialized_restores_folders() {
        let dir = TempDir::new().unwrap();
        let data = DataDir::new(dir.path().join("data"));
        data.init().unwrap();
        fs::remove_dir(data.namespaces_dir()).unwrap();

        data.ensure_initialized().unwrap();
        assert!(data.namespaces_dir().is_dir());
    }
}
