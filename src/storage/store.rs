//! Object storage
//!
//! Each object lives in `objects/<uuid>.yml` and is committed on its own.
//! A failed commit removes the file again, so the data directory never keeps
//! an object that is not in the history.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;
use uuid::Uuid;
use walkdir::WalkDir;

use super::data_dir::OBJECTS_DIR;
use super::git::{GitError, VersionControl};
use crate::domain::{Object, ObjectError};

/// Extension of object files
pub const OBJECT_EXTENSION: &str = "yml";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("This object file already exists: {0}")]
    DuplicateObject(String),

    #[error("Object not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Invalid(#[from] ObjectError),

    #[error("Failed to serialize object: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// File name used for an object
pub fn object_file_name(uuid: Uuid) -> String {
    format!("{}.{}", uuid, OBJECT_EXTENSION)
}

/// Store for objects in a version-controlled data directory
pub struct ObjectStore<V> {
    root: PathBuf,
    vcs: V,
}

impl<V: VersionControl> ObjectStore<V> {
    /// Creates a store rooted at the data directory (the repository workdir)
    pub fn new(root: impl Into<PathBuf>, vcs: V) -> Self {
        Self {
            root: root.into(),
            vcs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Path a new object is written to
    pub fn object_path(&self, uuid: Uuid) -> PathBuf {
        self.objects_dir().join(object_file_name(uuid))
    }

    /// Searches the objects directory tree for a file name
    ///
    /// Unreadable directories are reported instead of skipped.
    pub fn find(&self, file_name: &str) -> Result<Option<PathBuf>, StoreError> {
        let objects_dir = self.objects_dir();
        for entry in WalkDir::new(&objects_dir) {
            let entry = entry.map_err(|e| walk_error(&objects_dir, e))?;
            if entry.file_type().is_file() && entry.file_name() == file_name {
                return Ok(Some(entry.into_path()));
            }
        }
        Ok(None)
    }

    /// Writes `object` to its file and commits it
    ///
    /// Returns the commit id. Fails with [`StoreError::DuplicateObject`]
    /// if the object file already exists anywhere under `objects/`.
    pub fn create(&self, object: &Object) -> Result<String, StoreError> {
        let file_name = object_file_name(object.uuid());
        if self.find(&file_name)?.is_some() {
            return Err(StoreError::DuplicateObject(file_name));
        }

        let path = self.object_path(object.uuid());
        let document = object.to_yaml_document()?;
        write_new_file(&path, |file| file.write_all(document.as_bytes())).map_err(|e| {
            match e.kind() {
                io::ErrorKind::AlreadyExists => StoreError::DuplicateObject(file_name.clone()),
                _ => StoreError::io(&path, e),
            }
        })?;
        debug!("Wrote {}", path.display());

        let title = object.creation_summary();
        let body = format!("Reference: {}", object.uuid());
        let relative = Path::new(OBJECTS_DIR).join(&file_name);

        match self.vcs.create_commit(&title, Some(&body), &[relative]) {
            Ok(commit) => Ok(commit),
            Err(e) => {
                remove_quietly(&path);
                Err(e.into())
            }
        }
    }

    /// Reads an object back from its file
    pub fn load(&self, uuid: Uuid) -> Result<Object, StoreError> {
        let path = self
            .find(&object_file_name(uuid))?
            .ok_or(StoreError::NotFound(uuid))?;
        let content = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Ok(Object::from_yaml(&content)?)
    }
}

/// Creates `path`, which must not exist, and fills it with `fill`
///
/// A file that could not be filled completely is removed again.
fn write_new_file<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    match fill(&mut file).and_then(|()| file.flush()) {
        Ok(()) => Ok(()),
        Err(e) => {
            drop(file);
            remove_quietly(path);
            Err(e)
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn walk_error(root: &Path, err: walkdir::Error) -> StoreError {
    let path = err.path().unwrap_or(root).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop"));
    StoreError::Io { path, source }
}
