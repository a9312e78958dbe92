//! # Storage Layer
//!
//! Persistence for dstasky: a git repository holding one YAML file per
//! object.
//!
//! ## Data Directory Layout
//!
//! ```text
//! <data_dir>/
//! ├── .git/                  # Repository metadata
//! ├── objects/
//! │   └── <uuid>.yml         # One YAML document per object
//! └── namespaces/            # Reserved
//! ```
//!
//! The data directory is `$DSTASKY_HOME`, else `$XDG_DATA_HOME/dstasky`,
//! else the platform data directory joined with `dstasky`.
//!
//! ## Key Types
//!
//! - [`DataDir`] - Locating and initializing the data directory
//! - [`ObjectStore`] - Writing objects and committing them
//! - [`GitRepository`] - The [`VersionControl`] backend
//! - [`Config`] - User configuration

mod config;
mod data_dir;
mod git;
mod store;

pub use config::{Config, ConfigError, CONFIG_ENV};
pub use data_dir::{
    absolutize, data_directory, resolve_data_directory, DataDir, DataDirError, InitOutcome,
    DATA_SUBDIR, HOME_ENV, NAMESPACES_DIR, OBJECTS_DIR, XDG_DATA_HOME_ENV,
};
pub use git::{
    git_path, parse_porcelain, GitError, GitRepository, Identities, IdentityRole, Signature,
    StatusEntry, VersionControl,
};
pub use store::{object_file_name, ObjectStore, StoreError, OBJECT_EXTENSION};
