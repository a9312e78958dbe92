//! dstasky - a minimal task tracker
//!
//! Every task is stored as a YAML file in a git repository and committed
//! as soon as it is created.

pub mod cli;
pub mod color;
pub mod domain;
pub mod logging;
pub mod storage;

pub use domain::{Object, ObjectType, Reason, Status, TaskDraft};
