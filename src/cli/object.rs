//! Object CLI commands

use anyhow::{Context, Result};
use log::{debug, info};

use super::output::Output;
use crate::domain::{Object, TaskDraft};
use crate::storage::DataDir;

/// Title used by `create` when none is given
pub const DEFAULT_TITLE: &str = "yey";

/// Prints a sample task
pub fn show(data_dir: &DataDir, output: &Output) -> Result<()> {
    data_dir.ensure_initialized()?;

    let sample = Object::create_task(TaskDraft::new("test"))?;
    output.object(&sample)
}

/// Creates a task, commits it and prints the stored copy
pub fn create(
    data_dir: &DataDir,
    output: &Output,
    title: &str,
    description: Option<String>,
    project: Option<String>,
) -> Result<()> {
    let store = data_dir.object_store()?;

    let mut draft = TaskDraft::new(title);
    draft.description = description;
    draft.project = project;
    let task = Object::create_task(draft).context("Invalid task")?;

    let commit = store.create(&task)?;
    debug!("Committed {} as {}", task.uuid(), commit);
    info!("Created {} {}", task.object_type(), task.uuid());

    let stored = store
        .load(task.uuid())
        .context("Failed to read back the created object")?;
    output.object(&stored)
}
