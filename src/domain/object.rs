//! Object domain model
//!
//! An object is one task, note or event. Objects are immutable records:
//! they are built once through a factory that fills in defaults and checks
//! invariants, and any change is expressed by persisting a new object.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use uuid::Uuid;

use super::timestamp;

#[derive(Debug, Error, PartialEq)]
pub enum ObjectError {
    #[error("Modified time ({modified}) is before created time ({created})")]
    ModifiedBeforeCreated {
        created: DateTime<Utc>,
        modified: DateTime<Utc>,
    },

    #[error("Object title cannot be empty")]
    EmptyTitle,

    #[error("Unknown object type: {0}")]
    UnknownObjectType(String),

    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    #[error("Unknown reason: {0}")]
    UnknownReason(String),

    #[error("Invalid object file: {0}")]
    Parse(String),
}

/// Kind of object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    #[default]
    Task,
    Note,
    Event,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Task => "task",
            ObjectType::Note => "note",
            ObjectType::Event => "event",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "task" => Ok(ObjectType::Task),
            "note" => Ok(ObjectType::Note),
            "event" => Ok(ObjectType::Event),
            other => Err(ObjectError::UnknownObjectType(other.to_string())),
        }
    }
}

/// Lifecycle status of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Created,
    Closed,
    Reopened,
    Started,
    Resumed,
    Paused,
    Archived,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Created => "created",
            Status::Closed => "closed",
            Status::Reopened => "reopened",
            Status::Started => "started",
            Status::Resumed => "resumed",
            Status::Paused => "paused",
            Status::Archived => "archived",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "created" => Ok(Status::Created),
            "closed" => Ok(Status::Closed),
            "reopened" => Ok(Status::Reopened),
            "started" => Ok(Status::Started),
            "resumed" => Ok(Status::Resumed),
            "paused" => Ok(Status::Paused),
            "archived" => Ok(Status::Archived),
            other => Err(ObjectError::UnknownStatus(other.to_string())),
        }
    }
}

/// Why an object was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reason {
    Duplicated,
    Wontfix,
    Blocked,
    Invalid,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Duplicated => "duplicated",
            Reason::Wontfix => "wontfix",
            Reason::Blocked => "blocked",
            Reason::Invalid => "invalid",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Reason {
    type Err = ObjectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "duplicated" => Ok(Reason::Duplicated),
            "wontfix" => Ok(Reason::Wontfix),
            "blocked" => Ok(Reason::Blocked),
            "invalid" => Ok(Reason::Invalid),
            other => Err(ObjectError::UnknownReason(other.to_string())),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.is_empty())
}

/// A persisted task, note or event
///
/// Serializes to the object file schema: absent or empty optional fields
/// are left out entirely rather than written as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    uuid: Uuid,

    #[serde(rename = "type")]
    object_type: ObjectType,

    title: String,

    #[serde(default)]
    status: Status,

    #[serde(default, skip_serializing_if = "is_blank")]
    description: Option<String>,

    /// Free-form key/value pairs
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    metadata: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "is_blank")]
    project: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<i64>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<Reason>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    subtasks: Vec<Uuid>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dependencies: Vec<Uuid>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<Uuid>,

    #[serde(with = "timestamp")]
    created: DateTime<Utc>,

    #[serde(with = "timestamp")]
    modified: DateTime<Utc>,

    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    resolved: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    started: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    ended: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    scheduled: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp::option", skip_serializing_if = "Option::is_none")]
    due: Option<DateTime<Utc>>,
}

/// Inputs accepted by the object factory
///
/// Everything except the title is optional; the factory fills in a fresh
/// identifier and the current time where nothing was given.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub uuid: Option<Uuid>,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
    pub metadata: BTreeMap<String, String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub priority: Option<i64>,
    pub tags: BTreeSet<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    pub fn modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }
}

impl Object {
    /// Builds a new task
    pub fn create_task(draft: TaskDraft) -> Result<Self, ObjectError> {
        Self::create(ObjectType::Task, draft)
    }

    /// Builds a new object of the given type
    ///
    /// `modified` defaults to `created`, which defaults to now.
    pub fn create(object_type: ObjectType, draft: TaskDraft) -> Result<Self, ObjectError> {
        let created = draft.created.map(timestamp::truncate).unwrap_or_else(timestamp::now);
        let modified = draft.modified.map(timestamp::truncate).unwrap_or(created);

        let object = Self {
            uuid: draft.uuid.unwrap_or_else(Uuid::new_v4),
            object_type,
            title: draft.title,
            status: Status::Created,
            description: draft.description,
            metadata: draft.metadata,
            project: draft.project,
            priority: draft.priority,
            tags: draft.tags,
            reason: None,
            subtasks: Vec::new(),
            dependencies: Vec::new(),
            references: Vec::new(),
            created,
            modified,
            resolved: None,
            started: None,
            ended: None,
            scheduled: None,
            due: None,
        };

        object.check()?;
        Ok(object)
    }

    /// Checks the invariants every object must hold
    pub fn check(&self) -> Result<(), ObjectError> {
        if self.title.trim().is_empty() {
            return Err(ObjectError::EmptyTitle);
        }
        if self.modified < self.created {
            return Err(ObjectError::ModifiedBeforeCreated {
                created: self.created,
                modified: self.modified,
            });
        }
        Ok(())
    }

    /// Parses an object file and re-checks its invariants
    pub fn from_yaml(content: &str) -> Result<Self, ObjectError> {
        let object: Object =
            serde_yaml::from_str(content).map_err(|e| ObjectError::Parse(e.to_string()))?;
        object.check()?;
        Ok(object)
    }

    /// Renders the object as a YAML document, starting with `---`
    pub fn to_yaml_document(&self) -> Result<String, serde_yaml::Error> {
        let body = serde_yaml::to_string(self)?;
        Ok(format!("---\n\n{}", body))
    }

    /// Returns the plain mapping form of the object
    pub fn to_mapping(&self) -> Result<Mapping, serde_yaml::Error> {
        match serde_yaml::to_value(self)? {
            Value::Mapping(mapping) => Ok(mapping),
            _ => Ok(Mapping::new()),
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn reason(&self) -> Option<Reason> {
        self.reason
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    pub fn priority(&self) -> Option<i64> {
        self.priority
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn subtasks(&self) -> &[Uuid] {
        &self.subtasks
    }

    pub fn dependencies(&self) -> &[Uuid] {
        &self.dependencies
    }

    pub fn references(&self) -> &[Uuid] {
        &self.references
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn resolved(&self) -> Option<DateTime<Utc>> {
        self.resolved
    }

    pub fn started(&self) -> Option<DateTime<Utc>> {
        self.started
    }

    pub fn ended(&self) -> Option<DateTime<Utc>> {
        self.ended
    }

    pub fn scheduled(&self) -> Option<DateTime<Utc>> {
        self.scheduled
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        self.due
    }

    /// Commit title used when this object is first persisted
    pub fn creation_summary(&self) -> String {
        format!("create({}): {}", self.object_type, self.title)
    }
}
