//! Domain models for dstasky
//!
//! Contains the object record and its on-disk encoding rules, without any
//! filesystem or git concerns.

mod object;
pub mod timestamp;

pub use object::{Object, ObjectError, ObjectType, Reason, Status, TaskDraft};
