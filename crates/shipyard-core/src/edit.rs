//! Edit operations - the only legal ways to mutate a draft config

use serde::{Deserialize, Serialize};

use crate::config::{Config, EnvVar, PortMapping, VolumeMount};
use crate::error::Result;
use crate::path::FieldPath;

/// A typed value emitted by a field editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Port(PortMapping),
    Env(EnvVar),
    Mount(VolumeMount),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Name of the variant, used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::Port(_) => "port",
            FieldValue::Env(_) => "env",
            FieldValue::Mount(_) => "mount",
        }
    }
}

/// An atomic edit against a draft config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    /// Replace the scalar, list element or element sub-field at `path`
    SetField { path: FieldPath, value: FieldValue },
    /// Insert `value` into the list at `path`, shifting later elements right.
    /// `index == len` appends.
    InsertAt {
        path: FieldPath,
        index: usize,
        value: FieldValue,
    },
    /// Remove the element at `index` from the list at `path`, shifting later elements left
    RemoveAt { path: FieldPath, index: usize },
}

impl EditOperation {
    pub fn set(path: FieldPath, value: FieldValue) -> Self {
        Self::SetField { path, value }
    }

    pub fn insert(path: FieldPath, index: usize, value: FieldValue) -> Self {
        Self::InsertAt { path, index, value }
    }

    pub fn remove(path: FieldPath, index: usize) -> Self {
        Self::RemoveAt { path, index }
    }

    pub fn path(&self) -> &FieldPath {
        match self {
            EditOperation::SetField { path, .. }
            | EditOperation::InsertAt { path, .. }
            | EditOperation::RemoveAt { path, .. } => path,
        }
    }

    /// Short label for logs and events
    pub fn label(&self) -> &'static str {
        match self {
            EditOperation::SetField { .. } => "set_field",
            EditOperation::InsertAt { .. } => "insert_at",
            EditOperation::RemoveAt { .. } => "remove_at",
        }
    }

    /// Apply this operation to `config`.
    ///
    /// On success returns the exact inverse operation: applying it restores
    /// `config` to its previous state. On failure `config` is left untouched.
    pub fn apply(&self, config: &mut Config) -> Result<EditOperation> {
        match self {
            EditOperation::SetField { path, value } => {
                let previous = config.set_field(path, value.clone())?;
                Ok(EditOperation::set(path.clone(), previous))
            }
            EditOperation::InsertAt { path, index, value } => {
                config.insert_at(path, *index, value.clone())?;
                Ok(EditOperation::remove(path.clone(), *index))
            }
            EditOperation::RemoveAt { path, index } => {
                let removed = config.remove_at(path, *index)?;
                Ok(EditOperation::insert(path.clone(), *index, removed))
            }
        }
    }
}
