//! Typed view of the multi-file-stream configuration document
//!
//! The store treats documents as opaque JSON; this is the parsed shape
//! the scheduler and the control API work with. Loads are tolerant:
//! every collection defaults to empty.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::Task;
use super::template::Template;
use super::workflow::Workflow;

/// Tasks, templates and standalone workflows of one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamDocument {
    pub workflow_groups: Vec<Task>,
    pub workflow_group_templates: Vec<Template>,
    pub workflows: Vec<Workflow>,
}

impl StreamDocument {
    /// Parse from an opaque store value
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    /// Serialize back to a store value
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Find a task by id
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.workflow_groups.iter().find(|t| t.id == id)
    }

    /// Replace a task in place; returns false when the id is unknown
    pub fn replace_task(&mut self, task: Task) -> bool {
        match self.workflow_groups.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }
}
