//! Template: a frozen, reusable blueprint of workflows
//!
//! Unlike a workflow, a template may be referenced by many tasks. The
//! materializer deep-copies it per selected source file.

use serde::{Deserialize, Serialize};

use super::workflow::Workflow;

/// A reusable set of workflows with a fixed execution order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    pub workflows: Vec<Workflow>,
    /// Workflow ids in execution order; workflows not listed run after,
    /// in declaration order
    pub workflow_order: Vec<String>,
}

impl Template {
    /// Workflows in execution order per `workflow_order`
    pub fn ordered_workflows(&self) -> Vec<&Workflow> {
        let mut ordered: Vec<&Workflow> = self
            .workflow_order
            .iter()
            .filter_map(|id| self.workflows.iter().find(|w| w.id == *id))
            .collect();

        for workflow in &self.workflows {
            if !ordered.iter().any(|w| w.id == workflow.id) {
                ordered.push(workflow);
            }
        }

        ordered
    }

    /// Whether any workflow carries at least one step
    pub fn is_executable(&self) -> bool {
        self.workflows.iter().any(|w| w.is_executable())
    }
}
