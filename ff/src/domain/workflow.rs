//! Workflow: a named DAG of steps

use serde::{Deserialize, Serialize};

use super::step::{Step, StepId};

/// A directed acyclic graph of steps with a stable identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Workflow {
    /// Look up a step by id
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Whether this workflow holds at least one step (executable check)
    pub fn is_executable(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Ids of every step that transitively depends on `start`,
    /// including `start` itself. Used for partial re-execution.
    pub fn downstream_closure(&self, start: &str) -> Vec<StepId> {
        let mut closure: Vec<StepId> = vec![start.to_string()];
        let mut frontier = vec![start.to_string()];

        while let Some(current) = frontier.pop() {
            for step in &self.steps {
                if step.dependencies.iter().any(|d| *d == current) && !closure.contains(&step.id) {
                    closure.push(step.id.clone());
                    frontier.push(step.id.clone());
                }
            }
        }

        closure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::step::StepConfig;

    fn step(id: &str, order: u32, deps: &[&str]) -> Step {
        Step {
            id: id.to_string(),
            order,
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
            config: StepConfig::default(),
            status: Default::default(),
            result: None,
        }
    }

    fn chain() -> Workflow {
        Workflow {
            id: "wf".to_string(),
            name: "chain".to_string(),
            description: String::new(),
            steps: vec![step("s1", 0, &[]), step("s2", 1, &["s1"]), step("s3", 2, &["s2"])],
        }
    }

    #[test]
    fn test_step_lookup() {
        let wf = chain();
        assert!(wf.step("s2").is_some());
        assert!(wf.step("nope").is_none());
    }

    #[test]
    fn test_downstream_closure_linear() {
        let wf = chain();
        let mut closure = wf.downstream_closure("s2");
        closure.sort();
        assert_eq!(closure, vec!["s2", "s3"]);
    }

    #[test]
    fn test_downstream_closure_diamond() {
        let wf = Workflow {
            id: "wf".to_string(),
            name: "diamond".to_string(),
            description: String::new(),
            steps: vec![
                step("s1", 0, &[]),
                step("s2", 1, &["s1"]),
                step("s3", 2, &["s1"]),
                step("s4", 3, &["s2", "s3"]),
            ],
        };

        let mut closure = wf.downstream_closure("s2");
        closure.sort();
        assert_eq!(closure, vec!["s2", "s4"]);

        let mut all = wf.downstream_closure("s1");
        all.sort();
        assert_eq!(all, vec!["s1", "s2", "s3", "s4"]);
    }

    #[test]
    fn test_executable() {
        let wf = chain();
        assert!(wf.is_executable());
        let empty = Workflow {
            id: "e".to_string(),
            name: "empty".to_string(),
            description: String::new(),
            steps: vec![],
        };
        assert!(!empty.is_executable());
    }
}
