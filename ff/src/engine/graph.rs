//! Dependency graph validation and ordering
//!
//! A workflow's steps form a DAG over the `dependencies` relation.
//! Validation rejects references to unknown siblings and cycles before
//! any step runs; ordering is a stable topological sort with ties
//! broken by ascending step `order`.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::domain::Step;
use crate::error::EngineError;

/// Validate that every dependency names a sibling step and that the
/// graph contains no cycle
pub fn validate_dependency_graph(steps: &[Step]) -> Result<(), EngineError> {
    let step_map: HashMap<&str, &Step> = steps.iter().map(|s| (s.id.as_str(), s)).collect();

    for step in steps {
        for dep in &step.dependencies {
            if !step_map.contains_key(dep.as_str()) {
                return Err(EngineError::ConfigInvalid(format!(
                    "step '{}' depends on unknown step '{}'",
                    step.id, dep
                )));
            }
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut cycle_path = Vec::new();

    for step_id in step_map.keys() {
        if !visited.contains(step_id)
            && has_cycle_dfs(step_id, &step_map, &mut visited, &mut rec_stack, &mut cycle_path)
        {
            return Err(EngineError::ConfigInvalid(format!(
                "dependency cycle: {}",
                cycle_path.join(" -> ")
            )));
        }
    }

    Ok(())
}

/// DFS helper for cycle detection
fn has_cycle_dfs<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, &'a Step>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    cycle_path: &mut Vec<String>,
) -> bool {
    visited.insert(node);
    rec_stack.insert(node);
    cycle_path.push(node.to_string());

    if let Some(step) = graph.get(node) {
        for dep_id in &step.dependencies {
            if !visited.contains(dep_id.as_str()) {
                if has_cycle_dfs(dep_id.as_str(), graph, visited, rec_stack, cycle_path) {
                    return true;
                }
            } else if rec_stack.contains(dep_id.as_str()) {
                cycle_path.push(dep_id.clone());
                return true;
            }
        }
    }

    rec_stack.remove(node);
    cycle_path.pop();
    false
}

/// Topological execution order, ties broken by ascending `order`
///
/// Returns indices into the input slice. Fails with `ConfigInvalid` on
/// cycles or unknown dependency references.
pub fn execution_order(steps: &[Step]) -> Result<Vec<usize>, EngineError> {
    validate_dependency_graph(steps)?;

    let index_map: HashMap<&str, usize> = steps.iter().enumerate().map(|(i, s)| (s.id.as_str(), i)).collect();

    let mut indegree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
    for (i, step) in steps.iter().enumerate() {
        for dep in &step.dependencies {
            let d = index_map[dep.as_str()];
            indegree[i] += 1;
            dependents[d].push(i);
        }
    }

    // Ready set keyed by (order, index): the lowest `order` among
    // currently-unblocked steps always runs next.
    let mut ready: BTreeSet<(u32, usize)> = steps
        .iter()
        .enumerate()
        .filter(|(i, _)| indegree[*i] == 0)
        .map(|(i, s)| (s.order, i))
        .collect();

    let mut result = Vec::with_capacity(steps.len());
    while let Some(&(order, i)) = ready.iter().next() {
        ready.remove(&(order, i));
        result.push(i);
        for &j in &dependents[i] {
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.insert((steps[j].order, j));
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StepConfig;

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

    #[test]
    fn test_no_cycle() {
        let steps = vec![step("s1", 0, &[]), step("s2", 1, &["s1"]), step("s3", 2, &["s1", "s2"])];
        assert!(validate_dependency_graph(&steps).is_ok());
    }

    #[test]
    fn test_cycle_detected() {
        let steps = vec![step("s1", 0, &["s3"]), step("s2", 1, &["s1"]), step("s3", 2, &["s2"])];
        let err = validate_dependency_graph(&steps).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_self_cycle() {
        let steps = vec![step("s1", 0, &["s1"])];
        assert!(validate_dependency_graph(&steps).is_err());
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let steps = vec![step("s1", 0, &["ghost"])];
        let err = validate_dependency_graph(&steps).unwrap_err();
        assert!(err.to_string().contains("unknown step 'ghost'"));
    }

    #[test]
    fn test_order_linear() {
        let steps = vec![step("s3", 2, &["s2"]), step("s1", 0, &[]), step("s2", 1, &["s1"])];
        let order = execution_order(&steps).unwrap();
        let ids: Vec<&str> = order.iter().map(|&i| steps[i].id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_order_diamond_ties_broken_by_order_field() {
        let steps = vec![
            step("s1", 0, &[]),
            step("s2", 1, &["s1"]),
            step("s3", 2, &["s1"]),
            step("s4", 3, &["s2", "s3"]),
        ];
        let order = execution_order(&steps).unwrap();
        let ids: Vec<&str> = order.iter().map(|&i| steps[i].id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "s3", "s4"]);

        // Flipping the order fields flips the middle pair
        let steps = vec![
            step("s1", 0, &[]),
            step("s2", 5, &["s1"]),
            step("s3", 2, &["s1"]),
            step("s4", 9, &["s2", "s3"]),
        ];
        let order = execution_order(&steps).unwrap();
        let ids: Vec<&str> = order.iter().map(|&i| steps[i].id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3", "s2", "s4"]);
    }

    #[test]
    fn test_order_empty() {
        assert!(execution_order(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_order_rejects_cycle() {
        let steps = vec![step("a", 0, &["b"]), step("b", 1, &["a"])];
        assert!(execution_order(&steps).is_err());
    }
}
