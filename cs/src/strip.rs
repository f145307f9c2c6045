//! Transient-state stripping
//!
//! Step `status`/`result` and task `running` markers exist only for the
//! duration of a run. A persisted document must always reload cold:
//! every step `pending` with no `result`, every previously-running task
//! back to `idle`.

use serde_json::Value;

/// Strip runtime state from a configuration document, in place.
///
/// Touches `workflowGroups[*]` (task status plus the steps of every
/// workflow under `template`), `workflowGroupTemplates[*].workflows[*]`
/// and top-level `workflows[*]`. Unknown shapes are left alone, so the
/// document stays opaque to callers that store extra fields.
pub fn strip_runtime_state(doc: &mut Value) {
    if let Some(groups) = doc.get_mut("workflowGroups").and_then(Value::as_array_mut) {
        for group in groups {
            if group.get("status").and_then(Value::as_str) == Some("running") {
                group["status"] = Value::String("idle".to_string());
            }
            if let Some(workflows) = group
                .pointer_mut("/template/workflows")
                .and_then(Value::as_array_mut)
            {
                for workflow in workflows {
                    strip_workflow(workflow);
                }
            }
        }
    }

    if let Some(templates) = doc
        .get_mut("workflowGroupTemplates")
        .and_then(Value::as_array_mut)
    {
        for template in templates {
            if let Some(workflows) = template.get_mut("workflows").and_then(Value::as_array_mut) {
                for workflow in workflows {
                    strip_workflow(workflow);
                }
            }
        }
    }

    if let Some(workflows) = doc.get_mut("workflows").and_then(Value::as_array_mut) {
        for workflow in workflows {
            strip_workflow(workflow);
        }
    }
}

fn strip_workflow(workflow: &mut Value) {
    let Some(steps) = workflow.get_mut("steps").and_then(Value::as_array_mut) else {
        return;
    };
    for step in steps {
        if let Some(obj) = step.as_object_mut() {
            obj.insert("status".to_string(), Value::String("pending".to_string()));
            obj.remove("result");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_steps_in_all_three_locations() {
        let mut doc = json!({
            "workflowGroups": [{
                "status": "running",
                "template": {
                    "workflows": [{"steps": [{"id": "a", "status": "success", "result": {"success": true}}]}]
                }
            }],
            "workflowGroupTemplates": [{
                "workflows": [{"steps": [{"id": "b", "status": "error", "result": {"success": false}}]}]
            }],
            "workflows": [{"steps": [{"id": "c", "status": "running"}]}]
        });

        strip_runtime_state(&mut doc);

        assert_eq!(doc["workflowGroups"][0]["status"], "idle");
        let a = &doc["workflowGroups"][0]["template"]["workflows"][0]["steps"][0];
        assert_eq!(a["status"], "pending");
        assert!(a.get("result").is_none());

        let b = &doc["workflowGroupTemplates"][0]["workflows"][0]["steps"][0];
        assert_eq!(b["status"], "pending");
        assert!(b.get("result").is_none());

        assert_eq!(doc["workflows"][0]["steps"][0]["status"], "pending");
    }

    #[test]
    fn test_completed_task_status_survives() {
        let mut doc = json!({
            "workflowGroups": [
                {"status": "completed", "template": {"workflows": []}},
                {"status": "failed", "template": {"workflows": []}}
            ]
        });

        strip_runtime_state(&mut doc);

        assert_eq!(doc["workflowGroups"][0]["status"], "completed");
        assert_eq!(doc["workflowGroups"][1]["status"], "failed");
    }

    #[test]
    fn test_unknown_shapes_untouched() {
        let mut doc = json!({"custom": {"nested": [1, 2, 3]}, "workflows": "not-an-array"});
        let before = doc.clone();
        strip_runtime_state(&mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_status_forced_onto_step_without_one() {
        let mut doc = json!({"workflows": [{"steps": [{"id": "s"}]}]});
        strip_runtime_state(&mut doc);
        assert_eq!(doc["workflows"][0]["steps"][0]["status"], "pending");
    }
}
