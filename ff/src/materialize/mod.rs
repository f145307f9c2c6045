//! Template Materializer
//!
//! Expands one template across a set of selected source files into
//! fully-specified tasks, rewriting per-step input paths and output
//! names deterministically. Pure: no I/O; re-materializing identical
//! inputs yields identical tasks modulo fresh ids and timestamps.

mod paths;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{Step, StepStatus, Task, TaskStatus, Template, generate_id};

use paths::{capitalize_first, contains_path, dir_portion, file_name, join, separator_style, split_extension};

/// File input name that marks a cross-task shared document; never
/// rewritten so every materialized task keeps consuming the same file.
pub const SHARED_INPUT_NAME: &str = "接口文档";

/// One selected source file: a source root plus a file identifier
/// relative to it (may contain subdirectories)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub source_path: String,
    pub file: String,
}

/// Naming controls for the produced tasks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaterializeOptions {
    pub name_prefix: Option<String>,
    pub name_pattern: Option<String>,
    pub description: Option<String>,
}

/// Names derived from one selection, used by every rewrite
struct DerivedNames {
    /// The selection's file identifier, as given
    full_file_path: String,
    /// Basename with extension
    file_name: String,
    /// First character upper-cased basename, extension stripped
    capitalized: String,
    /// Directory portion of the identifier, empty when flat
    rel_prefix: String,
}

fn derive(selection: &Selection) -> DerivedNames {
    let full_file_path = selection.file.clone();
    let file_name = file_name(&full_file_path).to_string();
    let (base, _ext) = split_extension(&file_name);
    DerivedNames {
        capitalized: capitalize_first(base),
        rel_prefix: dir_portion(&full_file_path).to_string(),
        file_name,
        full_file_path,
    }
}

/// Expand `template` over `selections`, one task per selection
pub fn materialize(template: &Template, selections: &[Selection], options: &MaterializeOptions) -> Vec<Task> {
    selections
        .iter()
        .map(|selection| materialize_one(template, selection, options))
        .collect()
}

fn materialize_one(template: &Template, selection: &Selection, options: &MaterializeOptions) -> Task {
    let names = derive(selection);
    let prefix = options.name_prefix.as_deref().unwrap_or("");

    let mut instance = template.clone();
    for workflow in &mut instance.workflows {
        for step in &mut workflow.steps {
            step.status = StepStatus::Pending;
            step.result = None;
            rewrite_step(step, &names, &selection.source_path, prefix);
        }
    }

    let name = task_name(&names, options);
    let description = options
        .description
        .clone()
        .unwrap_or_default()
        .replace("{fileName}", &names.file_name)
        .replace("{sourcePath}", &selection.source_path);

    let now = Utc::now();
    Task {
        id: generate_id("task", &name),
        name,
        description,
        template: instance,
        status: TaskStatus::Idle,
        progress: 0.0,
        execution_results: None,
        created_at: Some(now),
        updated_at: Some(now),
    }
}

fn task_name(names: &DerivedNames, options: &MaterializeOptions) -> String {
    if let Some(pattern) = options.name_pattern.as_deref()
        && !pattern.is_empty()
    {
        return pattern.replace("{fileName}", &names.capitalized);
    }

    let prefix = options
        .name_prefix
        .as_deref()
        .unwrap_or("")
        .trim_end_matches('-');
    let prefix = if prefix.is_empty() { "task" } else { prefix };
    format!("{}-{}", prefix, names.capitalized)
}

fn rewrite_step(step: &mut Step, names: &DerivedNames, source_path: &str, name_prefix: &str) {
    for input in &mut step.config.file_inputs {
        if input.name == SHARED_INPUT_NAME {
            continue;
        }

        let sep = separator_style(&input.path);
        let dir = dir_portion(&input.path).to_string();
        let original_name = file_name(&input.path).to_string();
        let (_stem, ext) = split_extension(&original_name);

        if ext == ".jsp" {
            // A .jsp input consumes the selection's raw file directly
            let sep = separator_style(source_path);
            input.path = join(source_path, &names.full_file_path, sep);
            continue;
        }

        let new_name = format!("{}{}", names.capitalized, ext);
        let final_dir = if !names.rel_prefix.is_empty() && !contains_path(&dir, &names.rel_prefix) {
            join(&dir, &names.rel_prefix, sep)
        } else {
            dir
        };
        input.path = join(&final_dir, &new_name, sep);
    }

    let (_stem, out_ext) = split_extension(&step.config.output_file_name);
    step.config.output_file_name = format!("{}{}{}", name_prefix, names.capitalized, out_ext);

    if !names.rel_prefix.is_empty() && !contains_path(&step.config.output_folder, &names.rel_prefix) {
        let sep = separator_style(&step.config.output_folder);
        step.config.output_folder = join(&step.config.output_folder, &names.rel_prefix, sep);
    }
}
