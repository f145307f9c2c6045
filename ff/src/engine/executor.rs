//! Step Executor
//!
//! Drives one step end to end: validate the config, resolve file paths
//! against upstream results, render the prompt, read the referenced
//! files fresh, invoke the selected LLM endpoint, and persist the
//! extracted code. Failures of any kind fold into a `StepResult`; the
//! executor never raises into the workflow runner.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::content::ContentStore;
use crate::domain::{Step, StepData, StepId, StepResult};
use crate::engine::prompt::{PromptSegment, render_segments};
use crate::error::EngineError;
use crate::llm::{ChatMessage, LlmRouter, extract_fenced_code};
use crate::stop::StopToken;

/// Output-write behavior
#[derive(Debug, Clone, Copy)]
pub struct ExecutionPolicy {
    /// When false, refuse to replace a pre-existing output file
    pub overwrite: bool,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

impl ExecutionPolicy {
    /// Refuse pre-existing outputs instead of replacing them
    pub fn strict() -> Self {
        Self { overwrite: false }
    }
}

/// Executes single steps against the content store and the LLM router
pub struct StepExecutor {
    content: ContentStore,
    llm: Arc<LlmRouter>,
    policy: ExecutionPolicy,
}

impl StepExecutor {
    pub fn new(llm: Arc<LlmRouter>) -> Self {
        Self {
            content: ContentStore::new(),
            llm,
            policy: ExecutionPolicy::default(),
        }
    }

    pub fn with_policy(llm: Arc<LlmRouter>, policy: ExecutionPolicy) -> Self {
        Self {
            content: ContentStore::new(),
            llm,
            policy,
        }
    }

    /// Execute one step given its dependencies' results.
    ///
    /// Always returns a `StepResult`; errors become failed results with
    /// a human-readable message.
    pub async fn execute(
        &self,
        step: &Step,
        prior: &HashMap<StepId, StepResult>,
        stop: &StopToken,
    ) -> StepResult {
        debug!(step = %step.id, endpoint = %step.config.api_endpoint, "executing step");
        match self.run(step, prior, stop).await {
            Ok(result) => result,
            Err(EngineError::Cancelled) => StepResult::failure("cancelled before completion"),
            Err(e) => {
                warn!(step = %step.id, error = %e, "step failed");
                StepResult::failure(e.to_string())
            }
        }
    }

    async fn run(
        &self,
        step: &Step,
        prior: &HashMap<StepId, StepResult>,
        stop: &StopToken,
    ) -> Result<StepResult, EngineError> {
        let config = &step.config;

        // Validate
        if config.file_inputs.is_empty() {
            return Err(EngineError::ConfigInvalid(format!(
                "step '{}' has no file inputs",
                step.id
            )));
        }
        if config.prompt_inputs.is_empty() {
            return Err(EngineError::ConfigInvalid(format!(
                "step '{}' has no prompt inputs",
                step.id
            )));
        }
        if config.output_folder.trim().is_empty() || config.output_file_name.trim().is_empty() {
            return Err(EngineError::ConfigInvalid(format!(
                "step '{}' is missing output folder or file name",
                step.id
            )));
        }

        // Resolve file paths
        let paths = resolve_inputs(step, prior)?;

        // Render prompts into the ordered segment sequence
        let segments = render_segments(&config.prompt_inputs, &paths)?;

        if stop.is_stopped() {
            return Err(EngineError::Cancelled);
        }

        // Materialize: file segments are read fresh at this point
        let mut parts = Vec::with_capacity(segments.len());
        for segment in &segments {
            match segment {
                PromptSegment::Prompt(text) => parts.push(text.clone()),
                PromptSegment::File(path) => parts.push(self.content.read_file(path).await?),
            }
        }
        let payload = parts.join("\n");

        // Invoke
        let client = self.llm.client_for(config.api_endpoint)?;
        let completion = client.complete(vec![ChatMessage::user(payload)]).await?;

        // Persist
        let code = extract_fenced_code(&completion.content);
        let out_path = Path::new(&config.output_folder).join(&config.output_file_name);

        self.content.ensure_dir(&config.output_folder).await?;

        if !self.policy.overwrite
            && tokio::fs::try_exists(&out_path)
                .await
                .map_err(|e| EngineError::io(&out_path, e))?
        {
            return Err(EngineError::io(
                &out_path,
                std::io::Error::new(std::io::ErrorKind::AlreadyExists, "output file already exists"),
            ));
        }

        self.content.write_file(&out_path, &code).await?;

        let message = match completion.warning {
            Some(warning) => format!("completed with warning: {}", warning),
            None => "completed".to_string(),
        };

        debug!(step = %step.id, path = %out_path.display(), bytes = code.len(), "step completed");

        Ok(StepResult::ok(
            message,
            StepData {
                path: Some(out_path.to_string_lossy().to_string()),
                size: Some(code.len() as u64),
                content: Some(code),
            },
        ))
    }
}

/// Resolve every file input to a concrete path.
///
/// Inputs with `depends_on` consume the upstream result's output path
/// and require that result to be present and successful; plain inputs
/// use their literal path.
fn resolve_inputs(
    step: &Step,
    prior: &HashMap<StepId, StepResult>,
) -> Result<HashMap<String, String>, EngineError> {
    let mut paths = HashMap::new();

    for input in &step.config.file_inputs {
        let resolved = match &input.depends_on {
            Some(dep) => {
                let result = prior.get(dep).ok_or_else(|| {
                    EngineError::DependencyMissing(format!(
                        "input '{}' needs step '{}', which has no result",
                        input.name, dep
                    ))
                })?;
                if !result.success {
                    return Err(EngineError::DependencyMissing(format!(
                        "input '{}' needs step '{}', which failed",
                        input.name, dep
                    )));
                }
                result
                    .output_path()
                    .ok_or_else(|| {
                        EngineError::DependencyMissing(format!(
                            "input '{}' needs step '{}', which produced no output path",
                            input.name, dep
                        ))
                    })?
                    .to_string()
            }
            None => {
                if input.path.trim().is_empty() {
                    return Err(EngineError::ConfigInvalid(format!(
                        "file input '{}' has no path",
                        input.name
                    )));
                }
                input.path.clone()
            }
        };
        paths.insert(input.name.clone(), resolved);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Endpoint, FileInput, PromptInput, StepConfig};
    use crate::llm::{Completion, FinishReason, LlmClient, LlmError};
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Echoes the user payload back, optionally wrapped in a fence
    struct EchoLlm {
        fenced: bool,
    }

    #[async_trait]
    impl LlmClient for EchoLlm {
        async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion, LlmError> {
            let payload = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            let content = if self.fenced {
                format!("Sure, here you go:\n```tsx\n{}\n```\nanything else?", payload)
            } else {
                payload
            };
            Ok(Completion::new(content, FinishReason::Stop))
        }
    }

    fn executor(fenced: bool) -> StepExecutor {
        let router = LlmRouter::with_clients(Arc::new(EchoLlm { fenced }), None, None);
        StepExecutor::new(Arc::new(router))
    }

    fn step_with(temp: &TempDir, prompt: &str, inputs: Vec<FileInput>) -> Step {
        Step {
            id: "s1".to_string(),
            order: 0,
            dependencies: vec![],
            config: StepConfig {
                file_inputs: inputs,
                prompt_inputs: vec![PromptInput {
                    content: prompt.to_string(),
                    file_references: vec![],
                }],
                output_folder: temp.path().join("out").to_string_lossy().to_string(),
                output_file_name: "result.tsx".to_string(),
                api_endpoint: Endpoint::ChatRelay,
            },
            status: Default::default(),
            result: None,
        }
    }

    fn seed_input(temp: &TempDir, name: &str, content: &str) -> FileInput {
        let path = temp.path().join(format!("{}.txt", name));
        std::fs::write(&path, content).unwrap();
        FileInput {
            name: name.to_string(),
            path: path.to_string_lossy().to_string(),
            depends_on: None,
        }
    }

    #[tokio::test]
    async fn test_happy_path_writes_output() {
        let temp = TempDir::new().unwrap();
        let input = seed_input(&temp, "src", "original content");
        let step = step_with(&temp, "convert this: {{src}}", vec![input]);

        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;

        assert!(result.success, "message: {}", result.message);
        let data = result.data.unwrap();
        let written = std::fs::read_to_string(data.path.as_ref().unwrap()).unwrap();
        assert_eq!(written, "convert this:\noriginal content");
        assert_eq!(data.size, Some(written.len() as u64));
        assert_eq!(data.content.as_deref(), Some(written.as_str()));
    }

    #[tokio::test]
    async fn test_fenced_reply_is_extracted() {
        let temp = TempDir::new().unwrap();
        let input = seed_input(&temp, "src", "body");
        let step = step_with(&temp, "{{src}}", vec![input]);

        let result = executor(true)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;

        assert!(result.success);
        assert_eq!(result.data.unwrap().content.as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn test_missing_inputs_fail_validation() {
        let temp = TempDir::new().unwrap();
        let mut step = step_with(&temp, "x", vec![]);
        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;
        assert!(!result.success);
        assert!(result.message.contains("no file inputs"));

        step = step_with(&temp, "x", vec![seed_input(&temp, "a", "1")]);
        step.config.prompt_inputs.clear();
        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;
        assert!(result.message.contains("no prompt inputs"));

        step = step_with(&temp, "x", vec![seed_input(&temp, "b", "1")]);
        step.config.output_file_name = String::new();
        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;
        assert!(result.message.contains("output folder or file name"));
    }

    #[tokio::test]
    async fn test_dependency_resolution() {
        let temp = TempDir::new().unwrap();
        let upstream_out = temp.path().join("upstream.tsx");
        std::fs::write(&upstream_out, "from upstream").unwrap();

        let step = step_with(
            &temp,
            "{{in}}",
            vec![FileInput {
                name: "in".to_string(),
                path: "ignored.txt".to_string(),
                depends_on: Some("s0".to_string()),
            }],
        );

        // Dependency result present and successful: its path wins
        let mut prior = HashMap::new();
        prior.insert(
            "s0".to_string(),
            StepResult::ok(
                "done",
                StepData {
                    path: Some(upstream_out.to_string_lossy().to_string()),
                    content: None,
                    size: None,
                },
            ),
        );
        let result = executor(false).execute(&step, &prior, &StopToken::new()).await;
        assert!(result.success);
        assert_eq!(result.data.unwrap().content.as_deref(), Some("from upstream"));

        // Absent result
        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;
        assert!(result.message.contains("has no result"));

        // Failed result
        let mut prior = HashMap::new();
        prior.insert("s0".to_string(), StepResult::failure("boom"));
        let result = executor(false).execute(&step, &prior, &StopToken::new()).await;
        assert!(result.message.contains("which failed"));

        // Successful result without a path
        let mut prior = HashMap::new();
        prior.insert("s0".to_string(), StepResult::ok("done", StepData::default()));
        let result = executor(false).execute(&step, &prior, &StopToken::new()).await;
        assert!(result.message.contains("no output path"));
    }

    #[tokio::test]
    async fn test_unknown_prompt_reference_fails() {
        let temp = TempDir::new().unwrap();
        let step = step_with(&temp, "{{nope}}", vec![seed_input(&temp, "src", "x")]);
        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;
        assert!(!result.success);
        assert!(result.message.contains("unknown file input 'nope'"));
    }

    #[tokio::test]
    async fn test_missing_file_on_disk_fails() {
        let temp = TempDir::new().unwrap();
        let step = step_with(
            &temp,
            "{{src}}",
            vec![FileInput {
                name: "src".to_string(),
                path: temp.path().join("ghost.txt").to_string_lossy().to_string(),
                depends_on: None,
            }],
        );
        let result = executor(false)
            .execute(&step, &HashMap::new(), &StopToken::new())
            .await;
        assert!(!result.success);
        assert!(result.message.contains("input file not found"));
    }

    #[tokio::test]
    async fn test_overwrite_default_and_strict_policy() {
        let temp = TempDir::new().unwrap();
        let input = seed_input(&temp, "src", "v1");
        let step = step_with(&temp, "{{src}}", vec![input]);

        // Default policy: second run overwrites
        let exec = executor(false);
        assert!(exec.execute(&step, &HashMap::new(), &StopToken::new()).await.success);
        assert!(exec.execute(&step, &HashMap::new(), &StopToken::new()).await.success);

        // Strict policy: refuses the existing output
        let router = LlmRouter::with_clients(Arc::new(EchoLlm { fenced: false }), None, None);
        let strict = StepExecutor::with_policy(Arc::new(router), ExecutionPolicy::strict());
        let result = strict.execute(&step, &HashMap::new(), &StopToken::new()).await;
        assert!(!result.success);
        assert!(result.message.contains("already exists"));
    }

    #[tokio::test]
    async fn test_deterministic_output() {
        let temp = TempDir::new().unwrap();
        let input = seed_input(&temp, "src", "stable");
        let step = step_with(&temp, "{{src}}", vec![input]);
        let exec = executor(false);

        let first = exec.execute(&step, &HashMap::new(), &StopToken::new()).await;
        let second = exec.execute(&step, &HashMap::new(), &StopToken::new()).await;

        assert_eq!(first.data.as_ref().unwrap().path, second.data.as_ref().unwrap().path);
        assert_eq!(first.data.unwrap().content, second.data.unwrap().content);
    }

    #[tokio::test]
    async fn test_stop_token_short_circuits() {
        let temp = TempDir::new().unwrap();
        let input = seed_input(&temp, "src", "x");
        let step = step_with(&temp, "{{src}}", vec![input]);

        let stop = StopToken::new();
        stop.trigger();
        let result = executor(false).execute(&step, &HashMap::new(), &stop).await;
        assert!(!result.success);
        assert!(result.message.contains("cancelled"));
        assert!(!temp.path().join("out").join("result.tsx").exists());
    }
}
