//! Single-shot agent calls
//!
//! Adapts the process spawner into a plain request/response shape for
//! document generation: one prompt in, one trimmed text response out.
//! Unlike phase spawns, these calls go through the retry policy, since a
//! transient network failure on a text call is worth a second attempt.

use super::retry::{classify, retry_with_backoff, BackoffOptions, ErrorKind};
use super::spawn::{AgentSpawner, ProcessSpawner, SpawnError, SpawnRequest};
use crate::models::TaskdConfig;
use std::path::PathBuf;

/// One document-generation request.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub prompt: String,
    pub system: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentCallError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error("agent exited with code {exit_code}: {}", .stderr.trim())]
    Failed { exit_code: i32, stderr: String },
}

impl AgentCallError {
    /// Classification used to decide retry eligibility.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentCallError::Spawn(SpawnError::Launch { .. }) => ErrorKind::AgentNotFound,
            AgentCallError::Spawn(SpawnError::Timeout { .. }) => ErrorKind::Timeout,
            AgentCallError::Spawn(_) => ErrorKind::Unclassified,
            AgentCallError::Failed { exit_code, stderr } => classify(stderr, *exit_code),
        }
    }
}

/// Request/response client over the `generate` agent assignment.
pub struct AgentClient<'a, S: AgentSpawner = ProcessSpawner> {
    config: &'a TaskdConfig,
    project_root: PathBuf,
    spawner: S,
    backoff: BackoffOptions,
}

impl<'a> AgentClient<'a> {
    pub fn new(config: &'a TaskdConfig, project_root: impl Into<PathBuf>) -> Self {
        Self::with_spawner(config, project_root, ProcessSpawner)
    }
}

impl<'a, S: AgentSpawner> AgentClient<'a, S> {
    pub fn with_spawner(config: &'a TaskdConfig, project_root: impl Into<PathBuf>, spawner: S) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            spawner,
            backoff: BackoffOptions::default(),
        }
    }

    /// Send one prompt and return the agent's stdout, trimmed.
    ///
    /// Network failures and timeouts are retried with backoff; everything
    /// else (rate limits, unknown models, agent crashes) surfaces on the
    /// first occurrence.
    pub async fn request(&self, request: AgentRequest) -> Result<String, AgentCallError> {
        let (agent, model) = self.config.resolve(&self.config.generate);
        let prompt = match request.system.as_deref() {
            Some(system) => format!("{}\n\n{}", system.trim(), request.prompt),
            None => request.prompt,
        };

        retry_with_backoff(
            || {
                let prompt = prompt.clone();
                let model = model.clone();
                async move {
                    let result = self
                        .spawner
                        .spawn(SpawnRequest {
                            agent,
                            prompt,
                            working_dir: self.project_root.clone(),
                            model: Some(model),
                            timeout: self.config.timeout(),
                        })
                        .await?;

                    if result.exit_code != 0 {
                        return Err(AgentCallError::Failed {
                            exit_code: result.exit_code,
                            stderr: result.stderr,
                        });
                    }
                    Ok(result.stdout.trim().to_string())
                }
            },
            |error| matches!(error.kind(), ErrorKind::Network | ErrorKind::Timeout),
            self.backoff,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::spawn::SpawnResult;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedSpawner {
        responses: Mutex<VecDeque<Result<SpawnResult, SpawnError>>>,
        requests: Mutex<Vec<SpawnRequest>>,
    }

    impl ScriptedSpawner {
        fn new(responses: Vec<Result<SpawnResult, SpawnError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl AgentSpawner for ScriptedSpawner {
        async fn spawn(&self, request: SpawnRequest) -> Result<SpawnResult, SpawnError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("spawner called more times than scripted")
        }
    }

    fn ok(exit_code: i32, stdout: &str, stderr: &str) -> Result<SpawnResult, SpawnError> {
        Ok(SpawnResult {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })
    }

    #[tokio::test]
    async fn test_response_is_trimmed_stdout() {
        let config = TaskdConfig::default();
        let spawner = ScriptedSpawner::new(vec![ok(0, "\n  the document\n\n", "")]);
        let client = AgentClient::with_spawner(&config, ".", spawner);

        let response = client
            .request(AgentRequest {
                prompt: "write a haiku".to_string(),
                system: None,
            })
            .await
            .unwrap();
        assert_eq!(response, "the document");
    }

    #[tokio::test]
    async fn test_system_text_prepended_to_prompt() {
        let config = TaskdConfig::default();
        let spawner = ScriptedSpawner::new(vec![ok(0, "ok", "")]);
        let client = AgentClient::with_spawner(&config, ".", spawner);

        client
            .request(AgentRequest {
                prompt: "the prompt".to_string(),
                system: Some("you are terse".to_string()),
            })
            .await
            .unwrap();

        let requests = client.spawner.requests.lock().unwrap();
        assert!(requests[0].prompt.starts_with("you are terse\n\nthe prompt"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_surfaces_stderr() {
        let config = TaskdConfig::default();
        let spawner = ScriptedSpawner::new(vec![ok(2, "", "something broke")]);
        let client = AgentClient::with_spawner(&config, ".", spawner);

        let err = client
            .request(AgentRequest {
                prompt: "p".to_string(),
                system: None,
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("something broke"));
        assert_eq!(client.spawner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_retried_then_succeeds() {
        let config = TaskdConfig::default();
        let spawner = ScriptedSpawner::new(vec![
            ok(1, "", "connect ECONNREFUSED 127.0.0.1:443"),
            ok(1, "", "connect ECONNREFUSED 127.0.0.1:443"),
            ok(0, "made it", ""),
        ]);
        let client = AgentClient::with_spawner(&config, ".", spawner);

        let response = client
            .request(AgentRequest {
                prompt: "p".to_string(),
                system: None,
            })
            .await
            .unwrap();
        assert_eq!(response, "made it");
        assert_eq!(client.spawner.calls(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_not_retried() {
        let config = TaskdConfig::default();
        let spawner = ScriptedSpawner::new(vec![ok(1, "", "429 Too Many Requests")]);
        let client = AgentClient::with_spawner(&config, ".", spawner);

        let err = client
            .request(AgentRequest {
                prompt: "p".to_string(),
                system: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(client.spawner.calls(), 1);
    }

    #[tokio::test]
    async fn test_launch_failure_maps_to_agent_not_found() {
        let config = TaskdConfig::default();
        let spawner = ScriptedSpawner::new(vec![Err(SpawnError::Launch {
            command: "claude",
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })]);
        let client = AgentClient::with_spawner(&config, ".", spawner);

        let err = client
            .request(AgentRequest {
                prompt: "p".to_string(),
                system: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AgentNotFound);
        assert_eq!(client.spawner.calls(), 1);
    }
}
