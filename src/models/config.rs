//! taskd configuration
//!
//! Loaded from `taskd/config.toml`. Every field has a default so a project
//! with no config file still runs; the file only needs to name what it
//! overrides.

use crate::orchestrator::AgentKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_project_name() -> String {
    "My Project".to_string()
}

fn default_opencode_model() -> String {
    "anthropic/claude-sonnet-4-5".to_string()
}

fn default_claude_model() -> String {
    "sonnet".to_string()
}

/// opencode agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpencodeConfig {
    /// Default model, `provider/name` form
    #[serde(default = "default_opencode_model")]
    pub model: String,
}

impl Default for OpencodeConfig {
    fn default() -> Self {
        Self {
            model: default_opencode_model(),
        }
    }
}

/// claude agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// Default model name or short alias
    #[serde(default = "default_claude_model")]
    pub model: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            model: default_claude_model(),
        }
    }
}

/// Which agent runs a phase, and optionally with which model.
///
/// A missing model falls back to the agent section's default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseAssignment {
    pub agent: AgentKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl PhaseAssignment {
    fn new(agent: AgentKind) -> Self {
        Self { agent, model: None }
    }
}

/// Per-phase agent assignments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhasesConfig {
    #[serde(default = "PhasesConfig::default_implement")]
    pub implement: PhaseAssignment,
    #[serde(default = "PhasesConfig::default_review")]
    pub review: PhaseAssignment,
    #[serde(default = "PhasesConfig::default_finalize")]
    pub finalize: PhaseAssignment,
}

impl PhasesConfig {
    fn default_implement() -> PhaseAssignment {
        PhaseAssignment::new(AgentKind::Claude)
    }

    // Cross-agent review: the reviewer is never the implementer
    fn default_review() -> PhaseAssignment {
        PhaseAssignment::new(AgentKind::Opencode)
    }

    fn default_finalize() -> PhaseAssignment {
        PhaseAssignment::new(AgentKind::Claude)
    }
}

impl Default for PhasesConfig {
    fn default() -> Self {
        Self {
            implement: Self::default_implement(),
            review: Self::default_review(),
            finalize: Self::default_finalize(),
        }
    }
}

/// taskd configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskdConfig {
    /// Project name
    #[serde(default = "default_project_name")]
    pub project_name: String,

    /// Per-spawn timeout in seconds; 0 disables the timeout
    #[serde(default)]
    pub timeout_secs: u64,

    /// Skip the review phase on every iteration
    #[serde(default)]
    pub skip_review: bool,

    /// opencode configuration
    #[serde(default)]
    pub opencode: OpencodeConfig,

    /// claude configuration
    #[serde(default)]
    pub claude: ClaudeConfig,

    /// Per-phase agent assignments
    #[serde(default)]
    pub phases: PhasesConfig,

    /// Agent used for one-shot document generation
    #[serde(default = "TaskdConfig::default_generate")]
    pub generate: PhaseAssignment,
}

impl Default for TaskdConfig {
    fn default() -> Self {
        Self {
            project_name: default_project_name(),
            timeout_secs: 0,
            skip_review: false,
            opencode: OpencodeConfig::default(),
            claude: ClaudeConfig::default(),
            phases: PhasesConfig::default(),
            generate: Self::default_generate(),
        }
    }
}

impl TaskdConfig {
    fn default_generate() -> PhaseAssignment {
        PhaseAssignment::new(AgentKind::Claude)
    }

    /// Load config from taskd/config.toml, falling back to defaults when the
    /// file does not exist.
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let config_path = project_root.join("taskd/config.toml");
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: TaskdConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to taskd/config.toml
    pub fn save(&self, project_root: &Path) -> anyhow::Result<()> {
        let config_path = project_root.join("taskd/config.toml");
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Resolve an assignment to a concrete (agent, model) pair, applying the
    /// agent section's default model when the assignment names none.
    pub fn resolve(&self, assignment: &PhaseAssignment) -> (AgentKind, String) {
        let model = assignment.model.clone().unwrap_or_else(|| match assignment.agent {
            AgentKind::Opencode => self.opencode.model.clone(),
            AgentKind::Claude => self.claude.model.clone(),
        });
        (assignment.agent, model)
    }

    /// Per-spawn timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        if self.timeout_secs > 0 {
            Some(Duration::from_secs(self.timeout_secs))
        } else {
            None
        }
    }
}
