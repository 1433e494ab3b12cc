//! Agent-kind CLI argument mapping
//!
//! Maps a uniform spawn contract onto the two supported agent CLIs,
//! which take prompts and model flags in different shapes.

use serde::{Deserialize, Serialize};

/// Model names passed to opencode must carry a `provider/` prefix.
/// Bare names from config are qualified with this default.
const OPENCODE_DEFAULT_PROVIDER: &str = "anthropic";

/// Supported agent CLIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// opencode: `opencode run [--model provider/<name>] <prompt>`
    Opencode,
    /// claude: `claude --print [--model <name-or-alias>] <prompt>`
    Claude,
}

impl AgentKind {
    /// Get the CLI command name
    pub fn command(&self) -> &'static str {
        match self {
            AgentKind::Opencode => "opencode",
            AgentKind::Claude => "claude",
        }
    }

    /// Build the full argument vector for a non-interactive invocation.
    ///
    /// The prompt is always the final positional argument, passed as a single
    /// literal string. Nothing here goes through a shell, so prompts may
    /// contain quotes, `$`, backticks, or newlines without escaping.
    pub fn build_args(&self, prompt: &str, model: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();

        match self {
            AgentKind::Opencode => {
                args.push("run".to_string());
                if let Some(model) = model {
                    args.push("--model".to_string());
                    args.push(Self::qualify_opencode_model(model));
                }
            }
            AgentKind::Claude => {
                args.push("--print".to_string());
                if let Some(model) = model {
                    // Claude accepts bare model names and short aliases
                    args.push("--model".to_string());
                    args.push(model.to_string());
                }
            }
        }

        args.push(prompt.to_string());
        args
    }

    /// opencode rejects bare model names; qualify with the default provider
    /// unless the config already supplied one.
    fn qualify_opencode_model(model: &str) -> String {
        if model.contains('/') {
            model.to_string()
        } else {
            format!("{}/{}", OPENCODE_DEFAULT_PROVIDER, model)
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.command())
    }
}
