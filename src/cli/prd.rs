use crate::context;
use crate::models::TaskdConfig;
use crate::orchestrator::{AgentClient, AgentRequest};
use crate::Result;
use anyhow::Context as _;
use colored::Colorize;
use std::env;

const DEFAULT_OUTPUT: &str = "taskd/prd.md";

/// Draft a PRD from a one-line description and write it to a file.
pub async fn run(description: &str, output: Option<&str>) -> Result<()> {
    let project_root = env::current_dir()?;
    let config = TaskdConfig::load(&project_root)?;

    println!("{}", "📝 Drafting PRD...".cyan());

    let client = AgentClient::new(&config, &project_root);
    let prompt = context::prd_prompt(&config.project_name, description);
    let text = client
        .request(AgentRequest {
            prompt,
            system: None,
        })
        .await?;

    let output = output.unwrap_or(DEFAULT_OUTPUT);
    let output_path = project_root.join(output);
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output_path, format!("{}\n", text))
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!("{}", format!("✅ PRD written to {}", output).green());
    Ok(())
}
