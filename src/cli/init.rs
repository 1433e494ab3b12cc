use crate::models::{TaskdConfig, TASKS_FILE};
use crate::context::{KNOWLEDGE_FILE, PROGRESS_FILE};
use crate::Result;
use colored::Colorize;
use dialoguer::Confirm;
use std::env;
use std::path::Path;

const TASKS_SKELETON: &str = include_str!("../../templates/skeletons/tasks.yaml");
const PROGRESS_SKELETON: &str = include_str!("../../templates/skeletons/progress.md");
const KNOWLEDGE_SKELETON: &str = include_str!("../../templates/skeletons/knowledge.md");

/// Bootstrap the taskd/ directory: config, task list skeleton, progress log,
/// and knowledge file.
pub fn run(name: Option<&str>, force: bool) -> Result<()> {
    let project_root = env::current_dir()?;
    let taskd_dir = project_root.join("taskd");

    if taskd_dir.exists() && !force {
        let proceed = Confirm::new()
            .with_prompt("taskd/ already exists. Refresh config and missing skeleton files?")
            .default(false)
            .interact()?;
        if !proceed {
            println!("{}", "Init cancelled.".dimmed());
            return Ok(());
        }
    }

    std::fs::create_dir_all(&taskd_dir)?;

    let mut config = TaskdConfig::default();
    if let Some(name) = name {
        config.project_name = name.to_string();
    }
    config.save(&project_root)?;

    // Skeletons never clobber user data unless forced
    write_skeleton(&project_root, TASKS_FILE, TASKS_SKELETON, force)?;
    write_skeleton(&project_root, PROGRESS_FILE, PROGRESS_SKELETON, force)?;
    write_skeleton(&project_root, KNOWLEDGE_FILE, KNOWLEDGE_SKELETON, force)?;

    println!("{}", format!("✅ Initialized taskd for '{}'", config.project_name).green());
    println!("\n{}", "⏭️  Next steps:".yellow());
    println!("   1. Fill in taskd/tasks.yaml (or draft a PRD with 'taskd prd')");
    println!("   2. Run: taskd run");
    Ok(())
}

fn write_skeleton(project_root: &Path, relative: &str, content: &str, force: bool) -> Result<()> {
    let path = project_root.join(relative);
    if path.exists() && !force {
        println!("{}", format!("   keeping existing {}", relative).dimmed());
        return Ok(());
    }
    std::fs::write(&path, content)?;
    println!("   wrote {}", relative);
    Ok(())
}
