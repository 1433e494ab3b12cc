use crate::models::{TaskStatus, TaskStore};
use crate::Result;
use colored::Colorize;
use std::env;

/// Print a read-only summary of the task store.
pub fn run(json: bool) -> Result<()> {
    let project_root = env::current_dir()?;
    let store = TaskStore::load(&project_root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&store)?);
        return Ok(());
    }

    if store.tasks.is_empty() {
        println!("{}", "No tasks found. Run 'taskd init' to bootstrap a task list.".dimmed());
        return Ok(());
    }

    let mut done = 0;
    for task in &store.tasks {
        let label = match task.status {
            TaskStatus::Done => {
                done += 1;
                format!("✅ {}", task.id).green()
            }
            TaskStatus::InProgress => format!("🔨 {}", task.id).yellow(),
            TaskStatus::Pending => {
                if store.is_unblocked(task) {
                    format!("⏳ {}", task.id).normal()
                } else {
                    format!("🔒 {}", task.id).dimmed()
                }
            }
        };
        println!("{}  {}", label, task.title);
    }

    println!(
        "\n{} of {} tasks done",
        done.to_string().bold(),
        store.tasks.len()
    );
    Ok(())
}
