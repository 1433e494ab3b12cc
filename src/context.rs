//! Prompt assembly for agent invocations
//!
//! Builds the prompt text for each phase from embedded templates. Prompts
//! reference the task list, progress log, and knowledge file by path; a
//! reference is included only when the file actually exists, so a half-
//! bootstrapped project still produces a valid prompt.

use crate::models::TASKS_FILE;
use std::path::Path;

/// Relative path of the progress log inside a project
pub const PROGRESS_FILE: &str = "taskd/progress.md";
/// Relative path of the shared knowledge file inside a project
pub const KNOWLEDGE_FILE: &str = "taskd/knowledge.md";

const IMPLEMENT_TEMPLATE: &str = include_str!("../templates/implement.md");
const REVIEW_TEMPLATE: &str = include_str!("../templates/review.md");
const FINALIZE_TEMPLATE: &str = include_str!("../templates/finalize.md");
const PRD_TEMPLATE: &str = include_str!("../templates/prd.md");

/// Build the implement-phase prompt.
pub fn implement_prompt(project_root: &Path, project_name: &str) -> String {
    IMPLEMENT_TEMPLATE
        .replace("{{PROJECT_NAME}}", project_name)
        .replace("{{CONTEXT}}", &context_block(project_root))
}

/// Build the review-phase prompt for the task the implement phase reported.
pub fn review_prompt(project_root: &Path, project_name: &str, task_id: Option<&str>) -> String {
    REVIEW_TEMPLATE
        .replace("{{PROJECT_NAME}}", project_name)
        .replace("{{TASK_ID}}", &task_label(task_id))
        .replace("{{CONTEXT}}", &context_block(project_root))
}

/// Build the finalize-phase prompt, carrying review feedback when review ran.
pub fn finalize_prompt(
    project_root: &Path,
    project_name: &str,
    task_id: Option<&str>,
    review_feedback: Option<&str>,
) -> String {
    let feedback_block = match review_feedback {
        Some(feedback) if !feedback.trim().is_empty() => {
            format!("\n## Review feedback\n\n{}\n", feedback.trim())
        }
        _ => String::new(),
    };

    FINALIZE_TEMPLATE
        .replace("{{PROJECT_NAME}}", project_name)
        .replace("{{TASK_ID}}", &task_label(task_id))
        .replace("{{CONTEXT}}", &context_block(project_root))
        .replace("{{REVIEW_FEEDBACK}}", &feedback_block)
}

/// Build the one-shot PRD generation prompt.
pub fn prd_prompt(project_name: &str, description: &str) -> String {
    PRD_TEMPLATE
        .replace("{{PROJECT_NAME}}", project_name)
        .replace("{{DESCRIPTION}}", description)
}

fn task_label(task_id: Option<&str>) -> String {
    match task_id {
        Some(id) => format!("task `{}`", id),
        None => "the task you just implemented".to_string(),
    }
}

/// List the state files an agent should read, skipping any that do not
/// exist yet.
fn context_block(project_root: &Path) -> String {
    let references: Vec<String> = [
        (TASKS_FILE, "Task list"),
        (PROGRESS_FILE, "Progress log"),
        (KNOWLEDGE_FILE, "Project knowledge"),
    ]
    .iter()
    .filter(|(path, _)| project_root.join(path).exists())
    .map(|(path, label)| format!("- {}: `{}`", label, path))
    .collect();

    if references.is_empty() {
        String::new()
    } else {
        format!("## Project context\n\n{}", references.join("\n"))
    }
}
