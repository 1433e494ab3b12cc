//! Task store records
//!
//! Tasks live in `taskd/tasks.yaml` and are owned by the agents: taskd only
//! ever reads them for display (`taskd status`). The orchestrator core never
//! opens this file; it refers to it by path inside prompts.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relative path of the task store inside a project
pub const TASKS_FILE: &str = "taskd/tasks.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        };
        f.write_str(label)
    }
}

/// One unit of work in the task store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// The full task store file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskStore {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl TaskStore {
    /// Load the task store from `<project_root>/taskd/tasks.yaml`.
    pub fn load(project_root: &Path) -> anyhow::Result<Self> {
        let path = project_root.join(TASKS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let store: TaskStore = serde_yaml::from_str(&content)?;
        Ok(store)
    }

    /// Tasks not yet done.
    pub fn remaining(&self) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(|t| t.status != TaskStatus::Done)
    }

    /// A task is workable once everything it depends on is done.
    pub fn is_unblocked(&self, task: &Task) -> bool {
        task.depends_on.iter().all(|dep| {
            self.tasks
                .iter()
                .any(|t| t.id == *dep && t.status == TaskStatus::Done)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
tasks:
  - id: task-001
    title: Set up project scaffolding
    status: done
  - id: task-002
    title: Implement the parser
    status: pending
    depends_on: [task-001]
  - id: task-003
    title: Wire up the CLI
    depends_on: [task-002]
"#;

    fn store() -> TaskStore {
        serde_yaml::from_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_parse_task_store() {
        let store = store();
        assert_eq!(store.tasks.len(), 3);
        assert_eq!(store.tasks[0].status, TaskStatus::Done);
        // Omitted status defaults to pending
        assert_eq!(store.tasks[2].status, TaskStatus::Pending);
    }

    #[test]
    fn test_remaining_excludes_done() {
        let store = store();
        let remaining: Vec<_> = store.remaining().map(|t| t.id.as_str()).collect();
        assert_eq!(remaining, vec!["task-002", "task-003"]);
    }

    #[test]
    fn test_unblocked_requires_done_dependencies() {
        let store = store();
        let task_002 = &store.tasks[1];
        let task_003 = &store.tasks[2];
        assert!(store.is_unblocked(task_002));
        assert!(!store.is_unblocked(task_003));
    }

    #[test]
    fn test_missing_file_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = TaskStore::load(dir.path()).unwrap();
        assert!(store.tasks.is_empty());
    }
}
