// Taskd - AI Agent Task-Loop Orchestrator
// Drives autonomous implement/review/finalize iterations over a flat-file task list

pub mod cli;
pub mod context;
pub mod models;
pub mod orchestrator;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use models::{Task, TaskStatus, TaskStore, TaskdConfig};
pub use orchestrator::{AgentKind, IterationOutcome, Phase, PhaseOrchestrator, SpawnRequest, SpawnResult};
