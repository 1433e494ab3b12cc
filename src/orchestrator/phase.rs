//! Three-phase iteration state machine
//!
//! One iteration runs implement → review → finalize for a single task,
//! spawning one agent per phase. Review is skippable; finalize never runs
//! unless everything before it succeeded. A failed phase aborts the
//! iteration immediately and leaves all task-tracking files untouched, so
//! the next run re-selects the same task.
//!
//! Phase spawns are never retried; the retry policy applies only to the
//! single-shot text calls in [`super::client`].

use super::spawn::{AgentSpawner, ProcessSpawner, SpawnRequest, SpawnResult};
use crate::context;
use crate::models::{PhaseAssignment, TaskdConfig};
use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use std::path::PathBuf;

/// Printed by the implement agent when it finishes a task
pub const TASK_COMPLETE_MARKER: &str = "TASK COMPLETE:";
/// Printed by the finalize agent once the task is committed
pub const TASK_FINALIZED_MARKER: &str = "TASK FINALIZED:";

/// The three phases of one iteration, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Implement,
    Review,
    Finalize,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Implement => "implement",
            Phase::Review => "review",
            Phase::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What one iteration did, reported to the caller loop and then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationOutcome {
    /// Task the agent reported working on, when its marker was found
    pub task_id: Option<String>,
    pub phases_run: Vec<Phase>,
    pub final_exit_code: i32,
    pub aborted: bool,
}

/// Drives the phase sequence for one task at a time.
///
/// Holds no state across iterations; everything a later phase needs from an
/// earlier one (task id, review feedback) is passed explicitly.
pub struct PhaseOrchestrator<'a, S: AgentSpawner = ProcessSpawner> {
    config: &'a TaskdConfig,
    project_root: PathBuf,
    spawner: S,
}

impl<'a> PhaseOrchestrator<'a> {
    pub fn new(config: &'a TaskdConfig, project_root: impl Into<PathBuf>) -> Self {
        Self::with_spawner(config, project_root, ProcessSpawner)
    }
}

impl<'a, S: AgentSpawner> PhaseOrchestrator<'a, S> {
    pub fn with_spawner(config: &'a TaskdConfig, project_root: impl Into<PathBuf>, spawner: S) -> Self {
        Self {
            config,
            project_root: project_root.into(),
            spawner,
        }
    }

    /// Run exactly one iteration: implement, optionally review, finalize.
    ///
    /// Returns `Err` only when a phase process could not be run at all
    /// (binary missing, timeout, interrupt). An agent that ran and exited
    /// non-zero is an aborted iteration, not an error.
    pub async fn run_iteration(&self) -> Result<IterationOutcome> {
        let project_name = self.config.project_name.as_str();
        let mut phases_run = Vec::new();

        // ── Implement ────────────────────────────────────────────────────
        let prompt = context::implement_prompt(&self.project_root, project_name);
        let result = self.run_phase(Phase::Implement, prompt).await?;
        phases_run.push(Phase::Implement);
        if result.exit_code != 0 {
            return Ok(self.abort(Phase::Implement, &result, None, phases_run));
        }

        let task_id = extract_marker(&result.stdout, TASK_COMPLETE_MARKER);
        if task_id.is_none() {
            eprintln!(
                "{} implement agent printed no '{}' marker; continuing with an unidentified task",
                "⚠️".yellow(),
                TASK_COMPLETE_MARKER
            );
        }

        // ── Review (optional) ────────────────────────────────────────────
        let mut review_feedback: Option<String> = None;
        if self.config.skip_review {
            println!("{} review phase skipped", "↷".dimmed());
        } else {
            let prompt = context::review_prompt(&self.project_root, project_name, task_id.as_deref());
            let result = self.run_phase(Phase::Review, prompt).await?;
            phases_run.push(Phase::Review);
            if result.exit_code != 0 {
                // Finalize must not run: task files stay unmodified and the
                // same task is re-selected on the next iteration
                return Ok(self.abort(Phase::Review, &result, task_id, phases_run));
            }
            review_feedback = Some(result.stdout);
        }

        // ── Finalize ─────────────────────────────────────────────────────
        let prompt = context::finalize_prompt(
            &self.project_root,
            project_name,
            task_id.as_deref(),
            review_feedback.as_deref(),
        );
        let result = self.run_phase(Phase::Finalize, prompt).await?;
        phases_run.push(Phase::Finalize);
        if result.exit_code != 0 {
            return Ok(self.abort(Phase::Finalize, &result, task_id, phases_run));
        }

        match extract_marker(&result.stdout, TASK_FINALIZED_MARKER) {
            None => eprintln!(
                "{} finalize agent printed no '{}' marker; the commit may still have happened",
                "⚠️".yellow(),
                TASK_FINALIZED_MARKER
            ),
            Some(finalized) => {
                if let Some(expected) = task_id.as_deref() {
                    if finalized != expected {
                        eprintln!(
                            "{} finalize marker names '{}' but implement reported '{}'",
                            "⚠️".yellow(),
                            finalized,
                            expected
                        );
                    }
                }
            }
        }

        Ok(IterationOutcome {
            task_id,
            phases_run,
            final_exit_code: 0,
            aborted: false,
        })
    }

    fn assignment(&self, phase: Phase) -> &PhaseAssignment {
        match phase {
            Phase::Implement => &self.config.phases.implement,
            Phase::Review => &self.config.phases.review,
            Phase::Finalize => &self.config.phases.finalize,
        }
    }

    async fn run_phase(&self, phase: Phase, prompt: String) -> Result<SpawnResult> {
        let (agent, model) = self.config.resolve(self.assignment(phase));
        println!("{} {} phase → {} ({})", "▶".cyan(), phase, agent, model);

        let request = SpawnRequest {
            agent,
            prompt,
            working_dir: self.project_root.clone(),
            model: Some(model),
            timeout: self.config.timeout(),
        };
        self.spawner
            .spawn(request)
            .await
            .with_context(|| format!("{} phase could not run", phase))
    }

    /// Report a failed phase and build the aborted outcome. Never touches
    /// any task state; the failure is the agent's to explain via stderr.
    fn abort(
        &self,
        phase: Phase,
        result: &SpawnResult,
        task_id: Option<String>,
        phases_run: Vec<Phase>,
    ) -> IterationOutcome {
        eprintln!(
            "{} {} phase failed with exit code {}",
            "✗".red(),
            phase,
            result.exit_code
        );
        if !result.stderr.trim().is_empty() {
            eprintln!("{}", result.stderr.trim_end());
        }

        IterationOutcome {
            task_id,
            phases_run,
            final_exit_code: result.exit_code,
            aborted: true,
        }
    }
}

/// Best-effort extraction of `<marker> <task-id>` from agent stdout.
///
/// Agents echo prompts and wrap output in markdown, so the marker is
/// accepted anywhere in a line and the last occurrence wins. Returns None
/// when no marker is present; callers treat that as a warning, never a
/// failure.
pub fn extract_marker(stdout: &str, marker: &str) -> Option<String> {
    let pattern = format!(r"{}\s*([A-Za-z0-9][A-Za-z0-9._-]*)", regex::escape(marker));
    let re = Regex::new(&pattern).ok()?;
    re.captures_iter(stdout)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_marker_basic() {
        let stdout = "did some work\nTASK COMPLETE: task-007\n";
        assert_eq!(
            extract_marker(stdout, TASK_COMPLETE_MARKER),
            Some("task-007".to_string())
        );
    }

    #[test]
    fn test_extract_marker_last_occurrence_wins() {
        let stdout = "TASK COMPLETE: task-001\n...\nTASK COMPLETE: task-002\n";
        assert_eq!(
            extract_marker(stdout, TASK_COMPLETE_MARKER),
            Some("task-002".to_string())
        );
    }

    #[test]
    fn test_extract_marker_tolerates_decoration() {
        let stdout = "**TASK FINALIZED: task-9.2** all done";
        assert_eq!(
            extract_marker(stdout, TASK_FINALIZED_MARKER),
            Some("task-9.2".to_string())
        );
    }

    #[test]
    fn test_extract_marker_absent() {
        assert_eq!(extract_marker("no markers here", TASK_COMPLETE_MARKER), None);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Implement.name(), "implement");
        assert_eq!(Phase::Review.name(), "review");
        assert_eq!(Phase::Finalize.name(), "finalize");
    }
}
