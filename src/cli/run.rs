use crate::models::TaskdConfig;
use crate::orchestrator::PhaseOrchestrator;
use crate::Result;
use colored::Colorize;
use std::env;

/// Run up to `iterations` sequential task iterations, stopping immediately
/// on the first aborted one. Each iteration is independent: a failed
/// finalize leaves the task pending and the next run picks it up again.
pub async fn run(iterations: u32, skip_review: bool, timeout_secs: Option<u64>) -> Result<()> {
    let project_root = env::current_dir()?;
    let mut config = TaskdConfig::load(&project_root)?;

    if skip_review {
        config.skip_review = true;
    }
    if let Some(secs) = timeout_secs {
        config.timeout_secs = secs;
    }

    for iteration in 1..=iterations {
        println!(
            "\n{} {}",
            format!("🔁 Iteration {}/{}", iteration, iterations).cyan().bold(),
            chrono::Local::now().format("%H:%M:%S").to_string().dimmed()
        );

        let orchestrator = PhaseOrchestrator::new(&config, &project_root);
        let outcome = orchestrator.run_iteration().await?;

        if outcome.aborted {
            let phase = outcome
                .phases_run
                .last()
                .map(|p| p.name())
                .unwrap_or("unknown");
            anyhow::bail!(
                "iteration {} aborted during the {} phase (exit code {}); \
                 the task is still pending and will be retried on the next run",
                iteration,
                phase,
                outcome.final_exit_code
            );
        }

        let phases: Vec<&str> = outcome.phases_run.iter().map(|p| p.name()).collect();
        match &outcome.task_id {
            Some(id) => println!(
                "{}",
                format!("✅ {} finalized ({})", id, phases.join(" → ")).green()
            ),
            None => println!(
                "{}",
                format!("✅ Iteration complete ({}), task id unknown", phases.join(" → ")).green()
            ),
        }
    }

    println!("\n{}", "🎉 All iterations complete!".green().bold());
    Ok(())
}
