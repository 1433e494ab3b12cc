use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use taskd::Result;

#[derive(Parser)]
#[command(name = "taskd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AI agent task-loop orchestrator", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run implement → review → finalize iterations over pending tasks
    Run {
        /// Number of iterations to run
        #[arg(short = 'n', long, default_value_t = 1)]
        iterations: u32,

        /// Skip the review phase
        #[arg(long)]
        skip_review: bool,

        /// Per-agent timeout in seconds (overrides config; 0 disables)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Draft a PRD with the document-generation agent
    Prd {
        /// One-line feature description
        description: String,

        /// Output file (default: taskd/prd.md)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show task list status
    Status {
        /// Output in JSON format
        #[arg(short, long)]
        json: bool,
    },

    /// Initialize taskd in the current directory
    Init {
        /// Project name
        #[arg(short, long)]
        name: Option<String>,

        /// Overwrite existing skeleton files without confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            iterations,
            skip_review,
            timeout,
        } => taskd::cli::run::run(iterations, skip_review, timeout).await,
        Commands::Prd {
            description,
            output,
        } => taskd::cli::prd::run(&description, output.as_deref()).await,
        Commands::Status { json } => taskd::cli::status::run(json),
        Commands::Init { name, force } => taskd::cli::init::run(name.as_deref(), force),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "taskd", &mut io::stdout());
            Ok(())
        }
    }
}
