pub mod agent;
pub mod client;
pub mod phase;
pub mod retry;
pub mod spawn;

pub use agent::AgentKind;
pub use client::{AgentCallError, AgentClient, AgentRequest};
pub use phase::{IterationOutcome, Phase, PhaseOrchestrator};
pub use retry::{classify, retry_with_backoff, BackoffOptions, ErrorKind};
pub use spawn::{AgentSpawner, ProcessSpawner, SpawnError, SpawnRequest, SpawnResult};
