//! Failure classification and bounded-backoff retry
//!
//! Classification is substring matching over stderr text; it decides which
//! failures are worth retrying. The retry wrapper itself knows nothing about
//! subprocesses: eligibility is a predicate supplied by the call site, so
//! phase spawns (never retried) and AgentClient calls (network failures
//! retried) share one backoff loop.

use std::future::Future;
use std::time::Duration;

/// What a failed agent invocation most likely means.
///
/// Derived on demand from stderr text and the exit code; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient connectivity failure; the only kind worth retrying
    Network,
    /// Provider rate limit; will not clear within a backoff window
    RateLimit,
    /// Requested model rejected by the provider
    ModelUnavailable,
    /// The process exceeded its allotted time
    Timeout,
    /// The agent binary itself could not be found
    AgentNotFound,
    Unclassified,
}

const NETWORK_PATTERNS: &[&str] = &[
    "econnrefused",
    "econnreset",
    "etimedout",
    "enotfound",
    "eai_again",
    "connection refused",
    "connection reset",
    "network error",
    "network is unreachable",
    "dns",
    "socket hang up",
    "fetch failed",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "rate-limit",
    "rate_limit",
    "too many requests",
    "429",
    "quota exceeded",
    "overloaded",
];

const AGENT_NOT_FOUND_PATTERNS: &[&str] = &["command not found", "enoent", "no such file or directory"];

/// Classify an agent failure from its stderr text and exit code.
///
/// Matching is case-insensitive and tolerant: agents phrase errors
/// differently across versions, so this looks for well-known fragments
/// rather than exact messages.
pub fn classify(stderr: &str, exit_code: i32) -> ErrorKind {
    let text = stderr.to_lowercase();

    // 127 is the shell's command-not-found exit code
    if exit_code == 127 || AGENT_NOT_FOUND_PATTERNS.iter().any(|p| text.contains(p)) {
        return ErrorKind::AgentNotFound;
    }
    if RATE_LIMIT_PATTERNS.iter().any(|p| text.contains(p)) {
        return ErrorKind::RateLimit;
    }
    if text.contains("model") && (text.contains("not found") || text.contains("unavailable")) {
        return ErrorKind::ModelUnavailable;
    }
    if NETWORK_PATTERNS.iter().any(|p| text.contains(p)) {
        return ErrorKind::Network;
    }

    ErrorKind::Unclassified
}

/// Backoff parameters for one retry loop.
#[derive(Debug, Clone, Copy)]
pub struct BackoffOptions {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffOptions {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

/// Delay before retry number `attempt` (0-based): doubles from the initial
/// delay, capped at the ceiling.
pub fn backoff_delay(attempt: u32, options: &BackoffOptions) -> Duration {
    let doubled = options
        .initial_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    doubled.min(options.max_delay)
}

/// Run `operation` until it succeeds, retrying failures that `is_retryable`
/// accepts, sleeping an exponentially growing delay between attempts.
///
/// The last error is returned once attempts are exhausted or the failure is
/// not eligible. An interrupt received during a backoff delay aborts the
/// wait and surfaces the error immediately instead of finishing the sleep.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    mut operation: F,
    is_retryable: R,
    options: BackoffOptions,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    R: Fn(&E) -> bool,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                attempt += 1;
                if attempt >= options.max_attempts || !is_retryable(&error) {
                    return Err(error);
                }
                let delay = backoff_delay(attempt - 1, &options);
                eprintln!(
                    "⚠️  Attempt {}/{} failed ({}), retrying in {:.1}s...",
                    attempt,
                    options.max_attempts,
                    error,
                    delay.as_secs_f64()
                );
                if interrupted_during(delay).await {
                    return Err(error);
                }
            }
        }
    }
}

/// Sleep for `delay`, waking early on Ctrl-C. Returns true when interrupted.
async fn interrupted_during(delay: Duration) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        result = tokio::signal::ctrl_c() => result.is_ok(),
    }
}
