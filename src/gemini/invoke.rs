use std::fmt;
use std::time::Duration;

use tokio::time::sleep;

use crate::gemini::client::{GenerateBackend, GenerateFailure, GenerateOptions, Usage};
use crate::gemini::model;
use crate::gemini::prompt::PromptParts;

/// Retry knobs for one invocation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Attempt ceiling per candidate model (quota retries included).
    pub attempts_per_model: u32,
    /// Linear backoff unit: the n-th retry waits n times this long.
    pub backoff_unit_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts_per_model: 3,
            backoff_unit_ms: 2_000,
        }
    }
}

/// Wait before retrying the same model after `attempt` quota failures.
pub fn quota_backoff(policy: &RetryPolicy, attempt: u32) -> Duration {
    Duration::from_millis(policy.backoff_unit_ms.saturating_mul(u64::from(attempt)))
}

/// Successful terminal state of the invocation state machine.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub text: String,
    /// Model that produced the reply.
    pub model: String,
    pub usage: Option<Usage>,
    /// Total generate calls made, across all candidates.
    pub calls: u32,
}

/// Failing terminal state of the invocation state machine.
#[derive(Debug)]
pub enum InvocationError {
    EmptyPrompt,
    NoCandidates,
    Exhausted {
        /// Candidates tried, in order.
        attempted: Vec<String>,
        /// True when the final failure was a quota signal.
        quota_limited: bool,
        last_error: String,
    },
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPrompt => write!(f, "Prompt is empty."),
            Self::NoCandidates => write!(f, "No candidate models configured."),
            Self::Exhausted {
                attempted,
                quota_limited,
                last_error,
            } => {
                if *quota_limited {
                    write!(
                        f,
                        "AI is rate limited across all {} candidate model(s). \
                         Please wait a moment and retry.",
                        attempted.len()
                    )
                } else {
                    write!(f, "AI error: {last_error}")
                }
            }
        }
    }
}

impl std::error::Error for InvocationError {}

/// Mid-flight progress notifications, for cosmetic reporting only.
#[derive(Debug)]
pub enum InvokeEvent<'a> {
    /// Quota hit; waiting before retrying the same model.
    CoolingDown {
        model: &'a str,
        attempt: u32,
        wait: Duration,
    },
    /// Candidate failed for good; moving to the next one.
    Advancing {
        model: &'a str,
        error: &'a GenerateFailure,
    },
}

/// Resolves the candidate list via advisory live discovery.
///
/// A failed discovery call degrades to the static preference list, so the
/// invocation proceeds identically to skipping discovery altogether.
pub async fn resolve_candidates<B: GenerateBackend>(
    backend: &B,
    preferred: &[String],
) -> Vec<String> {
    match backend.list_models().await {
        Ok(live) => model::rank_candidates(preferred, &live),
        Err(_) => preferred.to_vec(),
    }
}

/// Runs one invocation to a terminal state.
///
/// Candidates are tried in order. A quota failure retries the same model
/// after a linearly growing wait, up to the policy ceiling; any other
/// failure advances to the next candidate immediately. The winning model is
/// not remembered across invocations.
pub async fn run<B, F>(
    backend: &B,
    candidates: &[String],
    parts: &PromptParts,
    options: GenerateOptions,
    policy: &RetryPolicy,
    mut notify: F,
) -> Result<Invocation, InvocationError>
where
    B: GenerateBackend,
    F: FnMut(InvokeEvent<'_>),
{
    if parts.is_empty() {
        return Err(InvocationError::EmptyPrompt);
    }
    if candidates.is_empty() {
        return Err(InvocationError::NoCandidates);
    }

    let mut attempted = Vec::with_capacity(candidates.len());
    let mut last_error: Option<GenerateFailure> = None;
    let mut calls = 0u32;

    for model in candidates {
        attempted.push(model.clone());
        let mut attempt = 1u32;

        loop {
            calls += 1;
            match backend.generate(model, parts, options).await {
                Ok(reply) => {
                    return Ok(Invocation {
                        text: reply.text,
                        model: model.clone(),
                        usage: reply.usage,
                        calls,
                    });
                }
                Err(failure) if failure.is_quota() && attempt < policy.attempts_per_model => {
                    let wait = quota_backoff(policy, attempt);
                    notify(InvokeEvent::CoolingDown {
                        model,
                        attempt,
                        wait,
                    });
                    last_error = Some(failure);
                    sleep(wait).await;
                    attempt += 1;
                }
                Err(failure) => {
                    notify(InvokeEvent::Advancing {
                        model,
                        error: &failure,
                    });
                    last_error = Some(failure);
                    break;
                }
            }
        }
    }

    let quota_limited = last_error.as_ref().is_some_and(GenerateFailure::is_quota);
    Err(InvocationError::Exhausted {
        attempted,
        quota_limited,
        last_error: last_error
            .map(|failure| failure.to_string())
            .unwrap_or_default(),
    })
}
