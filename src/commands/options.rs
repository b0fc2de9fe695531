use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use clap::Args;
use owo_colors::OwoColorize;
use serde_json::Value;

use crate::config::{self, ProfileConfig};
use crate::gemini::client::{GeminiClient, GenerateOptions, Usage};
use crate::gemini::invoke::{self, Invocation, InvokeEvent, RetryPolicy};
use crate::gemini::model;
use crate::gemini::prompt::PromptParts;

/// Invocation flags shared by every AI-backed command.
#[derive(Debug, Args, Clone, Default)]
pub struct AiOptions {
    /// Pin a single model and skip candidate selection
    #[arg(long)]
    pub model: Option<String>,

    /// Override the ranked candidate list (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Attempt ceiling per candidate model on quota errors
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Linear backoff unit in milliseconds
    #[arg(long)]
    pub backoff: Option<u64>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum output tokens
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Skip the strategist persona preamble
    #[arg(long)]
    pub no_persona: bool,

    /// Skip the advisory list-models call
    #[arg(long)]
    pub no_discovery: bool,

    /// Print the request as JSON without calling the provider
    #[arg(long)]
    pub dry_run: bool,

    /// Shorthand for --output json
    #[arg(long)]
    pub json: bool,

    /// Output mode: text or json
    #[arg(long)]
    pub output: Option<String>,

    /// Write the result record to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Report token usage and latency on stderr
    #[arg(long)]
    pub show_usage: bool,

    /// Verbose diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,

    /// Suppress non-fatal stderr output
    #[arg(long)]
    pub quiet: bool,

    /// Load defaults from a named config profile
    #[arg(long)]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

impl OutputMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Fully resolved invocation settings (CLI > env > profile > default).
#[derive(Debug, Clone)]
pub struct ResolvedAi {
    /// Static candidate list before advisory discovery.
    pub candidates: Vec<String>,
    /// True when a single model was pinned explicitly.
    pub pinned: bool,
    pub policy: RetryPolicy,
    pub options: GenerateOptions,
    pub persona: bool,
    pub discovery: bool,
    pub output: OutputMode,
    pub dry_run: bool,
    pub save: Option<PathBuf>,
    pub show_usage: bool,
    pub verbose: bool,
    pub quiet: bool,
}

pub fn resolve(args: &AiOptions) -> Result<ResolvedAi, String> {
    let profile = match &args.profile {
        Some(name) => {
            let profile = config::load_profile(name)?;
            config::validate_profile(&profile)?;
            profile
        }
        None => ProfileConfig::default(),
    };

    let pinned_model = first_of(
        args.model.clone(),
        env_string("TS_MODEL"),
        profile.model.clone(),
    );
    let model_list = first_of(
        args.models.clone(),
        env_list("TS_MODELS"),
        profile.models.clone(),
    );

    let (candidates, pinned) = match (pinned_model, model_list) {
        (Some(model), _) => (vec![model], true),
        (None, Some(models)) => (models, false),
        (None, None) => (model::default_candidates(), false),
    };
    if candidates.is_empty() {
        return Err("No candidate models configured.".to_string());
    }

    let attempts = first_of(
        args.attempts,
        env_parse::<u32>("TS_ATTEMPTS")?,
        profile.attempts,
    )
    .unwrap_or(RetryPolicy::default().attempts_per_model);
    if attempts == 0 {
        return Err("Invalid attempts '0'. Must be at least 1.".to_string());
    }
    let backoff = first_of(
        args.backoff,
        env_parse::<u64>("TS_BACKOFF")?,
        profile.backoff,
    )
    .unwrap_or(RetryPolicy::default().backoff_unit_ms);

    let output = if args.json {
        OutputMode::Json
    } else {
        let value = first_of(
            args.output.clone(),
            env_string("TS_OUTPUT"),
            profile.output.clone(),
        );
        match value.as_deref() {
            None | Some("text") => OutputMode::Text,
            Some("json") => OutputMode::Json,
            Some(other) => {
                return Err(format!(
                    "Invalid output '{other}'. Supported values: text, json."
                ));
            }
        }
    };

    Ok(ResolvedAi {
        candidates,
        pinned,
        policy: RetryPolicy {
            attempts_per_model: attempts,
            backoff_unit_ms: backoff,
        },
        options: GenerateOptions {
            temperature: first_of(
                args.temperature,
                env_parse::<f32>("TS_TEMPERATURE")?,
                profile.temperature,
            ),
            max_output_tokens: first_of(
                args.max_tokens,
                env_parse::<u32>("TS_MAX_TOKENS")?,
                profile.max_tokens,
            ),
            timeout_secs: first_of(
                args.timeout,
                env_parse::<u64>("TS_TIMEOUT")?,
                profile.timeout,
            ),
        },
        persona: if args.no_persona {
            false
        } else {
            profile.persona.unwrap_or(true)
        },
        discovery: !args.no_discovery,
        output,
        dry_run: args.dry_run,
        save: args.save.clone(),
        show_usage: args.show_usage || profile.show_usage.unwrap_or(false),
        verbose: args.verbose,
        quiet: args.quiet,
    })
}

fn first_of<T>(cli: Option<T>, env: Option<T>, profile: Option<T>) -> Option<T> {
    cli.or(env).or(profile)
}

fn env_string(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env_string(key).map(|value| {
        value
            .split(',')
            .map(|entry| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect()
    })
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>, String> {
    match env_string(key) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid {key} '{raw}'.")),
        None => Ok(None),
    }
}

pub fn gemini_api_key() -> Result<String, String> {
    env_string("GEMINI_API_KEY")
        .ok_or_else(|| "GEMINI_API_KEY is not set in the environment.".to_string())
}

pub fn youtube_api_key() -> Result<String, String> {
    env_string("YOUTUBE_API_KEY")
        .ok_or_else(|| "YOUTUBE_API_KEY is not set in the environment.".to_string())
}

/// Verbose-only stderr line, silenced by --quiet.
pub fn vlog(resolved: &ResolvedAi, message: &str) {
    if resolved.verbose && !resolved.quiet {
        eprintln!("{} {message}", "[tubestrat]".dimmed());
    }
}

/// Runs discovery plus the retry/fallback invocation, timing the whole thing.
pub async fn run_invocation(
    client: &GeminiClient,
    resolved: &ResolvedAi,
    parts: &PromptParts,
) -> Result<(Invocation, u128), String> {
    let candidates = if resolved.discovery && !resolved.pinned {
        let ranked = invoke::resolve_candidates(client, &resolved.candidates).await;
        vlog(resolved, &format!("candidates: {}", ranked.join(", ")));
        ranked
    } else {
        resolved.candidates.clone()
    };

    let started = Instant::now();
    let outcome = invoke::run(
        client,
        &candidates,
        parts,
        resolved.options,
        &resolved.policy,
        |event| match event {
            InvokeEvent::CoolingDown {
                model,
                attempt,
                wait,
            } => vlog(
                resolved,
                &format!(
                    "{model} hit its quota (attempt {attempt}), cooling down for {}ms",
                    wait.as_millis()
                ),
            ),
            InvokeEvent::Advancing { model, error } => {
                vlog(resolved, &format!("advancing past {model}: {error}"));
            }
        },
    )
    .await
    .map_err(|error| error.to_string())?;

    Ok((outcome, started.elapsed().as_millis()))
}

/// Usage summary for stderr, matching the dry-run placeholder format.
pub fn usage_line(usage: Option<&Usage>, latency_ms: u128) -> String {
    match usage {
        Some(usage) => format!(
            "usage: prompt={} completion={} total={} latency_ms={latency_ms}",
            usage.prompt_tokens.unwrap_or(0),
            usage.completion_tokens.unwrap_or(0),
            usage.total_tokens.unwrap_or(0),
        ),
        None => format!("usage: unavailable latency_ms={latency_ms}"),
    }
}

pub fn report_usage(resolved: &ResolvedAi, usage: Option<&Usage>, latency_ms: u128) {
    if resolved.show_usage && !resolved.quiet {
        eprintln!("{}", usage_line(usage, latency_ms));
    }
}

/// Writes a JSON record to the --save target, creating parent directories.
pub fn save_record(path: &Path, record: &Value) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create output directory '{}': {err}",
                    parent.display()
                )
            })?;
        }
    }
    let body = serde_json::to_string(record)
        .map_err(|err| format!("Failed to serialize output record: {err}"))?;
    fs::write(path, body)
        .map_err(|err| format!("Failed to write output file '{}': {err}", path.display()))
}
