use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::commands::options::{
    self, AiOptions, OutputMode, ResolvedAi, gemini_api_key, report_usage, run_invocation,
    save_record, vlog,
};
use crate::gemini::client::{self, GeminiClient};
use crate::gemini::prompt::{self, InlineImage, PromptParts};

#[derive(Debug, Args, Clone)]
pub struct AskArgs {
    /// Prompt text; read from stdin when omitted
    #[arg(value_name = "PROMPT")]
    pub prompt: Option<String>,

    /// Attach a local image to the prompt
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Print build metadata and exit
    #[arg(long)]
    pub version: bool,

    #[command(flatten)]
    pub ai: AiOptions,
}

pub async fn run(args: AskArgs) -> Result<(), String> {
    if args.version {
        println!(
            "tubestrat {} (commit: {}, built: {})",
            env!("CARGO_PKG_VERSION"),
            env!("TS_GIT_SHA"),
            env!("TS_BUILD_TS"),
        );
        return Ok(());
    }

    let resolved = options::resolve(&args.ai)?;
    let question = read_prompt(args.prompt.clone())?;
    let text = if resolved.persona {
        prompt::with_persona(&question)
    } else {
        question
    };

    let mut parts = PromptParts::text(text);
    if let Some(path) = &args.image {
        let bytes = fs::read(path)
            .map_err(|err| format!("Failed to read image '{}': {err}", path.display()))?;
        parts = parts.with_image(InlineImage::from_bytes(bytes)?);
    }

    vlog(
        &resolved,
        &format!("api_key_present={}", gemini_api_key().is_ok()),
    );

    if resolved.dry_run {
        return dry_run(&resolved, &parts);
    }

    let api_key = gemini_api_key()?;
    let gemini = GeminiClient::new(api_key);
    let (outcome, latency_ms) = run_invocation(&gemini, &resolved, &parts).await?;

    let record = json!({
        "model": outcome.model,
        "content": outcome.text,
        "calls": outcome.calls,
    });
    match resolved.output {
        OutputMode::Text => println!("{}", outcome.text),
        OutputMode::Json => println!("{record}"),
    }
    if let Some(path) = &resolved.save {
        save_record(path, &record)?;
    }
    report_usage(&resolved, outcome.usage.as_ref(), latency_ms);
    Ok(())
}

fn dry_run(resolved: &ResolvedAi, parts: &PromptParts) -> Result<(), String> {
    let record = json!({
        "dry_run": true,
        "model": resolved.candidates.first(),
        "candidates": resolved.candidates,
        "persona": resolved.persona,
        "retry": {
            "attempts_per_model": resolved.policy.attempts_per_model,
            "backoff_unit_ms": resolved.policy.backoff_unit_ms,
        },
        "request": client::request_body(parts, resolved.options),
        "timeout_secs": resolved.options.timeout_secs,
        "output": resolved.output.as_str(),
    });
    println!("{record}");
    if let Some(path) = &resolved.save {
        save_record(path, &record)?;
    }
    if resolved.show_usage && !resolved.quiet {
        eprintln!("usage: unavailable latency_ms=0 (dry-run)");
    }
    Ok(())
}

/// Argument prompt wins over stdin; an empty prompt is an explicit error.
fn read_prompt(arg: Option<String>) -> Result<String, String> {
    if let Some(prompt) = arg {
        let trimmed = prompt.trim();
        if !trimmed.is_empty() {
            return Ok(trimmed.to_string());
        }
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .map_err(|err| format!("Failed to read prompt from stdin: {err}"))?;
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Err("No prompt provided. Pass PROMPT or pipe it on stdin.".to_string());
    }
    Ok(trimmed.to_string())
}
