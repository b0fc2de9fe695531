use std::fs;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;
use serde_json::{Map, Value, json};

use crate::commands::options::{
    self, AiOptions, OutputMode, ResolvedAi, gemini_api_key, report_usage, run_invocation,
    save_record, vlog,
};
use crate::gemini::client::{self, GeminiClient};
use crate::gemini::prompt::{self, InlineImage, PromptParts};
use crate::gemini::verdict;
use crate::youtube::link;

const BAR_WIDTH: usize = 10;

#[derive(Debug, Args, Clone)]
pub struct AuditArgs {
    /// Video URL; the maxres thumbnail is fetched for the audit
    #[arg(long, conflicts_with = "image")]
    pub url: Option<String>,

    /// Local thumbnail file to audit
    #[arg(long)]
    pub image: Option<PathBuf>,

    #[command(flatten)]
    pub ai: AiOptions,
}

pub async fn run(args: AuditArgs) -> Result<(), String> {
    let resolved = options::resolve(&args.ai)?;

    let task = prompt::thumbnail_scorecard_task();
    let text = if resolved.persona {
        prompt::with_persona(&task)
    } else {
        task
    };

    let source = match (&args.url, &args.image) {
        (Some(url), None) => {
            let video_id = link::extract_video_id(url)
                .ok_or_else(|| format!("Could not find a video id in '{url}'."))?;
            ImageSource::Remote(link::thumbnail_url(&video_id))
        }
        (None, Some(path)) => ImageSource::Local(path.clone()),
        _ => return Err("Provide --url or --image.".to_string()),
    };

    if resolved.dry_run {
        return dry_run(&resolved, &text, &source);
    }

    let image = match &source {
        ImageSource::Local(path) => {
            let bytes = fs::read(path)
                .map_err(|err| format!("Failed to read image '{}': {err}", path.display()))?;
            InlineImage::from_bytes(bytes)?
        }
        ImageSource::Remote(url) => {
            vlog(&resolved, &format!("fetching thumbnail {url}"));
            InlineImage::from_bytes(fetch_thumbnail(url).await?)?
        }
    };
    let parts = PromptParts::text(text).with_image(image);

    let gemini = GeminiClient::new(gemini_api_key()?);
    let (outcome, latency_ms) = run_invocation(&gemini, &resolved, &parts).await?;

    let scores = verdict::parse_metric_map(&outcome.text);
    let narrative = verdict::narrative_text(&outcome.text);

    let record = json!({
        "model": outcome.model,
        "scores": scores.as_deref().map(score_map),
        "content": narrative,
    });
    match resolved.output {
        OutputMode::Json => println!("{record}"),
        OutputMode::Text => {
            if let Some(scores) = &scores {
                for (metric, score) in scores {
                    println!("{:<12} {} {:.0}/10", metric, bar(*score).cyan(), score);
                }
            }
            if !narrative.is_empty() {
                println!("{narrative}");
            }
        }
    }
    if let Some(path) = &resolved.save {
        save_record(path, &record)?;
    }
    report_usage(&resolved, outcome.usage.as_ref(), latency_ms);
    Ok(())
}

enum ImageSource {
    Local(PathBuf),
    Remote(String),
}

fn dry_run(resolved: &ResolvedAi, text: &str, source: &ImageSource) -> Result<(), String> {
    // The thumbnail is not fetched here, so the request body carries the
    // prompt text only and the image source is recorded alongside it.
    let (parts, image) = match source {
        ImageSource::Local(path) => {
            let bytes = fs::read(path)
                .map_err(|err| format!("Failed to read image '{}': {err}", path.display()))?;
            let image = InlineImage::from_bytes(bytes)?;
            (
                PromptParts::text(text).with_image(image),
                json!(path.display().to_string()),
            )
        }
        ImageSource::Remote(url) => (PromptParts::text(text), json!(url)),
    };

    let record = json!({
        "dry_run": true,
        "model": resolved.candidates.first(),
        "candidates": resolved.candidates,
        "image": image,
        "request": client::request_body(&parts, resolved.options),
        "output": resolved.output.as_str(),
    });
    println!("{record}");
    if let Some(path) = &resolved.save {
        save_record(path, &record)?;
    }
    Ok(())
}

async fn fetch_thumbnail(url: &str) -> Result<Vec<u8>, String> {
    let response = reqwest::get(url)
        .await
        .map_err(|err| format!("Failed to fetch thumbnail: {err}"))?;
    if !response.status().is_success() {
        return Err(format!(
            "Thumbnail fetch failed with status {}. Try --image with a local file.",
            response.status()
        ));
    }
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|err| format!("Failed to read thumbnail bytes: {err}"))
}

fn score_map(scores: &[(String, f64)]) -> Map<String, Value> {
    scores
        .iter()
        .map(|(metric, score)| (metric.clone(), json!(score)))
        .collect()
}

fn bar(score: f64) -> String {
    let filled = (score.clamp(0.0, 10.0).round() as usize).min(BAR_WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}
