use clap::Args;
use owo_colors::OwoColorize;
use serde_json::{Map, Value, json};

use crate::commands::options::{
    self, AiOptions, OutputMode, gemini_api_key, run_invocation, save_record, youtube_api_key,
};
use crate::gemini::client::GeminiClient;
use crate::gemini::prompt::{self, PromptParts};
use crate::gemini::verdict;
use crate::youtube::api::YoutubeClient;
use crate::youtube::link;

#[derive(Debug, Args, Clone)]
pub struct EngageArgs {
    /// Video URL to read the comment section of
    #[arg(value_name = "URL")]
    pub url: String,

    #[command(flatten)]
    pub ai: AiOptions,
}

pub async fn run(args: EngageArgs) -> Result<(), String> {
    let resolved = options::resolve(&args.ai)?;
    if resolved.dry_run {
        return Err("--dry-run is not supported for engagement scans.".to_string());
    }

    let video_id = link::extract_video_id(&args.url)
        .ok_or_else(|| format!("Could not find a video id in '{}'.", args.url))?;

    let youtube = YoutubeClient::new(youtube_api_key()?);
    let video = youtube
        .video_deep_data(&video_id)
        .await
        .map_err(|error| error.to_string())?;
    if video.top_comments.is_empty() {
        return Err(format!(
            "No comments available for '{}'. Nothing to analyze.",
            video.title
        ));
    }

    let comments = video.top_comments.join(" ");
    let gemini = GeminiClient::new(gemini_api_key()?);

    let (sentiment_outcome, _) = run_invocation(
        &gemini,
        &resolved,
        &PromptParts::text(prompt::sentiment_estimate(&comments)),
    )
    .await?;
    let sentiment = verdict::parse_metric_map(&sentiment_outcome.text);

    let (summary_outcome, _) = run_invocation(
        &gemini,
        &resolved,
        &PromptParts::text(prompt::comment_summary(&comments)),
    )
    .await?;

    let record = json!({
        "video": video.title,
        "views": video.views,
        "comments_sampled": video.top_comments.len(),
        "sentiment": sentiment.as_deref().map(sentiment_map),
        "summary": summary_outcome.text,
    });
    match resolved.output {
        OutputMode::Json => println!("{record}"),
        OutputMode::Text => {
            println!("{}", video.title.bold());
            println!(
                "{}",
                format!(
                    "{} views, {} comments sampled",
                    video.views,
                    video.top_comments.len()
                )
                .dimmed()
            );
            match &sentiment {
                Some(sentiment) => {
                    for (label, percent) in sentiment {
                        println!("{:<10} {percent:.0}%", label);
                    }
                }
                None => println!("{}", sentiment_outcome.text),
            }
            println!();
            println!("{}", summary_outcome.text);
        }
    }
    if let Some(path) = &resolved.save {
        save_record(path, &record)?;
    }
    Ok(())
}

fn sentiment_map(sentiment: &[(String, f64)]) -> Map<String, Value> {
    sentiment
        .iter()
        .map(|(label, percent)| (label.clone(), json!(percent)))
        .collect()
}
