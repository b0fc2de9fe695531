use clap::Args;
use owo_colors::OwoColorize;
use serde_json::json;

use crate::commands::options::{
    self, AiOptions, OutputMode, gemini_api_key, report_usage, run_invocation, save_record,
    youtube_api_key,
};
use crate::gemini::client::GeminiClient;
use crate::gemini::prompt::{self, PromptParts};
use crate::youtube::api::{VideoSummary, YoutubeClient};

/// Rows of channel data handed to the strategist prompt.
const REPORT_ROW_LIMIT: usize = 10;

#[derive(Debug, Args, Clone)]
pub struct ChannelArgs {
    /// Channel handles to scan (up to three)
    #[arg(value_name = "HANDLE", num_args = 1..=3, required = true)]
    pub handles: Vec<String>,

    /// Number of recent uploads per channel
    #[arg(long, default_value_t = 20)]
    pub limit: u32,

    /// Send the collected data through the strategist
    #[arg(long)]
    pub report: bool,

    #[command(flatten)]
    pub ai: AiOptions,
}

pub async fn run(args: ChannelArgs) -> Result<(), String> {
    let resolved = options::resolve(&args.ai)?;
    if resolved.dry_run {
        return Err("--dry-run is not supported for channel scans.".to_string());
    }
    let youtube = YoutubeClient::new(youtube_api_key()?);

    let mut videos: Vec<VideoSummary> = Vec::new();
    for handle in &args.handles {
        let mut batch = youtube
            .recent_videos(handle, args.limit)
            .await
            .map_err(|error| error.to_string())?;
        videos.append(&mut batch);
    }
    if videos.is_empty() {
        return Err("No videos found for the given channel(s).".to_string());
    }

    if resolved.output == OutputMode::Json && !args.report {
        println!(
            "{}",
            serde_json::to_string_pretty(&videos)
                .map_err(|err| format!("Failed to serialize videos: {err}"))?
        );
        return Ok(());
    }

    if resolved.output == OutputMode::Text {
        for video in &videos {
            print_summary_line(video, args.handles.len() > 1);
        }
    }

    if !args.report {
        return Ok(());
    }

    let table = summaries_csv(&videos, REPORT_ROW_LIMIT);
    let task = if args.handles.len() > 1 {
        prompt::rivals_comparison_task(&table)
    } else {
        prompt::channel_report_task(&table)
    };
    let text = if resolved.persona {
        prompt::with_persona(&task)
    } else {
        task
    };

    let gemini = GeminiClient::new(gemini_api_key()?);
    let (outcome, latency_ms) =
        run_invocation(&gemini, &resolved, &PromptParts::text(text)).await?;

    let record = json!({
        "model": outcome.model,
        "videos": videos,
        "content": outcome.text,
    });
    match resolved.output {
        OutputMode::Text => {
            println!();
            println!("{}", outcome.text);
        }
        OutputMode::Json => println!("{record}"),
    }
    if let Some(path) = &resolved.save {
        save_record(path, &record)?;
    }
    report_usage(&resolved, outcome.usage.as_ref(), latency_ms);
    Ok(())
}

fn print_summary_line(video: &VideoSummary, show_channel: bool) {
    let kind = format!("[{:<8}]", video.kind.as_str());
    let stats = format!(
        "{} views  {} likes  {} comments",
        group_digits(video.views),
        group_digits(video.likes),
        group_digits(video.comments),
    );
    if show_channel {
        println!(
            "{} {}  {}  {}",
            kind.magenta(),
            video.channel.bold(),
            stats.dimmed(),
            video.title
        );
    } else {
        println!("{} {}  {}", kind.magenta(), stats.dimmed(), video.title);
    }
}

/// CSV excerpt sent to the strategist, mirroring the on-screen table.
fn summaries_csv(videos: &[VideoSummary], max_rows: usize) -> String {
    let mut table = String::from("channel,title,type,views,likes,comments,published\n");
    for video in videos.iter().take(max_rows) {
        table.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            video.channel,
            csv_field(&video.title),
            video.kind.as_str(),
            video.views,
            video.likes,
            video.comments,
            video.published,
        ));
    }
    table
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
