use image::ImageFormat;

/// Instructional preamble prepended to strategist prompts.
pub const STRATEGIST_PERSONA: &str = "You are a Senior YouTube Strategist & SEO Expert (15+ years exp).\n\
Tone: Professional, Direct, Analytical.\n\
Focus: Distinguish between Shorts (velocity) and Longform (retention).";

const COMMENT_EXCERPT_CHARS: usize = 1_000;

/// Image payload attached to a prompt.
#[derive(Debug, Clone)]
pub struct InlineImage {
    /// Sniffed mime type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl InlineImage {
    /// Wraps raw bytes, sniffing the mime type from the magic header.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, String> {
        let format = image::guess_format(&data)
            .map_err(|_| "Unrecognized image format.".to_string())?;
        Ok(Self {
            mime_type: mime_for(format).to_string(),
            data,
        })
    }
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Prompt body sent to the model: text plus an optional inline image.
#[derive(Debug, Clone)]
pub struct PromptParts {
    pub text: String,
    pub image: Option<InlineImage>,
}

impl PromptParts {
    /// Builds a text-only prompt.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    /// Attaches an inline image to the prompt.
    pub fn with_image(mut self, image: InlineImage) -> Self {
        self.image = Some(image);
        self
    }

    /// True when there is neither text nor an image to send.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none()
    }
}

/// Prepends the strategist persona to a task prompt.
pub fn with_persona(task: &str) -> String {
    format!("{STRATEGIST_PERSONA}\n{task}")
}

/// Task prompt for a single-channel strategic report.
pub fn channel_report_task(table: &str) -> String {
    format!("Analyze this channel data:\n{table}")
}

/// Task prompt for a multi-channel competitor comparison.
pub fn rivals_comparison_task(table: &str) -> String {
    format!("Compare these competitors based on the data:\n{table}")
}

/// Task prompt for the five-metric thumbnail scorecard.
///
/// The model is asked for a JSON object first so the scores can be parsed
/// back out of the reply, followed by a free-text summary.
pub fn thumbnail_scorecard_task() -> String {
    "Rate this thumbnail 0-10 on these 5 metrics.\n\
     Output ONLY valid JSON format like: \
     {\"Legibility\": 8, \"Emotion\": 7, \"Contrast\": 9, \"Curiosity\": 6, \"Branding\": 5}\n\
     Then add a text summary."
        .to_string()
}

/// Prompt estimating sentiment percentages over a comment excerpt.
pub fn sentiment_estimate(comments: &str) -> String {
    format!(
        "Analyze these comments: \"{}...\"\n\
         Estimate sentiment percentages. Output ONLY JSON: \
         {{\"Positive\": 60, \"Neutral\": 30, \"Negative\": 10}}",
        excerpt(comments, COMMENT_EXCERPT_CHARS)
    )
}

/// Prompt summarizing a comment excerpt.
pub fn comment_summary(comments: &str) -> String {
    format!(
        "Summarize these comments: {}",
        excerpt(comments, COMMENT_EXCERPT_CHARS)
    )
}

/// Truncates to at most `max_chars` characters on a char boundary.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
