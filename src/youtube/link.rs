use std::sync::OnceLock;

use regex::Regex;

static VIDEO_ID_RE: OnceLock<Regex> = OnceLock::new();

fn video_id_re() -> &'static Regex {
    VIDEO_ID_RE.get_or_init(|| {
        Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid video-id regex")
    })
}

/// Pulls the 11-character video id out of a watch/short/share URL.
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_re()
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|found| found.as_str().to_string())
}

/// Highest-resolution thumbnail URL for a video id.
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{video_id}/maxresdefault.jpg")
}
