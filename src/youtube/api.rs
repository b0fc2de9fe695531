use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::youtube::duration::{self, VideoKind};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const COMMENT_FETCH_LIMIT: u32 = 50;
const PLAYLIST_PAGE_MAX: u32 = 50;

/// One recent upload, hydrated with statistics.
#[derive(Debug, Clone, Serialize)]
pub struct VideoSummary {
    pub id: String,
    pub channel: String,
    pub title: String,
    /// RFC 3339 publish timestamp, kept as reported for lexical sorting.
    pub published: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub kind: VideoKind,
    pub thumbnail: String,
}

/// Metadata and top comments for a single video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoDeepData {
    pub id: String,
    pub title: String,
    pub views: u64,
    pub likes: u64,
    pub comment_count: u64,
    pub thumbnail: String,
    /// Relevance-ordered top-level comments; empty when the thread fetch
    /// fails or comments are disabled.
    pub top_comments: Vec<String>,
}

#[derive(Debug)]
pub enum YoutubeError {
    Request { source: reqwest::Error },
    Api { status: StatusCode, body: String },
    ChannelNotFound { handle: String },
    VideoNotFound { id: String },
}

impl fmt::Display for YoutubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { source } => write!(f, "YouTube API request failed: {source}"),
            Self::Api { status, body } => write!(f, "YouTube API error {status}: {body}"),
            Self::ChannelNotFound { handle } => {
                write!(f, "No channel found for '{handle}'.")
            }
            Self::VideoNotFound { id } => write!(f, "No video found for id '{id}'."),
        }
    }
}

impl std::error::Error for YoutubeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Request { source } => Some(source),
            _ => None,
        }
    }
}

/// Data API v3 client.
#[derive(Debug, Clone)]
pub struct YoutubeClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: YOUTUBE_API_BASE.to_string(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, YoutubeError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| YoutubeError::Request { source })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(YoutubeError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|source| YoutubeError::Request { source })
    }

    /// Resolves a channel handle or name to a channel id via search.
    pub async fn channel_id(&self, handle: &str) -> Result<String, YoutubeError> {
        let body: SearchResponse = self
            .get_json(
                "search",
                &[
                    ("part", "id".to_string()),
                    ("q", handle.to_string()),
                    ("type", "channel".to_string()),
                    ("maxResults", "1".to_string()),
                ],
            )
            .await?;

        body.items
            .unwrap_or_default()
            .into_iter()
            .find_map(|item| item.id.and_then(|id| id.channel_id))
            .ok_or_else(|| YoutubeError::ChannelNotFound {
                handle: handle.to_string(),
            })
    }

    /// Fetches the most recent uploads of a channel, newest first.
    pub async fn recent_videos(
        &self,
        handle: &str,
        limit: u32,
    ) -> Result<Vec<VideoSummary>, YoutubeError> {
        let channel_id = self.channel_id(handle).await?;

        let channels: ChannelsResponse = self
            .get_json(
                "channels",
                &[
                    ("part", "contentDetails".to_string()),
                    ("id", channel_id.clone()),
                ],
            )
            .await?;
        let uploads_playlist = channels
            .items
            .unwrap_or_default()
            .into_iter()
            .find_map(|item| {
                item.content_details
                    .and_then(|details| details.related_playlists)
                    .map(|playlists| playlists.uploads)
            })
            .ok_or_else(|| YoutubeError::ChannelNotFound {
                handle: handle.to_string(),
            })?;

        let playlist: PlaylistItemsResponse = self
            .get_json(
                "playlistItems",
                &[
                    ("part", "contentDetails".to_string()),
                    ("playlistId", uploads_playlist),
                    ("maxResults", limit.clamp(1, PLAYLIST_PAGE_MAX).to_string()),
                ],
            )
            .await?;
        let video_ids: Vec<String> = playlist
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| item.content_details.map(|details| details.video_id))
            .collect();
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let videos: VideosResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,statistics,contentDetails".to_string()),
                    ("id", video_ids.join(",")),
                ],
            )
            .await?;

        Ok(videos
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| summarize(handle, item))
            .collect())
    }

    /// Fetches statistics and top comments for one video.
    ///
    /// The comment-thread call is best effort: comments may be disabled, and
    /// a failure there should not sink the whole lookup.
    pub async fn video_deep_data(&self, video_id: &str) -> Result<VideoDeepData, YoutubeError> {
        let videos: VideosResponse = self
            .get_json(
                "videos",
                &[
                    ("part", "snippet,statistics".to_string()),
                    ("id", video_id.to_string()),
                ],
            )
            .await?;
        let item = videos
            .items
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| YoutubeError::VideoNotFound {
                id: video_id.to_string(),
            })?;

        let snippet = item.snippet.unwrap_or_default();
        let statistics = item.statistics.unwrap_or_default();
        let top_comments = self.top_comments(video_id).await.unwrap_or_default();

        Ok(VideoDeepData {
            id: video_id.to_string(),
            title: snippet.title.unwrap_or_default(),
            views: parse_count(statistics.view_count),
            likes: parse_count(statistics.like_count),
            comment_count: parse_count(statistics.comment_count),
            thumbnail: high_thumbnail(snippet.thumbnails),
            top_comments,
        })
    }

    async fn top_comments(&self, video_id: &str) -> Result<Vec<String>, YoutubeError> {
        let body: CommentThreadsResponse = self
            .get_json(
                "commentThreads",
                &[
                    ("part", "snippet".to_string()),
                    ("videoId", video_id.to_string()),
                    ("maxResults", COMMENT_FETCH_LIMIT.to_string()),
                    ("textFormat", "plainText".to_string()),
                    ("order", "relevance".to_string()),
                ],
            )
            .await?;

        Ok(body
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                item.snippet
                    .and_then(|snippet| snippet.top_level_comment)
                    .and_then(|comment| comment.snippet)
                    .and_then(|snippet| snippet.text_display)
            })
            .collect())
    }
}

fn summarize(handle: &str, item: VideoItem) -> Option<VideoSummary> {
    let id = item.id?;
    let snippet = item.snippet.unwrap_or_default();
    let statistics = item.statistics.unwrap_or_default();
    let seconds = item
        .content_details
        .and_then(|details| details.duration)
        .and_then(|duration| duration::parse_iso8601_seconds(&duration))
        .unwrap_or(0);

    Some(VideoSummary {
        id,
        channel: handle.to_string(),
        title: snippet.title.unwrap_or_default(),
        published: snippet.published_at.unwrap_or_default(),
        views: parse_count(statistics.view_count),
        likes: parse_count(statistics.like_count),
        comments: parse_count(statistics.comment_count),
        kind: duration::classify(seconds),
        thumbnail: high_thumbnail(snippet.thumbnails),
    })
}

/// Statistics arrive as decimal strings; absent counters read as zero.
fn parse_count(value: Option<String>) -> u64 {
    value
        .as_deref()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}

fn high_thumbnail(thumbnails: Option<Thumbnails>) -> String {
    thumbnails
        .and_then(|set| set.high.or(set.default))
        .map(|thumb| thumb.url)
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Option<Vec<SearchItem>>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<SearchItemId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    items: Option<Vec<ChannelItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: String,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    items: Option<Vec<PlaylistItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: Option<PlaylistItemContentDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    items: Option<Vec<VideoItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: Option<String>,
    snippet: Option<VideoSnippet>,
    statistics: Option<VideoStatistics>,
    content_details: Option<VideoContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: Option<String>,
    published_at: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoContentDetails {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    items: Option<Vec<CommentThread>>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: Option<CommentThreadSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: Option<Comment>,
}

#[derive(Debug, Deserialize)]
struct Comment {
    snippet: Option<CommentSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{VideoItem, parse_count, summarize};

    #[test]
    fn counts_parse_with_zero_fallback() {
        assert_eq!(parse_count(Some("1234".to_string())), 1_234);
        assert_eq!(parse_count(Some("not-a-number".to_string())), 0);
        assert_eq!(parse_count(None), 0);
    }

    #[test]
    fn video_items_summarize_with_duration_classification() {
        let raw = r#"{
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Five-a-side special",
                "publishedAt": "2024-05-01T17:00:00Z",
                "thumbnails": {"high": {"url": "https://example.com/hq.jpg"}}
            },
            "statistics": {"viewCount": "1000", "likeCount": "50"},
            "contentDetails": {"duration": "PT45S"}
        }"#;
        let item: VideoItem = serde_json::from_str(raw).expect("fixture should parse");
        let summary = summarize("SomeChannel", item).expect("summary should build");

        assert_eq!(summary.id, "dQw4w9WgXcQ");
        assert_eq!(summary.channel, "SomeChannel");
        assert_eq!(summary.views, 1_000);
        assert_eq!(summary.comments, 0);
        assert_eq!(summary.kind.as_str(), "Short");
        assert_eq!(summary.thumbnail, "https://example.com/hq.jpg");
    }
}
