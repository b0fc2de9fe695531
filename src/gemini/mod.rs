//! Gemini integration helpers.
//!
//! The module contains the REST client for the Generative Language API, the
//! candidate-model roster, the retry/fallback invocation engine, and the
//! prompt and reply-parsing helpers used by CLI commands.

/// REST client and wire types for the Generative Language API.
pub mod client;
/// Retry/fallback invocation engine.
pub mod invoke;
/// Candidate model roster and ranking.
pub mod model;
/// Strategist persona and prompt builders.
pub mod prompt;
/// Extraction of structured verdicts from model replies.
pub mod verdict;
