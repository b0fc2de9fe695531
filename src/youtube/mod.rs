//! YouTube Data API helpers.
//!
//! Typed wrappers for the handful of v3 endpoints the commands need, plus
//! link parsing and ISO-8601 duration classification.

/// Data API v3 client.
pub mod api;
/// Duration parsing and Short/Longform classification.
pub mod duration;
/// Video-id extraction and thumbnail URLs.
pub mod link;
