/// Free-form strategist question.
pub mod ask;
/// Thumbnail scorecard audit.
pub mod audit;
/// Recent-uploads scan and strategic report.
pub mod channel;
/// Config file validation.
pub mod config;
/// Comment sentiment and summary.
pub mod engage;
/// Shared invocation flags and resolution.
pub mod options;
