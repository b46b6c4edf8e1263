//! Match commentary generation on top of a generative language model.
//!
//! Two pipelines are provided:
//! - [`CommentaryPipeline::narrate_two_stage`]: analysis, then a styled narrative
//!   for one event. Strict; failures are returned to the caller.
//! - [`CommentaryPipeline::match_report`]: one structured call over a batch of
//!   events, retried on rate limiting/overload, parsed tolerantly.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;

pub use config::{ApiKey, AppConfig, ConfigError};
pub use engine::llm_client::{GeminiClient, GenerationRequest, ModelClient, ModelError, ScriptedClient};
pub use engine::pipeline::CommentaryPipeline;
pub use engine::retry::{BackoffSchedule, LinearBackoff, RetryPolicy};
pub use error::{CommentaryError, Stage};
pub use model::game_event::GameEvent;
pub use model::match_report::MatchReportResult;
