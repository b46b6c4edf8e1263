use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::engine::llm_client::{GenerationRequest, ModelClient, ModelError};
use crate::engine::prompt_builder::PromptBuilder;
use crate::engine::retry::{with_retry, RetryPolicy};
use crate::error::{CommentaryError, Stage};
use crate::model::game_event::GameEvent;
use crate::model::llm_decode::{decode_analysis, decode_match_report};
use crate::model::match_report::{MatchReportResult, ReportKeys};

pub const NARRATIVE_LABEL: &str = "(AI Generated Two-Stage Commentary):";

/// Both commentary pipelines over one model backend.
/// Holds no per-invocation state, so one instance serves concurrent callers.
#[derive(Clone)]
pub struct CommentaryPipeline {
    client: Arc<dyn ModelClient>,
    model: String,
    retry: RetryPolicy,
    report_keys: ReportKeys,
}

impl CommentaryPipeline {
    pub fn new(client: Arc<dyn ModelClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            retry: RetryPolicy::default(),
            report_keys: ReportKeys::default(),
        }
    }

    pub fn from_config(client: Arc<dyn ModelClient>, config: &AppConfig) -> Self {
        Self::new(client, config.model.clone())
            .with_retry(config.retry_policy())
            .with_report_keys(config.report_keys.clone())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_report_keys(mut self, keys: ReportKeys) -> Self {
        self.report_keys = keys;
        self
    }

    /// Analysis then narrative. No retries; any failure goes to the caller.
    pub async fn narrate_two_stage(
        &self,
        event: &GameEvent,
        tone: &str,
        focus_player: &str,
    ) -> Result<String, CommentaryError> {
        info!(event_id = event.id, "stage 1: requesting analysis");
        let request = GenerationRequest::json(&self.model, PromptBuilder::analysis(event))
            .with_schema(analysis_schema());
        let analysis_text = self.call_once(request, Stage::Analysis).await?;

        let analysis = decode_analysis(&analysis_text).map_err(|source| {
            warn!(raw = %analysis_text, "failed to parse analysis JSON");
            CommentaryError::UnparsableAnalysis {
                raw: analysis_text.clone(),
                source,
            }
        })?;
        info!(?analysis, "stage 1 result");

        let analysis_json = serde_json::to_string(&analysis).map_err(CommentaryError::Serialize)?;

        info!(event_id = event.id, "stage 2: requesting narrative");
        let prompt = PromptBuilder::narrative(&analysis_json, tone, focus_player);
        let narrative = self
            .call_once(GenerationRequest::text(&self.model, prompt), Stage::Narrative)
            .await?;

        Ok(format!("{}\n\n{}", NARRATIVE_LABEL, narrative))
    }

    /// Single call with retry, then tolerant parsing.
    /// Call failures propagate; parse failures never do.
    pub async fn try_match_report(
        &self,
        events: &[GameEvent],
        tone: &str,
    ) -> Result<MatchReportResult, CommentaryError> {
        info!(events = events.len(), "requesting match report");
        let request = GenerationRequest::json(&self.model, PromptBuilder::match_report(events, tone));

        let text = with_retry(&self.retry, || self.client.generate(request.clone())).await?;

        Ok(decode_match_report(&text, &self.report_keys))
    }

    /// Like `try_match_report`, but always returns something displayable.
    pub async fn match_report(&self, events: &[GameEvent], tone: &str) -> MatchReportResult {
        match self.try_match_report(events, tone).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "match report call failed, returning degraded result");
                MatchReportResult {
                    summary: format!("Sorry, the match report could not be generated: {}", e),
                    key_moments: Vec::new(),
                }
            }
        }
    }

    async fn call_once(
        &self,
        request: GenerationRequest,
        stage: Stage,
    ) -> Result<String, CommentaryError> {
        match self.client.generate(request).await {
            Ok(text) if text.trim().is_empty() => Err(CommentaryError::NoOutput { stage }),
            Ok(text) => Ok(text),
            Err(ModelError::EmptyResponse) => Err(CommentaryError::NoOutput { stage }),
            Err(e) => Err(CommentaryError::Model(e)),
        }
    }
}

fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "sentiment": { "type": "STRING", "enum": ["positive", "negative", "neutral"] },
            "key_action": { "type": "STRING" },
            "justification": { "type": "STRING" }
        },
        "required": ["sentiment", "key_action", "justification"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::llm_client::ScriptedClient;
    use crate::engine::retry::RetryPolicy;
    use crate::model::demo_events::demo_events;
    use std::time::Duration;

    fn pipeline(client: &Arc<ScriptedClient>) -> CommentaryPipeline {
        let client: Arc<dyn ModelClient> = client.clone();
        CommentaryPipeline::new(client, "test-model")
            .with_retry(RetryPolicy::new(3, |_: u32| Duration::ZERO))
    }

    #[tokio::test]
    async fn stage_one_request_uses_json_mode_and_schema() {
        let client = Arc::new(ScriptedClient::new([
            Ok(r#"{"sentiment":"positive","key_action":"finish","justification":"gap"}"#.to_string()),
            Ok("Two sentences.".to_string()),
        ]));

        pipeline(&client)
            .narrate_two_stage(&demo_events()[0], "Neutral", "A. Smith")
            .await
            .unwrap();

        let requests = client.requests();
        assert!(requests[0].json_mode);
        assert!(requests[0].response_schema.is_some());
        assert!(!requests[1].json_mode);
        assert_eq!(requests[1].model, "test-model");
    }

    #[tokio::test]
    async fn empty_stage_one_is_no_output() {
        let client = Arc::new(ScriptedClient::new([Err(ModelError::EmptyResponse)]));

        let err = pipeline(&client)
            .narrate_two_stage(&demo_events()[0], "Neutral", "A. Smith")
            .await
            .unwrap_err();

        assert!(matches!(err, CommentaryError::NoOutput { stage: Stage::Analysis }));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn two_stage_does_not_retry_rate_limits() {
        let client = Arc::new(ScriptedClient::new([Err(ModelError::remote(429, "slow down"))]));

        let err = pipeline(&client)
            .narrate_two_stage(&demo_events()[0], "Neutral", "A. Smith")
            .await
            .unwrap_err();

        assert!(matches!(err, CommentaryError::Model(_)));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn report_call_failure_degrades_instead_of_failing() {
        let client = Arc::new(ScriptedClient::new([Err(ModelError::remote(400, "bad request"))]));

        let report = pipeline(&client).match_report(&demo_events(), "Neutral").await;

        assert!(report.summary.contains("could not be generated"));
        assert!(report.key_moments.is_empty());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn try_report_surfaces_exhausted_retries() {
        let client = Arc::new(ScriptedClient::new([
            Err(ModelError::remote(503, "overloaded")),
            Err(ModelError::remote(503, "overloaded")),
            Err(ModelError::remote(503, "overloaded")),
        ]));

        let err = pipeline(&client)
            .try_match_report(&demo_events(), "Neutral")
            .await
            .unwrap_err();

        assert!(matches!(err, CommentaryError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn report_keys_come_from_config() {
        let client = Arc::new(ScriptedClient::new([Ok(r#"{"recap": "r", "key_moments": [2]}"#.to_string())]));
        let mut config = AppConfig::default();
        config.report_keys.summary.push("recap".into());
        config.backoff_base_ms = 0;

        let dyn_client: Arc<dyn ModelClient> = client.clone();
        let report = CommentaryPipeline::from_config(dyn_client, &config)
            .match_report(&demo_events(), "Neutral")
            .await;

        assert_eq!(report.summary, "r");
        assert_eq!(client.requests()[0].model, "gemini-2.5-flash");
    }
}
