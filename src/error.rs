use thiserror::Error;

use crate::engine::llm_client::ModelError;

/// Errors surfaced by the commentary pipelines.
#[derive(Debug, Error)]
pub enum CommentaryError {
    /// Non-transient model failure (bad request, unauthorized, timeout...).
    #[error("model call failed: {0}")]
    Model(#[from] ModelError),

    /// Every attempt hit a transient failure.
    #[error("max retries exceeded after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ModelError },

    /// The model answered with no text, possibly filtered.
    #[error("AI did not return any text during {stage}. The response might have been blocked.")]
    NoOutput { stage: Stage },

    /// Stage-1 analysis was not the expected JSON document.
    #[error("AI returned unparsable analysis: {source}")]
    UnparsableAnalysis {
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize analysis: {0}")]
    Serialize(serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Analysis,
    Narrative,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Analysis => "analysis",
            Stage::Narrative => "narrative generation",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_output_names_the_stage() {
        let err = CommentaryError::NoOutput {
            stage: Stage::Narrative,
        };
        assert_eq!(
            err.to_string(),
            "AI did not return any text during narrative generation. The response might have been blocked."
        );
        assert_eq!(Stage::Analysis.to_string(), "analysis");
    }
}
