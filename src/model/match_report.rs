use serde::{Deserialize, Serialize};

/// Final output of the single-stage report pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReportResult {
    pub summary: String,

    /// Event ids, usually three. Always plain integers.
    pub key_moments: Vec<u32>,
}

/// Ordered candidate key names for each report field.
/// The first key present in the model output wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportKeys {
    pub summary: Vec<String>,
    pub key_moments: Vec<String>,
}

impl Default for ReportKeys {
    fn default() -> Self {
        Self {
            summary: vec!["summary".into(), "justification".into()],
            key_moments: vec!["key_moments".into(), "key_action".into()],
        }
    }
}
