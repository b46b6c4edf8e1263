use serde_json::Value;
use tracing::warn;

use crate::model::analysis::AnalysisResult;
use crate::model::match_report::{MatchReportResult, ReportKeys};

/// Characters of raw output quoted back in a degraded summary.
pub const RAW_PREVIEW_CHARS: usize = 100;

pub const MISSING_SUMMARY: &str = "No summary was provided for this match.";

/// Decode the stage-1 analysis. Strict: any deviation is an error.
pub fn decode_analysis(text: &str) -> Result<AnalysisResult, serde_json::Error> {
    serde_json::from_str(text)
}

/// Decode raw report output into a MatchReportResult.
/// Never fails: unparsable text yields a degraded result with a diagnostic summary.
pub fn decode_match_report(raw: &str, keys: &ReportKeys) -> MatchReportResult {
    let cleaned = strip_code_fences(raw);

    let value: Value = match serde_json::from_str(&cleaned) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "match report is not valid JSON, returning degraded result");
            return degraded_report(raw);
        }
    };

    let summary = keys
        .summary
        .iter()
        .find_map(|key| value.get(key.as_str()).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_else(|| MISSING_SUMMARY.to_string());

    let key_moments = keys
        .key_moments
        .iter()
        .find_map(|key| value.get(key.as_str()).filter(|v| !v.is_null()))
        .map(coerce_moments)
        .unwrap_or_default();

    MatchReportResult {
        summary,
        key_moments,
    }
}

/// Result shown when the model output could not be read at all.
pub fn degraded_report(raw: &str) -> MatchReportResult {
    let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
    MatchReportResult {
        summary: format!(
            "Sorry, the match report could not be parsed. Raw output began with: {}...",
            preview
        ),
        key_moments: Vec::new(),
    }
}

/// Remove an outer ``` wrapper (with optional language tag) around the payload.
/// Backticks inside the payload are left alone.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        text = &rest[tag_len..];
        if let Some(body) = text.trim_end().strip_suffix("```") {
            text = body;
        }
    }

    text.trim().to_string()
}

fn coerce_moments(value: &Value) -> Vec<u32> {
    match value {
        Value::Array(items) => items.iter().filter_map(coerce_moment).collect(),
        Value::String(s) => digit_runs(s),
        // Anything else is dropped silently; callers get an empty list.
        _ => Vec::new(),
    }
}

fn coerce_moment(item: &Value) -> Option<u32> {
    match item {
        Value::Number(n) => {
            if let Some(i) = n.as_u64() {
                u32::try_from(i).ok()
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0 && *f <= u32::MAX as f64)
                    .map(|f| f.trunc() as u32)
            }
        }
        Value::String(s) => s
            .trim()
            .parse()
            .ok()
            .or_else(|| digit_runs(s).into_iter().next()),
        _ => None,
    }
}

/// Every maximal run of ASCII digits, in order.
fn digit_runs(text: &str) -> Vec<u32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .filter_map(|run| run.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analysis::Sentiment;
    use pretty_assertions::assert_eq;

    fn decode(raw: &str) -> MatchReportResult {
        decode_match_report(raw, &ReportKeys::default())
    }

    #[test]
    fn canonical_keys_pass_through() {
        let report = decode(r#"{"summary": "A tense match.", "key_moments": [1, 2, 3]}"#);
        assert_eq!(
            report,
            MatchReportResult {
                summary: "A tense match.".into(),
                key_moments: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn legacy_keys_are_used_when_canonical_missing() {
        let report = decode(r#"{"justification": "x", "key_action": [1, 2]}"#);
        assert_eq!(report.summary, "x");
        assert_eq!(report.key_moments, vec![1, 2]);
    }

    #[test]
    fn canonical_key_wins_over_legacy() {
        let report = decode(
            r#"{"summary": "new", "justification": "old", "key_moments": [4], "key_action": [9]}"#,
        );
        assert_eq!(report.summary, "new");
        assert_eq!(report.key_moments, vec![4]);
    }

    #[test]
    fn string_moments_become_digit_runs() {
        let report = decode(r#"{"summary": "s", "key_moments": "ID_300, ID_303"}"#);
        assert_eq!(report.key_moments, vec![300, 303]);
    }

    #[test]
    fn mixed_array_elements_are_coerced() {
        let report = decode(r#"{"summary": "s", "key_moments": ["12", 7, 3.9, "ID_44", true, {"id": 1}]}"#);
        assert_eq!(report.key_moments, vec![12, 7, 3, 44]);
    }

    #[test]
    fn missing_fields_get_placeholder_and_empty_moments() {
        let report = decode(r#"{"headline": "nothing useful"}"#);
        assert_eq!(report.summary, MISSING_SUMMARY);
        assert!(report.key_moments.is_empty());
    }

    // Accepted edge case: a moments value that is neither array nor string
    // is dropped rather than reported as partial data.
    #[test]
    fn non_sequence_moments_are_dropped() {
        let report = decode(r#"{"summary": "s", "key_moments": 17}"#);
        assert_eq!(report.summary, "s");
        assert!(report.key_moments.is_empty());

        let report = decode(r#"{"summary": "s", "key_moments": {"first": 1}}"#);
        assert!(report.key_moments.is_empty());
    }

    #[test]
    fn null_canonical_moments_fall_back_to_legacy() {
        let report = decode(r#"{"summary": "s", "key_moments": null, "key_action": "5 and 6"}"#);
        assert_eq!(report.key_moments, vec![5, 6]);
    }

    #[test]
    fn fenced_output_parses_like_plain() {
        let plain = r#"{"summary": "A tense match.", "key_moments": [1, 2]}"#;
        let tagged = format!("```json\n{}\n```", plain);
        let untagged = format!("```\n{}\n```", plain);

        assert_eq!(decode(&tagged), decode(plain));
        assert_eq!(decode(&untagged), decode(plain));
    }

    #[test]
    fn garbage_yields_degraded_result() {
        let raw = "The model decided to write prose instead. ".repeat(10);
        let report = decode(&raw);

        assert!(report.key_moments.is_empty());
        assert!(report.summary.starts_with("Sorry, the match report could not be parsed."));

        let preview: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
        assert!(report.summary.contains(&preview));
        assert!(!report.summary.contains(&raw));
        assert!(report.summary.ends_with("..."));
    }

    #[test]
    fn degraded_preview_respects_char_boundaries() {
        let raw = "é".repeat(150);
        let report = decode(&raw);
        assert!(report.summary.contains(&"é".repeat(RAW_PREVIEW_CHARS)));
    }

    #[test]
    fn custom_keys_extend_fallbacks() {
        let keys = ReportKeys {
            summary: vec!["summary".into(), "report".into()],
            key_moments: vec!["key_moments".into(), "moments".into()],
        };
        let report = decode_match_report(r#"{"report": "r", "moments": [8]}"#, &keys);
        assert_eq!(report.summary, "r");
        assert_eq!(report.key_moments, vec![8]);
    }

    #[test]
    fn backticks_inside_summary_survive() {
        let report = decode(r#"{"summary": "Fans chanted ```olé``` twice", "key_moments": [1]}"#);
        assert_eq!(report.summary, "Fans chanted ```olé``` twice");

        let fenced = "```json\n{\"summary\": \"Use `offside` and ```VAR```\", \"key_moments\": [2]}\n```";
        let report = decode(fenced);
        assert_eq!(report.summary, "Use `offside` and ```VAR```");
        assert_eq!(report.key_moments, vec![2]);
    }

    #[test]
    fn strip_code_fences_handles_inline_markers() {
        assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn analysis_decode_is_strict() {
        let ok = decode_analysis(
            r#"{"sentiment": "positive", "key_action": "late run", "justification": "space"}"#,
        )
        .unwrap();
        assert_eq!(ok.sentiment, Sentiment::Positive);

        assert!(decode_analysis(r#"{"sentiment": "elated", "key_action": "", "justification": ""}"#).is_err());
        assert!(decode_analysis("```json\n{}\n```").is_err());
    }
}
