//! Plain-text rendering and persistence of analysis results.

use std::path::Path;

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use super::types::AnalysisResult;
use crate::device::io::write_atomic;

/// Returned instead of a report when there is no score to show.
pub const NO_ANALYSIS: &str = "No analysis available.";

const RULE_WIDTH: usize = 60;

/// Render a human-readable report.
///
/// Results with a score of 0 (including ERROR results) render as
/// [`NO_ANALYSIS`]; callers detect that case by matching the string.
pub fn render_report(result: &AnalysisResult) -> String {
    if result.score == 0 {
        return NO_ANALYSIS.to_string();
    }

    let rule = "=".repeat(RULE_WIDTH);
    let mut report = Vec::new();
    report.push(rule.clone());
    report.push(format!(
        "MOXA AI ANALYSIS REPORT - {}",
        result.created_at.to_rfc3339()
    ));
    report.push(rule.clone());

    report.push(format!(
        "\nOVERALL SCORE: {}% - {}",
        result.score_percent(),
        result.status
    ));

    let m = &result.roaming_metrics;
    report.push("\n--- ROAMING METRICS ---".to_string());
    report.push(format!("Roaming events: {}", m.total_events));
    report.push(format!("Average handoff time: {} ms", m.avg_handoff_time));
    report.push(format!(
        "Min/max handoff time: {} / {} ms",
        m.min_handoff_time, m.max_handoff_time
    ));
    report.push(format!("Average SNR before roaming: {} dB", m.avg_snr_before));
    report.push(format!("Average SNR after roaming: {} dB", m.avg_snr_after));
    report.push(format!("Average SNR improvement: {} dB", m.snr_improvement));

    if !result.recommendations.is_empty() {
        report.push("\n--- RECOMMENDATIONS ---".to_string());
        for (i, rec) in result.recommendations.iter().enumerate() {
            report.push(format!("{}. {}", i + 1, rec));
        }
    }

    if !result.config_changes.is_empty() {
        report.push("\n--- RECOMMENDED CONFIGURATION CHANGES ---".to_string());
        for (i, change) in result.config_changes.iter().enumerate() {
            report.push(format!("{}. Change '{}':", i + 1, change.parameter));
            report.push(format!("   - From: {}", display_value(&change.current_value)));
            report.push(format!(
                "   - To:   {}",
                change
                    .recommended_value
                    .as_ref()
                    .map(display_value)
                    .unwrap_or_default()
            ));
            report.push(format!("   - Reason: {}", change.reason));
            if let Some(impact) = change.impact.as_deref().filter(|s| !s.is_empty()) {
                report.push(format!("   - Impact: {}", impact));
            }
        }
    }

    if !result.insights.is_empty() {
        report.push("\n--- DETAILED ANALYSIS ---".to_string());
        report.push(result.insights.clone());
    }

    report.push(format!("\n{}", rule));
    report.push("End of AI analysis report".to_string());

    report.join("\n")
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Save a result to `path`: pretty JSON for a `.json` extension
/// (case-insensitive), the text report otherwise.
pub fn write_report(result: &AnalysisResult, path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let content = if is_json {
        serde_json::to_string_pretty(result)?
    } else {
        render_report(result)
    };
    write_atomic(path, content.as_bytes())?;

    info!(
        "Saved {} report to {:?}",
        if is_json { "JSON" } else { "text" },
        path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::normalize::normalize_response;
    use crate::device::DeviceConfig;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample() -> AnalysisResult {
        let raw = json!({
            "score": 72,
            "roaming_metrics": {
                "total_events": 12,
                "avg_handoff_time": 85.5,
                "min_handoff_time": 40,
                "max_handoff_time": 210,
                "avg_snr_before": 18,
                "avg_snr_after": 31,
                "snr_improvement": 13
            },
            "recommendations": ["Switch roaming to SNR", "Enable Turbo Roaming"],
            "config_changes": [
                {"param": "roaming_mechanism", "current": "signal_strength", "recommended": "snr",
                 "reason": "SNR is more reliable", "impact": "Fewer late handoffs"},
                {"param": "roaming_difference", "current": 9, "recommended": 8, "reason": "Less ping-pong"}
            ],
            "analysis": "Handoffs are slow on the east aisle."
        })
        .to_string();
        normalize_response(&raw, &DeviceConfig::moxa_defaults())
    }

    #[test]
    fn test_zero_score_renders_no_analysis() {
        let result = normalize_response(r#"{"score": 0}"#, &DeviceConfig::new());
        assert_eq!(render_report(&result), NO_ANALYSIS);

        let error = normalize_response("garbage", &DeviceConfig::new());
        assert_eq!(render_report(&error), NO_ANALYSIS);
    }

    #[test]
    fn test_report_header_and_metrics() {
        let report = render_report(&sample());
        assert!(report.contains("OVERALL SCORE: 72% - PASSABLE"));
        assert!(report.contains("Roaming events: 12"));
        assert!(report.contains("Average handoff time: 85.5 ms"));
        assert!(report.contains("Min/max handoff time: 40 / 210 ms"));
        assert!(report.contains("Average SNR improvement: 13 dB"));
    }

    #[test]
    fn test_report_numbers_recommendations_and_changes() {
        let report = render_report(&sample());
        assert!(report.contains("1. Switch roaming to SNR\n2. Enable Turbo Roaming"));
        assert!(report.contains("1. Change 'roaming_mechanism':"));
        assert!(report.contains("   - From: signal_strength"));
        assert!(report.contains("   - To:   snr"));
        assert!(report.contains("   - Impact: Fewer late handoffs"));
        assert!(report.contains("2. Change 'roaming_difference':\n   - From: 9\n   - To:   8\n   - Reason: Less ping-pong"));
    }

    #[test]
    fn test_report_insights_block_only_when_present() {
        assert!(render_report(&sample()).contains("--- DETAILED ANALYSIS ---\nHandoffs are slow"));

        let mut result = sample();
        result.insights.clear();
        assert!(!render_report(&result).contains("DETAILED ANALYSIS"));
    }

    #[test]
    fn test_write_report_picks_format_by_extension() {
        let dir = TempDir::new().unwrap();
        let result = sample();

        let json_path = dir.path().join("report.JSON");
        write_report(&result, &json_path).unwrap();
        let parsed: AnalysisResult =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed, result);

        let txt_path = dir.path().join("report.txt");
        write_report(&result, &txt_path).unwrap();
        assert_eq!(std::fs::read_to_string(&txt_path).unwrap(), render_report(&result));

        let bare_path = dir.path().join("report");
        write_report(&result, &bare_path).unwrap();
        assert!(std::fs::read_to_string(&bare_path).unwrap().starts_with("===="));
    }
}
