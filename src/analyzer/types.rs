//! Type definitions for AI roaming analysis.
//!
//! These types are serialized as-is into report files and history rows,
//! so field names are part of the on-disk format.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::device::DeviceConfig;

/// Upper bound of the score scale returned by the model.
pub const MAX_SCORE: u32 = 100;

/// Overall verdict derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisStatus {
    Excellent,
    Passable,
    Insuffisant,
    Error,
}

impl AnalysisStatus {
    /// Map a score onto its band. Lower bounds are inclusive:
    /// 80% and above is EXCELLENT, 60% up to 80% is PASSABLE.
    pub fn from_score(score: u32, max_score: u32) -> Self {
        if max_score == 0 {
            return AnalysisStatus::Insuffisant;
        }
        let percent = f64::from(score) / f64::from(max_score) * 100.0;
        if percent >= 80.0 {
            AnalysisStatus::Excellent
        } else if percent >= 60.0 {
            AnalysisStatus::Passable
        } else {
            AnalysisStatus::Insuffisant
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AnalysisStatus::Excellent => "EXCELLENT",
            AnalysisStatus::Passable => "PASSABLE",
            AnalysisStatus::Insuffisant => "INSUFFISANT",
            AnalysisStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Roaming figures reported by the model. Handoff times are in ms, SNR in dB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoamingMetrics {
    pub total_events: f64,
    pub avg_handoff_time: f64,
    pub min_handoff_time: f64,
    pub max_handoff_time: f64,
    pub avg_snr_before: f64,
    pub avg_snr_after: f64,
    pub snr_improvement: f64,
}

/// A parameter change suggested by the model.
///
/// Parameter names are not checked against the device configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChange {
    #[serde(rename = "param", alias = "parameter", default)]
    pub parameter: String,
    #[serde(rename = "current", alias = "current_value", default)]
    pub current_value: Value,
    #[serde(
        rename = "recommended",
        alias = "recommended_value",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recommended_value: Option<Value>,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

impl ConfigChange {
    /// Has both a parameter name and a recommended value.
    pub fn is_applicable(&self) -> bool {
        !self.parameter.is_empty() && self.recommended_value.is_some()
    }
}

/// Normalized outcome of one analysis invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: u32,
    pub max_score: u32,
    pub status: AnalysisStatus,
    #[serde(default)]
    pub roaming_metrics: RoamingMetrics,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub config_changes: Vec<ConfigChange>,
    #[serde(default)]
    pub insights: String,
    #[serde(default)]
    pub source_config: DeviceConfig,
    pub created_at: DateTime<Utc>,
    /// Set only on ERROR results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// The unmodified model answer, kept on ERROR results for inspection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl AnalysisResult {
    /// Build the result returned when the model answer could not be parsed.
    pub fn error(message: String, raw_response: &str, source_config: DeviceConfig) -> Self {
        Self {
            score: 0,
            max_score: MAX_SCORE,
            status: AnalysisStatus::Error,
            roaming_metrics: RoamingMetrics::default(),
            recommendations: Vec::new(),
            config_changes: Vec::new(),
            insights: String::new(),
            source_config,
            created_at: Utc::now(),
            error_message: Some(message),
            raw_response: Some(raw_response.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == AnalysisStatus::Error
    }

    /// Score as a rounded percentage of `max_score`.
    pub fn score_percent(&self) -> u32 {
        if self.max_score == 0 {
            return 0;
        }
        (f64::from(self.score) / f64::from(self.max_score) * 100.0).round() as u32
    }

    /// Source configuration with every recommended change overlaid.
    pub fn recommended_configuration(&self) -> DeviceConfig {
        self.source_config.with_changes(&self.config_changes)
    }
}
