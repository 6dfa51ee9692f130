//! Prompt construction for roaming analysis completion calls.

use serde_json::Value;

use crate::device::DeviceConfig;

/// Default maximum number of log characters sent to the model.
pub const DEFAULT_TRUNCATION_LIMIT: usize = 15_000;

/// Appended to the log text when it was cut at the truncation limit.
pub const TRUNCATION_MARKER: &str = "\n[Log truncated to limit size...]";

/// Reference values the model compares the current configuration against.
const IDEAL_PARAMETERS: &str = r#"- Minimum transmission rate: 12 Mbps (improves transmission reliability)
- Maximum transmission power: 20 dBm (balance between range and interference)
- RTS threshold: 512 (suited to industrial environments with interference)
- Fragmentation threshold: 2346 (avoids needless fragmentation)
- Roaming mechanism: SNR (more reliable than signal strength)
- Roaming difference: 8 dB (good balance to avoid ping-pong roaming)
- Roaming threshold (SNR): 40 dB (suited to industrial environments)
- Roaming threshold (signal strength): -75 dBm (suited to industrial environments)
- AP candidate threshold (SNR): 25 dB (allows good AP selection)
- AP candidate threshold (signal strength): -75 dBm (allows good AP selection)
- Remote connection check: enabled (improves disconnection detection)
- WMM: enabled (improves QoS)
- Turbo Roaming: enabled (reduces handoff time)
- AP alive check: enabled (improves reliability)"#;

/// Literal example of the JSON document the model must answer with.
const RESPONSE_EXAMPLE: &str = r#"{
  "roaming_metrics": {
    "total_events": 0,
    "avg_handoff_time": 0,
    "min_handoff_time": 0,
    "max_handoff_time": 0,
    "avg_snr_before": 0,
    "avg_snr_after": 0,
    "snr_improvement": 0
  },
  "score": 0,
  "recommendations": [
    "Detailed description of recommendation 1 with concrete actions",
    "Detailed description of recommendation 2 with concrete actions"
  ],
  "config_changes": [
    {
      "param": "Parameter name",
      "current": "Current value",
      "recommended": "Recommended value",
      "reason": "Detailed reason for the change",
      "impact": "Expected impact of the change on performance"
    }
  ],
  "analysis": "Detailed analysis of roaming performance, explaining the problems found and how the recommended changes address them"
}"#;

/// Ideal parameter values as a configuration, compared against the current
/// one by `config ideal`. SNR thresholds are in dB. Must agree with
/// `IDEAL_PARAMETERS`.
pub fn ideal_configuration() -> DeviceConfig {
    match serde_json::json!({
        "min_transmission_rate": 12,
        "max_transmission_power": 20,
        "rts_threshold": 512,
        "fragmentation_threshold": 2346,
        "roaming_mechanism": "snr",
        "roaming_difference": 8,
        "remote_connection_check": true,
        "wmm_enabled": true,
        "turbo_roaming": true,
        "ap_alive_check": true,
        "roaming_threshold_type": "snr",
        "roaming_threshold_value": 40,
        "ap_candidate_threshold_type": "snr",
        "ap_candidate_threshold_value": 25
    }) {
        Value::Object(map) => DeviceConfig::from_map(map),
        _ => DeviceConfig::new(),
    }
}

/// Cut `log_text` to at most `limit` characters and append the truncation marker.
///
/// The cut is a plain character count: it may split a log line. Returns the
/// text unchanged when it already fits.
pub fn truncate_log(log_text: &str, limit: usize) -> (String, bool) {
    match log_text.char_indices().nth(limit) {
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_MARKER.len());
            truncated.push_str(&log_text[..byte_idx]);
            truncated.push_str(TRUNCATION_MARKER);
            (truncated, true)
        }
        None => (log_text.to_string(), false),
    }
}

/// Build the roaming analysis prompt.
///
/// # Arguments
/// * `log_text` - Raw device log, truncated to `limit` characters
/// * `config` - Current device configuration, embedded as pretty JSON
/// * `limit` - Maximum log characters (see [`DEFAULT_TRUNCATION_LIMIT`])
pub fn compose_request(log_text: &str, config: &DeviceConfig, limit: usize) -> String {
    let (log, _) = truncate_log(log_text, limit);
    let config_text = config.to_pretty_json();

    format!(
        r#"As an expert in wireless networks, and in the configuration of Moxa devices in particular, analyze the following log and the current configuration to provide roaming optimization recommendations.

## Current Moxa configuration:
```json
{config_text}
```

## Analysis objectives:
1. Identify the roaming events in the log
2. Analyze roaming performance (handoff time, SNR improvement, etc.)
3. Assess whether the current parameters are optimal
4. Suggest changes to improve roaming performance
5. Provide recommendations tailored to this specific case

## Moxa log to analyze:
```
{log}
```

## Ideal parameters for reference:
{ideal}

## Required response format (JSON):
```json
{example}
```

For each recommendation, provide:
1. A detailed explanation of the problem found
2. The concrete actions to take
3. The expected benefits after the change
4. Advice for evaluating the effectiveness of the change

Answer only in the requested JSON format, without any additional text.
"#,
        config_text = config_text,
        log = log,
        ideal = IDEAL_PARAMETERS,
        example = RESPONSE_EXAMPLE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_log_embedded_verbatim() {
        let log = "Roaming from AP-01 to AP-02, SNR 18 -> 34 dB";
        let prompt = compose_request(log, &DeviceConfig::moxa_defaults(), DEFAULT_TRUNCATION_LIMIT);
        assert!(prompt.contains(&format!("```\n{}\n```", log)));
        assert!(!prompt.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn test_log_at_limit_not_truncated() {
        let log = "x".repeat(100);
        let (out, truncated) = truncate_log(&log, 100);
        assert!(!truncated);
        assert_eq!(out, log);
    }

    #[test]
    fn test_long_log_cut_at_limit_with_marker() {
        let log = "abcdefghij".repeat(3);
        let (out, truncated) = truncate_log(&log, 25);
        assert!(truncated);
        assert_eq!(out, format!("{}{}", &log[..25], TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let log = "éèàçù".repeat(4);
        let (out, truncated) = truncate_log(&log, 7);
        assert!(truncated);
        let kept: String = log.chars().take(7).collect();
        assert_eq!(out, format!("{}{}", kept, TRUNCATION_MARKER));
    }

    #[test]
    fn test_prompt_sections_in_order() {
        let prompt = compose_request("log line", &DeviceConfig::moxa_defaults(), 100);
        let config_pos = prompt.find("## Current Moxa configuration").unwrap();
        let log_pos = prompt.find("## Moxa log to analyze").unwrap();
        let ideal_pos = prompt.find("## Ideal parameters for reference").unwrap();
        let format_pos = prompt.find("## Required response format").unwrap();
        assert!(config_pos < log_pos);
        assert!(log_pos < ideal_pos);
        assert!(ideal_pos < format_pos);
    }

    #[test]
    fn test_prompt_embeds_config_as_pretty_json() {
        let config = DeviceConfig::moxa_defaults();
        let prompt = compose_request("", &config, 100);
        assert!(prompt.contains(&config.to_pretty_json()));
        assert!(prompt.contains("\"roaming_difference\": 9"));
    }

    #[test]
    fn test_prompt_contains_response_schema_keys() {
        let prompt = compose_request("", &DeviceConfig::new(), 100);
        for key in [
            "roaming_metrics",
            "total_events",
            "avg_handoff_time",
            "snr_improvement",
            "config_changes",
            "\"param\"",
            "\"recommended\"",
            "\"analysis\"",
        ] {
            assert!(prompt.contains(key), "prompt missing {}", key);
        }
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let config = DeviceConfig::moxa_defaults();
        assert_eq!(
            compose_request("same", &config, 10),
            compose_request("same", &config, 10)
        );
    }

    #[test]
    fn test_ideal_configuration_values() {
        let ideal = ideal_configuration();
        assert_eq!(ideal.get("roaming_difference"), Some(&serde_json::json!(8)));
        assert_eq!(ideal.get("roaming_threshold_value"), Some(&serde_json::json!(40)));
        assert_eq!(ideal.get("roaming_mechanism"), Some(&serde_json::json!("snr")));
    }

    #[test]
    fn test_ideal_configuration_matches_prompt_table() {
        let ideal = ideal_configuration();
        let expected_lines = [
            ("min_transmission_rate", "Minimum transmission rate: 12 Mbps"),
            ("max_transmission_power", "Maximum transmission power: 20 dBm"),
            ("rts_threshold", "RTS threshold: 512"),
            ("fragmentation_threshold", "Fragmentation threshold: 2346"),
            ("roaming_difference", "Roaming difference: 8 dB"),
            ("roaming_threshold_value", "Roaming threshold (SNR): 40 dB"),
            ("ap_candidate_threshold_value", "AP candidate threshold (SNR): 25 dB"),
        ];
        for (key, line) in expected_lines {
            let value = ideal.get(key).unwrap().to_string();
            assert!(line.contains(&value), "{} = {} not in '{}'", key, value, line);
            assert!(IDEAL_PARAMETERS.contains(line), "missing line '{}'", line);
        }
        for key in ["remote_connection_check", "wmm_enabled", "turbo_roaming", "ap_alive_check"] {
            assert_eq!(ideal.get(key), Some(&serde_json::json!(true)));
        }
        assert_eq!(IDEAL_PARAMETERS.matches(": enabled").count(), 4);
    }
}
