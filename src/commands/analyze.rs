//! Analysis commands.
//!
//! `analyze` reads a device log, resolves the configuration it ran under,
//! asks the completion service for a verdict and records the normalized
//! result in history. `report` and `apply` then work on recorded results.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::config::{resolve_device_config, store_current_config};
use super::history::{load_record, with_history, RecordSelector};
use crate::analyzer::{
    compose_request, render_report, write_report, AnalysisResult, Analyzer, CompletionService,
    ConfigChange, OpenAiClient,
};
use crate::device::{save_config, DeviceConfig};
use crate::error::AnalyzerError;
use crate::settings::credentials::resolve_api_key;
use crate::settings::{AppPaths, Preferences};

/// Inputs of one `analyze` invocation. `None` fields fall back to preferences.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeRequest {
    pub log_path: PathBuf,
    pub config_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
    pub truncation_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AnalyzeOutcome {
    /// History row of the recorded result
    pub id: i64,
    pub result: AnalysisResult,
}

#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub id: i64,
    pub applied: Vec<ConfigChange>,
    pub config: DeviceConfig,
}

fn read_log(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path)
        .map_err(|e| AnalyzerError::Io(format!("Failed to read log {:?}: {}", path, e)))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    if text.trim().is_empty() {
        warn!("Log {:?} is empty", path);
    }
    debug!("Read {} characters from {:?}", text.chars().count(), path);
    Ok(text)
}

/// Analyze a log with the OpenAI client configured from preferences.
pub async fn analyze_log(paths: &AppPaths, request: AnalyzeRequest) -> Result<AnalyzeOutcome, String> {
    let prefs = Preferences::open(&paths.preferences_file())?;
    let mut settings = prefs.completion_settings();
    if let Some(model) = &request.model {
        settings.model = model.clone();
    }
    if let Some(timeout) = request.timeout_secs {
        settings.timeout_secs = timeout;
    }
    let limit = request
        .truncation_limit
        .unwrap_or_else(|| prefs.truncation_limit());

    let (api_key, source) = resolve_api_key()?;
    debug!("Using API key from {:?}", source);

    let client = OpenAiClient::new(settings, api_key)?;
    info!(
        "Analyzing {:?} with model {} (timeout {}s)",
        request.log_path,
        client.settings().model,
        client.settings().timeout_secs
    );
    let analyzer = Analyzer::new(client).with_truncation_limit(limit);
    analyze_with(paths, &analyzer, &request).await
}

/// Analyze a log with any completion backend and record the result.
pub async fn analyze_with<C: CompletionService>(
    paths: &AppPaths,
    analyzer: &Analyzer<C>,
    request: &AnalyzeRequest,
) -> Result<AnalyzeOutcome, String> {
    let log_text = read_log(&request.log_path)?;
    let config = resolve_device_config(paths, request.config_path.as_deref())?;

    let result = analyzer.analyze(&log_text, &config).await?;
    if let Some(message) = &result.error_message {
        warn!("Model answer could not be used: {}", message);
    }

    let log_path = request.log_path.display().to_string();
    let stored = result.clone();
    let id = with_history(paths.history_db(), move |history| {
        history.record_analysis(&log_path, &stored)
    })
    .await?;

    if let Some(output) = &request.output {
        write_report(&result, output)
            .map_err(|e| AnalyzerError::Io(format!("Failed to write report: {:#}", e)))?;
    }
    Ok(AnalyzeOutcome { id, result })
}

/// The prompt `analyze` would send, without calling the service.
pub fn compose_prompt(
    paths: &AppPaths,
    log_path: &Path,
    config_path: Option<&Path>,
    truncation_limit: Option<usize>,
) -> Result<String, String> {
    let limit = match truncation_limit {
        Some(limit) => limit,
        None => Preferences::open(&paths.preferences_file())?.truncation_limit(),
    };
    let log_text = read_log(log_path)?;
    let config = resolve_device_config(paths, config_path)?;
    Ok(compose_request(&log_text, &config, limit))
}

/// Render a recorded analysis, optionally saving it to `output`.
pub async fn report_analysis(
    paths: &AppPaths,
    selector: RecordSelector,
    output: Option<&Path>,
) -> Result<String, String> {
    let record = load_record(paths, selector).await?;
    if let Some(output) = output {
        write_report(&record.result, output)
            .map_err(|e| AnalyzerError::Io(format!("Failed to write report: {:#}", e)))?;
    }
    Ok(render_report(&record.result))
}

/// Overlay a recorded analysis' changes on its source configuration and
/// store the outcome as the current configuration.
pub async fn apply_recommendations(
    paths: &AppPaths,
    selector: RecordSelector,
    output: Option<&Path>,
) -> Result<ApplyOutcome, String> {
    let record = load_record(paths, selector).await?;
    if record.result.is_error() {
        return Err(format!(
            "Analysis {} failed and has no configuration changes to apply",
            record.id
        ));
    }

    let applied: Vec<ConfigChange> = record
        .result
        .config_changes
        .iter()
        .filter(|change| change.is_applicable())
        .cloned()
        .collect();
    let skipped = record.result.config_changes.len() - applied.len();
    if skipped > 0 {
        warn!("Skipped {} changes without a parameter or recommended value", skipped);
    }

    let config = record.result.recommended_configuration();
    store_current_config(paths, &config)?;
    if let Some(output) = output {
        save_config(&config, output)
            .map_err(|e| AnalyzerError::Config(format!("{:#}", e)))?;
    }

    let id = record.id;
    with_history(paths.history_db(), move |history| history.mark_applied(id)).await?;
    info!("Applied {} changes from analysis {}", applied.len(), id);

    Ok(ApplyOutcome {
        id,
        applied,
        config,
    })
}
