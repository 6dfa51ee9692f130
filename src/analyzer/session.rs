//! One analysis invocation: compose, call, normalize.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use super::completion::CompletionService;
use super::normalize::normalize_response;
use super::prompts::{compose_request, truncate_log, DEFAULT_TRUNCATION_LIMIT};
use super::types::AnalysisResult;
use crate::device::DeviceConfig;
use crate::error::AnalyzerError;

/// Runs analyses against a completion backend, one at a time.
///
/// A second `analyze` call while one is awaiting the backend fails with
/// [`AnalyzerError::AnalysisInProgress`] instead of racing it.
pub struct Analyzer<C> {
    service: C,
    truncation_limit: usize,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when dropped, on success, error or panic.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AnalyzerError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| AnalyzerError::AnalysisInProgress)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: CompletionService> Analyzer<C> {
    pub fn new(service: C) -> Self {
        Self {
            service,
            truncation_limit: DEFAULT_TRUNCATION_LIMIT,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_truncation_limit(mut self, limit: usize) -> Self {
        self.truncation_limit = limit;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The prompt that `analyze` would send.
    pub fn compose(&self, log_text: &str, config: &DeviceConfig) -> String {
        compose_request(log_text, config, self.truncation_limit)
    }

    /// Analyze a device log with its current configuration.
    ///
    /// Credential, network and envelope failures are returned as errors.
    /// An answer that cannot be parsed still produces `Ok` with an ERROR result.
    pub async fn analyze(
        &self,
        log_text: &str,
        config: &DeviceConfig,
    ) -> Result<AnalysisResult, AnalyzerError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let original_len = log_text.chars().count();
        if truncate_log(log_text, self.truncation_limit).1 {
            warn!(
                "Log truncated from {} to {} characters for AI analysis",
                original_len, self.truncation_limit
            );
        }

        let prompt = self.compose(log_text, config);
        let raw_response = self.service.complete(&prompt).await?;
        let result = normalize_response(&raw_response, config);

        info!("Analysis complete: score {}/{} ({})", result.score, result.max_score, result.status);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::prompts::TRUNCATION_MARKER;
    use crate::analyzer::AnalysisStatus;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedService {
        answer: Result<String, ()>,
        delay: Duration,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedService {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Ok(answer.to_string()),
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                answer: Err(()),
                delay: Duration::ZERO,
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl CompletionService for ScriptedService {
        async fn complete(&self, prompt: &str) -> Result<String, AnalyzerError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.answer.clone().map_err(|_| AnalyzerError::Api {
                status: 500,
                message: "server error".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_analyze_normalizes_answer() {
        let analyzer = Analyzer::new(ScriptedService::answering(r#"{"score": 83}"#));
        let config = DeviceConfig::moxa_defaults();

        let result = analyzer.analyze("roaming log", &config).await.unwrap();
        assert_eq!(result.score, 83);
        assert_eq!(result.status, AnalysisStatus::Excellent);
        assert_eq!(result.source_config, config);
        assert!(!analyzer.is_busy());
    }

    #[tokio::test]
    async fn test_analyze_sends_truncated_prompt() {
        let analyzer = Analyzer::new(ScriptedService::answering("{}")).with_truncation_limit(10);
        analyzer
            .analyze(&"0123456789".repeat(5), &DeviceConfig::new())
            .await
            .unwrap();

        let prompts = analyzer.service.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(&format!("0123456789{}", TRUNCATION_MARKER)));
        assert!(!prompts[0].contains("01234567890"));
    }

    #[tokio::test]
    async fn test_unparsable_answer_is_ok_error_result() {
        let analyzer = Analyzer::new(ScriptedService::answering("I could not read the log."));
        let result = analyzer.analyze("log", &DeviceConfig::new()).await.unwrap();
        assert!(result.is_error());
        assert_eq!(result.raw_response.as_deref(), Some("I could not read the log."));
    }

    #[tokio::test]
    async fn test_service_failure_propagates_and_releases_flag() {
        let analyzer = Analyzer::new(ScriptedService::failing());
        let err = analyzer.analyze("log", &DeviceConfig::new()).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::Api { status: 500, .. }));
        assert!(!analyzer.is_busy());
    }

    #[tokio::test]
    async fn test_overlapping_analysis_rejected() {
        let analyzer = Analyzer::new(
            ScriptedService::answering(r#"{"score": 70}"#).slow(Duration::from_millis(50)),
        );
        let config = DeviceConfig::new();

        let (first, second) = tokio::join!(
            analyzer.analyze("log a", &config),
            analyzer.analyze("log b", &config)
        );

        let outcomes = [first, second];
        let completed: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].score, 70);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AnalyzerError::AnalysisInProgress))));

        // Flag released: a later call goes through.
        assert!(analyzer.analyze("log c", &config).await.is_ok());
    }
}
