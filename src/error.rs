use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("No OpenAI API key configured. Run `moxa-wifi-analyzer key set <KEY>` or set OPENAI_API_KEY.")]
    MissingCredential,

    #[error("Keychain error: {0}")]
    Keychain(String),

    #[error("Completion API timeout after {0}s")]
    Timeout(u64),

    #[error("Completion API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Completion API request failed: {0}")]
    Transport(String),

    #[error("Malformed completion API response: {0}")]
    MalformedEnvelope(String),

    #[error("An analysis is already running")]
    AnalysisInProgress,

    #[error("Config error: {0}")]
    Config(String),

    #[error("History error: {0}")]
    History(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<AnalyzerError> for String {
    fn from(err: AnalyzerError) -> Self {
        err.to_string()
    }
}
