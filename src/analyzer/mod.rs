//! AI roaming analysis of Moxa device logs.

pub mod completion;
pub mod normalize;
pub mod prompts;
pub mod report;
pub mod session;
pub mod types;

pub use completion::{CompletionService, CompletionSettings, OpenAiClient};
pub use normalize::normalize_response;
pub use prompts::{compose_request, DEFAULT_TRUNCATION_LIMIT};
pub use report::{render_report, write_report};
pub use session::Analyzer;
pub use types::*;
