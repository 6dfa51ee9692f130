//! Command handlers behind the CLI. Each returns `Result<T, String>` with a
//! one-line, user-facing error message.

pub mod analyze;
pub mod config;
pub mod health;
pub mod history;
pub mod keychain;
pub mod preference;
