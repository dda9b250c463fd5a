//! Error types for the server binary.

/// Errors while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is absent.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// An environment variable could not be parsed.
    #[error("{0}")]
    Invalid(String),
}
