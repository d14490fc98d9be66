use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum GatewayError {
    #[error(
        "BGG API is currently rate limiting requests (gave up after {attempts} attempts); please try again in a few seconds"
    )]
    #[diagnostic(help("the upstream enforces a single per-client request budget"))]
    RateLimited { attempts: usize },

    #[error("BGG API request failed after {attempts} attempts: {message}")]
    NetworkTransient { attempts: usize, message: String },

    #[error("BGG API returned status {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("failed to parse XML response from BGG API: {0}")]
    ParseError(String),

    #[error("cache failure: {0}")]
    Cache(String),

    #[error("storage backend unavailable: {0}")]
    Storage(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl GatewayError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. } | GatewayError::NetworkTransient { .. }
        )
    }
}
