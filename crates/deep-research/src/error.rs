//! Error types for the research core
//!
//! Provider failures are recovered inside the research loop; only
//! [`ResearchError`] ever reaches the caller, and even then it is folded into
//! a `ResearchResult` rather than returned as `Err`.

use thiserror::Error;

/// Failure of an external collaborator (search, extract or text generation).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized - check API key")]
    Unauthorized,

    #[error("Rate limited - too many requests")]
    RateLimited,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("HTTP error ({0}): {1}")]
    HttpError(u16, String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The provider answered but reported `success: false`.
    #[error("Provider rejected the request: {0}")]
    Rejected(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProviderError {
    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Timeout
                | ProviderError::Connection(_)
                | ProviderError::RateLimited
                | ProviderError::ServerError(_, _)
        )
    }

    /// Classify a transport-level reqwest failure.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout
        } else if e.is_connect() {
            ProviderError::Connection(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => ProviderError::Unauthorized,
            429 => ProviderError::RateLimited,
            400 => ProviderError::BadRequest(body),
            500..=599 => ProviderError::ServerError(status, body),
            _ => ProviderError::HttpError(status, body),
        }
    }
}

/// The model's analysis text could not be decoded into a verdict.
#[derive(Debug, Clone, Error)]
#[error("Failed to parse analysis response: {reason}")]
pub struct AnalysisParseError {
    pub reason: String,
    /// The raw model output, kept for logging
    pub raw: String,
}

/// Why the analysis step produced no verdict.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("Analysis call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Parse(#[from] AnalysisParseError),
}

/// Progress sink delivery failure
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fatal failure of a research run
#[derive(Debug, Clone, Error)]
pub enum ResearchError {
    #[error("Synthesis failed: {0}")]
    Synthesis(ProviderError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_retryable() {
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::ServerError(502, "bad gateway".into()).is_retryable());
        assert!(!ProviderError::Unauthorized.is_retryable());
        assert!(!ProviderError::Rejected("quota".into()).is_retryable());
        assert!(!ProviderError::ParseError("eof".into()).is_retryable());
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(
            ProviderError::from_status(401, String::new()),
            ProviderError::Unauthorized
        ));
        assert!(matches!(
            ProviderError::from_status(429, String::new()),
            ProviderError::RateLimited
        ));
        assert!(matches!(
            ProviderError::from_status(503, "down".into()),
            ProviderError::ServerError(503, _)
        ));
        assert!(matches!(
            ProviderError::from_status(404, "missing".into()),
            ProviderError::HttpError(404, _)
        ));
    }

    #[test]
    fn test_analysis_error_from_parse() {
        let parse = AnalysisParseError {
            reason: "missing field `gaps`".into(),
            raw: "{}".into(),
        };
        let err: AnalysisError = parse.into();
        assert!(matches!(err, AnalysisError::Parse(_)));
        assert!(err.to_string().contains("gaps"));
    }
}
