//! Error kinds surfaced at the gateway boundary.

/// Result type for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Errors produced while serving a gateway call.
///
/// None of these propagate to HTTP callers as faults: each operation maps
/// them to its safe default (empty results, not-ready, generic update
/// failure).
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Required input was missing. No downstream call was made.
    #[error("{0}")]
    Validation(String),

    /// The engine or the indexing service could not be reached, timed out,
    /// or answered with a non-success status.
    #[error("Downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    /// A downstream answered with a body of unexpected shape.
    #[error("Malformed downstream response: {0}")]
    Malformed(String),
}

impl GatewayError {
    /// Machine-readable kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation",
            GatewayError::DownstreamUnavailable(_) => "downstream_unavailable",
            GatewayError::Malformed(_) => "malformed",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, GatewayError::Validation(_))
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Malformed(err.to_string())
        } else if err.is_timeout() {
            GatewayError::DownstreamUnavailable(format!("timed out: {}", err))
        } else {
            GatewayError::DownstreamUnavailable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Malformed(err.to_string())
    }
}
