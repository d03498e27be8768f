use thiserror::Error;

/// Errors from a secret provider lookup.
///
/// The configuration resolver never surfaces these to its callers; they are
/// recorded as warnings and resolution moves on to the next provider.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("access to secret '{0}' denied")]
    PermissionDenied(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed secret response: {0}")]
    Malformed(String),
}

/// Errors from a data API request.
///
/// Used inside the data client only; every public client method converts
/// these into an empty result at its boundary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("data API base URL is not configured")]
    NotConfigured,

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Errors from delivering an outbound activity to the Bot Connector.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("token acquisition failed: {0}")]
    Token(String),

    #[error("invalid service URL: {0}")]
    InvalidUrl(String),

    #[error("service URL host '{0}' is not trusted for authenticated replies")]
    UntrustedHost(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("connector rejected activity with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Errors from invoking a registered capability.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("unknown capability '{0}'")]
    Unknown(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("capability failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_error_display() {
        let err = DataError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected HTTP status 500: boom");
    }

    #[test]
    fn test_secret_error_display() {
        let err = SecretError::PermissionDenied("sql-connection-string".to_string());
        assert!(err.to_string().contains("sql-connection-string"));
    }

    #[test]
    fn test_capability_error_display() {
        let err = CapabilityError::Unknown("get_weather".to_string());
        assert_eq!(err.to_string(), "unknown capability 'get_weather'");
    }
}
