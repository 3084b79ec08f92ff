//! Transient/permanent split for fetch errors

use crate::FetchError;

/// Whether an error is worth another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient; retry with backoff
    Retryable,

    /// Permanent for this URL; retrying would repeat the same answer
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable)
    }
}

/// Classifies a fetch error for the retry loop.
///
/// Network-level failures and throttling are transient. Client errors other
/// than 429 mean the URL itself is bad, and a body we cannot make sense of
/// will not improve on a second download.
pub fn classify(error: &FetchError) -> ErrorClass {
    match error {
        FetchError::Timeout { .. }
        | FetchError::ConnectionRefused { .. }
        | FetchError::DnsFailure { .. } => ErrorClass::Retryable,
        FetchError::Http { status: 429, .. } => ErrorClass::Retryable,
        FetchError::Http { status, .. } if *status >= 500 => ErrorClass::Retryable,
        _ => ErrorClass::Fatal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> FetchError {
        FetchError::Http {
            url: "https://example.com/".to_string(),
            status,
        }
    }

    #[test]
    fn test_network_failures_are_retryable() {
        let url = "https://example.com/".to_string();
        assert!(classify(&FetchError::Timeout { url: url.clone() }).is_retryable());
        assert!(classify(&FetchError::ConnectionRefused { url: url.clone() }).is_retryable());
        assert!(classify(&FetchError::DnsFailure { url }).is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        assert!(classify(&http(500)).is_retryable());
        assert!(classify(&http(502)).is_retryable());
        assert!(classify(&http(503)).is_retryable());
    }

    #[test]
    fn test_throttling_is_retryable() {
        assert!(classify(&http(429)).is_retryable());
    }

    #[test]
    fn test_client_errors_are_fatal() {
        assert_eq!(classify(&http(400)), ErrorClass::Fatal);
        assert_eq!(classify(&http(403)), ErrorClass::Fatal);
        assert_eq!(classify(&http(404)), ErrorClass::Fatal);
    }

    #[test]
    fn test_malformed_body_is_fatal() {
        let err = FetchError::Malformed {
            url: "https://example.com/".to_string(),
            message: "body was not valid UTF-8".to_string(),
        };
        assert_eq!(classify(&err), ErrorClass::Fatal);
    }

    #[test]
    fn test_terminal_conditions_are_fatal() {
        assert_eq!(classify(&FetchError::NoEndpointAvailable), ErrorClass::Fatal);
        assert_eq!(classify(&FetchError::Cancelled), ErrorClass::Fatal);
        assert_eq!(
            classify(&FetchError::RobotsDenied {
                url: "https://example.com/".to_string()
            }),
            ErrorClass::Fatal
        );
    }
}
