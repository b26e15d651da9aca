//! Integration tests for error types

#[cfg(test)]
mod tests {
    use hotswap_errors::*;

    #[test]
    fn test_error_conversion() {
        let svc_err = ServiceError::NotInstalled {
            name: "agent-1.0.0".into(),
        };
        let err: Error = svc_err.into();
        assert!(matches!(err, Error::Service(_)));
        assert_eq!(err.user_code(), Some("service.not_installed"));
    }

    #[test]
    fn test_error_display() {
        let err = ServiceError::StopTimedOut {
            name: "agent".into(),
            timeout_secs: 5,
        };
        assert_eq!(err.to_string(), "service agent did not stop within 5s");
    }

    #[test]
    fn test_error_clone() {
        let err = UpdateError::ApplyFailed {
            version: "1.2.0".into(),
            message: "disk full".into(),
        };
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
        let err: Error = io_err.into();
        assert!(matches!(
            err,
            Error::Io {
                kind: std::io::ErrorKind::PermissionDenied,
                ..
            }
        ));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        let timeout: Error = ServiceError::StopTimedOut {
            name: "agent".into(),
            timeout_secs: 5,
        }
        .into();
        assert!(timeout.is_retryable());

        let denied: Error = ServiceError::PermissionDenied {
            operation: "install".into(),
            message: "sudo: a password is required".into(),
        }
        .into();
        assert!(!denied.is_retryable());
        assert!(denied.user_hint().is_some());
    }
}
