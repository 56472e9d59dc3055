use std::time::Duration;

use pypi_gateway::{ErrorKind, GatewayError, Result};

fn api(status: u16) -> GatewayError {
    GatewayError::Api {
        status,
        message: format!("status {status}"),
    }
}

#[test]
fn test_error_display() {
    let err = GatewayError::NotFound("package 'ghost' not found on PyPI".to_string());
    assert_eq!(err.to_string(), "package 'ghost' not found on PyPI");

    let err = GatewayError::InvalidRequest("invalid package name ''".to_string());
    assert!(err.to_string().starts_with("invalid request"));
}

#[test]
fn test_exhausted_display_names_last_error() {
    let err = GatewayError::Exhausted {
        operation: "package_info".into(),
        attempts: 4,
        last: Box::new(api(503)),
    };
    let text = err.to_string();
    assert!(text.contains("package_info failed after 4 attempts"), "{text}");
    assert!(text.contains("503"), "{text}");
}

#[test]
fn test_result_alias() {
    fn returns_error() -> Result<()> {
        Err(GatewayError::Internal("boom".into()))
    }
    assert!(returns_error().is_err());
}

// ============================================================================
// Transient error classification
// ============================================================================

#[test]
fn transient_errors() {
    assert!(GatewayError::RateLimited { retry_after: None }.is_transient());
    assert!(
        GatewayError::RateLimited {
            retry_after: Some(Duration::from_secs(1))
        }
        .is_transient()
    );
    assert!(GatewayError::Http("connection reset".into()).is_transient());
    assert!(
        GatewayError::Timeout {
            operation: "releases".into(),
            after: Duration::from_secs(30)
        }
        .is_transient()
    );
    for status in [429, 500, 502, 503, 504] {
        assert!(api(status).is_transient(), "{status}");
    }
}

#[test]
fn permanent_errors() {
    assert!(!GatewayError::NotFound("x".into()).is_transient());
    assert!(!GatewayError::InvalidRequest("x".into()).is_transient());
    assert!(!GatewayError::Decode("x".into()).is_transient());
    assert!(!GatewayError::Configuration("x".into()).is_transient());
    assert!(!GatewayError::Internal("x".into()).is_transient());
    for status in [400, 401, 403, 404, 422] {
        assert!(!api(status).is_transient(), "{status}");
    }
    let exhausted = GatewayError::Exhausted {
        operation: "op".into(),
        attempts: 1,
        last: Box::new(api(503)),
    };
    assert!(!exhausted.is_transient());
}

#[test]
fn retry_after_hint() {
    let hinted = GatewayError::RateLimited {
        retry_after: Some(Duration::from_secs(7)),
    };
    assert_eq!(hinted.retry_after(), Some(Duration::from_secs(7)));
    assert_eq!(GatewayError::RateLimited { retry_after: None }.retry_after(), None);
    assert_eq!(api(503).retry_after(), None);
}

// ============================================================================
// Kind mapping
// ============================================================================

#[test]
fn error_kinds() {
    assert_eq!(GatewayError::NotFound("x".into()).kind(), ErrorKind::NotFound);
    assert_eq!(api(404).kind(), ErrorKind::NotFound);
    assert_eq!(GatewayError::InvalidRequest("x".into()).kind(), ErrorKind::InvalidRequest);
    assert_eq!(api(400).kind(), ErrorKind::InvalidRequest);
    assert_eq!(api(503).kind(), ErrorKind::Transient);
    assert_eq!(api(429).kind(), ErrorKind::Transient);
    assert_eq!(GatewayError::Http("reset".into()).kind(), ErrorKind::Transient);
    assert_eq!(GatewayError::Decode("bad json".into()).kind(), ErrorKind::Internal);
    assert_eq!(GatewayError::Configuration("x".into()).kind(), ErrorKind::Internal);
    assert_eq!(
        GatewayError::Exhausted {
            operation: "op".into(),
            attempts: 3,
            last: Box::new(GatewayError::Http("reset".into())),
        }
        .kind(),
        ErrorKind::Exhausted
    );
}

#[test]
fn json_errors_become_decode_errors() {
    let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let err: GatewayError = parse_err.into();
    assert!(matches!(err, GatewayError::Decode(_)));
}

#[test]
fn errors_clone_for_every_waiter() {
    let err = api(503);
    let copy = err.clone();
    assert_eq!(err.to_string(), copy.to_string());
}
