//! Tests for error classification and messages.

use super::*;

#[test]
fn test_commit_rejection_message_carries_status_and_body() {
    let error = CommitError::Rejected {
        status: 422,
        body: "Validation failed".to_string(),
    };

    assert_eq!(error.to_string(), "422 - Validation failed");
}

#[test]
fn test_commit_error_transient_classification() {
    let server_error = CommitError::Rejected {
        status: 502,
        body: String::new(),
    };
    let rate_limited = CommitError::Rejected {
        status: 429,
        body: String::new(),
    };
    let conflict = CommitError::Rejected {
        status: 409,
        body: String::new(),
    };

    assert!(server_error.is_transient());
    assert!(rate_limited.is_transient());
    assert!(!conflict.is_transient());
    assert!(CommitError::Network("reset".to_string()).is_transient());
    assert!(!CommitError::InvalidResponse {
        message: "missing sha".to_string()
    }
    .is_transient());
}

#[test]
fn test_auth_error_transient_classification() {
    assert!(AuthError::Network("timeout".to_string()).is_transient());
    assert!(AuthError::TokenExchangeFailed {
        status: 503,
        body: String::new()
    }
    .is_transient());
    assert!(!AuthError::TokenExchangeFailed {
        status: 401,
        body: "Bad credentials".to_string()
    }
    .is_transient());
    assert!(!AuthError::InvalidPrivateKey {
        message: "bad".to_string()
    }
    .is_transient());
}

#[test]
fn test_commit_error_wraps_auth_error() {
    let error: CommitError = AuthError::TokenExchangeFailed {
        status: 500,
        body: "boom".to_string(),
    }
    .into();

    assert!(error.is_transient());
    assert!(error.to_string().contains("500 - boom"));
}

#[test]
fn test_token_exchange_failure_message() {
    let error = AuthError::TokenExchangeFailed {
        status: 401,
        body: "Bad credentials".to_string(),
    };

    let message = error.to_string();
    assert!(message.contains("401"));
    assert!(message.contains("Bad credentials"));
}

#[test]
fn test_missing_fields_lists_every_field() {
    let error = ValidationError::MissingFields {
        fields: vec!["content".to_string(), "commitMessage".to_string()],
    };

    assert_eq!(
        error.to_string(),
        "Missing required fields: content, commitMessage"
    );
}

#[test]
fn test_setup_error_is_transparent() {
    let error: SetupError = ConfigError::MissingAuth.into();
    assert_eq!(
        error.to_string(),
        "Either githubToken or githubApp authentication must be provided"
    );

    let error: SetupError = AuthError::InvalidHeaderValue.into();
    assert_eq!(error.to_string(), "Credential is not a valid header value");
}

#[test]
fn test_secret_error_transient_classification() {
    assert!(SecretError::ProviderUnavailable("io".to_string()).is_transient());
    assert!(!SecretError::NotFound {
        reference: "default/creds/token".to_string()
    }
    .is_transient());
}

#[test]
fn test_setup_error_transient_classification() {
    let unavailable = SetupError::from(ConfigError::SecretResolution {
        field: "githubToken".to_string(),
        source: SecretError::ProviderUnavailable("io".to_string()),
    });
    let missing = SetupError::from(ConfigError::SecretResolution {
        field: "githubToken".to_string(),
        source: SecretError::NotFound {
            reference: "default/github/token".to_string(),
        },
    });

    assert!(unavailable.is_transient());
    assert!(!missing.is_transient());
    assert!(!SetupError::from(ConfigError::NoFiles).is_transient());
    assert!(SetupError::from(AuthError::Network("reset".to_string())).is_transient());
    assert!(!SetupError::from(AuthError::InvalidHeaderValue).is_transient());
}
