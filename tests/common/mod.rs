//! Common test utilities for integration tests
//!
//! Provides shared fixtures and helpers used across multiple integration
//! test files.

#![allow(dead_code)]

use chrono::Utc;
use ideaboard::domain::models::{AuthConfig, EndpointConfig, Idea, MatrixPosition};
use uuid::Uuid;

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Endpoint configuration pointing at a mock server.
pub fn endpoint_config(base_url: &str) -> EndpointConfig {
    EndpointConfig {
        base_url: base_url.to_string(),
        api_key: Some("anon-key".to_string()),
        timeout_secs: 5,
    }
}

/// Signed-in session for `user` with a refresh token.
pub fn auth_config(access_token: &str, user: &str) -> AuthConfig {
    AuthConfig {
        access_token: Some(access_token.to_string()),
        refresh_token: Some("refresh-1".to_string()),
        user_id: Some(user.to_string()),
    }
}

/// JSON row for a profile as the backend returns it.
pub fn profile_row(id: &str, email: &str, full_name: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "email": email,
        "full_name": full_name,
        "avatar_url": null,
        "role": "user",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
}

pub fn sample_idea(project_id: Uuid, content: &str, creator: &str) -> Idea {
    let mut idea = Idea::new(
        project_id,
        content,
        MatrixPosition::new(25.0, 75.0).expect("valid position"),
        creator,
    );
    idea.created_at = Utc::now();
    idea
}
