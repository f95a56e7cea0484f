//! Authentication integration tests.
//!
//! Tests verify:
//! - Missing or malformed bearer headers are rejected before any backend call
//! - Integration token rejection (invalid, rate limited, validator failure)
//! - Admin session resolution and role checks
//! - Rejected requests are never usage-audited

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use helpdesk_gateway::auth::VALIDATE_TOKEN_RPC;

use super::test_utils::{
    admin_router, integration_router, request, send, FakeBackend, ADMIN_TOKEN, AGENT_TOKEN,
    TOKEN,
};

// =============================================================================
// Missing Token
// =============================================================================

#[tokio::test]
async fn test_integration_missing_token() {
    let backend = Arc::new(FakeBackend::new().with_default_token());
    let router = integration_router(Arc::clone(&backend));

    let response = send(&router, request(Method::GET, "/tickets/t-1", None, None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({"error": "missing_token"}));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_malformed_authorization_headers() {
    let backend = Arc::new(FakeBackend::new().with_default_token());
    let router = integration_router(Arc::clone(&backend));

    for header in [
        "Basic dXNlcjpwYXNz",
        "Bearer",
        "Bearer ",
        TOKEN,
        "Token itk_live_abc123",
    ] {
        let request = Request::builder()
            .uri("/")
            .header("authorization", header)
            .body(Body::empty())
            .unwrap();
        let response = send(&router, request).await;

        assert_eq!(
            response.status,
            StatusCode::UNAUTHORIZED,
            "header {:?} should be rejected",
            header
        );
        assert_eq!(response.json()["error"], "missing_token");
    }

    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_lowercase_bearer_scheme_accepted() {
    let backend = Arc::new(FakeBackend::new().with_default_token());
    let router = integration_router(backend);

    let request = Request::builder()
        .uri("/")
        .header("authorization", format!("bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let response = send(&router, request).await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_missing_token() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let response = send(&router, request(Method::GET, "/activity-log", None, None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json(),
        json!({"error": "missing_token", "message": "Authorization header required"})
    );
    assert_eq!(backend.call_count(), 0);
}

// =============================================================================
// Integration Token Validation
// =============================================================================

#[tokio::test]
async fn test_unknown_token_rejected_on_every_route() {
    let backend = Arc::new(FakeBackend::new().with_default_token());
    let router = integration_router(Arc::clone(&backend));

    for (method, uri) in [
        (Method::GET, "/"),
        (Method::POST, "/tickets"),
        (Method::GET, "/tickets/t-1"),
        (Method::PATCH, "/tickets/t-1/status"),
        (Method::GET, "/no/such/route"),
    ] {
        let response = send(
            &router,
            request(method.clone(), uri, Some("itk_unknown"), Some(json!({}))),
        )
        .await;

        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(response.json()["error"], "invalid_token");
    }

    assert!(backend.usage_entries().await.is_empty());
}

#[tokio::test]
async fn test_revoked_token_carries_message() {
    let backend = Arc::new(FakeBackend::new().with_rejected_token(
        "itk_revoked",
        false,
        "Token has been revoked",
    ));
    let router = integration_router(backend);

    let response = send(&router, request(Method::GET, "/", Some("itk_revoked"), None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json(),
        json!({"error": "invalid_token", "message": "Token has been revoked"})
    );
}

#[tokio::test]
async fn test_rate_limited_token() {
    let backend = Arc::new(FakeBackend::new().with_rejected_token(
        "itk_busy",
        true,
        "Rate limit exceeded: 100 requests per hour",
    ));
    let router = integration_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(
            Method::POST,
            "/tickets",
            Some("itk_busy"),
            Some(json!({"title": "T"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.json()["error"], "rate_limit_exceeded");
    assert_eq!(
        response.json()["message"],
        "Rate limit exceeded: 100 requests per hour"
    );

    // Only the validation call happened; no ticket, no usage entry
    let calls = backend.rpc_calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, VALIDATE_TOKEN_RPC);
}

#[tokio::test]
async fn test_validator_failure_is_500() {
    let backend = Arc::new(
        FakeBackend::new().with_rpc_error(VALIDATE_TOKEN_RPC, "connection refused"),
    );
    let router = integration_router(Arc::clone(&backend));

    let response = send(&router, request(Method::GET, "/", Some(TOKEN), None)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({"error": "validation_failed", "details": "connection refused"})
    );
    assert!(backend.usage_entries().await.is_empty());
}

#[tokio::test]
async fn test_validation_receives_request_metadata() {
    let backend = Arc::new(FakeBackend::new().with_default_token());
    let router = integration_router(Arc::clone(&backend));

    let request = Request::builder()
        .method(Method::GET)
        .uri("//tickets/t-9")
        .header("authorization", format!("Bearer {}", TOKEN))
        .header("x-forwarded-for", "203.0.113.7")
        .header("user-agent", "acme-sync/2.1")
        .body(Body::empty())
        .unwrap();
    send(&router, request).await;

    let calls = backend.calls_to(VALIDATE_TOKEN_RPC).await;
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].params,
        json!({
            "p_token": TOKEN,
            "p_endpoint": "/tickets/t-9",
            "p_method": "GET",
            "p_ip_address": "203.0.113.7",
            "p_user_agent": "acme-sync/2.1",
        })
    );
}

// =============================================================================
// Admin Session Validation
// =============================================================================

#[tokio::test]
async fn test_admin_invalid_session() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(Method::GET, "/activity-log", Some("expired-session"), None),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.json(),
        json!({"error": "invalid_token", "message": "Authentication failed"})
    );
    assert!(backend.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_admin_requires_admin_role() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(
            Method::POST,
            "/invitations",
            Some(AGENT_TOKEN),
            Some(json!({"email": "new@example.com"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.json(),
        json!({"error": "insufficient_permissions", "message": "Admin role required"})
    );
    assert!(backend.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_admin_missing_profile() {
    let backend = Arc::new(FakeBackend::new().with_orphan_session("ghost", "c0c0c0c0"));
    let router = admin_router(backend);

    let response = send(&router, request(Method::GET, "/", Some("ghost"), None)).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(
        response.json(),
        json!({"error": "profile_not_found", "message": "User profile not found"})
    );
}

#[tokio::test]
async fn test_admin_profile_lookup_failure() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_failing_table("profiles"),
    );
    let router = admin_router(backend);

    let response = send(&router, request(Method::GET, "/", Some(ADMIN_TOKEN), None)).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.json()["error"], "profile_not_found");
}

#[tokio::test]
async fn test_admin_auth_precedes_routing() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(backend);

    let response = send(
        &router,
        request(Method::GET, "/definitely/not/a/route", Some("bogus"), None),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
