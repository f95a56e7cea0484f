//! User administration API tests.
//!
//! Tests verify:
//! - Field validation for every admin operation, before any procedure call
//! - Procedure parameters carry the acting administrator's id
//! - Email side effects and their best-effort reporting
//! - Body parsing strictness and unknown-endpoint handling

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use helpdesk_gateway::server::users::{
    ACTIVITY_LOG_RPC, BULK_UPDATE_ROLES_RPC, CREATE_INVITATION_RPC, RESEND_INVITATION_RPC,
    RESET_PASSWORD_RPC, TOGGLE_STATUS_RPC,
};

use super::test_utils::{
    admin_router, raw_request, request, send, FakeBackend, ADMIN_ID, ADMIN_TOKEN, AGENT_ID,
    SENDER,
};

const INVITATION_ID: &str = "5e5e5e5e-0000-4000-8000-000000000005";

fn invitation_row(email: &str, role: &str) -> Value {
    json!({
        "invitation_id": INVITATION_ID,
        "email": email,
        "invitation_code": "c0de",
        "role": role,
        "created_at": "2024-05-01T10:00:00Z",
    })
}

// =============================================================================
// Health and Routing
// =============================================================================

#[tokio::test]
async fn test_health() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(backend);

    let response = send(&router, request(Method::GET, "/", Some(ADMIN_TOKEN), None)).await;

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "user-admin");
    assert_eq!(body["version"], "1.0.0");
    assert_eq!(body["endpoints"].as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn test_unknown_endpoint() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    for (method, uri) in [
        (Method::GET, "/users"),
        (Method::PATCH, "/users/not-hex!/status"),
        (Method::DELETE, "/invitations"),
    ] {
        let response = send(
            &router,
            request(method.clone(), uri, Some(ADMIN_TOKEN), Some(json!({}))),
        )
        .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(
            response.json(),
            json!({"error": "not_found", "message": "Endpoint not found"})
        );
    }

    assert!(backend.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_invalid_json_rejected() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    for body in ["{\"email\": ", ""] {
        let response = send(
            &router,
            raw_request(Method::POST, "/invitations", ADMIN_TOKEN, body),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json(), json!({"error": "invalid_json"}));
    }

    assert!(backend.rpc_calls().await.is_empty());
}

// =============================================================================
// Invitations
// =============================================================================

#[tokio::test]
async fn test_create_invitation_defaults_to_agent() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(
                CREATE_INVITATION_RPC,
                invitation_row("new.hire@example.com", "agent"),
            ),
    );
    let router = admin_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(
            Method::POST,
            "/invitations",
            Some(ADMIN_TOKEN),
            Some(json!({"email": "  New.Hire@Example.com "})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "invitation": {
                "id": INVITATION_ID,
                "email": "new.hire@example.com",
                "role": "agent",
                "created_at": "2024-05-01T10:00:00Z",
            },
            "email_sent": true,
            "email_error": null,
        })
    );

    let calls = backend.calls_to(CREATE_INVITATION_RPC).await;
    assert_eq!(
        calls[0].params,
        json!({
            "p_email": "new.hire@example.com",
            "p_role": "agent",
            "p_invited_by": ADMIN_ID,
        })
    );

    let invites = backend.invites().await;
    assert_eq!(invites.len(), 1);
    assert_eq!(invites[0].email, "new.hire@example.com");
    assert_eq!(invites[0].role, "agent");
    assert_eq!(invites[0].invitation_code.as_deref(), Some("c0de"));
    assert_eq!(invites[0].sender, SENDER);
    assert_eq!(
        invites[0].redirect_to,
        "https://project.example.co/auth/v1/verify?token=c0de&type=invite\
         &redirect_to=https%3A%2F%2Fproject.example.co"
    );
}

#[tokio::test]
async fn test_create_invitation_validation() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let cases = [
        (json!({}), json!({"error": "missing_email"})),
        (json!({"email": "   "}), json!({"error": "missing_email"})),
        (json!({"email": 42}), json!({"error": "missing_email"})),
        (
            json!({"email": "x@example.com", "role": "owner"}),
            json!({"error": "invalid_role", "message": "Role must be 'agent' or 'admin'"}),
        ),
    ];

    for (body, expected) in cases {
        let response = send(
            &router,
            request(Method::POST, "/invitations", Some(ADMIN_TOKEN), Some(body)),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json(), expected);
    }

    assert!(backend.rpc_calls().await.is_empty());
    assert!(backend.invites().await.is_empty());
}

#[tokio::test]
async fn test_create_invitation_email_failure_is_reported() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(CREATE_INVITATION_RPC, invitation_row("x@example.com", "admin"))
            .with_invite_error("User already registered"),
    );
    let router = admin_router(backend);

    let response = send(
        &router,
        request(
            Method::POST,
            "/invitations",
            Some(ADMIN_TOKEN),
            Some(json!({"email": "x@example.com", "role": "admin"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let body = response.json();
    assert_eq!(body["invitation"]["role"], "admin");
    assert_eq!(body["email_sent"], false);
    assert_eq!(body["email_error"], "User already registered");
}

#[tokio::test]
async fn test_create_invitation_backend_failure() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc_error(CREATE_INVITATION_RPC, "invitation already pending"),
    );
    let router = admin_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(
            Method::POST,
            "/invitations",
            Some(ADMIN_TOKEN),
            Some(json!({"email": "x@example.com"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({"error": "invitation_failed", "details": "invitation already pending"})
    );
    assert!(backend.invites().await.is_empty());
}

#[tokio::test]
async fn test_create_invitation_unexpected_result() {
    // Unscripted procedures answer null, which is not an invitation row
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(
            Method::POST,
            "/invitations",
            Some(ADMIN_TOKEN),
            Some(json!({"email": "x@example.com"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["error"], "internal_error");
    assert!(body["details"]
        .as_str()
        .unwrap()
        .starts_with("unexpected create_user_invitation result"));
    assert!(backend.invites().await.is_empty());
}

#[tokio::test]
async fn test_resend_invitation() {
    let mut row = invitation_row("late@example.com", "admin");
    row["resent_at"] = json!("2024-05-02T09:00:00Z");

    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(RESEND_INVITATION_RPC, row),
    );
    let router = admin_router(Arc::clone(&backend));

    let uri = format!("/invitations/{}/resend", INVITATION_ID);
    let response = send(&router, request(Method::POST, &uri, Some(ADMIN_TOKEN), Some(json!({})))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "invitation": {
                "id": INVITATION_ID,
                "email": "late@example.com",
                "resent_at": "2024-05-02T09:00:00Z",
            },
            "email_sent": true,
            "email_error": null,
        })
    );

    let calls = backend.calls_to(RESEND_INVITATION_RPC).await;
    assert_eq!(
        calls[0].params,
        json!({"p_invitation_id": INVITATION_ID, "p_resent_by": ADMIN_ID})
    );

    // The email uses the default role even for an admin invitation
    let invites = backend.invites().await;
    assert_eq!(invites[0].role, "agent");
    assert_eq!(invites[0].email, "late@example.com");
}

#[tokio::test]
async fn test_resend_invitation_without_email() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions().with_rpc(
        RESEND_INVITATION_RPC,
        json!({"invitation_id": INVITATION_ID, "invitation_code": "c0de"}),
    ));
    let router = admin_router(Arc::clone(&backend));

    let uri = format!("/invitations/{}/resend", INVITATION_ID);
    let response = send(&router, request(Method::POST, &uri, Some(ADMIN_TOKEN), Some(json!({})))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["email_sent"], false);
    assert_eq!(response.json()["email_error"], "no email address on record");
    assert!(backend.invites().await.is_empty());
}

// =============================================================================
// Roles and Status
// =============================================================================

#[tokio::test]
async fn test_bulk_update_roles() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(BULK_UPDATE_ROLES_RPC, json!({"updated_count": 2})),
    );
    let router = admin_router(Arc::clone(&backend));

    let response = send(
        &router,
        request(
            Method::POST,
            "/users/roles/bulk",
            Some(ADMIN_TOKEN),
            Some(json!({"user_ids": [AGENT_ID, "c0c0c0c0"], "new_role": "admin"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({"success": true, "result": {"updated_count": 2}})
    );

    let calls = backend.calls_to(BULK_UPDATE_ROLES_RPC).await;
    assert_eq!(
        calls[0].params,
        json!({
            "p_user_ids": [AGENT_ID, "c0c0c0c0"],
            "p_new_role": "admin",
            "p_updated_by": ADMIN_ID,
        })
    );
}

#[tokio::test]
async fn test_bulk_update_roles_validation() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let cases = [
        (json!({"new_role": "admin"}), "missing_user_ids"),
        (json!({"user_ids": "abc", "new_role": "admin"}), "missing_user_ids"),
        (json!({"user_ids": []}), "missing_new_role"),
        (json!({"user_ids": [], "new_role": "root"}), "invalid_role"),
    ];

    for (body, code) in cases {
        let response = send(
            &router,
            request(Method::POST, "/users/roles/bulk", Some(ADMIN_TOKEN), Some(body)),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json()["error"], code);
    }

    assert!(backend.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_toggle_user_status() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(TOGGLE_STATUS_RPC, json!(true)),
    );
    let router = admin_router(Arc::clone(&backend));

    let uri = format!("/users/{}/status", AGENT_ID);
    let response = send(
        &router,
        request(Method::PATCH, &uri, Some(ADMIN_TOKEN), Some(json!({"is_active": false}))),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({"success": true, "result": true}));

    let calls = backend.calls_to(TOGGLE_STATUS_RPC).await;
    assert_eq!(
        calls[0].params,
        json!({"p_user_id": AGENT_ID, "p_is_active": false, "p_toggled_by": ADMIN_ID})
    );
}

#[tokio::test]
async fn test_toggle_user_status_requires_boolean() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));

    let uri = format!("/users/{}/status", AGENT_ID);
    for body in [json!({}), json!({"is_active": "false"}), json!({"is_active": 0})] {
        let response = send(&router, request(Method::PATCH, &uri, Some(ADMIN_TOKEN), Some(body))).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json(),
            json!({"error": "missing_is_active", "message": "is_active must be a boolean"})
        );
    }

    assert!(backend.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_toggle_user_status_backend_failure() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc_error(TOGGLE_STATUS_RPC, "cannot deactivate yourself"),
    );
    let router = admin_router(backend);

    let uri = format!("/users/{}/status", ADMIN_ID);
    let response = send(
        &router,
        request(Method::PATCH, &uri, Some(ADMIN_TOKEN), Some(json!({"is_active": false}))),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({"error": "toggle_failed", "details": "cannot deactivate yourself"})
    );
}

// =============================================================================
// Password Reset
// =============================================================================

#[tokio::test]
async fn test_reset_password() {
    let backend = Arc::new(
        FakeBackend::new().with_admin_sessions().with_rpc(
            RESET_PASSWORD_RPC,
            json!({
                "user_id": AGENT_ID,
                "email": "agent@example.com",
                "reset_at": "2024-05-03T08:00:00Z",
            }),
        ),
    );
    let router = admin_router(Arc::clone(&backend));

    let uri = format!("/users/{}/password", AGENT_ID);
    let response = send(
        &router,
        request(
            Method::PATCH,
            &uri,
            Some(ADMIN_TOKEN),
            Some(json!({"new_password": "hunter22"})),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "result": {
                "user_id": AGENT_ID,
                "email": "agent@example.com",
                "reset_at": "2024-05-03T08:00:00Z",
            },
            "email_sent": true,
            "email_error": null,
        })
    );

    let calls = backend.calls_to(RESET_PASSWORD_RPC).await;
    assert_eq!(
        calls[0].params,
        json!({"p_user_id": AGENT_ID, "p_new_password": "hunter22", "p_reset_by": ADMIN_ID})
    );

    assert_eq!(
        backend.resets().await,
        vec![(
            "agent@example.com".to_string(),
            "https://project.example.co/auth/reset-password".to_string()
        )]
    );
}

#[tokio::test]
async fn test_reset_password_validation() {
    let backend = Arc::new(FakeBackend::new().with_admin_sessions());
    let router = admin_router(Arc::clone(&backend));
    let uri = format!("/users/{}/password", AGENT_ID);

    let response = send(&router, request(Method::PATCH, &uri, Some(ADMIN_TOKEN), Some(json!({})))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({"error": "missing_new_password"}));

    let response = send(
        &router,
        request(Method::PATCH, &uri, Some(ADMIN_TOKEN), Some(json!({"new_password": "abc"}))),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({"error": "password_too_short", "message": "Password must be at least 6 characters"})
    );

    assert!(backend.rpc_calls().await.is_empty());
}

#[tokio::test]
async fn test_reset_password_email_failure_is_reported() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(
                RESET_PASSWORD_RPC,
                json!({"user_id": AGENT_ID, "email": "agent@example.com", "reset_at": null}),
            )
            .with_reset_error("Email rate limit exceeded"),
    );
    let router = admin_router(backend);

    let uri = format!("/users/{}/password", AGENT_ID);
    let response = send(
        &router,
        request(Method::PATCH, &uri, Some(ADMIN_TOKEN), Some(json!({"new_password": "s3cret!"}))),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["email_sent"], false);
    assert_eq!(response.json()["email_error"], "Email rate limit exceeded");
}

// =============================================================================
// Activity Log
// =============================================================================

#[tokio::test]
async fn test_activity_log_defaults() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(ACTIVITY_LOG_RPC, json!([{"action": "login"}])),
    );
    let router = admin_router(Arc::clone(&backend));

    let response = send(&router, request(Method::GET, "/activity-log", Some(ADMIN_TOKEN), None)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({
            "success": true,
            "logs": [{"action": "login"}],
            "pagination": {"limit": 100, "offset": 0},
        })
    );
    assert_eq!(
        backend.calls_to(ACTIVITY_LOG_RPC).await[0].params,
        json!({"p_limit": 100, "p_offset": 0})
    );
}

#[tokio::test]
async fn test_activity_log_query_parameters() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc(ACTIVITY_LOG_RPC, json!([])),
    );
    let router = admin_router(Arc::clone(&backend));

    for (uri, limit, offset) in [
        ("/activity-log?limit=25&offset=50", 25, 50),
        ("/activity-log?limit=10abc", 10, 0),
        ("/activity-log?limit=lots&offset=", 100, 0),
        ("/activity-log?limit=5&limit=50&offset=1&offset=2", 5, 1),
        ("/activity-log?limit=99999999999999999999", i64::MAX, 0),
    ] {
        let response = send(&router, request(Method::GET, uri, Some(ADMIN_TOKEN), None)).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            response.json()["pagination"],
            json!({"limit": limit, "offset": offset}),
            "{}",
            uri
        );
    }
}

#[tokio::test]
async fn test_activity_log_backend_failure() {
    let backend = Arc::new(
        FakeBackend::new()
            .with_admin_sessions()
            .with_rpc_error(ACTIVITY_LOG_RPC, "permission denied"),
    );
    let router = admin_router(backend);

    let response = send(&router, request(Method::GET, "/activity-log", Some(ADMIN_TOKEN), None)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.json(),
        json!({"error": "fetch_failed", "details": "permission denied"})
    );
}
