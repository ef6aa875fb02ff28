use axum::{
    Router,
    body::{self, Body},
    http::{Request, StatusCode},
};
use sea_orm::{DatabaseBackend, MockDatabase};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use estate_admin::{
    auth::password::hash_password,
    routes::GRAPHQL_PATH,
    test_helpers::{
        access_token, activity_model, admin_model, count_row, permission_model, session_model,
        test_router,
    },
};

async fn json_response(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.expect("request should succeed");
    let status = response.status();
    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json: Value = serde_json::from_slice(&body).expect("body should be json");
    (status, json)
}

fn graphql(query: &str, variables: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(GRAPHQL_PATH)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder
        .body(Body::from(
            json!({ "query": query, "variables": variables }).to_string(),
        ))
        .expect("request should build")
}

fn error_code(json: &Value) -> &Value {
    &json["errors"][0]["extensions"]["code"]
}

#[tokio::test]
async fn health_reports_ok() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (status, json) = json_response(
        test_router(db),
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request should build"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
}

#[tokio::test]
async fn me_without_token_is_unauthenticated() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (status, json) = json_response(
        test_router(db),
        graphql("{ me { sessionId } }", json!({}), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(error_code(&json), "UNAUTHENTICATED");
    assert_eq!(json["data"], Value::Null);
}

#[tokio::test]
async fn token_for_revoked_session_is_anonymous() {
    let admin_id = Uuid::new_v4();
    let session_id = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<estate_admin::db::entities::admin_session::Model>::new()])
        .into_connection();
    let token = access_token(admin_id, &["super_admin"], session_id);

    let (_, json) = json_response(
        test_router(db),
        graphql("{ me { sessionId } }", json!({}), Some(&token)),
    )
    .await;

    assert_eq!(error_code(&json), "UNAUTHENTICATED");
}

#[tokio::test]
async fn me_returns_admin_and_effective_permissions() {
    let admin = admin_model("ops@example.com", true);
    let session = session_model(admin.id, true);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[session.clone()]])
        .append_query_results([[admin.clone()]])
        .append_query_results([[
            permission_model("dashboard", "view"),
            permission_model("properties", "view"),
        ]])
        .into_connection();
    let token = access_token(admin.id, &["property_manager"], session.id);

    let (_, json) = json_response(
        test_router(db),
        graphql(
            "{ me { sessionId permissions admin { email } } }",
            json!({}),
            Some(&token),
        ),
    )
    .await;

    assert!(json.get("errors").is_none(), "{json}");
    assert_eq!(json["data"]["me"]["admin"]["email"], "ops@example.com");
    assert_eq!(json["data"]["me"]["sessionId"], session.id.to_string());
    assert_eq!(
        json["data"]["me"]["permissions"],
        json!(["dashboard:view", "properties:view"])
    );
}

#[tokio::test]
async fn approving_without_permission_is_forbidden() {
    let admin_id = Uuid::new_v4();
    let session = session_model(admin_id, true);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[session.clone()]])
        .append_query_results([[count_row(0)]])
        .into_connection();
    let token = access_token(admin_id, &["property_manager"], session.id);

    let (_, json) = json_response(
        test_router(db),
        graphql(
            "mutation($id: UUID!) { approveProperty(id: $id) { property { approvalStatus } } }",
            json!({ "id": Uuid::new_v4() }),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(error_code(&json), "FORBIDDEN");
    assert_eq!(
        json["errors"][0]["message"],
        "Missing permission properties:approve"
    );
}

#[tokio::test]
async fn login_with_wrong_password_is_invalid_credentials() {
    let mut admin = admin_model("ops@example.com", true);
    admin.password_hash = hash_password("correct-password").expect("hash should succeed");
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[admin.clone()]])
        .append_query_results([[activity_model(Some(admin.id), "login", false)]])
        .into_connection();

    let (_, json) = json_response(
        test_router(db),
        graphql(
            "mutation($email: String!, $password: String!) { \
             login(email: $email, password: $password) { accessToken } }",
            json!({ "email": "ops@example.com", "password": "wrong-password" }),
            None,
        ),
    )
    .await;

    assert_eq!(error_code(&json), "INVALID_CREDENTIALS");
    assert_eq!(json["data"], Value::Null);
}

#[tokio::test]
async fn half_open_dashboard_range_is_bad_input() {
    let admin_id = Uuid::new_v4();
    let session = session_model(admin_id, true);
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([[session.clone()]])
        .append_query_results([[count_row(1)]])
        .into_connection();
    let token = access_token(admin_id, &["property_manager"], session.id);

    let (_, json) = json_response(
        test_router(db),
        graphql(
            "query($from: DateTime) { dashboardStats(from: $from) { totalProperties { value } } }",
            json!({ "from": "2026-01-01T00:00:00Z" }),
            Some(&token),
        ),
    )
    .await;

    assert_eq!(error_code(&json), "BAD_USER_INPUT");
}

#[tokio::test]
async fn unknown_route_uses_json_envelope() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (status, json) = json_response(
        test_router(db),
        Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .expect("request should build"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}
