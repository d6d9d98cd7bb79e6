//! Handler tests for the Users domain
//!
//! These tests drive the accounts router directly (no docs, CORS or health
//! routes) against a real PostgreSQL and check:
//! - Status codes and error messages
//! - Role checks on the administrative routes
//! - Form-encoded login and lockout
//! - Pagination links on the listing

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum_helpers::{ErrorResponse, JwtAuth, JwtConfig};
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use test_utils::{STRONG_PASSWORD, TestDataBuilder, TestDatabase};
use tower::ServiceExt; // For oneshot()

struct TestApp {
    _db: TestDatabase,
    router: Router,
    service: UserService<PgUserRepository>,
    builder: TestDataBuilder,
}

impl TestApp {
    async fn new(test_name: &str) -> Self {
        let db = TestDatabase::new().await;
        let jwt = JwtAuth::new(&JwtConfig::new("handler-test-secret-that-is-long-enough"));
        let service = UserService::new(
            PgUserRepository::new(db.connection()),
            jwt,
            UserServiceConfig::default(),
        );

        Self {
            router: handlers::router(service.clone()),
            service,
            _db: db,
            builder: TestDataBuilder::from_test_name(test_name),
        }
    }

    async fn create(&self, suffix: &str, role: Option<Role>) -> User {
        self.service
            .create_user(CreateUser {
                email: self.builder.email(suffix),
                nickname: Some(self.builder.nickname(suffix)),
                password: STRONG_PASSWORD.to_string(),
                role,
                ..Default::default()
            })
            .await
            .unwrap()
    }

    /// First user created in a fresh database, hence an admin.
    async fn admin_token(&self) -> String {
        let admin = self.create("admin", None).await;
        assert_eq!(admin.role, Role::Admin);
        self.service.issue_token(&admin).unwrap()
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    let form = format!(
        "username={}&password={}",
        urlencoding::encode(username),
        urlencoding::encode(password)
    );
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap()
}

fn message(body: &Value) -> String {
    let error: ErrorResponse = serde_json::from_value(body.clone()).unwrap();
    error.message
}

#[tokio::test]
async fn test_register_returns_user_without_secrets() {
    let app = TestApp::new("handler_register").await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/register",
            None,
            json!({
                "email": app.builder.email("john"),
                "nickname": app.builder.nickname("john"),
                "password": STRONG_PASSWORD
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "ADMIN", "first registered user is admin");
    assert!(body.get("hashed_password").is_none());
    assert!(body.get("verification_token").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_is_400() {
    let app = TestApp::new("handler_register_duplicate").await;
    app.create("john", None).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/register",
            None,
            json!({
                "email": app.builder.email("john").to_uppercase(),
                "nickname": app.builder.nickname("other"),
                "password": STRONG_PASSWORD
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Email already exists");
}

#[tokio::test]
async fn test_register_rejects_invalid_input_with_422() {
    let app = TestApp::new("handler_register_invalid").await;

    let cases = [
        json!({ "email": "john@example.com", "nickname": "john doe", "password": STRONG_PASSWORD }),
        json!({ "email": "not-an-email", "password": STRONG_PASSWORD }),
        json!({ "email": "john@example.com", "password": "weakpassword" }),
    ];

    for payload in cases {
        let (status, _) = app
            .send(json_request("POST", "/register", None, payload.clone()))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{payload}");
    }
}

#[tokio::test]
async fn test_login_issues_bearer_token() {
    let app = TestApp::new("handler_login").await;
    let user = app.create("john", None).await;

    let (status, body) = app.send(login_request(&user.email, STRONG_PASSWORD)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");

    let claims = app
        .service
        .jwt()
        .verify_token(body["access_token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.user_id().unwrap(), user.id);
    assert_eq!(claims.role, "ADMIN");
}

#[tokio::test]
async fn test_login_wrong_password_then_lockout() {
    let app = TestApp::new("handler_login_lockout").await;
    app.create("admin", None).await;
    let user = app.create("john", None).await;

    for _ in 0..3 {
        let (status, body) = app.send(login_request(&user.nickname, "Wr0ng!password")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message(&body), "Incorrect email or password.");
    }

    let (status, body) = app.send(login_request(&user.nickname, STRONG_PASSWORD)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        message(&body),
        "Account locked due to too many failed login attempts."
    );
}

#[tokio::test]
async fn test_verify_email() {
    let app = TestApp::new("handler_verify_email").await;
    app.create("admin", None).await;
    let user = app.create("john", None).await;
    let token = user.verification_token.clone().unwrap();

    let (status, body) = app
        .send(get(&format!("/verify-email/{}/wrong-token", user.id), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Invalid or expired verification token");

    let (status, body) = app
        .send(get(&format!("/verify-email/{}/{}", user.id, token), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email verified successfully");

    let (status, _) = app.send(get("/verify-email/not-a-uuid/abc", None)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_users_route_requires_token_and_role() {
    let app = TestApp::new("handler_role_checks").await;
    app.create("admin", None).await;
    let member = app.create("member", None).await;
    let manager = app.create("manager", Some(Role::Manager)).await;
    let member_token = app.service.issue_token(&member).unwrap();
    let manager_token = app.service.issue_token(&manager).unwrap();

    let (status, _) = app.send(get("/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(get("/users", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(get("/users", Some(&member_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "Operation not permitted");

    // Listing is admin-only, single-user reads are open to managers.
    let (status, _) = app.send(get("/users", Some(&manager_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(get(&format!("/users/{}", member.id), Some(&manager_token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nickname"], member.nickname);

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/bio", member.id),
            Some(&member_token),
            json!({ "bio": "hello" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "Operation not permitted");

    let (status, body) = app.send(get("/me", Some(&member_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], member.id.to_string());
}

#[tokio::test]
async fn test_list_users_with_pagination_links() {
    let app = TestApp::new("handler_list_users").await;
    let token = app.admin_token().await;
    for i in 0..14 {
        app.create(&format!("user{i}"), None).await;
    }

    let (status, body) = app
        .send(get("/users?skip=5&limit=5&role=AUTHENTICATED", Some(&token)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 14);
    assert_eq!(body["page"], 2);
    assert_eq!(body["size"], 5);
    assert_eq!(body["items"].as_array().unwrap().len(), 5);

    let links = &body["links"];
    assert_eq!(
        links["next"],
        "http://localhost:8080/users?skip=10&limit=5&role=AUTHENTICATED"
    );
    assert_eq!(
        links["prev"],
        "http://localhost:8080/users?skip=0&limit=5&role=AUTHENTICATED"
    );
    assert_eq!(
        links["last"],
        "http://localhost:8080/users?skip=10&limit=5&role=AUTHENTICATED"
    );

    let (status, _) = app.send(get("/users?limit=0", Some(&token))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_list_users_with_huge_skip() {
    let app = TestApp::new("handler_list_huge_skip").await;
    let token = app.admin_token().await;

    let (status, body) = app
        .send(get("/users?skip=9223372036854775807&limit=10", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert!(body["links"]["next"].is_null());

    let (status, _) = app
        .send(get("/users?skip=18446744073709551615&limit=10", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(get("/users?skip=9223372036854775808", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_user_as_admin() {
    let app = TestApp::new("handler_create_user").await;
    let token = app.admin_token().await;

    let (status, body) = app
        .send(json_request(
            "POST",
            "/users",
            Some(&token),
            json!({
                "email": app.builder.email("created"),
                "password": STRONG_PASSWORD,
                "role": "MANAGER"
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "MANAGER");
    assert_eq!(body["email_verified"], false);
    assert_eq!(
        body["nickname"].as_str().unwrap().split('-').count(),
        3,
        "nickname is generated when missing"
    );
}

#[tokio::test]
async fn test_manager_cannot_assign_roles() {
    let app = TestApp::new("handler_manager_roles").await;
    app.create("admin", None).await;
    let manager = app.create("manager", Some(Role::Manager)).await;
    let token = app.service.issue_token(&manager).unwrap();
    let target = app.create("target", None).await;

    let (status, body) = app
        .send(json_request(
            "PUT",
            &format!("/users/{}", target.id),
            Some(&token),
            json!({ "role": "ADMIN" }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "Operation not permitted");

    let (status, body) = app
        .send(json_request(
            "POST",
            "/users",
            Some(&token),
            json!({
                "email": app.builder.email("sneaky"),
                "password": STRONG_PASSWORD,
                "role": "ADMIN"
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(message(&body), "Operation not permitted");

    let stored = app.service.get_by_id(target.id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Authenticated);
    assert!(
        app.service
            .get_by_email(&app.builder.email("sneaky"))
            .await
            .unwrap()
            .is_none()
    );

    // Profile edits without a role stay open to managers.
    let (status, body) = app
        .send(json_request(
            "PUT",
            &format!("/users/{}", target.id),
            Some(&token),
            json!({ "first_name": "Target" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["first_name"], "Target");
    assert_eq!(body["role"], "AUTHENTICATED");
}

#[tokio::test]
async fn test_update_user_nickname_conflict_and_missing() {
    let app = TestApp::new("handler_update_user").await;
    let token = app.admin_token().await;
    let alice = app.create("alice", None).await;
    let bob = app.create("bob", None).await;

    let (status, body) = app
        .send(json_request(
            "PUT",
            &format!("/users/{}", bob.id),
            Some(&token),
            json!({ "nickname": alice.nickname }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(message(&body), "Nickname already exists");

    let (status, body) = app
        .send(json_request(
            "PUT",
            &format!("/users/{}", uuid::Uuid::now_v7()),
            Some(&token),
            json!({ "first_name": "Nobody" }),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message(&body), "User not found");

    let (status, _) = app.send(get("/users/not-a-uuid", Some(&token))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_bio_and_profile_picture_rules() {
    let app = TestApp::new("handler_bio_picture").await;
    let token = app.admin_token().await;
    let user = app.create("john", None).await;

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/bio", user.id),
            Some(&token),
            json!({ "bio": "a".repeat(501) }),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        message(&body),
        "Bio exceeds maximum length of 500 characters."
    );

    let bio = "b".repeat(500);
    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/bio", user.id),
            Some(&token),
            json!({ "bio": bio }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bio"], bio);

    let (status, _) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/bio", user.id),
            Some(&token),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/profile-picture", user.id),
            Some(&token),
            json!({ "profile_picture_url": "not-a-valid-url" }),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        message(&body),
        "Invalid profile picture URL or other update issues."
    );

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/profile-picture", user.id),
            Some(&token),
            json!({ "profile_picture_url": "https://example.com/john.png" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile_picture_url"], "https://example.com/john.png");
    assert_eq!(body["email"], user.email);
}

#[tokio::test]
async fn test_admin_account_operations() {
    let app = TestApp::new("handler_admin_ops").await;
    let token = app.admin_token().await;
    let user = app.create("john", None).await;

    let (status, body) = app
        .send(json_request(
            "POST",
            &format!("/users/{}/lock", user.id),
            Some(&token),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_locked"], true);

    let (status, body) = app
        .send(json_request(
            "POST",
            &format!("/users/{}/reset-password", user.id),
            Some(&token),
            json!({ "new_password": "An0ther!Secret" }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, _) = app.send(login_request(&user.email, "An0ther!Secret")).await;
    assert_eq!(status, StatusCode::OK, "reset clears the lock");

    let (status, body) = app
        .send(json_request(
            "PATCH",
            &format!("/users/{}/professional-status", user.id),
            Some(&token),
            json!({ "is_professional": true }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_professional"], true);
    assert!(body["professional_status_updated_at"].is_string());

    let (status, _) = app
        .send(json_request(
            "POST",
            &format!("/users/{}/unlock", uuid::Uuid::now_v7()),
            Some(&token),
            json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user() {
    let app = TestApp::new("handler_delete_user").await;
    let token = app.admin_token().await;
    let user = app.create("john", None).await;

    let delete = |id: uuid::Uuid| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/users/{id}"))
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = app.send(delete(user.id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app.send(delete(user.id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(message(&body), "User not found");
}
