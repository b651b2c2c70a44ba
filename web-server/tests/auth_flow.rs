// web-server/tests/auth_flow.rs
use std::sync::Arc;
use actix_web::http::{header, StatusCode};
use actix_web::{test, App};
use chrono::{Duration, Utc};
use common::jwt::TokenIssuer;
use common::{ConfigError, ErrorBody, LoginResponse, Principal, Role, ServerConfig};
use serde_json::json;
use web_server::accounts::{hash_password, AccountRecord, InMemoryAccounts};
use web_server::{api, AppContext};

fn config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.jwt.secret = "integration-test-secret".to_string();
    config.jwt.issuer = "task-tracker".to_string();
    config.jwt.audience = "task-tracker-web".to_string();
    config
}

fn account(id: i64, username: &str, role: Role, password: &str) -> AccountRecord {
    AccountRecord {
        username: username.to_string(),
        principal: Principal::new(id, role).with_name(username),
        password_hash: hash_password(password).unwrap(),
    }
}

fn context() -> AppContext {
    let accounts = InMemoryAccounts::new();
    accounts.insert(account(1, "dana", Role::Director, "director-pw"));
    accounts.insert(account(2, "mike", Role::Manager, "manager-pw"));
    accounts.insert(account(3, "sam", Role::Staff, "staff-pw"));
    AppContext::new(&config(), Arc::new(accounts)).unwrap()
}

fn token_for(ctx: &AppContext, id: i64, role: Role) -> String {
    ctx.issuer.issue(&Principal::new(id, role)).unwrap().token
}

macro_rules! app {
    ($ctx:expr) => {{
        let ctx: AppContext = $ctx;
        test::init_service(
            App::new()
                .wrap(ctx.jwt_auth())
                .configure(move |cfg| api::configure(cfg, &ctx)),
        )
        .await
    }};
}

fn handshake(uri: &str) -> test::TestRequest {
    test::TestRequest::get()
        .uri(uri)
        .insert_header((header::UPGRADE, "websocket"))
        .insert_header((header::CONNECTION, "upgrade"))
        .insert_header((header::SEC_WEBSOCKET_VERSION, "13"))
        .insert_header((header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ=="))
}

#[actix_web::test]
async fn test_login_issues_token_usable_as_bearer() {
    let ctx = context();
    let validator = ctx.validator.clone();
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "sam", "password": "staff-pw" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let login: LoginResponse = test::read_body_json(resp).await;
    assert_eq!(login.user.id, 3);
    assert_eq!(login.user.role, Role::Staff);
    assert!(login.expires_at > Utc::now());
    assert_eq!(validator.validate(&login.token).unwrap().sub, "3");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", login.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let me: Principal = test::read_body_json(resp).await;
    assert_eq!(me, login.user);
}

#[actix_web::test]
async fn test_login_failure_does_not_reveal_which_half_was_wrong() {
    let app = app!(context());

    let wrong_password = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "sam", "password": "nope" }))
        .to_request();
    let resp = test::call_service(&app, wrong_password).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let first: ErrorBody = test::read_body_json(resp).await;

    let unknown_user = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "username": "ghost", "password": "staff-pw" }))
        .to_request();
    let resp = test::call_service(&app, unknown_user).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let second: ErrorBody = test::read_body_json(resp).await;

    assert_eq!(first, second);
}

#[actix_web::test]
async fn test_login_ignores_stale_authorization_header() {
    let app = app!(context());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header((header::AUTHORIZATION, "Bearer expired.or.garbage"))
        .set_json(json!({ "username": "dana", "password": "director-pw" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_public_paths_need_no_token() {
    let app = app!(context());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_missing_token_is_authentication_failure() {
    let app = app!(context());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/api/auth/me").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");

    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "unauthorized");
}

#[actix_web::test]
async fn test_expired_token_is_rejected() {
    let ctx = context();
    let stale = ctx
        .issuer
        .issue_at(&Principal::new(1, Role::Director), Utc::now() - Duration::days(2))
        .unwrap();
    let app = app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/staff")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", stale.token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.message, "token has expired");
}

#[actix_web::test]
async fn test_foreign_audience_and_issuer_are_rejected() {
    let ctx = context();

    let mut foreign_audience = config().jwt;
    foreign_audience.audience = "reporting-service".to_string();
    let mut foreign_issuer = config().jwt;
    foreign_issuer.issuer = "someone-else".to_string();

    let tokens: Vec<String> = [foreign_audience, foreign_issuer]
        .iter()
        .map(|jwt| {
            TokenIssuer::new(jwt)
                .issue(&Principal::new(1, Role::Director))
                .unwrap()
                .token
        })
        .collect();
    let app = app!(ctx);

    for token in tokens {
        let req = test::TestRequest::get()
            .uri("/api/auth/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}

#[actix_web::test]
async fn test_staff_on_director_endpoint_is_authorization_failure() {
    let ctx = context();
    let staff = token_for(&ctx, 3, Role::Staff);
    let director = token_for(&ctx, 1, Role::Director);
    let app = app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/staff")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", staff)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body: ErrorBody = test::read_body_json(resp).await;
    assert_eq!(body.error, "forbidden");

    let req = test::TestRequest::get()
        .uri("/api/staff")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", director)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let staff_list: Vec<Principal> = test::read_body_json(resp).await;
    assert_eq!(staff_list.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[actix_web::test]
async fn test_statistics_require_management() {
    let ctx = context();
    let manager = token_for(&ctx, 2, Role::Manager);
    let staff = token_for(&ctx, 3, Role::Staff);
    let app = app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/statistics")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", manager)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(summary["staff_total"], 3);
    assert_eq!(summary["staff_by_role"]["Staff"], 1);

    let req = test::TestRequest::get()
        .uri("/api/statistics")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", staff)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_channel_handshake_accepts_query_token() {
    let ctx = context();
    let token = token_for(&ctx, 3, Role::Staff);
    let app = app!(ctx);

    let req = handshake(&format!("/hubs/notifications?access_token={}", token)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SWITCHING_PROTOCOLS);
}

#[actix_web::test]
async fn test_channel_handshake_accepts_header_token() {
    let ctx = context();
    let token = token_for(&ctx, 2, Role::Manager);
    let app = app!(ctx);

    let req = handshake("/hubs/notifications")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SWITCHING_PROTOCOLS);
}

#[actix_web::test]
async fn test_channel_handshake_rejects_bad_or_missing_token() {
    let ctx = context();
    let stale = ctx
        .issuer
        .issue_at(&Principal::new(3, Role::Staff), Utc::now() - Duration::days(2))
        .unwrap()
        .token;
    let app = app!(ctx);

    let req = handshake(&format!("/hubs/notifications?access_token={}", stale)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = handshake("/hubs/notifications").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_query_token_ignored_outside_channel() {
    let ctx = context();
    let token = token_for(&ctx, 1, Role::Director);
    let app = app!(ctx);

    let req = test::TestRequest::get()
        .uri(&format!("/api/auth/me?access_token={}", token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_logout_acknowledges_authenticated_caller() {
    let ctx = context();
    let token = token_for(&ctx, 3, Role::Staff);
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/logout")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_context_requires_signing_configuration() {
    let mut missing = config();
    missing.jwt.secret.clear();
    let result = AppContext::new(&missing, Arc::new(InMemoryAccounts::new()));
    assert!(matches!(result, Err(ConfigError::Missing("jwt.secret"))));

    let mut no_policies = config();
    no_policies.policies.clear();
    let result = AppContext::new(&no_policies, Arc::new(InMemoryAccounts::new()));
    assert!(matches!(result, Err(ConfigError::UnknownPolicy(_))));
}
