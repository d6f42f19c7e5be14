mod common;

use axum::http::{header, Method, StatusCode};
use inkwell::{app::build_app, state::AppState};
use serde_json::json;

use common::*;

#[tokio::test]
async fn register_login_and_view_account() {
    let app = build_app(AppState::fake());

    let res = register(&app, "alice", "alice@x.com", "pw123").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = body_json(res).await;
    assert_eq!(body["username"], "alice");
    assert!(body.get("password_hash").is_none());

    let cookie = login(&app, "alice@x.com", "pw123").await;
    assert!(cookie.starts_with("session="));

    let res = send(&app, get("/account", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["email"], "alice@x.com");
}

#[tokio::test]
async fn account_requires_a_session() {
    let app = build_app(AppState::fake());
    let res = send(&app, get("/account", None)).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = send(&app, get("/account", Some("session=garbage"))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let app = build_app(AppState::fake());
    register(&app, "alice", "alice@x.com", "pw123").await;

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/login",
            None,
            json!({ "email": "alice@x.com", "password": "nope" }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(res).await["error"],
        "Login unsuccessful. Please check email and password"
    );
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = build_app(AppState::fake());
    assert_eq!(
        register(&app, "alice", "alice@x.com", "pw").await.status(),
        StatusCode::CREATED
    );
    let res = register(&app, "alice2", "alice@x.com", "pw").await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn remember_me_sets_a_persistent_cookie() {
    let app = build_app(AppState::fake());
    register(&app, "alice", "alice@x.com", "pw").await;

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/login",
            None,
            json!({ "email": "alice@x.com", "password": "pw", "remember": true }),
        ),
    )
    .await;
    let raw = res.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(raw.contains("Max-Age=1209600"));
    assert!(raw.contains("HttpOnly"));
}

#[tokio::test]
async fn logout_clears_the_cookie() {
    let app = build_app(AppState::fake());
    let res = send(&app, json_request(Method::POST, "/logout", None, json!({}))).await;
    assert_eq!(res.status(), StatusCode::OK);
    let raw = res.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(raw.starts_with("session=;"));
    assert!(raw.contains("Max-Age=0"));
}

#[tokio::test]
async fn logged_in_users_are_sent_home() {
    let app = build_app(AppState::fake());
    register(&app, "alice", "alice@x.com", "pw").await;
    let cookie = login(&app, "alice@x.com", "pw").await;

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/login",
            Some(&cookie),
            json!({ "email": "alice@x.com", "password": "pw" }),
        ),
    )
    .await;
    assert!(res.status().is_redirection());
    assert_eq!(res.headers()[header::LOCATION], "/home");
}

#[tokio::test]
async fn login_follows_a_local_next_path() {
    let app = build_app(AppState::fake());
    register(&app, "alice", "alice@x.com", "pw").await;
    let creds = json!({ "email": "alice@x.com", "password": "pw" });

    let res = send(
        &app,
        json_request(Method::POST, "/login?next=/account", None, creds.clone()),
    )
    .await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/account");
    let cookie = session_cookie(&res);
    let res = send(&app, get("/account", Some(&cookie))).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/login?next=https://evil.test/",
            None,
            creds,
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["username"], "alice");
}

#[tokio::test]
async fn password_reset_round_trip() {
    let (state, outbox) = AppState::fake_with_outbox();
    let app = build_app(state);
    register(&app, "alice", "alice@x.com", "pw123").await;

    let res = send(
        &app,
        json_request(
            Method::POST,
            "/reset_password",
            None,
            json!({ "email": "alice@x.com" }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let mail = outbox.last_to("alice@x.com").expect("reset mail");
    assert_eq!(mail.subject, "Password Reset Request");
    let link = mail
        .body
        .split_whitespace()
        .find(|w| w.contains("/reset_password/"))
        .expect("reset link")
        .to_string();
    let path = link.trim_start_matches("http://localhost:8080");

    let res = send(&app, get(path, None)).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = send(
        &app,
        json_request(
            Method::POST,
            path,
            None,
            json!({ "password": "fresh", "confirm_password": "fresh" }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    login(&app, "alice@x.com", "fresh").await;
}

#[tokio::test]
async fn reset_with_bad_token_is_rejected() {
    let app = build_app(AppState::fake());
    let res = send(&app, get("/reset_password/not-a-token", None)).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(res).await["error"], "That is an invalid or expired token");
}

#[tokio::test]
async fn reset_for_unknown_email_is_unprocessable() {
    let app = build_app(AppState::fake());
    let res = send(
        &app,
        json_request(
            Method::POST,
            "/reset_password",
            None,
            json!({ "email": "ghost@x.com" }),
        ),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn health_is_ok() {
    let app = build_app(AppState::fake());
    let res = send(&app, get("/health", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
}
