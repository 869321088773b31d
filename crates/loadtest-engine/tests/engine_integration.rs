//! 引擎集成测试
//!
//! 在进程内启动一个 axum 目标服务，通过真实的 ReqwestTransport 执行场景。

use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use loadtest_engine::{
    Context, ReqwestTransport, ScenarioExecutor, ScenarioStore, SourceFormat, StepFailure,
};

const TOKEN: &str = "abc123";

async fn signup(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::CREATED,
        Json(json!({"access_token": TOKEN, "id": body["id"]})),
    )
}

async fn profile(Path(id): Path<String>, headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"));
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({"id": id, "name": "load tester"})))
}

async fn echo_content_type(headers: HeaderMap) -> Json<Value> {
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    Json(json!({"content_type": content_type}))
}

async fn html() -> &'static str {
    "<html><body>not json</body></html>"
}

async fn spawn_target() -> String {
    let app = Router::new()
        .route("/signup", post(signup))
        .route("/profile/{id}", get(profile))
        .route("/echo", post(echo_content_type))
        .route("/html", get(html));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn executor(base_url: &str) -> ScenarioExecutor {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).unwrap();
    ScenarioExecutor::new(Arc::new(transport), base_url)
}

#[tokio::test]
async fn test_signup_then_profile_journey() {
    let base_url = spawn_target().await;
    let scenarios = ScenarioStore::parse(
        r#"{
            "scenarios": [
                {
                    "name": "signup",
                    "method": "POST",
                    "endpoint": "/signup",
                    "body": {"id": "{{uid}}"},
                    "generate": {"uid": "dynamic:uuid"},
                    "save": {"token": "json:$.access_token", "echoed": "json:body.id"}
                },
                {
                    "name": "profile",
                    "endpoint": "/profile/{{uid}}",
                    "headers": {"Authorization": "Bearer {{token}}"},
                    "save": {"profile_id": "json:$.id"}
                }
            ]
        }"#,
        SourceFormat::Json,
    )
    .unwrap();

    let mut ctx = Context::new();
    let report = executor(&base_url).run_once(&scenarios, &mut ctx).await;

    assert_eq!(report.attempted(), 2);
    assert_eq!(report.succeeded(), 2, "outcomes: {:?}", report.outcomes);
    assert_eq!(report.outcomes[0].status, Some(201));

    let uid = ctx.get_string("uid").unwrap();
    assert_eq!(ctx.get_string("token").as_deref(), Some(TOKEN));
    assert_eq!(ctx.get_string("echoed"), Some(uid.clone()));
    assert_eq!(ctx.get_string("profile_id"), Some(uid.clone()));
    assert_eq!(report.outcomes[1].url, format!("{base_url}/profile/{uid}"));
}

#[tokio::test]
async fn test_missing_token_yields_status_failure() {
    let base_url = spawn_target().await;
    let scenarios = ScenarioStore::parse(
        r#"{"scenarios": [{"endpoint": "/profile/someone", "headers": {"Authorization": "Bearer {{token}}"}}]}"#,
        SourceFormat::Json,
    )
    .unwrap();

    let report = executor(&base_url)
        .run_once(&scenarios, &mut Context::new())
        .await;

    assert_eq!(report.outcomes[0].failures, vec![StepFailure::Status(401)]);
}

#[tokio::test]
async fn test_post_content_type_default_and_override() {
    let base_url = spawn_target().await;
    let scenarios = ScenarioStore::parse(
        r#"{"scenarios": [
            {"method": "POST", "endpoint": "/echo", "save": {"ct": "json:$.content_type"}},
            {"method": "POST", "endpoint": "/echo",
             "headers": {"content-type": "application/vnd.api+json"},
             "save": {"custom_ct": "json:$.content_type"}}
        ]}"#,
        SourceFormat::Json,
    )
    .unwrap();

    let mut ctx = Context::new();
    let report = executor(&base_url).run_once(&scenarios, &mut ctx).await;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(ctx.get_string("ct").as_deref(), Some("application/json"));
    assert_eq!(
        ctx.get_string("custom_ct").as_deref(),
        Some("application/vnd.api+json")
    );
}

#[tokio::test]
async fn test_not_found_and_invalid_body_are_distinct() {
    let base_url = spawn_target().await;
    let scenarios = ScenarioStore::parse(
        r#"{"scenarios": [
            {"method": "POST", "endpoint": "/signup", "body": {"id": "x"},
             "save": {"refresh": "json:$.refresh_token"}},
            {"endpoint": "/html", "save": {"title": "json:$.title"}}
        ]}"#,
        SourceFormat::Json,
    )
    .unwrap();

    let mut ctx = Context::new();
    let report = executor(&base_url).run_once(&scenarios, &mut ctx).await;

    assert_eq!(report.attempted(), 2);
    assert_eq!(report.outcomes[0].failures[0].kind(), "not_found");
    assert_eq!(report.outcomes[1].failures[0].kind(), "invalid_body");
    assert!(!ctx.contains("refresh"));
    assert!(!ctx.contains("title"));
}

#[tokio::test]
async fn test_unreachable_target_fails_every_step_but_attempts_all() {
    let scenarios = ScenarioStore::parse(
        r#"{"scenarios": [{"endpoint": "/a"}, {"endpoint": "/b"}, {"endpoint": "/c"}]}"#,
        SourceFormat::Json,
    )
    .unwrap();

    let report = executor("http://127.0.0.1:1")
        .run_once(&scenarios, &mut Context::new())
        .await;

    assert_eq!(report.attempted(), 3);
    assert_eq!(report.failed(), 3);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.status.is_none() && o.failures[0].kind() == "transport"));
}
