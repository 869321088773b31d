//! 模拟目标服务
//!
//! 提供注册、资料查询、下单三个接口，并统计每个接口的调用次数。
//! 资料和下单接口要求携带注册时签发的 Bearer token。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// 各接口调用计数
#[derive(Debug, Default)]
pub struct TargetCounters {
    pub signups: AtomicU64,
    pub profiles: AtomicU64,
    pub orders: AtomicU64,
    pub unauthorized: AtomicU64,
}

impl TargetCounters {
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// 运行中的模拟目标服务
pub struct MockTarget {
    pub base_url: String,
    pub counters: Arc<TargetCounters>,
    server: JoinHandle<()>,
}

impl MockTarget {
    pub async fn start() -> Result<Self> {
        let counters = Arc::new(TargetCounters::default());
        let app = Router::new()
            .route("/signup", post(signup))
            .route("/profile/{id}", get(profile))
            .route("/orders", post(create_order))
            .with_state(counters.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            base_url,
            counters,
            server,
        })
    }
}

impl Drop for MockTarget {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn token_for(id: &str) -> String {
    format!("token-{id}")
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn signup(
    State(counters): State<Arc<TargetCounters>>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let id = body["id"].as_str().ok_or(StatusCode::BAD_REQUEST)?;
    counters.signups.fetch_add(1, Ordering::Relaxed);
    Ok((
        StatusCode::CREATED,
        Json(json!({"user": {"id": id}, "access_token": token_for(id)})),
    ))
}

async fn profile(
    State(counters): State<Arc<TargetCounters>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    if bearer(&headers) != Some(token_for(&id).as_str()) {
        counters.unauthorized.fetch_add(1, Ordering::Relaxed);
        return Err(StatusCode::UNAUTHORIZED);
    }
    counters.profiles.fetch_add(1, Ordering::Relaxed);
    Ok(Json(json!({"id": id, "tier": "gold"})))
}

async fn create_order(
    State(counters): State<Arc<TargetCounters>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    if bearer(&headers).is_none() {
        counters.unauthorized.fetch_add(1, Ordering::Relaxed);
        return Err(StatusCode::UNAUTHORIZED);
    }
    let n = counters.orders.fetch_add(1, Ordering::Relaxed) + 1;
    Ok((
        StatusCode::CREATED,
        Json(json!({"order_id": format!("o-{n}"), "quantity": body["quantity"]})),
    ))
}
