//! 多步骤用户旅程测试

use std::sync::Arc;
use std::time::Duration;

use loadtest_engine::{Context, ReqwestTransport, ScenarioExecutor, ScenarioStore, SourceFormat};

use crate::setup::{MockTarget, TargetCounters};

pub const JOURNEY_YAML: &str = r#"
scenarios:
  - name: signup
    method: POST
    endpoint: /signup
    body:
      id: "{{uid}}"
      password: "{{password}}"
    generate:
      uid: "dynamic:uuid"
      password: "dynamic:password|16"
    save:
      token: "json:$.access_token"
  - name: profile
    endpoint: "/profile/{{uid}}"
    headers:
      Authorization: "Bearer {{token}}"
    save:
      tier: "json:$.tier"
  - name: order
    method: POST
    endpoint: /orders
    headers:
      Authorization: "Bearer {{token}}"
    payload:
      quantity: "{{qty}}"
    generate:
      qty: "dynamic:number|1|5"
    save:
      order_id: "json:$.order_id"
"#;

pub fn executor(target: &MockTarget) -> Arc<ScenarioExecutor> {
    let transport = ReqwestTransport::new(Duration::from_secs(5)).expect("http client");
    Arc::new(ScenarioExecutor::new(
        Arc::new(transport),
        target.base_url.clone(),
    ))
}

#[cfg(test)]
mod journey_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_journey_threads_state_between_steps() {
        let target = MockTarget::start().await.unwrap();
        let scenarios = ScenarioStore::parse(JOURNEY_YAML, SourceFormat::Yaml).unwrap();
        assert_eq!(scenarios.len(), 3);

        let mut ctx = Context::new();
        let report = executor(&target).run_once(&scenarios, &mut ctx).await;

        assert_eq!(report.succeeded(), 3, "outcomes: {:?}", report.outcomes);
        let uid = ctx.get_string("uid").unwrap();
        assert_eq!(ctx.get_string("token"), Some(format!("token-{uid}")));
        assert_eq!(ctx.get_string("tier").as_deref(), Some("gold"));
        assert_eq!(ctx.get_string("order_id").as_deref(), Some("o-1"));
        assert_eq!(ctx.get_string("password").unwrap().len(), 16);

        assert_eq!(TargetCounters::get(&target.counters.signups), 1);
        assert_eq!(TargetCounters::get(&target.counters.profiles), 1);
        assert_eq!(TargetCounters::get(&target.counters.unauthorized), 0);
    }

    #[tokio::test]
    async fn test_repeated_cycles_regenerate_identity() {
        let target = MockTarget::start().await.unwrap();
        let scenarios = ScenarioStore::parse(JOURNEY_YAML, SourceFormat::Yaml).unwrap();
        let executor = executor(&target);

        let mut ctx = Context::new();
        executor.run_once(&scenarios, &mut ctx).await;
        let first_uid = ctx.get_string("uid").unwrap();
        let report = executor.run_once(&scenarios, &mut ctx).await;

        assert_eq!(report.succeeded(), 3);
        assert_ne!(ctx.get_string("uid").unwrap(), first_uid);
        assert_eq!(TargetCounters::get(&target.counters.signups), 2);
        assert_eq!(ctx.get_string("order_id").as_deref(), Some("o-2"));
    }
}
