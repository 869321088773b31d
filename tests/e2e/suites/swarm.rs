//! 完整压测调度测试

use std::time::Duration;

use loadtest_engine::{ScenarioStore, SourceFormat, Swarm, SwarmConfig};
use tokio::sync::watch;

use super::journey::{JOURNEY_YAML, executor};
use crate::setup::{MockTarget, TargetCounters};

fn short_run(users: usize, run_time: Option<Duration>) -> SwarmConfig {
    SwarmConfig {
        users,
        spawn_rate: 50.0,
        run_time,
        min_wait: Duration::from_millis(10),
        max_wait: Duration::from_millis(30),
    }
}

#[cfg(test)]
mod swarm_tests {
    use super::*;

    #[tokio::test]
    async fn test_swarm_runs_journeys_until_run_time() {
        let target = MockTarget::start().await.unwrap();
        let scenarios = ScenarioStore::parse(JOURNEY_YAML, SourceFormat::Yaml).unwrap();
        let swarm = Swarm::new(
            short_run(5, Some(Duration::from_millis(500))),
            scenarios.into(),
            executor(&target),
        );
        let (_tx, rx) = watch::channel(false);

        let summary = tokio::time::timeout(Duration::from_secs(10), swarm.run(rx))
            .await
            .expect("swarm should stop after run_time");

        assert_eq!(summary.users, 5);
        assert!(summary.stats.cycles >= 5);
        assert_eq!(TargetCounters::get(&target.counters.unauthorized), 0);
        assert_eq!(
            summary.stats.failure_kinds.keys().filter(|k| *k != "aborted").count(),
            0,
            "unexpected failures: {:?}",
            summary.stats.failure_kinds
        );
        assert!(summary.success_rate() > 0.0);
        assert!(summary.p95_latency_ms() >= summary.p50_latency_ms());
        summary.print_summary();
    }

    #[tokio::test]
    async fn test_swarm_stops_on_external_signal() {
        let target = MockTarget::start().await.unwrap();
        let scenarios = ScenarioStore::parse(JOURNEY_YAML, SourceFormat::Yaml).unwrap();
        let swarm = Swarm::new(short_run(3, None), scenarios.into(), executor(&target));
        let (tx, rx) = watch::channel(false);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let _ = tx.send(true);
        });

        let summary = tokio::time::timeout(Duration::from_secs(10), swarm.run(rx))
            .await
            .expect("swarm should stop on signal");

        assert_eq!(summary.users, 3);
        assert!(TargetCounters::get(&target.counters.signups) >= 3);
        assert!(summary.elapsed >= Duration::from_millis(300));
    }
}
