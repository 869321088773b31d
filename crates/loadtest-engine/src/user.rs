//! 虚拟用户
//!
//! 每个虚拟用户独占一个 [`Context`]，在会话开始时创建，
//! 之后被调度器反复驱动执行任务循环，上下文在多轮之间保留。

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::context::Context;
use crate::executor::{CycleReport, ScenarioExecutor};
use crate::scenarios::ScenarioDefinition;

/// 单个虚拟用户的累计统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStats {
    pub cycles: u64,
    pub aborted_cycles: u64,
    pub steps: u64,
    pub successes: u64,
    pub failures: u64,
    /// 失败类别 → 次数
    pub failure_kinds: BTreeMap<String, u64>,
    /// 每个已完成步骤的耗时（毫秒）
    pub latencies_ms: Vec<f64>,
}

impl UserStats {
    /// 累加一轮循环的报告
    pub fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        if report.aborted {
            self.aborted_cycles += 1;
        }

        for outcome in &report.outcomes {
            self.steps += 1;
            if outcome.is_success() {
                self.successes += 1;
            } else {
                self.failures += 1;
                for failure in &outcome.failures {
                    *self
                        .failure_kinds
                        .entry(failure.kind().to_string())
                        .or_default() += 1;
                }
            }
            // 被中止的请求没有完整耗时，不计入延迟分布
            if outcome.status.is_some() {
                self.latencies_ms
                    .push(outcome.elapsed.as_secs_f64() * 1000.0);
            }
        }
    }

    /// 合并另一个用户的统计
    pub fn merge(&mut self, other: UserStats) {
        self.cycles += other.cycles;
        self.aborted_cycles += other.aborted_cycles;
        self.steps += other.steps;
        self.successes += other.successes;
        self.failures += other.failures;
        for (kind, count) in other.failure_kinds {
            *self.failure_kinds.entry(kind).or_default() += count;
        }
        self.latencies_ms.extend(other.latencies_ms);
    }
}

/// 虚拟用户
pub struct VirtualUser {
    id: usize,
    scenarios: Arc<[ScenarioDefinition]>,
    executor: Arc<ScenarioExecutor>,
    context: Context,
    stats: UserStats,
}

impl VirtualUser {
    pub fn new(
        id: usize,
        scenarios: Arc<[ScenarioDefinition]>,
        executor: Arc<ScenarioExecutor>,
    ) -> Self {
        Self {
            id,
            scenarios,
            executor,
            context: Context::new(),
            stats: UserStats::default(),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// 会话开始：重置上下文
    pub fn on_start(&mut self) {
        self.context = Context::new();
        debug!(user = self.id, steps = self.scenarios.len(), "虚拟用户会话开始");
    }

    /// 执行一轮任务循环并累计统计
    pub async fn run_cycle(&mut self, abort: &mut watch::Receiver<bool>) -> CycleReport {
        let report = self
            .executor
            .run_cycle(&self.scenarios, &mut self.context, abort)
            .await;
        self.stats.record(&report);
        report
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn stats(&self) -> &UserStats {
        &self.stats
    }

    pub fn into_stats(self) -> UserStats {
        self.stats
    }
}
