//! 并发调度
//!
//! 按 `spawn_rate` 逐步启动虚拟用户，每个用户是独立的 tokio 任务，
//! 在两轮循环之间随机等待 `[min_wait, max_wait]`。
//! 停止信号（Ctrl+C 或运行时长到期）通过 `watch` 通道广播给所有用户，
//! 进行中的请求会被中止。各用户的统计在任务结束时汇总，运行期间不共享任何状态。

use std::sync::Arc;
use std::time::{Duration, Instant};

use loadtest_shared::config::LoadConfig;
use loadtest_shared::error::LoadTestError;
use loadtest_shared::observability::metrics as obs_metrics;
use rand::Rng;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::executor::ScenarioExecutor;
use crate::scenarios::ScenarioDefinition;
use crate::shutdown;
use crate::user::{UserStats, VirtualUser};

/// 调度参数
#[derive(Debug, Clone, PartialEq)]
pub struct SwarmConfig {
    pub users: usize,
    /// 每秒启动的用户数
    pub spawn_rate: f64,
    /// 为空时运行到收到停止信号
    pub run_time: Option<Duration>,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self::from(&LoadConfig::default())
    }
}

impl From<&LoadConfig> for SwarmConfig {
    fn from(config: &LoadConfig) -> Self {
        Self {
            users: config.users,
            spawn_rate: config.spawn_rate,
            run_time: config.run_time(),
            min_wait: Duration::from_millis(config.min_wait_ms),
            max_wait: Duration::from_millis(config.max_wait_ms),
        }
    }
}

impl SwarmConfig {
    /// 相邻两个用户的启动间隔
    fn spawn_interval(&self) -> Duration {
        if self.spawn_rate.is_finite() && self.spawn_rate > 0.0 {
            Duration::from_secs_f64(1.0 / self.spawn_rate)
        } else {
            Duration::ZERO
        }
    }

    /// 随机思考时间
    fn think_time(&self) -> Duration {
        let min = self.min_wait.as_millis() as u64;
        let max = (self.max_wait.as_millis() as u64).max(min);
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// 压测汇总
#[derive(Debug, Clone, Default)]
pub struct SwarmSummary {
    /// 实际启动的用户数
    pub users: usize,
    pub elapsed: Duration,
    pub stats: UserStats,
}

impl SwarmSummary {
    pub fn success_rate(&self) -> f64 {
        if self.stats.steps == 0 {
            return 0.0;
        }
        self.stats.successes as f64 / self.stats.steps as f64 * 100.0
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.stats.latencies_ms.is_empty() {
            return 0.0;
        }
        self.stats.latencies_ms.iter().sum::<f64>() / self.stats.latencies_ms.len() as f64
    }

    pub fn p50_latency_ms(&self) -> f64 {
        self.percentile(50.0)
    }

    pub fn p95_latency_ms(&self) -> f64 {
        self.percentile(95.0)
    }

    pub fn p99_latency_ms(&self) -> f64 {
        self.percentile(99.0)
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.stats.latencies_ms.is_empty() {
            return 0.0;
        }
        let mut sorted = self.stats.latencies_ms.clone();
        sorted.sort_by(f64::total_cmp);
        let index = ((p / 100.0) * (sorted.len() - 1) as f64) as usize;
        sorted[index]
    }

    /// 每秒完成的步骤数
    pub fn throughput(&self) -> f64 {
        if self.elapsed.as_secs_f64() == 0.0 {
            return 0.0;
        }
        self.stats.steps as f64 / self.elapsed.as_secs_f64()
    }

    pub fn print_summary(&self) {
        println!("\n========== 压测结果 ==========");
        println!("虚拟用户: {}", self.users);
        println!("运行时长: {:.1}s", self.elapsed.as_secs_f64());
        println!(
            "任务循环: {} (中止 {})",
            self.stats.cycles, self.stats.aborted_cycles
        );
        println!("步骤总数: {}", self.stats.steps);
        println!("成功步骤: {}", self.stats.successes);
        println!("失败步骤: {}", self.stats.failures);
        for (kind, count) in &self.stats.failure_kinds {
            println!("  {kind}: {count}");
        }
        println!("成功率: {:.2}%", self.success_rate());
        println!("吞吐量: {:.2} steps/s", self.throughput());
        println!("平均延迟: {:.2}ms", self.avg_latency_ms());
        println!("P50 延迟: {:.2}ms", self.p50_latency_ms());
        println!("P95 延迟: {:.2}ms", self.p95_latency_ms());
        println!("P99 延迟: {:.2}ms", self.p99_latency_ms());
        println!("==============================\n");
    }
}

/// 虚拟用户调度器
pub struct Swarm {
    config: SwarmConfig,
    scenarios: Arc<[ScenarioDefinition]>,
    executor: Arc<ScenarioExecutor>,
}

impl Swarm {
    pub fn new(
        config: SwarmConfig,
        scenarios: Arc<[ScenarioDefinition]>,
        executor: Arc<ScenarioExecutor>,
    ) -> Self {
        Self {
            config,
            scenarios,
            executor,
        }
    }

    /// 运行直到 `stop_signal` 变为 `true` 或运行时长到期
    pub async fn run(&self, stop_signal: watch::Receiver<bool>) -> SwarmSummary {
        if self.scenarios.is_empty() {
            warn!("没有可执行的场景，跳过压测");
            return SwarmSummary::default();
        }

        let started = Instant::now();
        let (stop_tx, stop_rx) = watch::channel(false);
        let stopper = tokio::spawn(stop_when(stop_signal, self.config.run_time, stop_tx));

        info!(
            users = self.config.users,
            spawn_rate = self.config.spawn_rate,
            steps = self.scenarios.len(),
            "开始压测"
        );

        let interval = self.config.spawn_interval();
        let mut ramp_rx = stop_rx.clone();
        let mut handles = Vec::with_capacity(self.config.users);

        for id in 0..self.config.users {
            if *ramp_rx.borrow() {
                break;
            }
            if id > 0 && !interval.is_zero() {
                tokio::select! {
                    biased;

                    _ = shutdown::wait_for(&mut ramp_rx) => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }

            let user = VirtualUser::new(id, self.scenarios.clone(), self.executor.clone());
            handles.push(tokio::spawn(user_loop(
                user,
                stop_rx.clone(),
                self.config.clone(),
            )));
            obs_metrics::set_active_users(handles.len());
        }
        info!(users = handles.len(), "虚拟用户启动完成");

        let mut summary = SwarmSummary {
            users: handles.len(),
            ..Default::default()
        };
        for result in futures::future::join_all(handles).await {
            match result {
                Ok(stats) => summary.stats.merge(stats),
                Err(e) => {
                    let err = LoadTestError::Internal(e.to_string());
                    error!(error = %err, code = err.code(), "虚拟用户任务异常退出");
                }
            }
        }

        stopper.abort();
        obs_metrics::set_active_users(0);
        summary.elapsed = started.elapsed();

        info!(
            cycles = summary.stats.cycles,
            steps = summary.stats.steps,
            failures = summary.stats.failures,
            "压测结束"
        );
        summary
    }
}

/// 外部停止信号或运行时长到期时广播停止
async fn stop_when(
    mut stop_signal: watch::Receiver<bool>,
    run_time: Option<Duration>,
    stop_tx: watch::Sender<bool>,
) {
    let deadline = async {
        match run_time {
            Some(run_time) => tokio::time::sleep(run_time).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = shutdown::wait_for(&mut stop_signal) => info!("收到停止信号"),
        _ = deadline => info!("已达到运行时长"),
    }
    let _ = stop_tx.send(true);
}

async fn user_loop(
    mut user: VirtualUser,
    mut stop: watch::Receiver<bool>,
    config: SwarmConfig,
) -> UserStats {
    user.on_start();

    loop {
        if *stop.borrow() {
            break;
        }

        let report = user.run_cycle(&mut stop).await;
        if report.aborted {
            break;
        }

        tokio::select! {
            biased;

            _ = shutdown::wait_for(&mut stop) => break,
            _ = tokio::time::sleep(config.think_time()) => {}
        }
    }

    user.into_stats()
}
