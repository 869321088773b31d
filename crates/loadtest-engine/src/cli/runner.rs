//! 命令执行器
//!
//! 负责执行各 CLI 子命令的具体逻辑。

use std::sync::Arc;

use anyhow::{Context as _, Result};
use loadtest_shared::config::AppConfig;
use loadtest_shared::error::LoadTestError;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::Context;
use crate::executor::{CycleReport, ScenarioExecutor};
use crate::scenarios::{ScenarioDefinition, ScenarioStore, unbound_placeholders};
use crate::shutdown;
use crate::swarm::{Swarm, SwarmConfig};
use crate::template::TemplateSubstitutor;
use crate::transport::ReqwestTransport;

/// 命令行对配置的覆盖项
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub users: Option<usize>,
    pub spawn_rate: Option<f64>,
    pub run_time: Option<u64>,
    pub scenarios: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.target.host = host.clone();
        }
        if let Some(users) = self.users {
            config.load.users = users;
        }
        if let Some(spawn_rate) = self.spawn_rate {
            config.load.spawn_rate = spawn_rate;
        }
        if let Some(run_time) = self.run_time {
            config.load.run_time_secs = Some(run_time);
        }
        if let Some(path) = &self.scenarios {
            config.scenarios.path = path.clone();
        }
    }
}

/// 命令执行器
pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn executor(&self) -> Result<Arc<ScenarioExecutor>> {
        let transport = ReqwestTransport::new(self.config.target.request_timeout())
            .map_err(LoadTestError::from)
            .context("创建 HTTP 客户端失败")?;
        Ok(Arc::new(ScenarioExecutor::new(
            Arc::new(transport),
            self.config.target.host.clone(),
        )))
    }

    /// 执行 run 命令
    pub async fn run_load(mut self, overrides: Overrides) -> Result<()> {
        overrides.apply(&mut self.config);
        self.config.validate().context("配置校验失败")?;

        let scenarios: Arc<[ScenarioDefinition]> =
            ScenarioStore::load(&self.config.scenarios.path).into();
        let executor = self.executor()?;
        let swarm = Swarm::new(SwarmConfig::from(&self.config.load), scenarios, executor);

        info!(
            host = %self.config.target.host,
            scenarios = %self.config.scenarios.path,
            "按 Ctrl+C 停止压测"
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let signal_task = tokio::spawn(async move {
            shutdown::signal().await;
            let _ = stop_tx.send(true);
        });

        let summary = swarm.run(stop_rx).await;
        signal_task.abort();

        summary.print_summary();
        Ok(())
    }

    /// 执行 check 命令
    pub fn run_check(mut self, scenarios_path: Option<String>) -> Result<()> {
        if let Some(path) = scenarios_path {
            self.config.scenarios.path = path;
        }
        let path = &self.config.scenarios.path;

        let scenarios = ScenarioStore::try_load(path)
            .map_err(LoadTestError::from)
            .with_context(|| format!("加载场景文件失败: {path}"))?;
        if scenarios.is_empty() {
            return Err(LoadTestError::ScenarioParse(format!("没有可用的场景: {path}")).into());
        }

        println!("场景文件: {path}");
        println!("共 {} 个步骤:", scenarios.len());
        for (index, scenario) in scenarios.iter().enumerate() {
            println!(
                "  {}. [{}] {} -> {}",
                index + 1,
                scenario.method,
                scenario.name,
                scenario.endpoint
            );
            for (variable, directive) in &scenario.generate {
                let marker = if directive.function.is_known() { "" } else { "  (未知的生成函数)" };
                println!("       generate {variable} = {directive}{marker}");
            }
            for (variable, directive) in &scenario.save {
                match directive.path_error() {
                    Some(e) => println!("       save {variable} <- {directive}  (路径无效: {e})"),
                    None => println!("       save {variable} <- {directive}"),
                }
            }
        }

        let unbound = unbound_placeholders(&scenarios, &TemplateSubstitutor::new());
        if !unbound.is_empty() {
            println!("\n以下占位符在执行时可能无法替换:");
            for placeholder in &unbound {
                warn!(step = placeholder.step + 1, variable = %placeholder.variable, "占位符未绑定");
                println!(
                    "  步骤 {}: {{{{{}}}}}",
                    placeholder.step + 1,
                    placeholder.variable
                );
            }
        }

        Ok(())
    }

    /// 执行 once 命令
    pub async fn run_once(mut self, scenarios_path: Option<String>, host: Option<String>) -> Result<()> {
        Overrides {
            host,
            scenarios: scenarios_path,
            ..Default::default()
        }
        .apply(&mut self.config);
        self.config.validate().context("配置校验失败")?;

        let scenarios = ScenarioStore::load(&self.config.scenarios.path);
        let executor = self.executor()?;

        let mut context = Context::new();
        let report = executor.run_once(&scenarios, &mut context).await;
        print_report(&report);
        Ok(())
    }
}

/// 从错误链中取出错误码，不是 [`LoadTestError`] 时为 `INTERNAL_ERROR`
pub fn error_code(err: &anyhow::Error) -> &'static str {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<LoadTestError>())
        .map_or("INTERNAL_ERROR", LoadTestError::code)
}

fn print_report(report: &CycleReport) {
    println!("\n========== 单轮执行结果 ==========");
    for outcome in &report.outcomes {
        let status = outcome
            .status
            .map_or_else(|| "-".to_string(), |s| s.to_string());
        let result = if outcome.is_success() {
            "OK".to_string()
        } else {
            outcome
                .failures
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        };
        println!(
            "{:>3}. {:<6} {:<40} {:>4} {:>8.1}ms  {}",
            outcome.index + 1,
            outcome.method.as_str(),
            outcome.name,
            status,
            outcome.elapsed.as_secs_f64() * 1000.0,
            result
        );
    }
    println!(
        "成功 {}/{}{}",
        report.succeeded(),
        report.attempted(),
        if report.aborted { "（已中止）" } else { "" }
    );
    println!("==================================\n");
}
