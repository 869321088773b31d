//! 场景执行器
//!
//! 对每个场景步骤依次执行：生成 → 替换 → 发送 → 提取 → 分类。
//! 单个步骤失败不会阻止同一轮中后续步骤的执行，
//! 只有停止信号会让本轮提前结束。

use std::sync::Arc;
use std::time::{Duration, Instant};

use loadtest_shared::observability::metrics as obs_metrics;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::context::Context;
use crate::extractor::{ExtractionError, ResponseExtractor};
use crate::generators::DataGenerator;
use crate::scenarios::{HttpMethod, ScenarioDefinition};
use crate::shutdown;
use crate::template::TemplateSubstitutor;
use crate::transport::{HttpTransport, PreparedRequest};

const CONTENT_TYPE: &str = "Content-Type";
const JSON_CONTENT_TYPE: &str = "application/json";

/// 步骤失败原因
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepFailure {
    #[error("status {0}")]
    Status(u16),

    #[error("transport: {0}")]
    Transport(String),

    #[error("not found: {variable} <- {path}")]
    NotFound { variable: String, path: String },

    #[error("invalid body: {variable}: {message}")]
    InvalidBody { variable: String, message: String },

    #[error("invalid path: {variable}: {message}")]
    InvalidPath { variable: String, message: String },

    #[error("aborted")]
    Aborted,
}

impl StepFailure {
    /// 失败类别，用于指标标签和汇总
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Transport(_) => "transport",
            Self::NotFound { .. } => "not_found",
            Self::InvalidBody { .. } => "invalid_body",
            Self::InvalidPath { .. } => "invalid_path",
            Self::Aborted => "aborted",
        }
    }

    fn from_extraction(variable: &str, err: ExtractionError) -> Self {
        let variable = variable.to_string();
        match err {
            ExtractionError::NotFound { path } => Self::NotFound { variable, path },
            ExtractionError::InvalidBody(message) => Self::InvalidBody { variable, message },
            ExtractionError::InvalidPath { path, message } => Self::InvalidPath {
                variable,
                message: format!("{path}: {message}"),
            },
        }
    }
}

/// 单个步骤的执行结果
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// 步骤下标
    pub index: usize,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    /// 传输失败或被中止时为空
    pub status: Option<u16>,
    pub elapsed: Duration,
    /// 为空表示成功
    pub failures: Vec<StepFailure>,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 一轮任务循环的报告
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub outcomes: Vec<StepOutcome>,
    /// 本轮是否被停止信号中断
    pub aborted: bool,
}

impl CycleReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }
}

/// 场景执行器
///
/// 本身无状态，可通过 `Arc` 在所有虚拟用户间共享；
/// 可变状态只存在于调用方传入的 [`Context`] 中
pub struct ScenarioExecutor {
    transport: Arc<dyn HttpTransport>,
    base_url: String,
    generator: DataGenerator,
    substitutor: TemplateSubstitutor,
    extractor: ResponseExtractor,
}

impl ScenarioExecutor {
    pub fn new(transport: Arc<dyn HttpTransport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            generator: DataGenerator::new(),
            substitutor: TemplateSubstitutor::new(),
            extractor: ResponseExtractor::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 执行一轮：按顺序执行所有场景
    ///
    /// 停止信号在请求进行中触发时，该请求被放弃并记为 `aborted`，剩余步骤跳过。
    /// 信号在两个步骤之间到达时，后续步骤不再生成变量也不再发送。
    #[instrument(skip_all, fields(steps = scenarios.len()))]
    pub async fn run_cycle(
        &self,
        scenarios: &[ScenarioDefinition],
        context: &mut Context,
        abort: &mut watch::Receiver<bool>,
    ) -> CycleReport {
        let mut report = CycleReport {
            outcomes: Vec::with_capacity(scenarios.len()),
            aborted: *abort.borrow(),
        };

        for (index, scenario) in scenarios.iter().enumerate() {
            if report.aborted || *abort.borrow() {
                report.aborted = true;
                break;
            }

            let outcome = self.run_step(index, scenario, context, abort).await;
            report.aborted = outcome.failures.contains(&StepFailure::Aborted);
            report.outcomes.push(outcome);
        }

        obs_metrics::record_cycle(report.aborted);
        debug!(
            attempted = report.attempted(),
            succeeded = report.succeeded(),
            aborted = report.aborted,
            "任务循环结束"
        );
        report
    }

    /// 不带停止信号执行一轮
    pub async fn run_once(
        &self,
        scenarios: &[ScenarioDefinition],
        context: &mut Context,
    ) -> CycleReport {
        let (_tx, mut rx) = watch::channel(false);
        self.run_cycle(scenarios, context, &mut rx).await
    }

    async fn run_step(
        &self,
        index: usize,
        scenario: &ScenarioDefinition,
        context: &mut Context,
        abort: &mut watch::Receiver<bool>,
    ) -> StepOutcome {
        self.generate_variables(scenario, context);
        let request = self.prepare_request(scenario, context);
        let url = request.url.clone();

        let started = Instant::now();
        let result = tokio::select! {
            biased;

            _ = shutdown::wait_for(abort) => None,
            result = self.transport.send(request) => Some(result),
        };
        let elapsed = started.elapsed();

        let mut status = None;
        let mut failures = Vec::new();

        match result {
            None => failures.push(StepFailure::Aborted),
            Some(Err(e)) => failures.push(StepFailure::Transport(e.to_string())),
            Some(Ok(response)) => {
                status = Some(response.status);
                if !response.is_success() {
                    failures.push(StepFailure::Status(response.status));
                } else if !scenario.save.is_empty() {
                    for (variable, extracted) in self.extractor.extract_all(&response, &scenario.save)
                    {
                        match extracted {
                            Ok(Some(value)) => {
                                context.set(variable, value);
                            }
                            Ok(None) => {}
                            Err(e) => failures.push(StepFailure::from_extraction(variable, e)),
                        }
                    }
                }
            }
        }

        let outcome = StepOutcome {
            index,
            name: scenario.name.clone(),
            method: scenario.method,
            url,
            status,
            elapsed,
            failures,
        };
        self.report(&outcome);
        outcome
    }

    /// 执行当前步骤的生成指令，失败的变量直接跳过
    fn generate_variables(&self, scenario: &ScenarioDefinition, context: &mut Context) {
        for (variable, directive) in &scenario.generate {
            match self.generator.generate_directive(directive) {
                Ok(value) => {
                    context.set(variable.clone(), value);
                }
                Err(e) => {
                    debug!(variable = %variable, directive = %directive, error = %e, "变量生成失败，跳过");
                }
            }
        }
    }

    /// 用当前上下文构造请求
    pub fn prepare_request(&self, scenario: &ScenarioDefinition, context: &Context) -> PreparedRequest {
        let endpoint = self.substitutor.substitute_str(&scenario.endpoint, context);
        let mut headers = self.substitutor.substitute_headers(&scenario.headers, context);

        if scenario.method == HttpMethod::Post
            && !headers.keys().any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE))
        {
            headers.insert(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
        }

        let body = scenario
            .method
            .carries_body()
            .then(|| self.substitutor.substitute(&scenario.body, context));

        PreparedRequest {
            method: scenario.method,
            url: resolve_url(&self.base_url, &endpoint),
            headers,
            body,
            name: scenario.name.clone(),
        }
    }

    /// 每个步骤恰好上报一次
    fn report(&self, outcome: &StepOutcome) {
        let success = outcome.is_success();
        obs_metrics::record_request(
            &outcome.name,
            outcome.method.as_str(),
            outcome.status,
            success,
            outcome.elapsed.as_secs_f64(),
        );

        if success {
            debug!(
                name = %outcome.name,
                status = ?outcome.status,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "步骤成功"
            );
            return;
        }

        for failure in &outcome.failures {
            obs_metrics::record_step_failure(&outcome.name, failure.kind());
        }
        warn!(
            name = %outcome.name,
            url = %outcome.url,
            status = ?outcome.status,
            failures = ?outcome.failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "步骤失败"
        );
    }
}

/// 相对路径拼接到目标地址，绝对 URL 原样使用
fn resolve_url(base_url: &str, endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return endpoint.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
