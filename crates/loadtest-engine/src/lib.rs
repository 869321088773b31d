//! 场景驱动的负载测试引擎
//!
//! 从声明式场景文件加载一组有序的 HTTP 步骤，由每个虚拟用户按顺序重复执行。
//! 每个步骤依次经历：数据生成 → 模板替换 → 发送请求 → 响应提取 → 结果分类，
//! 步骤之间通过虚拟用户独占的 [`Context`] 传递状态。
//!
//! # 主要模块
//!
//! - `scenarios`: 场景定义与加载（ScenarioStore）
//! - `generators`: 合成数据生成（DataGenerator）
//! - `context`: 虚拟用户上下文
//! - `template`: `{{name}}` 占位符替换（TemplateSubstitutor）
//! - `extractor`: 响应值提取（ResponseExtractor）
//! - `transport`: HTTP 传输抽象与 reqwest 实现
//! - `executor`: 单轮场景执行（ScenarioExecutor）
//! - `user` / `swarm`: 虚拟用户生命周期与并发调度
//!
//! # 使用示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use loadtest_engine::{Context, ReqwestTransport, ScenarioExecutor, ScenarioStore};
//!
//! let scenarios = ScenarioStore::load("locust/scenarios.json");
//! let transport = Arc::new(ReqwestTransport::new(std::time::Duration::from_secs(30))?);
//! let executor = ScenarioExecutor::new(transport, "http://localhost:8080");
//!
//! let mut context = Context::new();
//! let report = executor.run_once(&scenarios, &mut context).await;
//! println!("{}/{} 步骤成功", report.succeeded(), report.attempted());
//! ```

pub mod cli;
pub mod context;
pub mod executor;
pub mod extractor;
pub mod generators;
pub mod scenarios;
pub mod shutdown;
pub mod swarm;
pub mod template;
pub mod transport;
pub mod user;

pub use context::Context;
pub use executor::{CycleReport, ScenarioExecutor, StepFailure, StepOutcome};
pub use extractor::{ExtractSource, ExtractionDirective, ExtractionError, ResponseExtractor};
pub use generators::{DataGenerator, GenerateError, GeneratorDirective, GeneratorFn};
pub use scenarios::{HttpMethod, LoadError, ScenarioDefinition, ScenarioStore, SourceFormat};
pub use swarm::{Swarm, SwarmConfig, SwarmSummary};
pub use template::TemplateSubstitutor;
pub use transport::{
    HttpTransport, PreparedRequest, ReqwestTransport, TransportError, TransportResponse,
};
pub use user::{UserStats, VirtualUser};
