//! 测试环境设置模块

mod target;

pub use target::{MockTarget, TargetCounters};
