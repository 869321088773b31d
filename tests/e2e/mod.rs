//! 负载测试引擎端到端测试
//!
//! 在进程内启动模拟目标服务，覆盖：
//! - 多步骤用户旅程（注册 → 查询资料 → 下单）
//! - 完整压测调度（逐步启动、运行时长、停止信号）

pub mod setup;
pub mod suites;

pub use setup::MockTarget;
