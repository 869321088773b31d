//! 场景定义与加载

mod lint;
mod models;
mod store;

pub use lint::{UnboundPlaceholder, unbound_placeholders};
pub use models::{HttpMethod, InvalidScenario, ScenarioDefinition};
pub use store::{LoadError, ScenarioStore, SourceFormat};
