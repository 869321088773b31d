//! 模板替换模块
//!
//! 将请求中的 `{{name}}` 占位符替换为虚拟用户上下文中的变量值。

mod substitutor;

pub use substitutor::TemplateSubstitutor;
