//! 虚拟用户上下文
//!
//! 保存一次用户会话中生成和提取出的变量，供后续步骤的模板替换使用。
//! 每个虚拟用户独占一个 Context，从不跨用户共享，因此无需加锁。

use std::collections::HashMap;

use serde_json::Value;

/// 会话变量存储
///
/// 变量一旦写入，只会被后续步骤覆盖，不会在会话中途被隐式清除
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: HashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入变量，返回被覆盖的旧值
    pub fn set(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// 获取变量的字符串形式（模板替换使用的表示）
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.values.get(name).map(render_value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }
}

/// 将上下文值渲染为字符串
///
/// 字符串原样输出（不带引号），其余类型使用 JSON 文本表示
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_get() {
        let mut ctx = Context::new();
        assert!(ctx.is_empty());

        assert!(ctx.set("token", json!("abc123")).is_none());
        assert_eq!(ctx.get("token"), Some(&json!("abc123")));
        assert!(ctx.contains("token"));
        assert_eq!(ctx.len(), 1);
        assert!(ctx.get("missing").is_none());
    }

    #[test]
    fn test_overwrite_returns_previous() {
        let mut ctx = Context::new();
        ctx.set("id", json!(1));
        let previous = ctx.set("id", json!(2));
        assert_eq!(previous, Some(json!(1)));
        assert_eq!(ctx.get("id"), Some(&json!(2)));
    }

    #[test]
    fn test_string_form() {
        let mut ctx = Context::new();
        ctx.set("name", json!("alice"));
        ctx.set("age", json!(42));
        ctx.set("active", json!(true));

        assert_eq!(ctx.get_string("name").as_deref(), Some("alice"));
        assert_eq!(ctx.get_string("age").as_deref(), Some("42"));
        assert_eq!(ctx.get_string("active").as_deref(), Some("true"));
    }

    #[test]
    fn test_render_nested_value_as_json() {
        assert_eq!(render_value(&json!({"a": [1, 2]})), r#"{"a":[1,2]}"#);
        assert_eq!(render_value(&Value::Null), "null");
    }
}
