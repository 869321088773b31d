//! 模板替换器
//!
//! 递归遍历 JSON 结构，替换字符串中的 `{{name}}` 占位符。
//! 上下文中不存在的变量保持原样输出，替换本身永远不会失败。

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::context::{Context, render_value};

/// 模板替换器
///
/// 每个字符串只扫描一次，所有占位符在同一趟中完成替换，
/// 替换进去的值不会被再次扫描。
#[derive(Debug, Clone)]
pub struct TemplateSubstitutor {
    /// 匹配 {{name}} 格式的占位符，name 为花括号之间的原文，不做裁剪
    placeholder_regex: Regex,
}

impl TemplateSubstitutor {
    pub fn new() -> Self {
        Self {
            placeholder_regex: Regex::new(r"\{\{([^{}]+)\}\}").unwrap(),
        }
    }

    /// 递归替换 JSON 值中的占位符
    ///
    /// 只改写字符串值，对象的键和非字符串标量原样保留。返回新结构，不修改输入。
    pub fn substitute(&self, value: &Value, context: &Context) -> Value {
        match value {
            Value::String(s) => Value::String(self.substitute_str(s, context)),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.substitute(item, context))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut replaced = Map::with_capacity(obj.len());
                for (k, v) in obj {
                    replaced.insert(k.clone(), self.substitute(v, context));
                }
                Value::Object(replaced)
            }
            _ => value.clone(),
        }
    }

    /// 替换单个字符串中的占位符
    pub fn substitute_str(&self, input: &str, context: &Context) -> String {
        if context.is_empty() || !input.contains("{{") {
            return input.to_string();
        }

        self.placeholder_regex
            .replace_all(input, |caps: &Captures| {
                context
                    .get(&caps[1])
                    .map(render_value)
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    /// 替换请求头的值（请求头名称不参与替换）
    pub fn substitute_headers(
        &self,
        headers: &IndexMap<String, String>,
        context: &Context,
    ) -> IndexMap<String, String> {
        headers
            .iter()
            .map(|(name, value)| (name.clone(), self.substitute_str(value, context)))
            .collect()
    }

    /// 列出字符串中引用的变量名（按出现顺序，可能重复）
    pub fn placeholders<'a>(&self, input: &'a str) -> Vec<&'a str> {
        self.placeholder_regex
            .captures_iter(input)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// 递归列出 JSON 值中引用的变量名
    pub fn placeholders_in<'a>(&self, value: &'a Value) -> Vec<&'a str> {
        match value {
            Value::String(s) => self.placeholders(s),
            Value::Array(items) => items.iter().flat_map(|v| self.placeholders_in(v)).collect(),
            Value::Object(obj) => obj.values().flat_map(|v| self.placeholders_in(v)).collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for TemplateSubstitutor {
    fn default() -> Self {
        Self::new()
    }
}
