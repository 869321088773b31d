//! 场景静态检查
//!
//! 找出引用了在执行到该步骤时仍不可能存在的变量的占位符。
//! 变量在以下情况视为已绑定：之前的步骤生成或提取了它，或者同一步骤生成了它。
//! 同一步骤 `save` 的变量要到响应之后才存在，不算绑定。

use std::collections::HashSet;

use super::models::ScenarioDefinition;
use crate::template::TemplateSubstitutor;

/// 一个无法绑定的占位符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnboundPlaceholder {
    /// 步骤下标（从 0 开始）
    pub step: usize,
    pub variable: String,
}

/// 按步骤顺序列出无法绑定的占位符，同一步骤内去重
pub fn unbound_placeholders(
    scenarios: &[ScenarioDefinition],
    substitutor: &TemplateSubstitutor,
) -> Vec<UnboundPlaceholder> {
    let mut bound: HashSet<&str> = HashSet::new();
    let mut unbound = Vec::new();

    for (step, scenario) in scenarios.iter().enumerate() {
        bound.extend(scenario.generate.keys().map(String::as_str));

        let mut referenced: Vec<&str> = substitutor.placeholders(&scenario.endpoint);
        referenced.extend(
            scenario
                .headers
                .values()
                .flat_map(|v| substitutor.placeholders(v)),
        );
        referenced.extend(substitutor.placeholders_in(&scenario.body));

        let mut seen = HashSet::new();
        for variable in referenced {
            if !bound.contains(variable) && seen.insert(variable) {
                unbound.push(UnboundPlaceholder {
                    step,
                    variable: variable.to_string(),
                });
            }
        }

        bound.extend(scenario.save.keys().map(String::as_str));
    }

    unbound
}
