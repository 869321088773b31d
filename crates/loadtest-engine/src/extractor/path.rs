//! JSONPath 子集
//!
//! 支持的语法：
//! - `$` 根节点
//! - `.name` / `['name']` / `["name"]` 子字段
//! - `[0]` 数组下标，负数从末尾计数
//! - `.*` / `[*]` 通配
//! - `..name` / `..*` 递归下降
//!
//! 不以 `$` 开头的路径视为相对根节点，开头的 `body` 段指代根节点本身
//! （兼容 `body.access_token` 这种写法）。

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("位置 {position}: {message}")]
pub struct PathError {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Child(String),
    Index(i64),
    Wildcard,
    Descendant(String),
    DescendantWildcard,
}

/// 编译后的路径表达式
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<Segment>,
}

impl JsonPath {
    /// 编译路径表达式
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        let normalized = normalize(expr.trim());
        let chars: Vec<char> = normalized.chars().collect();
        let mut segments = Vec::new();
        // 跳过开头的 $
        let mut pos = 1;

        while pos < chars.len() {
            match chars[pos] {
                '.' if chars.get(pos + 1) == Some(&'.') => {
                    pos += 2;
                    if chars.get(pos) == Some(&'*') {
                        segments.push(Segment::DescendantWildcard);
                        pos += 1;
                    } else {
                        let (name, next) = read_name(&chars, pos)?;
                        segments.push(Segment::Descendant(name));
                        pos = next;
                    }
                }
                '.' => {
                    pos += 1;
                    if chars.get(pos) == Some(&'*') {
                        segments.push(Segment::Wildcard);
                        pos += 1;
                    } else {
                        let (name, next) = read_name(&chars, pos)?;
                        segments.push(Segment::Child(name));
                        pos = next;
                    }
                }
                '[' => {
                    let (segment, next) = read_bracket(&chars, pos)?;
                    segments.push(segment);
                    pos = next;
                }
                other => {
                    return Err(PathError {
                        position: pos,
                        message: format!("意外的字符 '{other}'"),
                    });
                }
            }
        }

        Ok(Self { segments })
    }

    /// 返回所有匹配的节点（按文档顺序）
    pub fn find<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];

        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match segment {
                    Segment::Child(name) => {
                        if let Some(v) = node.as_object().and_then(|o| o.get(name)) {
                            next.push(v);
                        }
                    }
                    Segment::Index(index) => {
                        if let Some(v) = node.as_array().and_then(|arr| index_into(arr, *index)) {
                            next.push(v);
                        }
                    }
                    Segment::Wildcard => push_children(node, &mut next),
                    Segment::Descendant(name) => {
                        let mut all = Vec::new();
                        collect_descendants(node, true, &mut all);
                        next.extend(
                            all.into_iter()
                                .filter_map(|v| v.as_object().and_then(|o| o.get(name))),
                        );
                    }
                    Segment::DescendantWildcard => collect_descendants(node, false, &mut next),
                }
            }
            current = next;
        }

        current
    }

    /// 返回第一个匹配的节点
    pub fn first<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.find(root).into_iter().next()
    }
}

/// 将相对路径和 `body` 前缀统一转换为 `$` 开头的形式
fn normalize(expr: &str) -> String {
    if expr.starts_with('$') {
        return expr.to_string();
    }

    let relative = match expr {
        "body" => "",
        _ => expr.strip_prefix("body.").unwrap_or(expr),
    };

    if relative.is_empty() {
        "$".to_string()
    } else if relative.starts_with('[') || relative.starts_with('.') {
        format!("${relative}")
    } else {
        format!("$.{relative}")
    }
}

fn read_name(chars: &[char], start: usize) -> Result<(String, usize), PathError> {
    let mut end = start;
    while end < chars.len() && chars[end] != '.' && chars[end] != '[' {
        end += 1;
    }
    if end == start {
        return Err(PathError {
            position: start,
            message: "字段名为空".to_string(),
        });
    }
    Ok((chars[start..end].iter().collect(), end))
}

fn read_bracket(chars: &[char], start: usize) -> Result<(Segment, usize), PathError> {
    let mut pos = start + 1;

    match chars.get(pos) {
        Some(&quote @ ('\'' | '"')) => {
            pos += 1;
            let name_start = pos;
            while pos < chars.len() && chars[pos] != quote {
                pos += 1;
            }
            if pos >= chars.len() {
                return Err(PathError {
                    position: start,
                    message: "引号未闭合".to_string(),
                });
            }
            let name: String = chars[name_start..pos].iter().collect();
            expect_close(chars, pos + 1).map(|next| (Segment::Child(name), next))
        }
        Some('*') => expect_close(chars, pos + 1).map(|next| (Segment::Wildcard, next)),
        Some(_) => {
            let index_start = pos;
            while pos < chars.len() && chars[pos] != ']' {
                pos += 1;
            }
            let raw: String = chars[index_start..pos].iter().collect();
            let index = raw.trim().parse::<i64>().map_err(|_| PathError {
                position: index_start,
                message: format!("无效的数组下标 '{raw}'"),
            })?;
            expect_close(chars, pos).map(|next| (Segment::Index(index), next))
        }
        None => Err(PathError {
            position: start,
            message: "方括号未闭合".to_string(),
        }),
    }
}

fn expect_close(chars: &[char], pos: usize) -> Result<usize, PathError> {
    if chars.get(pos) == Some(&']') {
        Ok(pos + 1)
    } else {
        Err(PathError {
            position: pos,
            message: "缺少 ']'".to_string(),
        })
    }
}

fn index_into(arr: &[Value], index: i64) -> Option<&Value> {
    let resolved = if index < 0 {
        arr.len().checked_sub(index.unsigned_abs() as usize)?
    } else {
        index as usize
    };
    arr.get(resolved)
}

fn push_children<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    match node {
        Value::Object(obj) => out.extend(obj.values()),
        Value::Array(arr) => out.extend(arr.iter()),
        _ => {}
    }
}

/// 前序收集后代节点
fn collect_descendants<'a>(node: &'a Value, include_self: bool, out: &mut Vec<&'a Value>) {
    if include_self {
        out.push(node);
    }
    let mut children = Vec::new();
    push_children(node, &mut children);
    for child in children {
        collect_descendants(child, true, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "access_token": "abc123",
            "user": {"id": 7, "roles": ["admin", "dev"]},
            "items": [
                {"id": "a", "price": 1},
                {"id": "b", "price": 2}
            ],
            "weird key": true
        })
    }

    fn first(expr: &str) -> Option<Value> {
        JsonPath::parse(expr).unwrap().first(&sample()).cloned()
    }

    #[test]
    fn test_root_child() {
        assert_eq!(first("$.access_token"), Some(json!("abc123")));
        assert_eq!(first("$"), Some(sample()));
    }

    #[test]
    fn test_nested_and_index() {
        assert_eq!(first("$.user.id"), Some(json!(7)));
        assert_eq!(first("$.user.roles[1]"), Some(json!("dev")));
        assert_eq!(first("$.items[-1].id"), Some(json!("b")));
        assert_eq!(first("$.items[5]"), None);
        assert_eq!(first("$.items[-3]"), None);
    }

    #[test]
    fn test_bracket_names() {
        assert_eq!(first("$['weird key']"), Some(json!(true)));
        assert_eq!(first(r#"$["user"]["id"]"#), Some(json!(7)));
    }

    #[test]
    fn test_wildcards() {
        let path = JsonPath::parse("$.items[*].price").unwrap();
        let root = sample();
        let prices: Vec<&Value> = path.find(&root);
        assert_eq!(prices, vec![&json!(1), &json!(2)]);

        assert_eq!(first("$.items.*.id"), Some(json!("a")));
    }

    #[test]
    fn test_recursive_descent() {
        let root = sample();
        let ids = JsonPath::parse("$..id").unwrap();
        assert_eq!(ids.find(&root), vec![&json!(7), &json!("a"), &json!("b")]);

        let all = JsonPath::parse("$..*").unwrap();
        assert!(all.find(&root).len() > 5);
    }

    #[test]
    fn test_relative_and_body_prefix() {
        assert_eq!(first("access_token"), Some(json!("abc123")));
        assert_eq!(first("body.access_token"), Some(json!("abc123")));
        assert_eq!(first("body.user.roles[0]"), Some(json!("admin")));
        assert_eq!(first("body"), Some(sample()));
        assert_eq!(first("[\"user\"].id"), Some(json!(7)));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(first("$.refresh_token"), None);
        assert_eq!(first("$.access_token.length"), None);
    }

    #[test]
    fn test_invalid_paths() {
        assert!(JsonPath::parse("$.").is_err());
        assert!(JsonPath::parse("$.items[abc]").is_err());
        assert!(JsonPath::parse("$.items[0").is_err());
        assert!(JsonPath::parse("$['open").is_err());
        assert!(JsonPath::parse("$x").is_err());
    }
}
