use crate::error::WildflyError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// 管理树中资源的路径，最外层的段在前。
///
/// 地址是不可变值：`and` 返回多一段的新地址。构造时允许空的类型或名称，
/// 但 [`Address::validate`] 会拒绝它们，每个操作提交前都会校验。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    segments: Vec<(String, String)>,
}

impl Address {
    /// 管理树的根（没有段）
    pub fn root() -> Self {
        Self::default()
    }

    pub fn of(resource_type: &str, name: &str) -> Self {
        Self::root().and(resource_type, name)
    }

    pub fn subsystem(name: &str) -> Self {
        Self::of("subsystem", name)
    }

    pub fn extension(name: &str) -> Self {
        Self::of("extension", name)
    }

    pub fn core_service(name: &str) -> Self {
        Self::of("core-service", name)
    }

    pub fn deployment(name: &str) -> Self {
        Self::of("deployment", name)
    }

    pub fn host(name: &str) -> Self {
        Self::of("host", name)
    }

    pub fn profile(name: &str) -> Self {
        Self::of("profile", name)
    }

    pub fn socket_binding_group(name: &str) -> Self {
        Self::of("socket-binding-group", name)
    }

    /// 返回追加了 `(resource_type, name)` 的新地址
    pub fn and(&self, resource_type: &str, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push((resource_type.to_string(), name.to_string()));
        Self { segments }
    }

    pub fn segments(&self) -> &[(String, String)] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// 上一级地址，根地址返回 `None`
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        let mut segments = self.segments.clone();
        segments.pop();
        Some(Self { segments })
    }

    pub fn last_type(&self) -> Option<&str> {
        self.segments.last().map(|(t, _)| t.as_str())
    }

    pub fn last_name(&self) -> Option<&str> {
        self.segments.last().map(|(_, n)| n.as_str())
    }

    /// 任一段的类型或名称为空时失败
    pub fn validate(&self) -> Result<(), WildflyError> {
        for (index, (resource_type, name)) in self.segments.iter().enumerate() {
            if resource_type.trim().is_empty() {
                return Err(WildflyError::Validation(format!(
                    "Address segment {} has an empty resource type",
                    index
                )));
            }
            if name.is_empty() {
                return Err(WildflyError::Validation(format!(
                    "Name of '{}' in address segment {} must be specified as non empty value",
                    resource_type, index
                )));
            }
        }
        Ok(())
    }

    /// 传输格式：单键对象列表，`[{"subsystem": "elytron"}, ...]`
    pub fn to_model(&self) -> Value {
        Value::Array(
            self.segments
                .iter()
                .map(|(t, n)| {
                    let mut segment = Map::new();
                    segment.insert(t.clone(), Value::String(n.clone()));
                    Value::Object(segment)
                })
                .collect(),
        )
    }
}

fn needs_quoting(name: &str) -> bool {
    name.is_empty()
        || name.chars().any(|c| {
            c.is_whitespace() || matches!(c, '/' | '=' | ':' | ',' | '"' | '\\' | '[' | ']' | '{' | '}' | '(' | ')')
        })
}

/// 值包含保留字符时按 CLI 语法加引号
pub(crate) fn quote_if_needed(value: &str) -> String {
    if needs_quoting(value) {
        quote(value)
    } else {
        value.to_string()
    }
}

pub(crate) fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for (resource_type, name) in &self.segments {
            write!(f, "/{}={}", resource_type, quote_if_needed(name))?;
        }
        Ok(())
    }
}

impl FromStr for Address {
    type Err = WildflyError;

    /// 解析 CLI 路径形式，例如 `/subsystem=elytron/key-store="my ks"`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Ok(Self::root());
        }
        let rest = trimmed
            .strip_prefix('/')
            .ok_or_else(|| WildflyError::Parse(format!("Address '{}' must start with '/'", s)))?;

        let mut segments = Vec::new();
        let mut chars = rest.chars().peekable();
        loop {
            let mut resource_type = String::new();
            while let Some(&c) = chars.peek() {
                if c == '=' {
                    break;
                }
                if c == '/' {
                    return Err(WildflyError::Parse(format!(
                        "Address segment '{}' in '{}' has no name",
                        resource_type, s
                    )));
                }
                resource_type.push(c);
                chars.next();
            }
            if chars.next() != Some('=') {
                return Err(WildflyError::Parse(format!(
                    "Address segment '{}' in '{}' has no name",
                    resource_type, s
                )));
            }

            let mut name = String::new();
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                name.push(escaped);
                            }
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => name.push(other),
                    }
                }
                if !closed {
                    return Err(WildflyError::Parse(format!("Unterminated quote in address '{}'", s)));
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c == '/' {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
            }

            segments.push((resource_type.trim().to_string(), name));

            match chars.next() {
                None => break,
                Some('/') => continue,
                Some(other) => {
                    return Err(WildflyError::Parse(format!(
                        "Unexpected '{}' after quoted name in address '{}'",
                        other, s
                    )));
                }
            }
        }

        let address = Self { segments };
        address.validate().map_err(|e| WildflyError::Parse(e.to_string()))?;
        Ok(address)
    }
}

impl TryFrom<String> for Address {
    type Error = WildflyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}
