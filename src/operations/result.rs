use crate::error::WildflyError;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

const OUTCOME: &str = "outcome";
const SUCCESS: &str = "success";
const FAILED: &str = "failed";
const RESULT: &str = "result";
const FAILURE_DESCRIPTION: &str = "failure-description";
const RESPONSE_HEADERS: &str = "response-headers";

/// 资源不存在（新旧两种消息 ID）
const NOT_FOUND_CODES: &[&str] = &["WFLYCTL0216", "JBAS014807"];
/// 资源已存在
const DUPLICATE_CODES: &[&str] = &["WFLYCTL0212", "JBAS014803"];

static FAILURE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Z]{4,}[0-9]{4,6})\b").expect("valid failure code pattern"));

/// 一次操作的结果。
///
/// 失败的结果只是数据，是否转换为错误由调用方决定（见 `ErrorHandlingClient`）。
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNodeResult {
    response: Value,
}

impl ModelNodeResult {
    pub fn from_response(response: Value) -> Self {
        Self { response }
    }

    pub fn success(result: Value) -> Self {
        let mut response = Map::new();
        response.insert(OUTCOME.to_string(), Value::String(SUCCESS.to_string()));
        response.insert(RESULT.to_string(), result);
        Self::from_response(Value::Object(response))
    }

    pub fn failed(description: &str) -> Self {
        let mut response = Map::new();
        response.insert(OUTCOME.to_string(), Value::String(FAILED.to_string()));
        response.insert(
            FAILURE_DESCRIPTION.to_string(),
            Value::String(description.to_string()),
        );
        Self::from_response(Value::Object(response))
    }

    /// 添加 `response-headers.process-state`，与服务器在需要重载或重启的变更之后的行为一致
    pub fn with_process_state(mut self, state: &str) -> Self {
        if let Value::Object(response) = &mut self.response {
            let headers = response
                .entry(RESPONSE_HEADERS.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(headers) = headers {
                headers.insert("process-state".to_string(), Value::String(state.to_string()));
            }
        }
        self
    }

    pub fn is_success(&self) -> bool {
        self.response.get(OUTCOME).and_then(Value::as_str) == Some(SUCCESS)
    }

    /// 不是明确的 success 都算失败
    pub fn is_failed(&self) -> bool {
        !self.is_success()
    }

    /// 操作成功且结果非空
    pub fn is_defined(&self) -> bool {
        self.is_success() && !self.value().is_null()
    }

    /// `result` 内容，缺失时为 `Null`
    pub fn value(&self) -> &Value {
        self.response.get(RESULT).unwrap_or(&Value::Null)
    }

    pub fn response(&self) -> &Value {
        &self.response
    }

    /// 整个响应的文本形式
    pub fn as_string(&self) -> String {
        self.response.to_string()
    }

    pub fn string_value(&self) -> Option<String> {
        match self.value() {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn string_value_or(&self, default: &str) -> String {
        self.string_value().unwrap_or_else(|| default.to_string())
    }

    pub fn string_list_value(&self) -> Option<Vec<String>> {
        let items = self.value().as_array()?;
        Some(
            items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        )
    }

    pub fn int_value(&self) -> Option<i64> {
        match self.value() {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn bool_value(&self) -> Option<bool> {
        match self.value() {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn failure_description(&self) -> Option<String> {
        match self.response.get(FAILURE_DESCRIPTION)? {
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// 失败描述开头的消息 ID，例如 `WFLYCTL0216`
    pub fn failure_code(&self) -> Option<String> {
        let description = self.failure_description()?;
        FAILURE_CODE
            .captures(&description)
            .map(|caps| caps[1].to_string())
    }

    pub fn is_not_found(&self) -> bool {
        self.is_failed() && self.has_failure_code(NOT_FOUND_CODES)
    }

    pub fn is_duplicate(&self) -> bool {
        self.is_failed() && self.has_failure_code(DUPLICATE_CODES)
    }

    fn has_failure_code(&self, codes: &[&str]) -> bool {
        self.failure_code()
            .is_some_and(|code| codes.contains(&code.as_str()))
    }

    /// 服务器返回的 `response-headers.process-state`
    pub fn process_state(&self) -> Option<&str> {
        self.response
            .get(RESPONSE_HEADERS)?
            .get("process-state")?
            .as_str()
    }

    pub fn assert_success(&self, message: &str) -> Result<(), WildflyError> {
        if self.is_failed() {
            return Err(WildflyError::OperationFailed(format!(
                "{}: {}",
                message,
                self.failure_description().unwrap_or_else(|| self.as_string())
            )));
        }
        Ok(())
    }

    pub fn assert_failed(&self, message: &str) -> Result<(), WildflyError> {
        if self.is_success() {
            return Err(WildflyError::OperationFailed(format!(
                "{}: expected failure, got {}",
                message,
                self.as_string()
            )));
        }
        Ok(())
    }

    pub fn assert_defined_value(&self, message: &str) -> Result<(), WildflyError> {
        self.assert_success(message)?;
        if !self.is_defined() {
            return Err(WildflyError::OperationFailed(format!(
                "{}: result is undefined",
                message
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ModelNodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}
