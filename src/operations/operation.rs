use super::address::{Address, quote};
use super::values::Values;
use crate::error::WildflyError;
use serde_json::{Map, Value};
use std::fmt;

pub const ADD: &str = "add";
pub const REMOVE: &str = "remove";
pub const READ_RESOURCE: &str = "read-resource";
pub const READ_ATTRIBUTE: &str = "read-attribute";
pub const READ_CHILDREN_NAMES: &str = "read-children-names";
pub const WRITE_ATTRIBUTE: &str = "write-attribute";
pub const UNDEFINE_ATTRIBUTE: &str = "undefine-attribute";
pub const RELOAD: &str = "reload";

/// 针对管理树的一次请求：地址、操作名和参数
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    address: Address,
    name: String,
    params: Values,
}

impl Operation {
    /// 操作名为空或地址含空段时立即失败
    pub fn new(name: &str, address: &Address, params: Values) -> Result<Self, WildflyError> {
        if name.trim().is_empty() {
            return Err(WildflyError::Validation(
                "Operation name must be specified as non empty value".to_string(),
            ));
        }
        address.validate()?;
        Ok(Self {
            address: address.clone(),
            name: name.to_string(),
            params,
        })
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Values {
        &self.params
    }

    /// JSON 请求体：`{"operation": ..., "address": [...], <params>}`
    pub fn to_request(&self) -> Value {
        let mut request = Map::new();
        request.insert("operation".to_string(), Value::String(self.name.clone()));
        request.insert("address".to_string(), self.address.to_model());
        for (key, value) in self.params.iter() {
            request.insert(key.clone(), value.clone());
        }
        Value::Object(request)
    }

    /// CLI 请求语法，例如 `/subsystem=elytron/key-store=ks:add(type="JKS")`
    pub fn to_cli_request(&self) -> String {
        let mut request = if self.address.is_root() {
            String::new()
        } else {
            self.address.to_string()
        };
        request.push(':');
        request.push_str(&self.name);
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(key, value)| format!("{}={}", key, cli_value(value)))
                .collect();
            request.push('(');
            request.push_str(&params.join(","));
            request.push(')');
        }
        request
    }
}

fn cli_value(value: &Value) -> String {
    match value {
        Value::Null => "undefined".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(cli_value).collect();
            format!("[{}]", items.join(","))
        }
        Value::Object(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(key, value)| format!("{}={}", key, cli_value(value)))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cli_request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_address() {
        let address = Address::subsystem("elytron").and("key-store", "");
        let err = Operation::new(ADD, &address, Values::empty()).unwrap_err();
        assert!(matches!(err, WildflyError::Validation(_)));
        assert!(Operation::new("", &Address::root(), Values::empty()).is_err());
    }

    #[test]
    fn test_json_request() {
        let op = Operation::new(
            ADD,
            &Address::subsystem("elytron").and("key-store", "ks"),
            Values::empty().and("type", "JKS").and("required", false),
        )
        .unwrap();

        assert_eq!(
            op.to_request(),
            json!({
                "operation": "add",
                "address": [{"subsystem": "elytron"}, {"key-store": "ks"}],
                "type": "JKS",
                "required": false
            })
        );
    }

    #[test]
    fn test_cli_request() {
        let op = Operation::new(
            ADD,
            &Address::subsystem("elytron").and("key-store", "ks"),
            Values::empty()
                .and("type", "JKS")
                .and_object("credential-reference", Values::empty().and("clear-text", "se\"cret"))
                .and_list("protocols", ["TLSv1.2", "TLSv1.3"])
                .and("maximum-session-cache-size", 10),
        )
        .unwrap();

        assert_eq!(
            op.to_cli_request(),
            "/subsystem=elytron/key-store=ks:add(type=\"JKS\",credential-reference={clear-text=\"se\\\"cret\"},protocols=[\"TLSv1.2\",\"TLSv1.3\"],maximum-session-cache-size=10)"
        );
    }

    #[test]
    fn test_root_operation_without_params() {
        let op = Operation::new(READ_RESOURCE, &Address::root(), Values::empty()).unwrap();
        assert_eq!(op.to_cli_request(), ":read-resource");
        assert_eq!(op.to_string(), ":read-resource");
    }
}
