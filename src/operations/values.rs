use serde_json::{Map, Value};

/// 一个管理操作的有序命名参数。
///
/// 普通 setter（`and`、`and_list`、`and_object` 等）总会写入属性，即使值为空。
/// `*_optional` 系列在值为空时不写入，服务器只会看到设置过的参数。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Values {
    attributes: Map<String, Value>,
}

fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

impl Values {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 由固定的键值对构造参数，保持顺序
    pub fn from_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        entries
            .into_iter()
            .fold(Self::empty(), |values, (k, v)| {
                let name: String = k.into();
                values.and(&name, v)
            })
    }

    pub fn and(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn and_optional(self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        if is_absent(&value) {
            return self;
        }
        self.and(name, value)
    }

    pub fn and_list<I, V>(self, name: &str, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let list: Vec<Value> = items.into_iter().map(Into::into).collect();
        self.and(name, Value::Array(list))
    }

    pub fn and_list_optional<I, V>(self, name: &str, items: Option<I>) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        match items {
            Some(items) => {
                let list: Vec<Value> = items.into_iter().map(Into::into).collect();
                self.and_optional(name, Value::Array(list))
            }
            None => self,
        }
    }

    pub fn and_object(self, name: &str, object: Values) -> Self {
        self.and(name, object.into_model())
    }

    pub fn and_object_optional(self, name: &str, object: impl Into<Option<Values>>) -> Self {
        match object.into() {
            Some(object) if !object.is_empty() => self.and_object(name, object),
            _ => self,
        }
    }

    /// 按给定顺序写入嵌套对象列表
    pub fn and_object_list<I>(self, name: &str, objects: I) -> Self
    where
        I: IntoIterator<Item = Values>,
    {
        self.and_list(name, objects.into_iter().map(Values::into_model))
    }

    pub fn and_object_list_optional<I>(self, name: &str, objects: Option<I>) -> Self
    where
        I: IntoIterator<Item = Values>,
    {
        match objects {
            Some(objects) => {
                let list: Vec<Value> = objects.into_iter().map(Values::into_model).collect();
                self.and_optional(name, Value::Array(list))
            }
            None => self,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.attributes.iter()
    }

    pub fn into_model(self) -> Value {
        Value::Object(self.attributes)
    }
}

impl From<Map<String, Value>> for Values {
    fn from(attributes: Map<String, Value>) -> Self {
        Self { attributes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_optional_setters_omit_absent_values() {
        let values = Values::empty()
            .and_optional("provider", None::<String>)
            .and_optional("alias-filter", "")
            .and_list_optional("protocols", Some(Vec::<String>::new()))
            .and_list_optional("cipher-suites", None::<Vec<String>>)
            .and_object_optional("credential-reference", Values::empty())
            .and_object_optional("configuration", None::<Values>)
            .and_object_list_optional("realms", Some(Vec::<Values>::new()));

        assert!(values.is_empty());
    }

    #[test]
    fn test_plain_setters_always_include() {
        let values = Values::empty()
            .and("path", "")
            .and("provider", None::<String>)
            .and_list("name-rewriters", Vec::<String>::new())
            .and_object("credential-reference", Values::empty());

        assert_eq!(values.len(), 4);
        assert_eq!(values.get("path"), Some(&json!("")));
        assert_eq!(values.get("provider"), Some(&Value::Null));
        assert_eq!(values.get("name-rewriters"), Some(&json!([])));
        assert_eq!(values.get("credential-reference"), Some(&json!({})));
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let values = Values::empty()
            .and("type", "JKS")
            .and_list("name-rewriters", ["second", "first", "third"])
            .and("required", true)
            .and("session-timeout", 30);

        assert_eq!(values.names(), vec!["type", "name-rewriters", "required", "session-timeout"]);
        assert_eq!(values.get("name-rewriters"), Some(&json!(["second", "first", "third"])));
    }

    #[test]
    fn test_nested_objects() {
        let credential = Values::empty().and_optional("alias", None::<String>).and("clear-text", "secret");
        let realms = vec![
            Values::empty().and("realm", "a"),
            Values::empty().and("realm", "b").and("role-decoder", "groups"),
        ];
        let values = Values::empty()
            .and_object("credential-reference", credential)
            .and_object_list("realms", realms);

        assert_eq!(
            values.into_model(),
            json!({
                "credential-reference": {"clear-text": "secret"},
                "realms": [{"realm": "a"}, {"realm": "b", "role-decoder": "groups"}]
            })
        );
    }

    #[test]
    fn test_from_map() {
        let values = Values::from_map([("java.security.krb5.debug", "true"), ("mode", "strict")]);
        assert_eq!(values.names(), vec!["java.security.krb5.debug", "mode"]);
        assert_eq!(values.get("mode"), Some(&json!("strict")));
    }

    #[test]
    fn test_duplicate_name_overwrites() {
        let values = Values::empty().and("type", "JKS").and("type", "PKCS12");
        assert_eq!(values.len(), 1);
        assert_eq!(values.get("type"), Some(&json!("PKCS12")));
    }
}
