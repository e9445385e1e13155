use crate::operations::Values;
use serde::{Deserialize, Serialize};

/// 多种 Elytron 资源共用的 `credential-reference` 复合属性
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub credential_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    #[serde(default, rename = "clear-text", skip_serializing_if = "Option::is_none")]
    pub clear_text: Option<String>,
}

impl CredentialRef {
    pub fn clear_text(password: &str) -> Self {
        Self {
            clear_text: Some(password.to_string()),
            ..Default::default()
        }
    }

    pub fn from_store(store: &str, alias: &str) -> Self {
        Self {
            store: Some(store.to_string()),
            alias: Some(alias.to_string()),
            ..Default::default()
        }
    }

    pub fn to_values(&self) -> Values {
        Values::empty()
            .and_optional("alias", self.alias.clone())
            .and_optional("type", self.credential_type.clone())
            .and_optional("store", self.store.clone())
            .and_optional("clear-text", self.clear_text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_values_skips_unset_fields() {
        let values = CredentialRef::from_store("cs", "db-password").to_values();
        assert_eq!(values.names(), vec!["alias", "store"]);

        let values = CredentialRef::clear_text("secret").to_values();
        assert_eq!(values.get("clear-text").and_then(|v| v.as_str()), Some("secret"));
        assert_eq!(values.len(), 1);
    }
}
