use super::{address, require_non_empty};
use crate::commands::{CommandContext, OnlineCommand, add_resource};
use crate::error::WildflyError;
use crate::operations::{Address, Values};

/// 添加 `/subsystem=elytron/security-property=<key>`
#[derive(Debug, Clone)]
pub struct AddSecurityProperty {
    key: String,
    value: String,
    replace_existing: bool,
}

impl AddSecurityProperty {
    pub fn new(key: &str, value: &str) -> Result<Self, WildflyError> {
        Ok(Self {
            key: require_non_empty(Some(key), "Key of the security-property")?,
            value: require_non_empty(Some(value), "Value of the security-property")?,
            replace_existing: false,
        })
    }

    pub fn replace_existing(mut self) -> Self {
        self.replace_existing = true;
        self
    }

    pub fn address(&self) -> Address {
        address("security-property", &self.key)
    }
}

impl OnlineCommand for AddSecurityProperty {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        let params = Values::empty().and("value", self.value.as_str());
        add_resource(ctx, &self.address(), params, self.replace_existing)
    }

    fn describe(&self) -> String {
        format!("Add security-property {}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::elytron::test_support::elytron_server;
    use serde_json::json;

    #[test]
    fn test_empty_key_or_value_rejected() {
        assert!(AddSecurityProperty::new("", "v").is_err());
        assert!(AddSecurityProperty::new("k", " ").is_err());
    }

    #[test]
    fn test_replace_existing_property() {
        let (server, client) = elytron_server();
        let first = AddSecurityProperty::new("jdk.tls.disabledAlgorithms", "SSLv3").unwrap();
        let second = AddSecurityProperty::new("jdk.tls.disabledAlgorithms", "SSLv3, RC4")
            .unwrap()
            .replace_existing();

        client.apply_one(&first).unwrap();
        client.apply_one(&second).unwrap();

        assert_eq!(
            server.attribute(&second.address(), "value"),
            Some(json!("SSLv3, RC4"))
        );
        // 不需要重载，所以没有重载
        assert_eq!(server.reload_count(), 0);
    }
}
