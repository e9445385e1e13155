use super::{CredentialRef, address, require_non_empty};
use crate::commands::{CommandContext, OnlineCommand, add_resource};
use crate::error::WildflyError;
use crate::operations::{Address, Values};

/// 添加 `/subsystem=elytron/key-store=<name>`
#[derive(Debug, Clone)]
pub struct AddKeyStore {
    name: String,
    params: Values,
    replace_existing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AddKeyStoreBuilder {
    name: String,
    key_store_type: Option<String>,
    provider_name: Option<String>,
    providers: Option<String>,
    alias_filter: Option<String>,
    path: Option<String>,
    relative_to: Option<String>,
    required: Option<bool>,
    credential_reference: Option<CredentialRef>,
    replace_existing: bool,
}

impl AddKeyStore {
    pub fn builder(name: &str) -> AddKeyStoreBuilder {
        AddKeyStoreBuilder {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn address(&self) -> Address {
        address("key-store", &self.name)
    }
}

impl AddKeyStoreBuilder {
    /// 密钥库格式，例如 `JKS` 或 `PKCS12`
    pub fn key_store_type(mut self, key_store_type: &str) -> Self {
        self.key_store_type = Some(key_store_type.to_string());
        self
    }

    pub fn provider_name(mut self, provider_name: &str) -> Self {
        self.provider_name = Some(provider_name.to_string());
        self
    }

    pub fn providers(mut self, providers: &str) -> Self {
        self.providers = Some(providers.to_string());
        self
    }

    pub fn alias_filter(mut self, alias_filter: &str) -> Self {
        self.alias_filter = Some(alias_filter.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.path = Some(path.to_string());
        self
    }

    pub fn relative_to(mut self, relative_to: &str) -> Self {
        self.relative_to = Some(relative_to.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn credential_reference(mut self, credential_reference: CredentialRef) -> Self {
        self.credential_reference = Some(credential_reference);
        self
    }

    pub fn replace_existing(mut self) -> Self {
        self.replace_existing = true;
        self
    }

    pub fn build(self) -> Result<AddKeyStore, WildflyError> {
        let name = require_non_empty(Some(self.name.as_str()), "Name of the key-store")?;
        let key_store_type = require_non_empty(self.key_store_type.as_deref(), "Type of the key-store")?;
        if self.relative_to.is_some() && self.path.is_none() {
            return Err(WildflyError::Validation(
                "relative-to requires path to be set".to_string(),
            ));
        }

        let params = Values::empty()
            .and("type", key_store_type)
            .and_optional("provider-name", self.provider_name)
            .and_optional("providers", self.providers)
            .and_optional("alias-filter", self.alias_filter)
            .and_optional("path", self.path)
            .and_optional("relative-to", self.relative_to)
            .and_optional("required", self.required)
            .and_object_optional(
                "credential-reference",
                self.credential_reference.as_ref().map(CredentialRef::to_values),
            );

        Ok(AddKeyStore {
            name,
            params,
            replace_existing: self.replace_existing,
        })
    }
}

impl OnlineCommand for AddKeyStore {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        add_resource(ctx, &self.address(), self.params.clone(), self.replace_existing)
    }

    fn describe(&self) -> String {
        format!("Add key-store {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::elytron::test_support::elytron_server;
    use serde_json::json;

    #[test]
    fn test_build_requires_name_and_type() {
        let err = AddKeyStore::builder("").key_store_type("JKS").build().unwrap_err();
        assert!(matches!(err, WildflyError::Validation(_)));

        let err = AddKeyStore::builder("ks").build().unwrap_err();
        assert!(err.to_string().contains("Type of the key-store"));

        let err = AddKeyStore::builder("ks")
            .key_store_type("JKS")
            .relative_to("jboss.server.config.dir")
            .build()
            .unwrap_err();
        assert!(matches!(err, WildflyError::Validation(_)));
    }

    #[test]
    fn test_add_key_store() {
        let (server, client) = elytron_server();
        let command = AddKeyStore::builder("server-ks")
            .key_store_type("PKCS12")
            .path("server.p12")
            .relative_to("jboss.server.config.dir")
            .credential_reference(CredentialRef::clear_text("secret"))
            .build()
            .unwrap();

        client.apply_one(&command).unwrap();

        let stored = server.attributes(&command.address()).unwrap();
        assert_eq!(stored.get("type"), Some(&json!("PKCS12")));
        assert_eq!(stored.get("credential-reference"), Some(&json!({"clear-text": "secret"})));
        assert!(!stored.contains_key("required"));
    }

    #[test]
    fn test_replace_existing_key_store_waits_for_reload() {
        let (server, client) = elytron_server();
        let server = server.reload_required_on_remove("key-store");
        let first = AddKeyStore::builder("ks").key_store_type("JKS").path("a.jks").build().unwrap();
        client.apply_one(&first).unwrap();

        let second = AddKeyStore::builder("ks")
            .key_store_type("PKCS12")
            .replace_existing()
            .build()
            .unwrap();
        client.apply_one(&second).unwrap();

        let stored = server.attributes(&second.address()).unwrap();
        assert_eq!(stored.get("type"), Some(&json!("PKCS12")));
        assert!(!stored.contains_key("path"));
        assert_eq!(server.reload_count(), 1);
    }
}
