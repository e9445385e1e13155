use super::{address, require_non_empty};
use crate::commands::{CommandContext, OnlineCommand, add_resource};
use crate::error::WildflyError;
use crate::operations::{Address, Values};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Other,
    PasswordCredential,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Other => "Other",
            EntryType::PasswordCredential => "org.wildfly.security.credential.PasswordCredential",
        }
    }
}

/// 添加 `/subsystem=elytron/credential-store=<store>/alias=<name>`
#[derive(Debug, Clone)]
pub struct AddCredentialStoreAlias {
    name: String,
    credential_store: String,
    secret_value: String,
    entry_type: Option<EntryType>,
    replace_existing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AddCredentialStoreAliasBuilder {
    name: String,
    credential_store: Option<String>,
    secret_value: Option<String>,
    entry_type: Option<EntryType>,
    replace_existing: bool,
}

impl AddCredentialStoreAlias {
    pub fn builder(name: &str) -> AddCredentialStoreAliasBuilder {
        AddCredentialStoreAliasBuilder {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn address(&self) -> Address {
        address("credential-store", &self.credential_store).and("alias", &self.name)
    }
}

impl AddCredentialStoreAliasBuilder {
    pub fn credential_store(mut self, credential_store: &str) -> Self {
        self.credential_store = Some(credential_store.to_string());
        self
    }

    pub fn secret_value(mut self, secret_value: &str) -> Self {
        self.secret_value = Some(secret_value.to_string());
        self
    }

    pub fn entry_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn replace_existing(mut self) -> Self {
        self.replace_existing = true;
        self
    }

    pub fn build(self) -> Result<AddCredentialStoreAlias, WildflyError> {
        Ok(AddCredentialStoreAlias {
            name: require_non_empty(Some(self.name.as_str()), "Name of the credential-store alias")?,
            credential_store: require_non_empty(self.credential_store.as_deref(), "credential-store")?,
            secret_value: require_non_empty(self.secret_value.as_deref(), "secret-value")?,
            entry_type: self.entry_type,
            replace_existing: self.replace_existing,
        })
    }
}

impl OnlineCommand for AddCredentialStoreAlias {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        let params = Values::empty()
            .and("secret-value", self.secret_value.as_str())
            .and_optional("entry-type", self.entry_type.map(|t| t.as_str()));
        add_resource(ctx, &self.address(), params, self.replace_existing)
    }

    fn describe(&self) -> String {
        format!("Add alias {} to credential-store {}", self.name, self.credential_store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::elytron::test_support::elytron_server;
    use serde_json::json;

    #[test]
    fn test_build_requires_store_and_secret() {
        let err = AddCredentialStoreAlias::builder("db").secret_value("pw").build().unwrap_err();
        assert!(err.to_string().contains("credential-store"));

        let err = AddCredentialStoreAlias::builder("db").credential_store("cs").build().unwrap_err();
        assert!(err.to_string().contains("secret-value"));
    }

    #[test]
    fn test_alias_requires_existing_store() {
        let (server, client) = elytron_server();
        let command = AddCredentialStoreAlias::builder("db")
            .credential_store("cs")
            .secret_value("pw")
            .entry_type(EntryType::PasswordCredential)
            .build()
            .unwrap();

        assert!(client.apply_one(&command).unwrap_err().is_command_failure());

        server.add_resource(&address("credential-store", "cs"), Values::empty());
        client.apply_one(&command).unwrap();
        assert_eq!(
            server.attribute(&command.address(), "entry-type"),
            Some(json!("org.wildfly.security.credential.PasswordCredential"))
        );
    }
}
