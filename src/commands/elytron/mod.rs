//! 部分 Elytron 资源的构建器。
//!
//! 构建器在 `build()` 中校验字段，早于任何请求。

mod credential_ref;
mod credential_store;
mod key_store;
mod name_rewriter;
mod security_property;
mod subsystem;

pub use credential_ref::CredentialRef;
pub use credential_store::{AddCredentialStoreAlias, AddCredentialStoreAliasBuilder, EntryType};
pub use key_store::{AddKeyStore, AddKeyStoreBuilder};
pub use name_rewriter::{
    AddAggregateNameRewriter, AddAggregateNameRewriterBuilder, AddChainedNameRewriter,
    AddChainedNameRewriterBuilder, NameRewriterOptions,
};
pub use security_property::AddSecurityProperty;
pub use subsystem::{AddElytronSubsystem, RemoveElytronSubsystem};

use crate::error::WildflyError;
use crate::operations::Address;

pub const SUBSYSTEM: &str = "elytron";
pub const EXTENSION: &str = "org.wildfly.extension.elytron";

/// `/subsystem=elytron/<resource_type>=<name>`
pub fn address(resource_type: &str, name: &str) -> Address {
    Address::subsystem(SUBSYSTEM).and(resource_type, name)
}

fn require_non_empty(value: Option<&str>, what: &str) -> Result<String, WildflyError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(WildflyError::Validation(format!(
            "{} must be specified as non empty value",
            what
        ))),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::client::{ClientOptions, OnlineManagementClient, online};
    use crate::operations::Values;
    use crate::testing::InMemoryServer;
    use std::time::Duration;

    /// 带空 elytron 子系统的服务器及其客户端
    pub fn elytron_server() -> (InMemoryServer, OnlineManagementClient) {
        let server = InMemoryServer::new();
        server.add_resource(&super::Address::subsystem(super::SUBSYSTEM), Values::empty());
        let client = online(
            server.clone(),
            ClientOptions {
                reload_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(1),
            },
        );
        (server, client)
    }
}
