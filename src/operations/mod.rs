pub mod address;
pub mod admin;
pub mod operation;
pub mod result;
pub mod values;
pub mod version;

pub use address::Address;
pub use admin::{Administration, ReloadState};
pub use operation::Operation;
pub use result::ModelNodeResult;
pub use values::Values;
pub use version::ServerVersion;

use crate::client::ManagementClient;
use crate::error::WildflyError;
use operation::{
    ADD, READ_ATTRIBUTE, READ_CHILDREN_NAMES, READ_RESOURCE, REMOVE, UNDEFINE_ATTRIBUTE,
    WRITE_ATTRIBUTE,
};
use serde_json::Value;
use tracing::debug;

/// 基于管理客户端的增删改查。
///
/// 自身不保存状态，每次调用都构造并提交一个操作。
pub struct Operations<'a> {
    client: &'a dyn ManagementClient,
}

impl<'a> Operations<'a> {
    pub fn new(client: &'a dyn ManagementClient) -> Self {
        Self { client }
    }

    /// 构造并提交任意操作
    pub fn invoke(
        &self,
        operation: &str,
        address: &Address,
        params: Values,
    ) -> Result<ModelNodeResult, WildflyError> {
        let operation = Operation::new(operation, address, params)?;
        self.client.execute(&operation)
    }

    /// 只有服务器返回“不存在”时为 `false`，其他失败都返回错误
    pub fn exists(&self, address: &Address) -> Result<bool, WildflyError> {
        let operation = Operation::new(READ_RESOURCE, address, Values::empty())?;
        let result = {
            let _allowed = self.client.allow_failures();
            self.client.execute(&operation)?
        };
        if result.is_success() {
            return Ok(true);
        }
        if result.is_not_found() {
            return Ok(false);
        }
        Err(WildflyError::CommandFailed {
            operation: operation.to_string(),
            message: result
                .failure_description()
                .unwrap_or_else(|| result.as_string()),
        })
    }

    pub fn add(&self, address: &Address, params: Values) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(ADD, address, params)
    }

    /// 添加不带参数的资源
    pub fn add_empty(&self, address: &Address) -> Result<ModelNodeResult, WildflyError> {
        self.add(address, Values::empty())
    }

    pub fn remove(&self, address: &Address) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(REMOVE, address, Values::empty())
    }

    /// 资源存在时删除，返回是否删除了资源。
    ///
    /// 需要两次往返（先检查再删除）。期间另一个会话删除了该资源时，删除会失败。
    pub fn remove_if_exists(&self, address: &Address) -> Result<bool, WildflyError> {
        if !self.exists(address)? {
            debug!("{} does not exist, nothing to remove", address);
            return Ok(false);
        }
        let result = self.remove(address)?;
        if result.is_failed() {
            return Err(WildflyError::CommandFailed {
                operation: format!("{}:{}", address, REMOVE),
                message: result
                    .failure_description()
                    .unwrap_or_else(|| result.as_string()),
            });
        }
        Ok(true)
    }

    pub fn read_attribute(&self, address: &Address, name: &str) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(READ_ATTRIBUTE, address, Values::empty().and("name", name))
    }

    /// 同 `read_attribute`，未定义的属性返回默认值
    pub fn read_attribute_with_defaults(
        &self,
        address: &Address,
        name: &str,
    ) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(
            READ_ATTRIBUTE,
            address,
            Values::empty().and("name", name).and("include-defaults", true),
        )
    }

    pub fn read_children_names(
        &self,
        address: &Address,
        child_type: &str,
    ) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(
            READ_CHILDREN_NAMES,
            address,
            Values::empty().and("child-type", child_type),
        )
    }

    pub fn read_resource(&self, address: &Address, recursive: bool) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(
            READ_RESOURCE,
            address,
            Values::empty().and("recursive", recursive),
        )
    }

    pub fn write_attribute(
        &self,
        address: &Address,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(
            WRITE_ATTRIBUTE,
            address,
            Values::empty().and("name", name).and("value", value),
        )
    }

    pub fn undefine_attribute(&self, address: &Address, name: &str) -> Result<ModelNodeResult, WildflyError> {
        self.invoke(UNDEFINE_ATTRIBUTE, address, Values::empty().and("name", name))
    }
}
