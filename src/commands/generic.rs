use super::{CommandContext, OnlineCommand, add_resource};
use crate::error::WildflyError;
use crate::operations::{Address, Values};
use serde_json::Value;
use tracing::debug;

/// 添加带任意参数的资源
#[derive(Debug, Clone)]
pub struct AddResource {
    address: Address,
    params: Values,
    replace_existing: bool,
}

impl AddResource {
    pub fn new(address: Address, params: Values) -> Self {
        Self {
            address,
            params,
            replace_existing: false,
        }
    }

    /// 添加前先删除该地址上已有的资源
    pub fn replace_existing(mut self) -> Self {
        self.replace_existing = true;
        self
    }

    pub fn replace_existing_if(mut self, replace: bool) -> Self {
        self.replace_existing = replace;
        self
    }
}

impl OnlineCommand for AddResource {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        add_resource(ctx, &self.address, self.params.clone(), self.replace_existing)
    }

    fn describe(&self) -> String {
        format!("Add {}", self.address)
    }
}

#[derive(Debug, Clone)]
pub struct RemoveResource {
    address: Address,
    if_exists: bool,
}

impl RemoveResource {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            if_exists: false,
        }
    }

    /// 资源不存在时直接成功
    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn if_exists_when(mut self, if_exists: bool) -> Self {
        self.if_exists = if_exists;
        self
    }
}

impl OnlineCommand for RemoveResource {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        let ops = ctx.ops();
        if self.if_exists {
            let removed = ops.remove_if_exists(&self.address)?;
            debug!("Remove {}: removed={}", self.address, removed);
        } else {
            ops.remove(&self.address)?;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Remove {}", self.address)
    }
}

#[derive(Debug, Clone)]
pub struct WriteAttribute {
    address: Address,
    name: String,
    value: Value,
}

impl WriteAttribute {
    pub fn new(address: Address, name: &str, value: impl Into<Value>) -> Self {
        Self {
            address,
            name: name.to_string(),
            value: value.into(),
        }
    }
}

impl OnlineCommand for WriteAttribute {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        ctx.ops()
            .write_attribute(&self.address, &self.name, self.value.clone())?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Write {}@{}", self.name, self.address)
    }
}

#[derive(Debug, Clone)]
pub struct UndefineAttribute {
    address: Address,
    name: String,
}

impl UndefineAttribute {
    pub fn new(address: Address, name: &str) -> Self {
        Self {
            address,
            name: name.to_string(),
        }
    }
}

impl OnlineCommand for UndefineAttribute {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        ctx.ops().undefine_attribute(&self.address, &self.name)?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Undefine {}@{}", self.name, self.address)
    }
}

/// 仅在服务器报告 `reload-required` 时重载
#[derive(Debug, Clone, Copy, Default)]
pub struct ReloadIfRequired;

impl OnlineCommand for ReloadIfRequired {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        ctx.administration().reload_if_required()?;
        Ok(())
    }

    fn describe(&self) -> String {
        "Reload if required".to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reload;

impl OnlineCommand for Reload {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        ctx.administration().reload()
    }

    fn describe(&self) -> String {
        "Reload".to_string()
    }
}
