//! 通过在线客户端执行的可复用配置命令

pub mod elytron;
mod generic;

pub use generic::{AddResource, Reload, ReloadIfRequired, RemoveResource, UndefineAttribute, WriteAttribute};

use crate::client::ManagementClient;
use crate::error::WildflyError;
use crate::operations::{Address, Administration, Operations, ServerVersion, Values};
use tracing::debug;

/// 命令执行时的上下文
pub struct CommandContext<'a> {
    pub client: &'a dyn ManagementClient,
    pub version: ServerVersion,
}

impl<'a> CommandContext<'a> {
    pub fn new(client: &'a dyn ManagementClient, version: ServerVersion) -> Self {
        Self { client, version }
    }

    pub fn ops(&self) -> Operations<'a> {
        Operations::new(self.client)
    }

    pub fn administration(&self) -> Administration<'a> {
        Administration::new(self.client)
    }
}

/// 针对运行中服务器的一项配置工作
pub trait OnlineCommand {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError>;

    /// 日志中使用的简短描述
    fn describe(&self) -> String;
}

/// 添加资源；设置 `replace_existing` 时先删除已有资源。
///
/// 删除可能使服务器进入 `reload-required`，因此在添加前先重载。
/// 结果只包含 `params`，旧资源的内容不会保留。
pub fn add_resource(
    ctx: &CommandContext<'_>,
    address: &Address,
    params: Values,
    replace_existing: bool,
) -> Result<(), WildflyError> {
    let ops = ctx.ops();
    if replace_existing {
        if ops.remove_if_exists(address)? {
            debug!("Removed existing {} before adding it again", address);
        }
        ctx.administration().reload_if_required()?;
    }
    ops.add(address, params)?;
    Ok(())
}
