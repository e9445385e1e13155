use super::{EXTENSION, SUBSYSTEM};
use crate::commands::{CommandContext, OnlineCommand};
use crate::error::WildflyError;
use crate::operations::{Address, ServerVersion};
use tracing::info;

/// 添加 Elytron 扩展（不存在时）和子系统
#[derive(Debug, Clone, Copy, Default)]
pub struct AddElytronSubsystem;

impl OnlineCommand for AddElytronSubsystem {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        // 管理接口 5.0.0（WildFly 11）之前没有 Elytron
        if ctx.version.less_than(ServerVersion::VERSION_5_0_0) {
            return Err(WildflyError::OperationFailed(format!(
                "Elytron subsystem requires management version {} or later, server is {}",
                ServerVersion::VERSION_5_0_0,
                ctx.version
            )));
        }
        let ops = ctx.ops();
        let extension = Address::extension(EXTENSION);
        if !ops.exists(&extension)? {
            ops.add_empty(&extension)?;
        }
        ops.add_empty(&Address::subsystem(SUBSYSTEM))?;
        ctx.administration().reload_if_required()?;
        info!("Elytron subsystem added");
        Ok(())
    }

    fn describe(&self) -> String {
        "Add elytron extension and subsystem".to_string()
    }
}

/// 依次删除子系统和扩展，不存在的部分跳过
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveElytronSubsystem;

impl OnlineCommand for RemoveElytronSubsystem {
    fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
        let ops = ctx.ops();
        ops.remove_if_exists(&Address::subsystem(SUBSYSTEM))?;
        ops.remove_if_exists(&Address::extension(EXTENSION))?;
        ctx.administration().reload_if_required()?;
        Ok(())
    }

    fn describe(&self) -> String {
        "Remove elytron subsystem and extension".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOptions, online};
    use crate::testing::InMemoryServer;
    use std::time::Duration;

    #[test]
    fn test_add_then_remove_subsystem() {
        let server = InMemoryServer::new().reload_required_on_remove("subsystem");
        let client = online(
            server.clone(),
            ClientOptions {
                reload_timeout: Duration::from_secs(5),
                poll_interval: Duration::from_millis(1),
            },
        );

        client.apply_one(&AddElytronSubsystem).unwrap();
        assert!(server.exists(&Address::extension(EXTENSION)));
        assert!(server.exists(&Address::subsystem(SUBSYSTEM)));

        client.apply_one(&RemoveElytronSubsystem).unwrap();
        assert!(!server.exists(&Address::subsystem(SUBSYSTEM)));
        assert!(!server.exists(&Address::extension(EXTENSION)));
        assert_eq!(server.reload_count(), 1);

        // 已经不存在，什么也不做
        client.apply_one(&RemoveElytronSubsystem).unwrap();
    }

    #[test]
    fn test_add_subsystem_rejects_old_server() {
        let server = InMemoryServer::new().with_version(ServerVersion::VERSION_4_0_0);
        let client = online(server.clone(), ClientOptions::default());
        server.clear_journal();

        let err = client.apply_one(&AddElytronSubsystem).unwrap_err();
        assert!(matches!(err, WildflyError::OperationFailed(_)));
        assert!(!server.exists(&Address::extension(EXTENSION)));
        // 只读取了版本号
        assert!(
            server
                .journal()
                .iter()
                .all(|request| request.contains("management-"))
        );
    }
}
