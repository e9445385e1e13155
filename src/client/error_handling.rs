use super::{ClientOptions, FailuresAllowed, ManagementClient};
use crate::commands::{CommandContext, OnlineCommand};
use crate::error::WildflyError;
use crate::operations::{ModelNodeResult, Operation, ServerVersion};
use std::cell::Cell;
use std::time::Duration;
use tracing::{info, warn};

/// 把失败的结果转换为 [`WildflyError::CommandFailed`]，
/// [`allow_failures`](ManagementClient::allow_failures) 作用域内除外
pub struct ErrorHandlingClient<C: ManagementClient> {
    delegate: C,
    throw_on_failures: Cell<bool>,
}

impl<C: ManagementClient> ErrorHandlingClient<C> {
    pub fn new(delegate: C) -> Self {
        Self {
            delegate,
            throw_on_failures: Cell::new(true),
        }
    }

    /// 当前失败结果是否会转换为错误
    pub fn throws_on_failures(&self) -> bool {
        self.throw_on_failures.get()
    }

    /// 按顺序执行命令，第一个错误会中止后续命令。已执行的命令不会回滚。
    pub fn apply<'c, I>(&self, commands: I) -> Result<(), WildflyError>
    where
        I: IntoIterator<Item = &'c dyn OnlineCommand>,
    {
        let version = self.version()?;
        let ctx = CommandContext::new(self, version);
        for (index, command) in commands.into_iter().enumerate() {
            info!("Applying command #{}: {}", index + 1, command.describe());
            if let Err(e) = command.apply(&ctx) {
                warn!("Command '{}' failed: {}", command.describe(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn apply_one(&self, command: &dyn OnlineCommand) -> Result<(), WildflyError> {
        self.apply([command])
    }
}

impl<C: ManagementClient> ManagementClient for ErrorHandlingClient<C> {
    fn execute(&self, operation: &Operation) -> Result<ModelNodeResult, WildflyError> {
        let result = self.delegate.execute(operation)?;
        if result.is_failed() && self.throw_on_failures.get() {
            return Err(WildflyError::CommandFailed {
                operation: operation.to_string(),
                message: result
                    .failure_description()
                    .unwrap_or_else(|| result.as_string()),
            });
        }
        Ok(result)
    }

    fn reconnect(&self, timeout: Duration) -> Result<(), WildflyError> {
        self.delegate.reconnect(timeout)
    }

    fn allow_failures(&self) -> FailuresAllowed<'_> {
        FailuresAllowed::suppress(&self.throw_on_failures)
    }

    fn version(&self) -> Result<ServerVersion, WildflyError> {
        self.delegate.version()
    }

    fn options(&self) -> ClientOptions {
        self.delegate.options()
    }
}
