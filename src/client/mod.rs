mod error_handling;
mod raw;

pub use error_handling::ErrorHandlingClient;
pub use raw::RawClient;

use crate::error::WildflyError;
use crate::operations::{ModelNodeResult, Operation, ServerVersion};
use crate::transport::Transport;
use crate::types::ManagementOptions;
use std::cell::Cell;
use std::time::Duration;

/// 等待服务器时使用的客户端超时设置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientOptions {
    pub reload_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ManagementOptions::default().into()
    }
}

impl From<&ManagementOptions> for ClientOptions {
    fn from(options: &ManagementOptions) -> Self {
        Self {
            reload_timeout: options.reload_timeout(),
            poll_interval: options.poll_interval(),
        }
    }
}

impl From<ManagementOptions> for ClientOptions {
    fn from(options: ManagementOptions) -> Self {
        (&options).into()
    }
}

/// 到一台服务器管理接口的会话。
///
/// 实现独占自己的会话，只在一个线程中使用：一个操作应答后才提交下一个。
pub trait ManagementClient {
    /// 提交一个操作。失败结果以 `Ok` 数据还是 `Err(CommandFailed)` 返回，取决于实现和当前模式。
    fn execute(&self, operation: &Operation) -> Result<ModelNodeResult, WildflyError>;

    /// 重新建立连接，轮询直到 `timeout` 用完
    fn reconnect(&self, timeout: Duration) -> Result<(), WildflyError>;

    /// 返回的 guard 存活期间，失败结果作为数据返回
    fn allow_failures(&self) -> FailuresAllowed<'_>;

    fn version(&self) -> Result<ServerVersion, WildflyError>;

    fn options(&self) -> ClientOptions;
}

/// 失败的操作不会转换为错误的作用域。
///
/// 释放时恢复创建时的模式，因此可以嵌套。
#[must_use = "failures are only allowed while the guard is alive"]
pub struct FailuresAllowed<'a> {
    restore: Option<(&'a Cell<bool>, bool)>,
}

impl<'a> FailuresAllowed<'a> {
    pub(crate) fn suppress(throw_on_failures: &'a Cell<bool>) -> Self {
        let previous = throw_on_failures.replace(false);
        Self {
            restore: Some((throw_on_failures, previous)),
        }
    }

    /// 用于本来就不会因失败结果报错的客户端
    pub(crate) fn noop() -> Self {
        Self { restore: None }
    }
}

impl Drop for FailuresAllowed<'_> {
    fn drop(&mut self) {
        if let Some((flag, previous)) = self.restore.take() {
            flag.set(previous);
        }
    }
}

/// 常用组合：带自动错误处理的原始客户端
pub type OnlineManagementClient = ErrorHandlingClient<RawClient<Box<dyn Transport>>>;

/// 基于任意传输构造 [`OnlineManagementClient`]
pub fn online<T: Transport + 'static>(transport: T, options: ClientOptions) -> OnlineManagementClient {
    let transport: Box<dyn Transport> = Box::new(transport);
    ErrorHandlingClient::new(RawClient::new(transport, options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failures_allowed_restores_previous_mode() {
        let flag = Cell::new(true);
        {
            let _outer = FailuresAllowed::suppress(&flag);
            assert!(!flag.get());
            {
                let _inner = FailuresAllowed::suppress(&flag);
                assert!(!flag.get());
            }
            // 内层作用域恢复的是外层的模式，而不是默认模式
            assert!(!flag.get());
        }
        assert!(flag.get());
    }

    #[test]
    fn test_client_options_from_management_options() {
        let management = ManagementOptions {
            reload_timeout_secs: 5,
            poll_interval_millis: 20,
            ..Default::default()
        };
        let options = ClientOptions::from(&management);
        assert_eq!(options.reload_timeout, Duration::from_secs(5));
        assert_eq!(options.poll_interval, Duration::from_millis(20));
    }
}
