use super::{ClientOptions, FailuresAllowed, ManagementClient};
use crate::error::WildflyError;
use crate::operations::operation::READ_ATTRIBUTE;
use crate::operations::{Address, ModelNodeResult, Operation, ServerVersion, Values};
use crate::transport::Transport;
use std::cell::{OnceCell, RefCell};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 把传输层响应转换为 [`ModelNodeResult`]，失败结果总是作为数据返回
pub struct RawClient<T: Transport> {
    transport: RefCell<T>,
    options: ClientOptions,
    version: OnceCell<ServerVersion>,
}

impl<T: Transport> RawClient<T> {
    pub fn new(transport: T, options: ClientOptions) -> Self {
        Self {
            transport: RefCell::new(transport),
            options,
            version: OnceCell::new(),
        }
    }

    /// 关闭底层连接；丢弃客户端时也会调用，可重复调用
    pub fn close(&self) -> Result<(), WildflyError> {
        self.transport.borrow_mut().close()
    }

    fn read_version_part(&self, attribute: &str) -> Result<u32, WildflyError> {
        let operation = Operation::new(
            READ_ATTRIBUTE,
            &Address::root(),
            Values::empty().and("name", attribute),
        )?;
        let result = self.execute(&operation)?;
        result.assert_success(&format!("Reading {} failed", attribute))?;
        let value = result.int_value().ok_or_else(|| {
            WildflyError::Parse(format!("{} is not a number: {}", attribute, result.as_string()))
        })?;
        u32::try_from(value)
            .map_err(|_| WildflyError::Parse(format!("{} out of range: {}", attribute, value)))
    }
}

impl<T: Transport> ManagementClient for RawClient<T> {
    fn execute(&self, operation: &Operation) -> Result<ModelNodeResult, WildflyError> {
        debug!("Executing {}", operation);
        let response = self.transport.borrow_mut().submit(operation)?;
        let result = ModelNodeResult::from_response(response);
        if result.is_failed() {
            debug!(
                "Operation {} failed: {}",
                operation,
                result.failure_description().unwrap_or_default()
            );
        }
        Ok(result)
    }

    fn reconnect(&self, timeout: Duration) -> Result<(), WildflyError> {
        let started = Instant::now();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let budget = timeout.saturating_sub(started.elapsed());
            match self.transport.borrow_mut().reconnect(budget) {
                Ok(()) => {
                    info!("Reconnected after {} attempt(s)", attempt);
                    return Ok(());
                }
                Err(e) => {
                    debug!("Reconnect attempt {} failed: {}", attempt, e);
                }
            }
            if started.elapsed() >= timeout {
                warn!("Giving up reconnecting after {} attempt(s)", attempt);
                return Err(WildflyError::Timeout {
                    what: "the server to become reachable".to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }
            thread::sleep(self.options.poll_interval);
        }
    }

    fn allow_failures(&self) -> FailuresAllowed<'_> {
        FailuresAllowed::noop()
    }

    fn version(&self) -> Result<ServerVersion, WildflyError> {
        if let Some(version) = self.version.get() {
            return Ok(*version);
        }
        let version = ServerVersion::new(
            self.read_version_part("management-major-version")?,
            self.read_version_part("management-minor-version")?,
            self.read_version_part("management-micro-version")?,
        );
        debug!("Server management version is {}", version);
        Ok(*self.version.get_or_init(|| version))
    }

    fn options(&self) -> ClientOptions {
        self.options
    }
}

impl<T: Transport> Drop for RawClient<T> {
    fn drop(&mut self) {
        if let Err(e) = self.transport.get_mut().close() {
            warn!("Failed to close connection: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryServer;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// 每次重连都失败，并记录收到的预算
    #[derive(Clone, Default)]
    struct Unreachable {
        budgets: Arc<Mutex<Vec<Duration>>>,
    }

    impl Transport for Unreachable {
        fn submit(&mut self, _operation: &Operation) -> Result<Value, WildflyError> {
            Err(WildflyError::Transport("Connection refused".to_string()))
        }

        fn reconnect(&mut self, budget: Duration) -> Result<(), WildflyError> {
            self.budgets.lock().unwrap().push(budget);
            thread::sleep(Duration::from_millis(5));
            Err(WildflyError::Transport("Connection refused".to_string()))
        }
    }

    fn options() -> ClientOptions {
        ClientOptions {
            reload_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_reconnect_passes_remaining_budget() {
        let transport = Unreachable::default();
        let client = RawClient::new(transport.clone(), options());
        let timeout = Duration::from_millis(40);

        let err = client.reconnect(timeout).unwrap_err();
        assert!(matches!(err, WildflyError::Timeout { .. }));

        let budgets = transport.budgets.lock().unwrap().clone();
        assert!(budgets.len() > 1);
        assert!(budgets.iter().all(|budget| *budget <= timeout));
        // 预算随已用时间递减
        assert!(budgets.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn test_dropping_client_closes_transport() {
        let server = InMemoryServer::new();
        {
            let client = RawClient::new(server.clone(), options());
            client.version().unwrap();
            assert_eq!(server.close_count(), 0);
        }
        assert_eq!(server.close_count(), 1);
    }
}
