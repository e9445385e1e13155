use super::operation::RELOAD;
use super::{Address, Operation, Operations, Values};
use crate::client::ManagementClient;
use crate::error::WildflyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 服务器根节点报告的 `server-state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReloadState {
    Running,
    ReloadRequired,
    RestartRequired,
    /// `starting`、`stopping` 等过渡状态
    Other(String),
}

impl ReloadState {
    pub fn parse(state: &str) -> Self {
        match state {
            "running" => Self::Running,
            "reload-required" => Self::ReloadRequired,
            "restart-required" => Self::RestartRequired,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::ReloadRequired => write!(f, "reload-required"),
            Self::RestartRequired => write!(f, "restart-required"),
            Self::Other(state) => write!(f, "{}", state),
        }
    }
}

/// 重载协调。每次调用都重新读取服务器状态，不做缓存。
pub struct Administration<'a> {
    client: &'a dyn ManagementClient,
}

impl<'a> Administration<'a> {
    pub fn new(client: &'a dyn ManagementClient) -> Self {
        Self { client }
    }

    pub fn reload_state(&self) -> Result<ReloadState, WildflyError> {
        let result = Operations::new(self.client).read_attribute(&Address::root(), "server-state")?;
        result.assert_success("Reading server-state failed")?;
        let state = result
            .string_value()
            .ok_or_else(|| WildflyError::Parse("server-state is undefined".to_string()))?;
        Ok(ReloadState::parse(&state))
    }

    pub fn is_reload_required(&self) -> Result<bool, WildflyError> {
        Ok(self.reload_state()? == ReloadState::ReloadRequired)
    }

    pub fn is_restart_required(&self) -> Result<bool, WildflyError> {
        Ok(self.reload_state()? == ReloadState::RestartRequired)
    }

    /// 服务器需要时重载，返回是否执行了重载。
    ///
    /// 处于 restart-required 的服务器返回 [`WildflyError::RestartRequired`]，不会尝试重启。
    pub fn reload_if_required(&self) -> Result<bool, WildflyError> {
        match self.reload_state()? {
            ReloadState::ReloadRequired => {
                info!("Server is in reload-required state, reloading");
                self.reload()?;
                Ok(true)
            }
            ReloadState::RestartRequired => {
                warn!("Server is in restart-required state, which a reload cannot resolve");
                Err(WildflyError::RestartRequired(
                    "server-state is restart-required; restart the server before continuing".to_string(),
                ))
            }
            state => {
                debug!("No reload needed, server-state is {}", state);
                Ok(false)
            }
        }
    }

    /// 无条件重载，并阻塞到服务器重新运行
    pub fn reload(&self) -> Result<(), WildflyError> {
        let operation = Operation::new(RELOAD, &Address::root(), Values::empty())?;
        info!("Reloading server");
        match self.client.execute(&operation) {
            Ok(result) => result.assert_success("Reload failed")?,
            // 服务器可能在应答前断开连接
            Err(e) if e.is_transport() => debug!("Connection dropped while issuing reload: {}", e),
            Err(e) => return Err(e),
        }
        self.wait_until_running(self.client.options().reload_timeout)?;
        info!("Server reloaded");
        Ok(())
    }

    /// 轮询直到 `server-state` 为 `running`，必要时重连
    pub fn wait_until_running(&self, timeout: Duration) -> Result<(), WildflyError> {
        let started = Instant::now();
        let poll_interval = self.client.options().poll_interval;
        let timed_out = || WildflyError::Timeout {
            what: "the server to reach running state".to_string(),
            timeout_secs: timeout.as_secs(),
        };

        loop {
            let remaining = timeout.checked_sub(started.elapsed()).ok_or_else(timed_out)?;
            self.client.reconnect(remaining)?;

            match self.poll_state() {
                Ok(Some(ReloadState::Running)) => return Ok(()),
                Ok(Some(state)) => debug!("Waiting for running state, currently {}", state),
                Ok(None) => {}
                Err(e) if e.is_transport() => debug!("Server not reachable yet: {}", e),
                Err(e) => return Err(e),
            }

            if started.elapsed() >= timeout {
                return Err(timed_out());
            }
            thread::sleep(poll_interval);
        }
    }

    /// 读取 `server-state`；服务器仍在启动时会返回失败结果，此时返回 `None`
    fn poll_state(&self) -> Result<Option<ReloadState>, WildflyError> {
        let result = {
            let _allowed = self.client.allow_failures();
            Operations::new(self.client).read_attribute(&Address::root(), "server-state")?
        };
        if result.is_failed() {
            debug!(
                "Server not ready yet: {}",
                result.failure_description().unwrap_or_else(|| result.as_string())
            );
            return Ok(None);
        }
        Ok(result.string_value().map(|state| ReloadState::parse(&state)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ClientOptions, OnlineManagementClient, online};
    use crate::testing::InMemoryServer;

    fn client(server: &InMemoryServer, reload_timeout: Duration) -> OnlineManagementClient {
        online(
            server.clone(),
            ClientOptions {
                reload_timeout,
                poll_interval: Duration::from_millis(1),
            },
        )
    }

    #[test]
    fn test_reload_state_parse() {
        assert_eq!(ReloadState::parse("running"), ReloadState::Running);
        assert_eq!(ReloadState::parse("reload-required"), ReloadState::ReloadRequired);
        assert_eq!(ReloadState::parse("restart-required"), ReloadState::RestartRequired);
        assert_eq!(ReloadState::parse("starting"), ReloadState::Other("starting".to_string()));
        assert_eq!(ReloadState::ReloadRequired.to_string(), "reload-required");
    }

    #[test]
    fn test_reload_keeps_polling_while_server_boots() {
        let server = InMemoryServer::new();
        server.fail_operation_times(
            "read-attribute",
            &Address::root(),
            "WFLYCTL0379: System boot is in process; execution of remote management operations is not currently available",
            2,
        );
        let client = client(&server, Duration::from_secs(5));

        Administration::new(&client).reload().unwrap();

        assert_eq!(server.reload_count(), 1);
        // 两次失败的读取之后才读到 running
        let reads = server
            .journal()
            .iter()
            .filter(|request| request.contains("server-state"))
            .count();
        assert_eq!(reads, 3);
    }

    #[test]
    fn test_wait_times_out_while_server_keeps_failing() {
        let server = InMemoryServer::new();
        server.fail_operation("read-attribute", &Address::root(), "WFLYCTL0379: System boot is in process");
        let client = client(&server, Duration::from_millis(30));

        let err = Administration::new(&client)
            .wait_until_running(Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, WildflyError::Timeout { .. }));
    }

    #[test]
    fn test_restart_required_state() {
        let server = InMemoryServer::new();
        let client = client(&server, Duration::from_secs(5));
        let admin = Administration::new(&client);
        assert!(!admin.is_restart_required().unwrap());

        server.set_server_state(ReloadState::RestartRequired);
        assert!(admin.is_restart_required().unwrap());
        assert!(!admin.is_reload_required().unwrap());
    }
}
