use crate::client::{ClientOptions, ErrorHandlingClient, OnlineManagementClient, RawClient};
use crate::config::{InventoryConfig, ServerConfig};
use crate::error::WildflyError;
use crate::executor::{Plan, PlanExecutor, PlanResult};
use crate::operations::Administration;
use crate::transport::{SshCliTransport, Transport};
use crate::types::HostConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, info};

/// 打开到指定服务器的传输
pub type Connector =
    Arc<dyn Fn(&str, &ServerConfig) -> Result<Box<dyn Transport>, WildflyError> + Send + Sync>;

/// 通过 SSH 和 `jboss-cli.sh` 连接
pub fn ssh_connector() -> Connector {
    Arc::new(|_name: &str, config: &ServerConfig| {
        let transport = SshCliTransport::connect(config.ssh.clone(), config.management.clone())?;
        Ok(Box::new(transport) as Box<dyn Transport>)
    })
}

/// 并发管理多台服务器。每台服务器在自己的阻塞工作线程上使用独立会话，
/// 会话不会在服务器或任务之间共享。
pub struct ServerManager {
    servers: HashMap<String, ServerConfig>,
    max_concurrent_connections: usize,
    connector: Connector,
}

#[derive(Debug, Serialize, Default)]
pub struct BatchResult<T> {
    pub results: HashMap<String, Result<T, WildflyError>>,
    pub successful: Vec<String>,
    pub failed: Vec<String>,
}

impl<T> BatchResult<T> {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            successful: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn add_result(&mut self, server: String, result: Result<T, WildflyError>) {
        match result {
            Ok(_) => self.successful.push(server.clone()),
            Err(_) => self.failed.push(server.clone()),
        }
        self.results.insert(server, result);
    }

    pub fn success_rate(&self) -> f32 {
        if self.results.is_empty() {
            return 0.0;
        }
        self.successful.len() as f32 / self.results.len() as f32
    }

    /// 所有失败服务器的 `(服务器, 错误信息)`，按名称排序
    pub fn failures(&self) -> Vec<(String, String)> {
        let mut failures: Vec<(String, String)> = self
            .results
            .iter()
            .filter_map(|(server, result)| {
                result.as_ref().err().map(|e| (server.clone(), e.to_string()))
            })
            .collect();
        failures.sort();
        failures
    }
}

impl Default for ServerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerManager {
    pub fn new() -> Self {
        Self {
            servers: HashMap::new(),
            max_concurrent_connections: 10,
            connector: ssh_connector(),
        }
    }

    pub fn from_inventory(inventory: &InventoryConfig) -> Self {
        let mut manager = Self::new();
        for (name, config) in &inventory.servers {
            manager.add_server(name, config.clone());
        }
        manager
    }

    pub fn with_max_concurrent_connections(mut self, max_connections: usize) -> Self {
        self.max_concurrent_connections = max_connections.max(1);
        self
    }

    /// 替换会话的打开方式，例如换成内存服务器
    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    pub fn max_concurrent_connections(&self) -> usize {
        self.max_concurrent_connections
    }

    pub fn add_server(&mut self, name: &str, config: ServerConfig) {
        self.servers.insert(name.to_string(), config);
    }

    pub fn remove_server(&mut self, name: &str) -> Option<ServerConfig> {
        self.servers.remove(name)
    }

    pub fn get_server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }

    pub fn list_servers(&self) -> Vec<&String> {
        self.servers.keys().collect()
    }

    /// 在当前线程上打开到单台服务器的客户端
    pub fn connect(&self, name: &str) -> Result<OnlineManagementClient, WildflyError> {
        let config = self
            .servers
            .get(name)
            .ok_or_else(|| WildflyError::Validation(format!("Server {} not found", name)))?;
        open_client(&self.connector, name, config)
    }

    /// 在每台服务器上独立执行计划。计划在某一步停止的服务器记为失败。
    pub async fn apply_plan(&self, plan: &Plan, server_names: &[String]) -> BatchResult<PlanResult> {
        let plan = plan.clone();
        self.execute_concurrent_operation(server_names, move |client| {
            let result = PlanExecutor::new(client).execute(&plan);
            match result.failed_step() {
                None => Ok(result),
                Some(step) => Err(WildflyError::OperationFailed(format!(
                    "plan '{}' stopped at step '{}': {:?}",
                    result.plan_name, step.name, step.status
                ))),
            }
        })
        .await
    }

    /// 重载列表中处于 `reload-required` 的服务器
    pub async fn reload_if_required(&self, server_names: &[String]) -> BatchResult<bool> {
        self.execute_concurrent_operation(server_names, |client| {
            Administration::new(client).reload_if_required()
        })
        .await
    }

    /// 在每台服务器的独立会话上执行 `operation`，
    /// 同时最多 `max_concurrent_connections` 个
    pub async fn execute_concurrent_operation<T, F>(
        &self,
        server_names: &[String],
        operation: F,
    ) -> BatchResult<T>
    where
        T: Send + 'static,
        F: Fn(&OnlineManagementClient) -> Result<T, WildflyError> + Send + Sync + Clone + 'static,
    {
        let mut result = BatchResult::new();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_connections));
        let mut handles = Vec::new();

        info!(
            "Starting operation on {} server(s) with max {} concurrent connections",
            server_names.len(),
            self.max_concurrent_connections
        );

        for server_name in server_names {
            let Some(config) = self.servers.get(server_name) else {
                result.add_result(
                    server_name.clone(),
                    Err(WildflyError::Validation(format!("Server {} not found", server_name))),
                );
                continue;
            };

            let config = config.clone();
            let name = server_name.clone();
            let semaphore = semaphore.clone();
            let operation = operation.clone();
            let connector = self.connector.clone();

            let handle = task::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (name, Err(WildflyError::Transport(e.to_string()))),
                };
                debug!("Connection slot acquired for server: {}", name);

                let worker_name = name.clone();
                let outcome = task::spawn_blocking(move || {
                    let client = open_client(&connector, &worker_name, &config)?;
                    operation(&client)
                })
                .await
                .unwrap_or_else(|e| Err(WildflyError::Transport(format!("Worker failed: {}", e))));
                (name, outcome)
            });
            handles.push(handle);
        }

        for handle in handles {
            if let Ok((server_name, outcome)) = handle.await {
                result.add_result(server_name, outcome);
            }
        }

        info!(
            "Operation completed. Success rate: {:.2}%",
            result.success_rate() * 100.0
        );
        result
    }

    pub fn host_builder() -> HostConfigBuilder {
        HostConfigBuilder::new()
    }
}

fn open_client(
    connector: &Connector,
    name: &str,
    config: &ServerConfig,
) -> Result<OnlineManagementClient, WildflyError> {
    let transport = connector(name, config)?;
    let options = ClientOptions::from(&config.management);
    Ok(ErrorHandlingClient::new(RawClient::new(transport, options)))
}

#[derive(Default)]
pub struct HostConfigBuilder {
    config: HostConfig,
}

impl HostConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hostname(mut self, hostname: &str) -> Self {
        self.config.hostname = hostname.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn username(mut self, username: &str) -> Self {
        self.config.username = username.to_string();
        self
    }

    pub fn password(mut self, password: &str) -> Self {
        self.config.password = Some(password.to_string());
        self
    }

    pub fn private_key_path(mut self, path: &str) -> Self {
        self.config.private_key_path = Some(path.to_string());
        self
    }

    pub fn passphrase(mut self, passphrase: &str) -> Self {
        self.config.passphrase = Some(passphrase.to_string());
        self
    }

    pub fn build(self) -> HostConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::{Address, ReloadState};
    use crate::testing::InMemoryServer;
    use crate::types::ManagementOptions;

    fn manager_with(servers: &[(&str, InMemoryServer)]) -> ServerManager {
        let backends: HashMap<String, InMemoryServer> = servers
            .iter()
            .map(|(name, server)| (name.to_string(), server.clone()))
            .collect();
        let connector: Connector = Arc::new(move |name: &str, _config: &ServerConfig| {
            backends
                .get(name)
                .cloned()
                .map(|server| Box::new(server) as Box<dyn Transport>)
                .ok_or_else(|| WildflyError::SshConnection(format!("no route to {}", name)))
        });

        let mut manager = ServerManager::new()
            .with_connector(connector)
            .with_max_concurrent_connections(2);
        for (name, _) in servers {
            manager.add_server(
                name,
                ServerConfig {
                    ssh: ServerManager::host_builder().hostname(name).username("wildfly").build(),
                    management: ManagementOptions {
                        poll_interval_millis: 1,
                        ..Default::default()
                    },
                },
            );
        }
        manager
    }

    #[tokio::test]
    async fn test_apply_plan_on_many_servers() {
        let healthy = InMemoryServer::new();
        let broken = InMemoryServer::new();
        broken.fail_operation("add", &Address::subsystem("elytron"), "WFLYCTL0158: Operation handler failed");
        let manager = manager_with(&[("a", healthy.clone()), ("b", broken.clone())]);

        let plan = Plan::from_yaml_str(
            "name: elytron\nsteps:\n  - name: add\n    action: add\n    address: /subsystem=elytron\n",
        )
        .unwrap();
        let names = vec!["a".to_string(), "b".to_string(), "ghost".to_string()];
        let result = manager.apply_plan(&plan, &names).await;

        assert_eq!(result.successful, vec!["a".to_string()]);
        assert_eq!(result.failed.len(), 2);
        assert!(healthy.exists(&Address::subsystem("elytron")));
        assert!(!broken.exists(&Address::subsystem("elytron")));
        let failures = result.failures();
        assert_eq!(failures[0].0, "b");
        assert!(failures[0].1.contains("stopped at step 'add'"));
        assert!(failures[1].1.contains("not found"));
    }

    #[tokio::test]
    async fn test_reload_if_required_batch() {
        let pending = InMemoryServer::new();
        pending.set_server_state(ReloadState::ReloadRequired);
        let stuck = InMemoryServer::new();
        stuck.set_server_state(ReloadState::RestartRequired);
        let manager = manager_with(&[("pending", pending.clone()), ("stuck", stuck.clone())]);

        let names = vec!["pending".to_string(), "stuck".to_string()];
        let result = manager.reload_if_required(&names).await;

        assert!(matches!(result.results.get("pending"), Some(Ok(true))));
        assert!(matches!(
            result.results.get("stuck"),
            Some(Err(WildflyError::RestartRequired(_)))
        ));
        assert_eq!(pending.reload_count(), 1);
        assert_eq!(stuck.reload_count(), 0);
    }

    #[test]
    fn test_batch_success_rate() {
        let mut batch: BatchResult<()> = BatchResult::new();
        assert_eq!(batch.success_rate(), 0.0);
        batch.add_result("a".to_string(), Ok(()));
        batch.add_result("b".to_string(), Err(WildflyError::Transport("down".to_string())));
        assert_eq!(batch.success_rate(), 0.5);
    }
}
