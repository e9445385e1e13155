use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 运行应用服务器的主机的 SSH 登录信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key_path: Option<String>,
    pub passphrase: Option<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            port: 22,
            username: String::new(),
            password: None,
            private_key_path: None,
            passphrase: None,
        }
    }
}

/// 登录主机后如何访问管理接口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagementOptions {
    #[serde(default = "default_jboss_home")]
    pub jboss_home: String,
    #[serde(default = "default_controller_host")]
    pub controller_host: String,
    #[serde(default = "default_controller_port")]
    pub controller_port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_reload_timeout_secs")]
    pub reload_timeout_secs: u64,
    #[serde(default = "default_poll_interval_millis")]
    pub poll_interval_millis: u64,
}

fn default_jboss_home() -> String {
    "/opt/wildfly".to_string()
}

fn default_controller_host() -> String {
    "localhost".to_string()
}

fn default_controller_port() -> u16 {
    9990
}

fn default_reload_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_millis() -> u64 {
    500
}

impl Default for ManagementOptions {
    fn default() -> Self {
        Self {
            jboss_home: default_jboss_home(),
            controller_host: default_controller_host(),
            controller_port: default_controller_port(),
            username: None,
            password: None,
            reload_timeout_secs: default_reload_timeout_secs(),
            poll_interval_millis: default_poll_interval_millis(),
        }
    }
}

impl ManagementOptions {
    pub fn reload_timeout(&self) -> Duration {
        Duration::from_secs(self.reload_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    /// 传给 `--controller` 的 `host:port`
    pub fn controller(&self) -> String {
        format!("{}:{}", self.controller_host, self.controller_port)
    }
}

/// 远程命令执行结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}
