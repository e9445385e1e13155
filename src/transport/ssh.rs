use super::Transport;
use crate::error::WildflyError;
use crate::operations::{Address, Operation, Values, operation::READ_ATTRIBUTE};
use crate::types::{CommandResult, HostConfig, ManagementOptions};
use serde_json::Value;
use ssh2::Session;
use std::io::prelude::*;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 首次建立连接时单次尝试的超时
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// 单次尝试的最小预算，避免传入零超时
const MIN_ATTEMPT_BUDGET: Duration = Duration::from_millis(100);

/// 通过 SSH 在服务器主机上执行 `jboss-cli.sh --output-json`，每个操作一次调用。
///
/// 管理密码不会出现在命令行上：需要时写入一个权限为 0600 的 Elytron 客户端配置文件，
/// 通过 `-Dwildfly.config.url` 传给 CLI，关闭连接时删除。
pub struct SshCliTransport {
    session: Option<Session>,
    host: HostConfig,
    management: ManagementOptions,
    credentials_file: Option<String>,
}

impl SshCliTransport {
    /// 建立 SSH 会话，失败时重试（延迟递增）
    pub fn connect(host: HostConfig, management: ManagementOptions) -> Result<Self, WildflyError> {
        let max_retries = 3;
        let retry_delay = Duration::from_millis(1000);
        let mut last_error = None;

        for attempt in 1..=max_retries {
            if attempt > 1 {
                info!(
                    "Retrying SSH connection to {}:{} (Attempt {}/{})",
                    host.hostname, host.port, attempt, max_retries
                );
                thread::sleep(retry_delay * (attempt as u32 - 1));
            }

            match Self::open_session(&host, CONNECT_TIMEOUT) {
                Ok(session) => {
                    let mut transport = Self {
                        session: Some(session),
                        host,
                        management,
                        credentials_file: None,
                    };
                    transport.install_credentials()?;
                    return Ok(transport);
                }
                Err(e) => {
                    warn!("SSH connection failed for {}:{}: {}", host.hostname, host.port, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            WildflyError::SshConnection("Failed to connect after retries".to_string())
        }))
    }

    /// 整个握手和认证都受 `timeout` 限制
    fn open_session(host: &HostConfig, timeout: Duration) -> Result<Session, WildflyError> {
        let timeout = timeout.max(MIN_ATTEMPT_BUDGET);
        let addr = (host.hostname.as_str(), host.port)
            .to_socket_addrs()
            .map_err(|e| {
                WildflyError::SshConnection(format!("Failed to resolve {}: {}", host.hostname, e))
            })?
            .next()
            .ok_or_else(|| {
                WildflyError::SshConnection(format!("No address found for {}", host.hostname))
            })?;

        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            WildflyError::SshConnection(format!(
                "Failed to connect to {}:{}: {}",
                host.hostname, host.port, e
            ))
        })?;

        if let Err(e) = tcp.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }

        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(session_timeout_millis(timeout));

        session
            .handshake()
            .map_err(|e| WildflyError::SshConnection(format!("SSH Handshake failed: {}", e)))?;

        if let Some(ref private_key_path) = host.private_key_path {
            let passphrase = host.passphrase.as_deref();
            session.userauth_pubkey_file(&host.username, None, Path::new(private_key_path), passphrase)?;
        } else if let Some(ref password) = host.password {
            session.userauth_password(&host.username, password)?;
        } else {
            return Err(WildflyError::Authentication(
                "No authentication method provided".to_string(),
            ));
        }

        if !session.authenticated() {
            return Err(WildflyError::Authentication("Authentication failed".to_string()));
        }

        // CLI 调用可能较慢，认证完成后放宽超时
        session.set_timeout(session_timeout_millis(CONNECT_TIMEOUT.max(timeout)));

        info!("Successfully connected to {}", host.hostname);
        Ok(session)
    }

    fn session(&self) -> Result<&Session, WildflyError> {
        self.session
            .as_ref()
            .ok_or_else(|| WildflyError::Transport(format!("Not connected to {}", self.host.hostname)))
    }

    fn execute_command(&self, command: &str) -> Result<CommandResult, WildflyError> {
        let mut channel = self.session()?.channel_session()?;
        channel.exec(command)?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        channel.read_to_string(&mut stdout)?;
        channel.stderr().read_to_string(&mut stderr)?;

        channel.wait_close()?;
        let exit_code = channel.exit_status()?;

        debug!("CLI command on '{}' exited with {}", self.host.hostname, exit_code);

        Ok(CommandResult {
            exit_code,
            stdout,
            stderr,
        })
    }

    /// 有管理密码时，在远端创建仅当前用户可读的客户端配置文件
    fn install_credentials(&mut self) -> Result<(), WildflyError> {
        let Some(ref password) = self.management.password else {
            return Ok(());
        };
        let content = credentials_xml(self.management.username.as_deref(), password);

        // mktemp 创建的文件权限为 0600，scp 覆盖已有文件时保留该权限
        let created = self.execute_command("umask 077 && mktemp /tmp/rs-wildfly-XXXXXXXX.xml")?;
        let path = created.stdout.trim().to_string();
        if created.exit_code != 0 || path.is_empty() {
            return Err(WildflyError::Transport(format!(
                "Failed to create credentials file on {}: {}",
                self.host.hostname,
                created.stderr.trim()
            )));
        }

        let mut remote_file =
            self.session()?
                .scp_send(Path::new(&path), 0o600, content.len() as u64, None)?;
        remote_file.write_all(content.as_bytes())?;
        remote_file.send_eof()?;
        remote_file.wait_eof()?;
        remote_file.close()?;
        remote_file.wait_close()?;

        debug!("Management credentials installed on {}", self.host.hostname);
        self.credentials_file = Some(path);
        Ok(())
    }

    fn remove_credentials(&mut self) {
        let Some(path) = self.credentials_file.take() else {
            return;
        };
        if let Err(e) = self.execute_command(&format!("rm -f {}", shell_quote(&path))) {
            warn!("Failed to remove credentials file {} on {}: {}", path, self.host.hostname, e);
        }
    }
}

fn session_timeout_millis(timeout: Duration) -> u32 {
    u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX)
}

/// 执行一次 CLI 请求的 shell 命令行；不包含任何密码
fn cli_command_line(
    management: &ManagementOptions,
    credentials_file: Option<&str>,
    request: &str,
) -> String {
    let mut command = format!(
        "{}/bin/jboss-cli.sh",
        management.jboss_home.trim_end_matches('/')
    );
    if let Some(path) = credentials_file {
        command.push_str(&format!(
            " {}",
            shell_quote(&format!("-Dwildfly.config.url={}", path))
        ));
    }
    command.push_str(&format!(
        " --connect --controller={} --output-json",
        shell_quote(&management.controller())
    ));
    command.push_str(&format!(" --command={}", shell_quote(request)));
    command
}

/// Elytron 客户端认证配置（`urn:elytron:client:1.2`）
fn credentials_xml(username: Option<&str>, password: &str) -> String {
    let user = username
        .map(|name| format!("<set-user-name name=\"{}\"/>", xml_escape(name)))
        .unwrap_or_default();
    format!(
        "<configuration>\n\
         <authentication-client xmlns=\"urn:elytron:client:1.2\">\n\
         <authentication-rules><rule use-configuration=\"management\"/></authentication-rules>\n\
         <authentication-configurations>\n\
         <configuration name=\"management\">{}<credentials><clear-password password=\"{}\"/></credentials></configuration>\n\
         </authentication-configurations>\n\
         </authentication-client>\n\
         </configuration>\n",
        user,
        xml_escape(password)
    )
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 为 POSIX shell 加单引号
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// 操作失败时 jboss-cli 依然会输出 JSON；stdout 中没有 JSON 说明请求没有到达控制器
fn parse_cli_output(result: &CommandResult) -> Result<Value, WildflyError> {
    let stdout = result.stdout.trim();
    let start = stdout.find('{');
    match start.and_then(|start| serde_json::from_str::<Value>(&stdout[start..]).ok()) {
        Some(response) if response.get("outcome").is_some() => Ok(response),
        _ => Err(WildflyError::Transport(format!(
            "jboss-cli exited with {}: {}",
            result.exit_code,
            if result.stderr.trim().is_empty() {
                stdout
            } else {
                result.stderr.trim()
            }
        ))),
    }
}

impl Transport for SshCliTransport {
    fn submit(&mut self, operation: &Operation) -> Result<Value, WildflyError> {
        let command = cli_command_line(
            &self.management,
            self.credentials_file.as_deref(),
            &operation.to_cli_request(),
        );
        let result = self.execute_command(&command)?;
        parse_cli_output(&result)
    }

    fn reconnect(&mut self, budget: Duration) -> Result<(), WildflyError> {
        let alive = self
            .session
            .as_ref()
            .is_some_and(|session| session.authenticated() && self.execute_command("true").is_ok());
        if !alive {
            debug!("Re-opening SSH session to {}", self.host.hostname);
            self.session = None;
            self.session = Some(Self::open_session(&self.host, budget)?);
        }

        // 会话已就绪，但控制器可能仍在重启
        let read_state = Operation::new(
            READ_ATTRIBUTE,
            &Address::root(),
            Values::empty().and("name", "server-state"),
        )?;
        self.submit(&read_state).map(|_| ())
    }

    fn close(&mut self) -> Result<(), WildflyError> {
        self.remove_credentials();
        if let Some(session) = self.session.take() {
            session.disconnect(None, "closing", None)?;
        }
        Ok(())
    }
}

impl Drop for SshCliTransport {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            debug!("Error while closing SSH session to {}: {}", self.host.hostname, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("abc"), "'abc'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_command_line_never_carries_password() {
        let management = ManagementOptions {
            jboss_home: "/opt/wildfly/".to_string(),
            username: Some("admin".to_string()),
            password: Some("s3cr3t".to_string()),
            ..Default::default()
        };

        let command = cli_command_line(
            &management,
            Some("/tmp/rs-wildfly-abc.xml"),
            ":read-attribute(name=server-state)",
        );

        assert!(!command.contains("s3cr3t"));
        assert!(!command.contains("--password"));
        assert_eq!(
            command,
            "/opt/wildfly/bin/jboss-cli.sh '-Dwildfly.config.url=/tmp/rs-wildfly-abc.xml' \
             --connect --controller='localhost:9990' --output-json \
             --command=':read-attribute(name=server-state)'"
        );

        let local = cli_command_line(&ManagementOptions::default(), None, ":whoami");
        assert!(!local.contains("wildfly.config.url"));
    }

    #[test]
    fn test_credentials_xml_escapes_values() {
        let xml = credentials_xml(Some("admin"), "p<a\"ss&");
        assert!(xml.contains("<set-user-name name=\"admin\"/>"));
        assert!(xml.contains("password=\"p&lt;a&quot;ss&amp;\""));

        let xml = credentials_xml(None, "pw");
        assert!(!xml.contains("set-user-name"));
    }

    #[test]
    fn test_attempt_budget_bounds_session_timeout() {
        assert_eq!(session_timeout_millis(Duration::from_millis(250)), 250);
        assert_eq!(session_timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }

    #[test]
    fn test_unreachable_host_respects_budget() {
        let host = HostConfig {
            // TEST-NET-1，不可路由
            hostname: "192.0.2.1".to_string(),
            username: "wildfly".to_string(),
            password: Some("pw".to_string()),
            ..Default::default()
        };
        let started = std::time::Instant::now();
        assert!(SshCliTransport::open_session(&host, Duration::from_millis(200)).is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_parse_cli_output_success_and_failure() {
        let ok = CommandResult {
            exit_code: 0,
            stdout: "{\n    \"outcome\" : \"success\",\n    \"result\" : \"running\"\n}\n".to_string(),
            stderr: String::new(),
        };
        let response = parse_cli_output(&ok).unwrap();
        assert_eq!(response["result"], "running");

        let failed = CommandResult {
            exit_code: 1,
            stdout: "{\"outcome\" : \"failed\", \"failure-description\" : \"WFLYCTL0212: Duplicate resource\"}"
                .to_string(),
            stderr: String::new(),
        };
        let response = parse_cli_output(&failed).unwrap();
        assert_eq!(response["outcome"], "failed");
    }

    #[test]
    fn test_parse_cli_output_unreachable_controller() {
        let down = CommandResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "Failed to connect to the controller".to_string(),
        };
        let err = parse_cli_output(&down).unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("Failed to connect"));
    }
}
