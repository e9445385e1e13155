use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum WildflyError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation {operation} failed: {message}")]
    CommandFailed { operation: String, message: String },

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Server requires a restart: {0}")]
    RestartRequired(String),

    #[error("Timed out after {timeout_secs}s waiting for {what}")]
    Timeout { what: String, timeout_secs: u64 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("SSH connection failed: {0}")]
    SshConnection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("SSH error: {0}")]
    Ssh2(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl WildflyError {
    /// 连接层面的失败，而不是服务器拒绝了操作
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::SshConnection(_)
                | Self::Authentication(_)
                | Self::Ssh2(_)
                | Self::Io(_)
        )
    }

    pub fn is_command_failure(&self) -> bool {
        matches!(self, Self::CommandFailed { .. })
    }
}

impl From<std::io::Error> for WildflyError {
    fn from(error: std::io::Error) -> Self {
        WildflyError::Io(error.to_string())
    }
}

impl From<ssh2::Error> for WildflyError {
    fn from(error: ssh2::Error) -> Self {
        WildflyError::Ssh2(error.to_string())
    }
}
