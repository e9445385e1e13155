pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod manager;
pub mod operations;
pub mod testing;
pub mod transport;
pub mod types;


pub use client::{ClientOptions, ErrorHandlingClient, ManagementClient, OnlineManagementClient, RawClient, online};
pub use commands::{CommandContext, OnlineCommand};
pub use config::{InventoryConfig, ServerConfig};
pub use error::WildflyError;
pub use executor::{Plan, PlanExecutor, PlanResult, Step, StepKind, StepStatus};
pub use manager::{BatchResult, HostConfigBuilder, ServerManager};
pub use operations::{
    Address, Administration, ModelNodeResult, Operation, Operations, ReloadState, ServerVersion, Values,
};
pub use transport::{SshCliTransport, Transport};
pub use types::{HostConfig, ManagementOptions};

pub type Result<T> = std::result::Result<T, WildflyError>;
