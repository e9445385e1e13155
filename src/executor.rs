use crate::client::{ErrorHandlingClient, ManagementClient};
use crate::commands::{
    AddResource, OnlineCommand, Reload, ReloadIfRequired, RemoveResource, UndefineAttribute,
    WriteAttribute,
};
use crate::error::WildflyError;
use crate::operations::{Address, Values};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum StepKind {
    Add {
        address: Address,
        #[serde(default)]
        params: Map<String, Value>,
        #[serde(default)]
        replace_existing: bool,
    },
    Remove {
        address: Address,
        #[serde(default)]
        if_exists: bool,
    },
    WriteAttribute {
        address: Address,
        name: String,
        value: Value,
    },
    UndefineAttribute {
        address: Address,
        name: String,
    },
    ReloadIfRequired,
    Reload,
}

impl StepKind {
    pub fn to_command(&self) -> Box<dyn OnlineCommand> {
        match self {
            StepKind::Add {
                address,
                params,
                replace_existing,
            } => Box::new(
                AddResource::new(address.clone(), Values::from(params.clone()))
                    .replace_existing_if(*replace_existing),
            ),
            StepKind::Remove { address, if_exists } => {
                Box::new(RemoveResource::new(address.clone()).if_exists_when(*if_exists))
            }
            StepKind::WriteAttribute {
                address,
                name,
                value,
            } => Box::new(WriteAttribute::new(address.clone(), name, value.clone())),
            StepKind::UndefineAttribute { address, name } => {
                Box::new(UndefineAttribute::new(address.clone(), name))
            }
            StepKind::ReloadIfRequired => Box::new(ReloadIfRequired),
            StepKind::Reload => Box::new(Reload),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    #[serde(flatten)]
    pub kind: StepKind,
    /// 本步失败时继续执行下一步
    #[serde(default)]
    pub ignore_errors: bool,
}

/// 在一台服务器上按顺序执行的步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn from_yaml_str(content: &str) -> Result<Self, WildflyError> {
        serde_yaml::from_str(content)
            .map_err(|e| WildflyError::Parse(format!("Failed to parse plan: {}", e)))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, WildflyError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| WildflyError::Io(format!("Failed to read plan file: {}", e)))?;
        Self::from_yaml_str(&content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum StepStatus {
    Applied,
    /// 失败，但该步骤设置了 `ignore_errors`
    Ignored(WildflyError),
    Failed(WildflyError),
    /// 前面的步骤失败，未执行
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    pub plan_name: String,
    pub steps: Vec<StepOutcome>,
    pub overall_success: bool,
}

impl PlanResult {
    pub fn failed_step(&self) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed(_)))
    }

    pub fn applied_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Applied)
            .count()
    }
}

/// 通过一个带错误处理的客户端逐步执行计划
pub struct PlanExecutor<'a, C: ManagementClient> {
    client: &'a ErrorHandlingClient<C>,
}

impl<'a, C: ManagementClient> PlanExecutor<'a, C> {
    pub fn new(client: &'a ErrorHandlingClient<C>) -> Self {
        Self { client }
    }

    /// 按顺序执行步骤。第一个未设置 `ignore_errors` 的失败步骤会停止计划，
    /// 剩余步骤记为跳过。
    pub fn execute(&self, plan: &Plan) -> PlanResult {
        info!("Executing plan: {} ({} steps)", plan.name, plan.steps.len());
        let mut outcomes = Vec::with_capacity(plan.steps.len());
        let mut aborted = false;

        for step in &plan.steps {
            if aborted {
                outcomes.push(StepOutcome {
                    name: step.name.clone(),
                    status: StepStatus::Skipped,
                });
                continue;
            }

            info!("Executing step: {}", step.name);
            let command = step.kind.to_command();
            let status = match self.client.apply_one(command.as_ref()) {
                Ok(()) => StepStatus::Applied,
                Err(e) if step.ignore_errors => {
                    warn!("Step '{}' failed, ignoring: {}", step.name, e);
                    StepStatus::Ignored(e)
                }
                Err(e) => {
                    warn!("Step '{}' failed, stopping plan: {}", step.name, e);
                    aborted = true;
                    StepStatus::Failed(e)
                }
            };
            outcomes.push(StepOutcome {
                name: step.name.clone(),
                status,
            });
        }

        let result = PlanResult {
            plan_name: plan.name.clone(),
            steps: outcomes,
            overall_success: !aborted,
        };
        info!(
            "Plan '{}' finished: {} of {} step(s) applied",
            plan.name,
            result.applied_count(),
            plan.steps.len()
        );
        result
    }
}
