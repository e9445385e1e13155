//! 实现 [`Transport`] 协议的内存管理树。
//!
//! 无需运行服务器即可测试命令。内部保存资源表、`server-state` 以及已应答请求的日志。
//! 可以标记某些资源类型，使删除后服务器进入 `reload-required`（或 `restart-required`）；
//! 在下次重载之前，被删除的地址不能再次添加，与真实服务器在旧服务仍然安装时的行为一致。
//!
//! ```ignore
//! let server = InMemoryServer::new().reload_required_on_remove("key-store");
//! let client = rs_wildfly::client::online(server.clone(), ClientOptions::default());
//! client.apply_one(&command)?;
//! assert!(server.exists(&address));
//! ```

use crate::error::WildflyError;
use crate::operations::operation::{
    ADD, READ_ATTRIBUTE, READ_CHILDREN_NAMES, READ_RESOURCE, RELOAD, REMOVE, UNDEFINE_ATTRIBUTE,
    WRITE_ATTRIBUTE,
};
use crate::operations::{Address, ModelNodeResult, Operation, ReloadState, ServerVersion, Values};
use crate::transport::Transport;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

struct InjectedFailure {
    operation: String,
    address: Address,
    message: String,
    remaining: Option<u32>,
}

struct ServerModel {
    resources: BTreeMap<Address, Map<String, Value>>,
    server_state: ReloadState,
    version: ServerVersion,
    reload_on_remove: HashSet<String>,
    restart_on_remove: HashSet<String>,
    pending_removal: HashSet<Address>,
    unreachable_after_reload: u32,
    unreachable_remaining: u32,
    failures: Vec<InjectedFailure>,
    journal: Vec<String>,
    reloads: u32,
    closes: u32,
}

impl Default for ServerModel {
    fn default() -> Self {
        let mut resources = BTreeMap::new();
        resources.insert(Address::root(), Map::new());
        Self {
            resources,
            server_state: ReloadState::Running,
            version: ServerVersion::VERSION_5_0_0,
            reload_on_remove: HashSet::new(),
            restart_on_remove: HashSet::new(),
            pending_removal: HashSet::new(),
            unreachable_after_reload: 0,
            unreachable_remaining: 0,
            failures: Vec::new(),
            journal: Vec::new(),
            reloads: 0,
            closes: 0,
        }
    }
}

/// 克隆共享同一棵树，测试可以在交给客户端之后保留一个句柄
#[derive(Clone, Default)]
pub struct InMemoryServer {
    model: Arc<Mutex<ServerModel>>,
}

fn not_found(address: &Address) -> ModelNodeResult {
    ModelNodeResult::failed(&format!(
        "WFLYCTL0216: Management resource '{}' not found",
        address
    ))
}

fn is_descendant(candidate: &Address, ancestor: &Address) -> bool {
    candidate.len() > ancestor.len() && candidate.segments().starts_with(ancestor.segments())
}

impl InMemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    fn model(&self) -> MutexGuard<'_, ServerModel> {
        self.model.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_version(self, version: ServerVersion) -> Self {
        self.model().version = version;
        self
    }

    /// 删除该类型的资源后服务器进入 `reload-required`
    pub fn reload_required_on_remove(self, resource_type: &str) -> Self {
        self.model().reload_on_remove.insert(resource_type.to_string());
        self
    }

    /// 删除该类型的资源后服务器进入 `restart-required`
    pub fn restart_required_on_remove(self, resource_type: &str) -> Self {
        self.model().restart_on_remove.insert(resource_type.to_string());
        self
    }

    /// 每次重载后失败的重连次数
    pub fn unreachable_after_reload(self, attempts: u32) -> Self {
        self.model().unreachable_after_reload = attempts;
        self
    }

    /// 让 `address` 上的每个 `operation` 都以 `message` 失败
    pub fn fail_operation(&self, operation: &str, address: &Address, message: &str) {
        self.model().failures.push(InjectedFailure {
            operation: operation.to_string(),
            address: address.clone(),
            message: message.to_string(),
            remaining: None,
        });
    }

    /// 同 `fail_operation`，但只对接下来的 `times` 个匹配请求生效
    pub fn fail_operation_times(&self, operation: &str, address: &Address, message: &str, times: u32) {
        self.model().failures.push(InjectedFailure {
            operation: operation.to_string(),
            address: address.clone(),
            message: message.to_string(),
            remaining: Some(times),
        });
    }

    pub fn set_server_state(&self, state: ReloadState) {
        self.model().server_state = state;
    }

    pub fn server_state(&self) -> ReloadState {
        self.model().server_state.clone()
    }

    /// 直接写入资源，不检查父资源
    pub fn add_resource(&self, address: &Address, attributes: Values) {
        let attributes = match attributes.into_model() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.model().resources.insert(address.clone(), attributes);
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.model().resources.contains_key(address)
    }

    pub fn attributes(&self, address: &Address) -> Option<Map<String, Value>> {
        self.model().resources.get(address).cloned()
    }

    pub fn attribute(&self, address: &Address, name: &str) -> Option<Value> {
        self.model().resources.get(address)?.get(name).cloned()
    }

    /// 已应答的全部请求（CLI 语法）
    pub fn journal(&self) -> Vec<String> {
        self.model().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.model().journal.clear();
    }

    pub fn reload_count(&self) -> u32 {
        self.model().reloads
    }

    /// 客户端关闭连接的次数
    pub fn close_count(&self) -> u32 {
        self.model().closes
    }
}

impl ServerModel {
    fn handle(&mut self, operation: &Operation) -> ModelNodeResult {
        let address = operation.address();
        let params = operation.params();

        if let Some(message) = self.injected_failure(operation) {
            return ModelNodeResult::failed(&message);
        }

        match operation.name() {
            ADD => self.add(address, params),
            REMOVE => self.remove(address),
            READ_RESOURCE => {
                if !self.resources.contains_key(address) {
                    return not_found(address);
                }
                let recursive = params.get("recursive").and_then(Value::as_bool).unwrap_or(false);
                ModelNodeResult::success(self.describe(address, recursive))
            }
            READ_ATTRIBUTE => self.read_attribute(address, params),
            READ_CHILDREN_NAMES => {
                if !self.resources.contains_key(address) {
                    return not_found(address);
                }
                let child_type = params.get("child-type").and_then(Value::as_str).unwrap_or_default();
                let names: Vec<Value> = self
                    .children(address)
                    .into_iter()
                    .filter(|child| child.last_type() == Some(child_type))
                    .filter_map(|child| child.last_name().map(|n| Value::String(n.to_string())))
                    .collect();
                ModelNodeResult::success(Value::Array(names))
            }
            WRITE_ATTRIBUTE | UNDEFINE_ATTRIBUTE => {
                let Some(attributes) = self.resources.get_mut(address) else {
                    return not_found(address);
                };
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return ModelNodeResult::failed("WFLYCTL0155: 'name' may not be null");
                };
                match params.get("value") {
                    Some(value) if operation.name() == WRITE_ATTRIBUTE && !value.is_null() => {
                        attributes.insert(name.to_string(), value.clone());
                    }
                    _ => {
                        attributes.remove(name);
                    }
                }
                ModelNodeResult::success(Value::Null)
            }
            RELOAD => {
                self.server_state = ReloadState::Running;
                self.pending_removal.clear();
                self.reloads += 1;
                self.unreachable_remaining = self.unreachable_after_reload;
                debug!("In-memory server reloaded ({} so far)", self.reloads);
                ModelNodeResult::success(Value::Null)
            }
            other => ModelNodeResult::failed(&format!(
                "WFLYCTL0031: No operation named '{}' exists at address {}",
                other, address
            )),
        }
    }

    fn injected_failure(&mut self, operation: &Operation) -> Option<String> {
        let position = self.failures.iter().position(|failure| {
            failure.operation == operation.name()
                && &failure.address == operation.address()
                && failure.remaining != Some(0)
        })?;
        let failure = &mut self.failures[position];
        if let Some(remaining) = failure.remaining.as_mut() {
            *remaining -= 1;
        }
        Some(failure.message.clone())
    }

    fn add(&mut self, address: &Address, params: &Values) -> ModelNodeResult {
        if self.resources.contains_key(address) || self.pending_removal.contains(address) {
            return ModelNodeResult::failed(&format!("WFLYCTL0212: Duplicate resource {}", address));
        }
        let parent = address.parent().unwrap_or_default();
        if !self.resources.contains_key(&parent) {
            return ModelNodeResult::failed(&format!(
                "WFLYCTL0175: Resource {} does not exist; a resource at address {} cannot be created until all ancestor resources have been added",
                parent, address
            ));
        }
        let attributes: Map<String, Value> = params
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.resources.insert(address.clone(), attributes);
        ModelNodeResult::success(Value::Null)
    }

    fn remove(&mut self, address: &Address) -> ModelNodeResult {
        if address.is_root() || !self.resources.contains_key(address) {
            return not_found(address);
        }
        self.resources
            .retain(|candidate, _| candidate != address && !is_descendant(candidate, address));

        let resource_type = address.last_type().unwrap_or_default();
        if self.restart_on_remove.contains(resource_type) {
            self.server_state = ReloadState::RestartRequired;
            self.pending_removal.insert(address.clone());
            return ModelNodeResult::success(Value::Null).with_process_state("restart-required");
        }
        if self.reload_on_remove.contains(resource_type) {
            if self.server_state != ReloadState::RestartRequired {
                self.server_state = ReloadState::ReloadRequired;
            }
            self.pending_removal.insert(address.clone());
            return ModelNodeResult::success(Value::Null).with_process_state("reload-required");
        }
        ModelNodeResult::success(Value::Null)
    }

    fn read_attribute(&self, address: &Address, params: &Values) -> ModelNodeResult {
        let Some(attributes) = self.resources.get(address) else {
            return not_found(address);
        };
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return ModelNodeResult::failed("WFLYCTL0155: 'name' may not be null");
        };
        if address.is_root() {
            let builtin = match name {
                "server-state" => Some(Value::String(self.server_state.to_string())),
                "management-major-version" => Some(Value::from(self.version.major)),
                "management-minor-version" => Some(Value::from(self.version.minor)),
                "management-micro-version" => Some(Value::from(self.version.micro)),
                _ => None,
            };
            if let Some(value) = builtin {
                return ModelNodeResult::success(value);
            }
        }
        ModelNodeResult::success(attributes.get(name).cloned().unwrap_or(Value::Null))
    }

    fn children(&self, address: &Address) -> Vec<Address> {
        self.resources
            .keys()
            .filter(|candidate| candidate.len() == address.len() + 1 && is_descendant(candidate, address))
            .cloned()
            .collect()
    }

    fn describe(&self, address: &Address, recursive: bool) -> Value {
        let mut description = self.resources.get(address).cloned().unwrap_or_default();
        for child in self.children(address) {
            let (Some(child_type), Some(child_name)) = (child.last_type(), child.last_name()) else {
                continue;
            };
            let child_value = if recursive {
                self.describe(&child, true)
            } else {
                Value::Null
            };
            let entry = description
                .entry(child_type.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(children) = entry {
                children.insert(child_name.to_string(), child_value);
            }
        }
        Value::Object(description)
    }
}

impl Transport for InMemoryServer {
    fn submit(&mut self, operation: &Operation) -> Result<Value, WildflyError> {
        let mut model = self.model();
        if model.unreachable_remaining > 0 {
            return Err(WildflyError::Transport("Connection refused".to_string()));
        }
        model.journal.push(operation.to_cli_request());
        Ok(model.handle(operation).response().clone())
    }

    fn reconnect(&mut self, _budget: Duration) -> Result<(), WildflyError> {
        let mut model = self.model();
        if model.unreachable_remaining > 0 {
            model.unreachable_remaining -= 1;
            return Err(WildflyError::Transport("Connection refused".to_string()));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), WildflyError> {
        self.model().closes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submit(server: &mut InMemoryServer, name: &str, address: &Address, params: Values) -> ModelNodeResult {
        let operation = Operation::new(name, address, params).unwrap();
        ModelNodeResult::from_response(server.submit(&operation).unwrap())
    }

    #[test]
    fn test_add_requires_parent() {
        let mut server = InMemoryServer::new();
        let ks = Address::subsystem("elytron").and("key-store", "ks");

        let result = submit(&mut server, ADD, &ks, Values::empty());
        assert!(result.is_failed());
        assert_eq!(result.failure_code(), Some("WFLYCTL0175".to_string()));

        assert!(submit(&mut server, ADD, &Address::subsystem("elytron"), Values::empty()).is_success());
        assert!(submit(&mut server, ADD, &ks, Values::empty().and("type", "JKS")).is_success());
        assert_eq!(server.attribute(&ks, "type"), Some(json!("JKS")));
    }

    #[test]
    fn test_remove_drops_descendants() {
        let mut server = InMemoryServer::new();
        let elytron = Address::subsystem("elytron");
        server.add_resource(&elytron, Values::empty());
        server.add_resource(&elytron.and("key-store", "a"), Values::empty());
        server.add_resource(&elytron.and("key-store", "b"), Values::empty());

        let names = submit(
            &mut server,
            READ_CHILDREN_NAMES,
            &elytron,
            Values::empty().and("child-type", "key-store"),
        );
        assert_eq!(names.string_list_value(), Some(vec!["a".to_string(), "b".to_string()]));

        assert!(submit(&mut server, REMOVE, &elytron, Values::empty()).is_success());
        assert!(!server.exists(&elytron.and("key-store", "a")));
        assert!(submit(&mut server, REMOVE, &elytron, Values::empty()).is_not_found());
    }

    #[test]
    fn test_pending_removal_blocks_re_add_until_reload() {
        let mut server = InMemoryServer::new().reload_required_on_remove("key-store");
        let elytron = Address::subsystem("elytron");
        let ks = elytron.and("key-store", "ks");
        server.add_resource(&elytron, Values::empty());
        server.add_resource(&ks, Values::empty());

        let removed = submit(&mut server, REMOVE, &ks, Values::empty());
        assert_eq!(removed.process_state(), Some("reload-required"));
        assert_eq!(server.server_state(), ReloadState::ReloadRequired);
        assert!(submit(&mut server, ADD, &ks, Values::empty()).is_duplicate());

        assert!(submit(&mut server, RELOAD, &Address::root(), Values::empty()).is_success());
        assert_eq!(server.server_state(), ReloadState::Running);
        assert!(submit(&mut server, ADD, &ks, Values::empty()).is_success());
    }

    #[test]
    fn test_unreachable_after_reload() {
        let mut server = InMemoryServer::new().unreachable_after_reload(2);
        submit(&mut server, RELOAD, &Address::root(), Values::empty());

        let request = Operation::new(READ_RESOURCE, &Address::root(), Values::empty()).unwrap();
        assert!(server.submit(&request).unwrap_err().is_transport());
        let budget = Duration::from_secs(1);
        assert!(server.reconnect(budget).is_err());
        assert!(server.reconnect(budget).is_err());
        assert!(server.reconnect(budget).is_ok());
        assert!(server.submit(&request).is_ok());
    }

    #[test]
    fn test_injected_failure_times() {
        let mut server = InMemoryServer::new();
        server.fail_operation_times(READ_RESOURCE, &Address::root(), "WFLYCTL0030: boom", 1);

        assert!(submit(&mut server, READ_RESOURCE, &Address::root(), Values::empty()).is_failed());
        assert!(submit(&mut server, READ_RESOURCE, &Address::root(), Values::empty()).is_success());
    }

    #[test]
    fn test_read_resource_lists_children() {
        let mut server = InMemoryServer::new();
        let elytron = Address::subsystem("elytron");
        server.add_resource(&elytron, Values::empty().and("default-realm", "r"));
        server.add_resource(&elytron.and("key-store", "ks"), Values::empty().and("type", "JKS"));

        let shallow = submit(&mut server, READ_RESOURCE, &elytron, Values::empty());
        assert_eq!(
            shallow.value(),
            &json!({"default-realm": "r", "key-store": {"ks": null}})
        );

        let deep = submit(&mut server, READ_RESOURCE, &elytron, Values::empty().and("recursive", true));
        assert_eq!(
            deep.value(),
            &json!({"default-realm": "r", "key-store": {"ks": {"type": "JKS"}}})
        );
    }
}
