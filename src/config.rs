use crate::error::WildflyError;
use crate::types::{HostConfig, ManagementOptions};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// 一台应用服务器：如何登录其主机，以及如何从主机访问管理接口
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub ssh: HostConfig,
    #[serde(default)]
    pub management: ManagementOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InventoryConfig {
    pub servers: HashMap<String, ServerConfig>,
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
}

impl InventoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, WildflyError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| WildflyError::Io(format!("Failed to read inventory file: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| WildflyError::Parse(format!("Failed to parse YAML inventory: {}", e)))
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, WildflyError> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| WildflyError::Io(format!("Failed to read inventory file: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| WildflyError::Parse(format!("Failed to parse JSON inventory: {}", e)))
    }

    /// 根据扩展名选择格式，除 `.json` 以外都按 YAML 处理
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WildflyError> {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_file(path),
            _ => Self::from_yaml_file(path),
        }
    }

    pub fn save_to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), WildflyError> {
        let yaml_content = serde_yaml::to_string(self)
            .map_err(|e| WildflyError::Parse(format!("Failed to serialize to YAML: {}", e)))?;

        std::fs::write(path, yaml_content)
            .map_err(|e| WildflyError::Io(format!("Failed to write inventory file: {}", e)))
    }

    pub fn save_to_json<P: AsRef<Path>>(&self, path: P) -> Result<(), WildflyError> {
        let json_content = serde_json::to_string_pretty(self)
            .map_err(|e| WildflyError::Parse(format!("Failed to serialize to JSON: {}", e)))?;

        std::fs::write(path, json_content)
            .map_err(|e| WildflyError::Io(format!("Failed to write inventory file: {}", e)))
    }

    pub fn add_server(&mut self, name: &str, server: ServerConfig) {
        self.servers.insert(name.to_string(), server);
    }

    pub fn add_server_to_group(&mut self, server_name: &str, group_name: &str) {
        self.groups
            .entry(group_name.to_string())
            .or_default()
            .push(server_name.to_string());
    }

    pub fn servers_in_group(&self, group_name: &str) -> Vec<String> {
        self.groups.get(group_name).cloned().unwrap_or_default()
    }

    /// 把服务器名和组展开为排序去重的列表，未选择时返回全部服务器
    pub fn select(&self, servers: &[String], groups: &[String]) -> Result<Vec<String>, WildflyError> {
        if servers.is_empty() && groups.is_empty() {
            let all: BTreeSet<String> = self.servers.keys().cloned().collect();
            return Ok(all.into_iter().collect());
        }

        let mut selected = BTreeSet::new();
        for group in groups {
            let members = self
                .groups
                .get(group)
                .ok_or_else(|| WildflyError::Validation(format!("Unknown group '{}'", group)))?;
            selected.extend(members.iter().cloned());
        }
        selected.extend(servers.iter().cloned());

        if let Some(unknown) = selected.iter().find(|name| !self.servers.contains_key(*name)) {
            return Err(WildflyError::Validation(format!("Unknown server '{}'", unknown)));
        }
        Ok(selected.into_iter().collect())
    }
}
