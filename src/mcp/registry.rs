//! `ToolRegistry` — owns a set of named `ToolClient`s, resolves tool names
//! to their owning client, aggregates schemas.
//!
//! Grounded on `dirmacs-ares::tools::registry::ToolRegistry`'s
//! `HashMap<String, Arc<dyn Tool>>` registry pattern, generalized from
//! in-process tools to MCP tool-server clients, and on
//! `lev.mcp.mcp_registry.McpClientRegistry`'s "per-client failures are
//! logged and skipped, never fatal" behavior in `gatherSpecs`.

use crate::mcp::client::{ToolClient, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;

pub struct ToolRegistry {
    clients: HashMap<String, Arc<dyn ToolClient>>,
    /// Construction order, preserved so `find_server_of_tool`'s first-match
    /// policy is deterministic.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { clients: HashMap::new(), order: Vec::new() }
    }

    pub fn register(&mut self, client: Arc<dyn ToolClient>) {
        let name = client.server_name().to_string();
        if !self.clients.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.clients.insert(name, client);
    }

    pub fn get_client(&self, name: &str) -> Option<Arc<dyn ToolClient>> {
        self.clients.get(name).cloned()
    }

    pub fn list_servers(&self) -> Vec<&str> {
        self.order.iter().map(|s| s.as_str()).collect()
    }

    pub fn get_all_clients(&self) -> Vec<Arc<dyn ToolClient>> {
        self.order.iter().filter_map(|name| self.clients.get(name).cloned()).collect()
    }

    /// Resolve the first client (in construction order) whose tool list
    /// contains `name`.
    pub async fn find_server_of_tool(&self, name: &str) -> Option<String> {
        for server in &self.order {
            if let Some(client) = self.clients.get(server) {
                if let Ok(tools) = client.list_tools().await {
                    if tools.iter().any(|t| t == name) {
                        return Some(server.clone());
                    }
                }
            }
        }
        None
    }

    /// Connect any not-yet-connected client and aggregate tool specs across
    /// all of them. Per-client failures are logged and skipped, never
    /// fatal.
    pub async fn gather_specs(&self) -> Vec<ToolSpec> {
        let mut specs = Vec::new();
        for server in &self.order {
            let Some(client) = self.clients.get(server) else { continue };
            if !client.is_connected().await {
                if let Err(e) = client.connect().await {
                    tracing::warn!(server = %server, error = %e, "failed to connect tool server, skipping");
                    continue;
                }
            }
            match client.get_tool_specs().await {
                Ok(mut s) => specs.append(&mut s),
                Err(e) => {
                    tracing::warn!(server = %server, error = %e, "failed to fetch tool specs, skipping");
                }
            }
        }
        specs
    }

    pub async fn connect_all(&self) {
        for client in self.get_all_clients() {
            if let Err(e) = client.connect().await {
                tracing::warn!(server = %client.server_name(), error = %e, "failed to warm up tool server");
            }
        }
    }

    pub async fn disconnect_all(&self) {
        for client in self.get_all_clients() {
            client.disconnect().await;
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
