//! `ToolClient` — one per configured tool server. Owns the child process,
//! the stdio transport, and the MCP session.
//!
//! Grounded on
//! `ConaryLabs-Mira/crates/mira-server/src/mcp_client.rs::McpClientManager`'s
//! `ensure_connected`/`call_tool` sequence: spawn via `TokioChildProcess`,
//! `serve_client` to get a `RunningService`, keep the service alive for the
//! lifetime of the connection (dropping it tears down the transport and
//! kills the child process).

use crate::mcp::normalize::{normalize_tool_result, NormalizeConfig};
use crate::manifest::ToolServerConfig;
use crate::error::{HarnessError, Result};
use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, ClientInfo, Implementation, Tool};
use rmcp::service::{Peer, RunningService};
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::{serve_client, RoleClient};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::RwLock;

/// The schema a tool server advertises for one tool.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// The public contract a tool-server connection satisfies.
#[async_trait]
pub trait ToolClient: Send + Sync {
    fn server_name(&self) -> &str;
    async fn connect(&self) -> Result<()>;
    async fn disconnect(&self);
    async fn is_connected(&self) -> bool;
    async fn list_tools(&self) -> Result<Vec<String>>;
    async fn get_tool_specs(&self) -> Result<Vec<ToolSpec>>;
    async fn call_tool(&self, name: &str, args: serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value>;
}

struct Connected {
    peer: Peer<RoleClient>,
    tools: Vec<Tool>,
    // Keeping the RunningService alive prevents the transport from being torn
    // down; dropping it cancels the transport and kills the child process.
    _service: RunningService<RoleClient, ClientInfo>,
}

/// A `ToolClient` backed by a real MCP server subprocess speaking stdio.
pub struct RmcpToolClient {
    config: ToolServerConfig,
    state: RwLock<Option<Connected>>,
    normalize: NormalizeConfig,
}

impl RmcpToolClient {
    pub fn new(config: ToolServerConfig) -> Self {
        Self { config, state: RwLock::new(None), normalize: NormalizeConfig::default() }
    }

    pub fn with_normalize_config(mut self, normalize: NormalizeConfig) -> Self {
        self.normalize = normalize;
        self
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.state.read().await.is_some() {
            return Ok(());
        }

        let mut cmd = Command::new(&self.config.command);
        cmd.args(&self.config.args);
        for (k, v) in &self.config.env {
            cmd.env(k, v);
        }
        if self.config.suppress_output {
            cmd.env("SUPPRESS_OUTPUT", "1");
        }
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null());

        let transport = TokioChildProcess::new(cmd)
            .map_err(|e| HarnessError::Transport(format!("failed to spawn tool server '{}': {e}", self.config.name)))?;

        let client_info = ClientInfo {
            protocol_version: Default::default(),
            capabilities: Default::default(),
            client_info: Implementation {
                name: "lev-eval".to_string(),
                title: Some("lev-eval MCP harness".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
        };

        let service = serve_client(client_info, transport)
            .await
            .map_err(|e| HarnessError::Transport(format!("MCP handshake failed for '{}': {e}", self.config.name)))?;

        let peer = service.peer().clone();
        let tools = peer
            .list_all_tools()
            .await
            .map_err(|e| HarnessError::Transport(format!("failed to list tools for '{}': {e}", self.config.name)))?;

        *self.state.write().await = Some(Connected { peer, tools, _service: service });
        Ok(())
    }
}

#[async_trait]
impl ToolClient for RmcpToolClient {
    fn server_name(&self) -> &str {
        &self.config.name
    }

    async fn connect(&self) -> Result<()> {
        self.ensure_connected().await
    }

    async fn disconnect(&self) {
        self.state.write().await.take();
    }

    async fn is_connected(&self) -> bool {
        self.state.read().await.is_some()
    }

    async fn list_tools(&self) -> Result<Vec<String>> {
        self.ensure_connected().await?;
        let guard = self.state.read().await;
        Ok(guard.as_ref().unwrap().tools.iter().map(|t| t.name.to_string()).collect())
    }

    async fn get_tool_specs(&self) -> Result<Vec<ToolSpec>> {
        self.ensure_connected().await?;
        let guard = self.state.read().await;
        let connected = guard.as_ref().unwrap();
        Ok(connected
            .tools
            .iter()
            .map(|t| ToolSpec {
                name: t.name.to_string(),
                description: t.description.clone().unwrap_or_default().to_string(),
                parameters_schema: serde_json::to_value(&t.input_schema).unwrap_or(serde_json::Value::Null),
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, args: serde_json::Map<String, serde_json::Value>) -> Result<serde_json::Value> {
        self.ensure_connected().await?;
        let guard = self.state.read().await;
        let connected = guard.as_ref().ok_or_else(|| HarnessError::Transport("not connected".to_string()))?;

        let result = connected
            .peer
            .call_tool(CallToolRequestParam { name: name.to_string().into(), arguments: Some(args) })
            .await
            .map_err(|e| HarnessError::ToolInvocation(format!("call_tool '{name}' failed: {e}")))?;

        Ok(normalize_tool_result(&result, self.normalize))
    }
}
