//! Battle Resolver MCP Server
//!
//! A Model Context Protocol server (rmcp) that lets a host feed agent
//! messages and front-end events into a resolver session.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pkm_battle_resolver::errors::SessionError;
use pkm_battle_resolver::settings::PartialSettings;
use pkm_battle_resolver::{
    InMemoryStore, ResolverConfig, Session, SessionEvent, SessionHandle, TransferSelection,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ErrorData as McpError, *},
    schemars, tool, tool_handler, tool_router, ServerHandler, ServiceExt,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pkm-battle-resolver-mcp", version)]
struct Args {
    /// JSON document used to seed the in-memory store.
    #[arg(long)]
    store: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone)]
pub struct ResolverService {
    tool_router: ToolRouter<ResolverService>,
    session: SessionHandle,
    store: InMemoryStore,
}

// Tool request structures
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ResolveBattleRequest {
    #[schemars(description = "Host identifier of the message; repeated ids are ignored")]
    pub message_id: u64,
    #[schemars(description = "Full text of the agent message")]
    pub text: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetLeaderRequest {
    #[schemars(description = "Party slot to lead with (1-6)")]
    pub slot: u8,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateSettingsRequest {
    #[schemars(description = "Setting flags to change, e.g. {\"enableBGM\": false}")]
    pub settings: BTreeMap<String, bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TransferStorageRequest {
    #[schemars(description = "Selected party slots (1-6)")]
    pub party_slots: Vec<u8>,
    #[schemars(description = "Selected box keys, e.g. storage_01")]
    #[serde(default)]
    pub box_keys: Vec<String>,
    #[schemars(description = "Number of selected empty box cells")]
    #[serde(default)]
    pub empty_cells: usize,
}

fn tool_error(context: &str, error: impl std::fmt::Display) -> McpError {
    McpError {
        code: ErrorCode(-32603),
        message: Cow::from(format!("{}: {}", context, error)),
        data: None,
    }
}

fn describe(event: SessionEvent) -> String {
    match event {
        SessionEvent::PayloadReady { message, .. } => message,
        SessionEvent::Skipped(cause) => format!("Skipped: {:?}", cause),
        SessionEvent::Rejected(reason) => format!("Rejected: {}", reason),
        SessionEvent::Updated { paths } => format!("Updated {} store paths.", paths),
        SessionEvent::Transferred {
            kind,
            uploaded,
            downloaded,
        } => format!(
            "Transfer ({:?}) complete. Stored: [{}] Retrieved: [{}]",
            kind,
            uploaded.join(", "),
            downloaded.join(", ")
        ),
        SessionEvent::StateBroadcast { summary, .. } => summary,
        SessionEvent::Cleared => "Session cleared.".to_string(),
    }
}

fn reply(result: Result<SessionEvent, SessionError>) -> Result<CallToolResult, McpError> {
    let event = result.map_err(|e| tool_error("Session unavailable", e))?;
    Ok(CallToolResult::success(vec![Content::text(describe(event))]))
}

#[tool_router]
impl ResolverService {
    pub fn new(session: SessionHandle, store: InMemoryStore) -> Self {
        Self {
            tool_router: Self::tool_router(),
            session,
            store,
        }
    }

    #[tool(description = "Resolve the battle declaration in an agent message and return the rendered message")]
    async fn resolve_battle(
        &self,
        Parameters(request): Parameters<ResolveBattleRequest>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.session.message_received(request.message_id, request.text).await)
    }

    #[tool(description = "Fold pending progress and return the team summary")]
    async fn refresh_state(&self) -> Result<CallToolResult, McpError> {
        reply(self.session.refresh().await)
    }

    #[tool(description = "Make a party slot the lead")]
    async fn set_leader(
        &self,
        Parameters(request): Parameters<SetLeaderRequest>,
    ) -> Result<CallToolResult, McpError> {
        reply(self.session.set_leader(request.slot).await)
    }

    #[tool(description = "Change battle presentation settings")]
    async fn update_settings(
        &self,
        Parameters(request): Parameters<UpdateSettingsRequest>,
    ) -> Result<CallToolResult, McpError> {
        let raw = Value::Object(
            request
                .settings
                .into_iter()
                .map(|(key, enabled)| (key, Value::Bool(enabled)))
                .collect(),
        );
        reply(self.session.update_settings(PartialSettings::from_value(Some(&raw))).await)
    }

    #[tool(description = "Move Pokemon between the party and the storage box")]
    async fn transfer_storage(
        &self,
        Parameters(request): Parameters<TransferStorageRequest>,
    ) -> Result<CallToolResult, McpError> {
        let selection = TransferSelection {
            party_slots: request.party_slots,
            box_keys: request.box_keys,
            empty_cells: request.empty_cells,
        };
        reply(self.session.transfer_storage(selection).await)
    }

    #[tool(description = "Return the raw store document as JSON")]
    async fn get_store(&self) -> Result<CallToolResult, McpError> {
        let document = self.store.document().await;
        let text = serde_json::to_string_pretty(&document)
            .map_err(|e| tool_error("Store document could not be serialized", e))?;
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(description = "Forget handled messages and cooldowns, e.g. after switching conversations")]
    async fn reset_session(&self) -> Result<CallToolResult, McpError> {
        reply(self.session.reset().await)
    }
}

#[tool_handler]
impl ServerHandler for ResolverService {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pkm_battle_resolver=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ResolverConfig::load(path)?,
        None => ResolverConfig::default(),
    };
    let document: Value = match &args.store {
        Some(path) => serde_json::from_str(&tokio::fs::read_to_string(path).await?)?,
        None => Value::Object(Default::default()),
    };

    let store = InMemoryStore::new(document);
    let (session, _task) = Session::spawn(Arc::new(config), Arc::new(store.clone()), args.seed);
    let service = ResolverService::new(session, store);

    info!("battle resolver MCP server starting");
    let server = service.serve((stdin(), stdout())).await?;
    let quit_reason = server.waiting().await?;
    info!(?quit_reason, "battle resolver MCP server exiting");
    Ok(())
}
