use std::sync::Arc;

use storefront_agent::{
    system_prompt, AgentRuntime, Assistant, NoteStore, NoteTool, OpenAiClient, OrdersTool,
    ProductsTool, SessionStore, ToolRegistry,
};
use storefront_core::config::{AppConfig, ConfigError};
use storefront_core::enhance::EnhancerBuildError;
use storefront_core::{CatalogSource, Enhancer, OrderSource};
use storefront_shopify::{AdminClient, ClientError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub catalog: Arc<dyn CatalogSource>,
    pub assistant: Arc<Assistant>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("shopify client setup failed: {0}")]
    Shopify(#[from] ClientError),
    #[error("llm client setup failed: {0}")]
    Llm(String),
    #[error("enhancer setup failed: {0}")]
    Enhancer(#[from] EnhancerBuildError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let shop_base_url = config.shopify.shop_base_url();
    let admin = Arc::new(AdminClient::new(&config.shopify)?);
    let catalog: Arc<dyn CatalogSource> = admin.clone();
    let orders: Arc<dyn OrderSource> = admin.clone();
    info!(
        event_name = "system.bootstrap.shopify_configured",
        correlation_id = "bootstrap",
        admin_base_url = admin.admin_base_url(),
        "shopify admin client configured"
    );

    let enhancer = Enhancer::from_config(catalog.clone(), &config.enhancer, &shop_base_url)?;

    let mut tools = ToolRegistry::default();
    tools.register(ProductsTool::new(catalog.clone(), shop_base_url));
    tools.register(OrdersTool::new(orders));
    tools.register(NoteTool::new(Arc::new(NoteStore::new(config.notes.path.clone()))));

    let llm = OpenAiClient::new(&config.llm)
        .map_err(|error| BootstrapError::Llm(format!("{error:#}")))?;
    info!(
        event_name = "system.bootstrap.agent_configured",
        correlation_id = "bootstrap",
        model = llm.model(),
        tools = tools.len(),
        max_steps = config.llm.max_steps,
        "agent runtime configured"
    );
    let runtime = AgentRuntime::new(Arc::new(llm), tools, config.llm.max_steps);
    let sessions = SessionStore::new(system_prompt(&config.enhancer));

    Ok(Application {
        catalog,
        assistant: Arc::new(Assistant::new(runtime, enhancer, sessions)),
        config,
    })
}
