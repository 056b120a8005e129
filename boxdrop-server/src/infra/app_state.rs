use std::{fmt, sync::Arc};

use anyhow::Context;
use tracing::{info, warn};

use crate::infra::config::Config;
use boxdrop_core::database::ports::{BoxTypeRepository, DeliveryRepository, StoreRepository};
use boxdrop_core::database::{InMemoryDatabase, PostgresDatabase};
use boxdrop_core::domain::receipts::{
    ArtifactLayout, CommandDispatcher, Dispatcher, HtmlImageRenderer, ReceiptRenderer,
    ReceiptTemplate, ReceiptWorkflow,
};

/// Repository handles shared by every request.
#[derive(Clone)]
pub struct Repositories {
    pub stores: Arc<dyn StoreRepository>,
    pub box_types: Arc<dyn BoxTypeRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        let db = Arc::new(InMemoryDatabase::new());
        Self {
            stores: db.clone(),
            box_types: db.clone(),
            deliveries: db,
        }
    }

    pub fn postgres(db: &PostgresDatabase) -> Self {
        Self {
            stores: Arc::new(db.stores().clone()),
            box_types: Arc::new(db.box_types().clone()),
            deliveries: Arc::new(db.deliveries().clone()),
        }
    }
}

impl fmt::Debug for Repositories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub stores: Arc<dyn StoreRepository>,
    pub box_types: Arc<dyn BoxTypeRepository>,
    pub deliveries: Arc<dyn DeliveryRepository>,
    pub workflow: Arc<ReceiptWorkflow<dyn DeliveryRepository>>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        repositories: Repositories,
        renderer: Arc<dyn ReceiptRenderer>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let layout = ArtifactLayout::new(
            config.artifact_dir.clone(),
            config.artifact_public_prefix.clone(),
        );
        let workflow = ReceiptWorkflow::new(
            Arc::clone(&repositories.deliveries),
            renderer,
            dispatcher,
            layout,
        );

        Self {
            config,
            stores: repositories.stores,
            box_types: repositories.box_types,
            deliveries: repositories.deliveries,
            workflow: Arc::new(workflow),
        }
    }

    /// Wire the external renderer and messaging CLI from configuration.
    pub async fn from_config(
        config: Arc<Config>,
        repositories: Repositories,
    ) -> anyhow::Result<Self> {
        let template = match &config.receipt_template_path {
            Some(path) => {
                info!(path = %path.display(), "loading receipt template");
                ReceiptTemplate::load(path)
                    .await
                    .with_context(|| format!("failed to load template {}", path.display()))?
            }
            None => ReceiptTemplate::default(),
        };

        let dispatcher = CommandDispatcher::new(config.dispatcher_config());
        if !dispatcher_available(dispatcher.binary()) {
            warn!(
                binary = dispatcher.binary(),
                "messaging CLI not found; receipts will be generated but sending will fail"
            );
        }

        let renderer = HtmlImageRenderer::new(config.renderer_config(), template);
        Ok(Self::new(
            config,
            repositories,
            Arc::new(renderer),
            Arc::new(dispatcher),
        ))
    }
}

// Bare names are resolved through PATH at spawn time.
fn dispatcher_available(binary: &str) -> bool {
    !binary.contains(std::path::MAIN_SEPARATOR) || std::path::Path::new(binary).exists()
}
