//! Content repository facade
//!
//! Wires configuration, event store, command handlers and projections together. Commands
//! are handled one at a time; in synchronous projection mode the projections are caught up
//! before `handle` returns.

use crate::commands::{CommandHandlingResult, ContentRepositoryCommand, RemoveContentStream};
use crate::config::{ConfigurationResult, ContentRepositoryConfig, ProjectionMode};
use crate::dimension_space::{ContentDimensionZookeeper, InterDimensionalVariationGraph};
use crate::handlers::{
    CommandBus, CommandHandlerContext, CommandResult, ContentStreamCommandHandler, NodeAggregateCommandHandler,
    WorkspaceCommandHandler,
};
use crate::infrastructure::{EventStore, InMemoryEventStore, NodeAggregateEventPublisher};
use crate::node_types::NodeTypeManager;
use crate::projections::{
    ContentGraphProjection, ContentStreamProjection, ProjectionCatchUp, ProjectionResult, WorkspaceProjection,
};
use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLockReadGuard};
use tracing::{info, instrument};

/// One configured content repository
pub struct ContentRepository {
    config: ContentRepositoryConfig,
    context: CommandHandlerContext,
    command_bus: CommandBus,
    command_lock: Mutex<()>,
}

impl ContentRepository {
    /// Validate `config` and build a repository on top of `event_store`.
    ///
    /// Projections start empty; call [`ContentRepository::catch_up_projections`] when the
    /// store already holds events.
    pub fn from_config(config: ContentRepositoryConfig, event_store: Arc<dyn EventStore>) -> ConfigurationResult<Self> {
        let zookeeper = ContentDimensionZookeeper::from_config(&config.dimensions)?;
        let variation_graph = InterDimensionalVariationGraph::new(&zookeeper);
        let node_type_manager = NodeTypeManager::from_config(&config.node_types)?;

        let context = CommandHandlerContext {
            zookeeper: Arc::new(zookeeper),
            variation_graph: Arc::new(variation_graph),
            node_type_manager: Arc::new(node_type_manager),
            publisher: Arc::new(NodeAggregateEventPublisher::new(event_store.clone())),
            catch_up: Arc::new(ProjectionCatchUp::new(event_store.clone())),
            event_store,
        };
        let content_streams = Arc::new(ContentStreamCommandHandler::new(context.clone()));
        let node_aggregates = Arc::new(NodeAggregateCommandHandler::new(context.clone()));
        let workspaces = Arc::new(WorkspaceCommandHandler::new(
            context.clone(),
            content_streams.clone(),
            node_aggregates.clone(),
        ));
        let command_bus = CommandBus::new()
            .with_handler(content_streams)
            .with_handler(node_aggregates)
            .with_handler(workspaces);

        info!(
            repository = %config.identifier,
            dimensions = config.dimensions.len(),
            node_types = config.node_types.len(),
            projection_mode = ?config.projection_mode,
            "Content repository configured"
        );
        Ok(Self {
            config,
            context,
            command_bus,
            command_lock: Mutex::new(()),
        })
    }

    /// A repository backed by a fresh in-memory event store
    pub fn in_memory(config: ContentRepositoryConfig) -> ConfigurationResult<Self> {
        Self::from_config(config, Arc::new(InMemoryEventStore::new()))
    }

    pub fn identifier(&self) -> &str {
        &self.config.identifier
    }

    pub fn projection_mode(&self) -> ProjectionMode {
        self.config.projection_mode
    }

    /// Handle one command.
    ///
    /// In synchronous mode the projections reflect the command's events (or the failure
    /// events of a failed rebase) once this returns.
    #[instrument(skip(self, command))]
    pub async fn handle(&self, command: impl Into<ContentRepositoryCommand>) -> CommandHandlingResult<CommandResult> {
        let command = command.into();
        let _guard = self.command_lock.lock().await;
        let result = self.command_bus.handle(command).await;
        if self.config.projection_mode == ProjectionMode::Synchronous {
            let caught_up = self.context.catch_up.catch_up().await;
            if result.is_ok() {
                caught_up?;
            }
        }
        result
    }

    pub async fn content_graph(&self) -> RwLockReadGuard<'_, ContentGraphProjection> {
        self.context.catch_up.content_graph().await
    }

    pub async fn workspace_finder(&self) -> RwLockReadGuard<'_, WorkspaceProjection> {
        self.context.catch_up.workspaces().await
    }

    pub async fn content_stream_finder(&self) -> RwLockReadGuard<'_, ContentStreamProjection> {
        self.context.catch_up.content_streams().await
    }

    pub fn zookeeper(&self) -> &ContentDimensionZookeeper {
        &self.context.zookeeper
    }

    pub fn variation_graph(&self) -> &InterDimensionalVariationGraph {
        &self.context.variation_graph
    }

    pub fn node_type_manager(&self) -> &NodeTypeManager {
        &self.context.node_type_manager
    }

    pub fn event_store(&self) -> &Arc<dyn EventStore> {
        &self.context.event_store
    }

    /// Apply all committed events the projections have not seen yet
    pub async fn catch_up_projections(&self) -> ProjectionResult<u64> {
        self.context.catch_up.catch_up().await
    }

    /// Rebuild every projection from the first event
    pub async fn replay_projections(&self) -> ProjectionResult<u64> {
        let _guard = self.command_lock.lock().await;
        self.context.catch_up.replay().await
    }

    /// Remove content streams no workspace points at anymore, such as the previous streams
    /// of rebased workspaces and candidates of failed rebases
    pub async fn remove_unused_content_streams(&self) -> CommandHandlingResult<Vec<ContentStreamIdentifier>> {
        self.context.catch_up.catch_up().await?;
        let unused = {
            let workspaces = self.context.catch_up.workspaces().await;
            self.context
                .catch_up
                .content_streams()
                .await
                .find_unused_content_streams(&workspaces)
        };
        for content_stream_identifier in &unused {
            self.handle(RemoveContentStream {
                content_stream_identifier: *content_stream_identifier,
                initiating_user_identifier: UserIdentifier::system_user(),
            })
            .await?;
        }
        self.context.catch_up.catch_up().await?;
        info!(removed = unused.len(), "Removed unused content streams");
        Ok(unused)
    }
}

impl std::fmt::Debug for ContentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRepository")
            .field("identifier", &self.config.identifier)
            .field("projection_mode", &self.config.projection_mode)
            .field("command_bus", &self.command_bus)
            .finish()
    }
}
