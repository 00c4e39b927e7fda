//! Content repository command handlers
//!
//! Command handlers validate commands against the projected state and publish the resulting
//! events. They are registered explicitly on a [`CommandBus`], which dispatches each command to
//! the first handler accepting it.

mod content_stream_handler;
mod node_aggregate;
mod workspace_handler;

pub use content_stream_handler::ContentStreamCommandHandler;
pub use node_aggregate::NodeAggregateCommandHandler;
pub use workspace_handler::WorkspaceCommandHandler;

use crate::commands::{CommandError, CommandHandlingResult, ContentRepositoryCommand};
use crate::dimension_space::{ContentDimensionZookeeper, InterDimensionalVariationGraph};
use crate::infrastructure::{EventStore, NodeAggregateEventPublisher};
use crate::node_types::NodeTypeManager;
use crate::projections::ProjectionCatchUp;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Trait for handling content repository commands
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Whether this handler is responsible for `command`
    fn can_handle(&self, command: &ContentRepositoryCommand) -> bool;

    /// Validate the command and publish its events
    async fn handle(&self, command: ContentRepositoryCommand) -> CommandHandlingResult<CommandResult>;
}

/// Outcome of a handled command
#[derive(Clone)]
pub struct CommandResult {
    last_sequence_number: u64,
    catch_up: Arc<ProjectionCatchUp>,
}

impl CommandResult {
    pub(crate) fn new(last_sequence_number: u64, catch_up: Arc<ProjectionCatchUp>) -> Self {
        Self {
            last_sequence_number,
            catch_up,
        }
    }

    /// Sequence number of the last event the command committed, or of the log head if it
    /// committed nothing
    pub fn last_sequence_number(&self) -> u64 {
        self.last_sequence_number
    }

    /// Wait until every projection has applied the command's events
    pub async fn block_until_projections_are_up_to_date(&self) -> CommandHandlingResult<()> {
        self.catch_up.catch_up_to(self.last_sequence_number).await?;
        Ok(())
    }
}

impl std::fmt::Debug for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandResult")
            .field("last_sequence_number", &self.last_sequence_number)
            .finish()
    }
}

/// Immutable collaborators shared by all command handlers
#[derive(Clone)]
pub struct CommandHandlerContext {
    pub zookeeper: Arc<ContentDimensionZookeeper>,
    pub variation_graph: Arc<InterDimensionalVariationGraph>,
    pub node_type_manager: Arc<NodeTypeManager>,
    pub event_store: Arc<dyn EventStore>,
    pub publisher: Arc<NodeAggregateEventPublisher>,
    pub catch_up: Arc<ProjectionCatchUp>,
}

impl CommandHandlerContext {
    pub(crate) async fn result(&self, last_sequence_number: Option<u64>) -> CommandHandlingResult<CommandResult> {
        let last_sequence_number = match last_sequence_number {
            Some(sequence_number) => sequence_number,
            None => self.event_store.head_sequence_number().await?,
        };
        Ok(CommandResult::new(last_sequence_number, self.catch_up.clone()))
    }
}

/// Dispatches commands to explicitly registered handlers
#[derive(Default, Clone)]
pub struct CommandBus {
    handlers: Vec<Arc<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; earlier registrations take precedence
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) {
        self.handlers.push(handler);
    }

    pub fn with_handler(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.register(handler);
        self
    }

    pub async fn handle(&self, command: ContentRepositoryCommand) -> CommandHandlingResult<CommandResult> {
        let command_type = command.command_type();
        let Some(handler) = self.handlers.iter().find(|handler| handler.can_handle(&command)) else {
            return Err(CommandError::InvalidCommand(format!(
                "no handler registered for {command_type}"
            )));
        };
        debug!(command_type, "Dispatching command");
        let result = handler.handle(command).await;
        if let Err(error) = &result {
            warn!(command_type, error = %error, "Command rejected");
        }
        result
    }
}

impl std::fmt::Debug for CommandBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
