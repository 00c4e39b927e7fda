//! Node aggregate command handler
//!
//! Commands are decided against the content graph projection of their content stream and
//! published with an exact expected version, so a concurrent writer that slipped in between
//! the read and the append causes a retryable concurrency conflict instead of corrupt state.

mod constraint_checks;
mod creation;
mod disabling;
mod modification;
mod movement;
mod removal;
mod variation;

use self::constraint_checks::ConstraintChecks;
use super::{CommandHandler, CommandHandlerContext, CommandResult};
use crate::commands::{CommandError, CommandHandlingResult, ContentRepositoryCommand, CreateNodeAggregateWithNode};
use crate::domain_events::ContentRepositoryEvent;
use crate::infrastructure::{ExpectedVersion, StreamName};
use crate::node_types::NodeTypeManager;
use crate::value_objects::{ContentStreamIdentifier, NodeAggregateIdentifier, NodePath, NodeTypeName};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Handles all commands that change node aggregates of a content stream
pub struct NodeAggregateCommandHandler {
    context: CommandHandlerContext,
}

impl NodeAggregateCommandHandler {
    pub fn new(context: CommandHandlerContext) -> Self {
        Self { context }
    }

    /// Validate `command` and compute its events together with the stream version they
    /// were decided against
    async fn decide(
        &self,
        command: &ContentRepositoryCommand,
        content_stream_identifier: ContentStreamIdentifier,
    ) -> CommandHandlingResult<(Vec<ContentRepositoryEvent>, u64)> {
        let version = self
            .context
            .catch_up
            .content_streams()
            .await
            .find_version(&content_stream_identifier)
            .ok_or(CommandError::ContentStreamDoesNotExistYet(content_stream_identifier))?;

        let graph = self.context.catch_up.content_graph().await;
        let checks = ConstraintChecks::new(&self.context, &graph, content_stream_identifier);
        let events = match command {
            ContentRepositoryCommand::CreateRootNodeAggregateWithNode(c) => creation::create_root(&checks, c)?,
            ContentRepositoryCommand::CreateNodeAggregateWithNode(c) => creation::create(&checks, c)?,
            ContentRepositoryCommand::CreateNodeVariant(c) => variation::create_variant(&checks, c)?,
            ContentRepositoryCommand::MoveNodeAggregate(c) => movement::move_node_aggregate(&checks, c)?,
            ContentRepositoryCommand::RemoveNodeAggregate(c) => removal::remove(&checks, c)?,
            ContentRepositoryCommand::DisableNodeAggregate(c) => disabling::disable(&checks, c)?,
            ContentRepositoryCommand::EnableNodeAggregate(c) => disabling::enable(&checks, c)?,
            ContentRepositoryCommand::SetNodeProperties(c) => modification::set_properties(&checks, c)?,
            ContentRepositoryCommand::SetNodeReferences(c) => modification::set_references(&checks, c)?,
            ContentRepositoryCommand::ChangeNodeAggregateName(c) => modification::change_name(&checks, c)?,
            other => {
                return Err(CommandError::InvalidCommand(format!(
                    "{} is not a node aggregate command",
                    other.command_type()
                )))
            }
        };
        Ok((events, version))
    }
}

#[async_trait]
impl CommandHandler for NodeAggregateCommandHandler {
    fn can_handle(&self, command: &ContentRepositoryCommand) -> bool {
        command.is_node_aggregate_command()
    }

    #[instrument(skip(self, command), fields(command_type = command.command_type()))]
    async fn handle(&self, command: ContentRepositoryCommand) -> CommandHandlingResult<CommandResult> {
        let Some(content_stream_identifier) = command.node_content_stream_identifier() else {
            return Err(CommandError::InvalidCommand(format!(
                "{} does not address a content stream",
                command.command_type()
            )));
        };
        let command = match command {
            ContentRepositoryCommand::CreateNodeAggregateWithNode(mut c) => {
                complete_tethered_descendant_identifiers(&self.context.node_type_manager, &mut c);
                ContentRepositoryCommand::CreateNodeAggregateWithNode(c)
            }
            other => other,
        };

        let (events, version) = self.decide(&command, content_stream_identifier).await?;
        if events.is_empty() {
            debug!("Command produced no events");
            return self.context.result(None).await;
        }

        let mut scope = self.context.publisher.with_command(&command)?;
        let result = scope
            .publish(
                &StreamName::for_content_stream(&content_stream_identifier),
                events,
                ExpectedVersion::Exact(version),
            )
            .await;
        drop(scope);
        self.context.result(Some(result?.last_sequence_number)).await
    }
}

/// Assign deterministic identifiers to tethered descendants the caller did not name.
///
/// Identifiers are derived from the new aggregate's identifier and the descendant's path,
/// and are stored on the command so a rebase recreates the same descendants.
fn complete_tethered_descendant_identifiers(
    node_type_manager: &NodeTypeManager,
    command: &mut CreateNodeAggregateWithNode,
) {
    let root = command.node_aggregate_identifier;
    let node_type_name = command.node_type_name.clone();
    complete_below(
        node_type_manager,
        &node_type_name,
        &NodePath::from_names(Vec::new()),
        &root,
        command,
    );
}

fn complete_below(
    node_type_manager: &NodeTypeManager,
    node_type_name: &NodeTypeName,
    path: &NodePath,
    root: &NodeAggregateIdentifier,
    command: &mut CreateNodeAggregateWithNode,
) {
    let Some(node_type) = node_type_manager.get_node_type(node_type_name) else {
        return;
    };
    for tethered in node_type.tethered_nodes() {
        let path = path.appended(tethered.name.clone());
        let key = crate::commands::path_key(&path);
        command
            .tethered_descendant_node_aggregate_identifiers
            .entry(key.clone())
            .or_insert_with(|| NodeAggregateIdentifier::for_tethered_descendant(root, &key));
        complete_below(node_type_manager, &tethered.node_type_name, &path, root, command);
    }
}
