//! Content repository commands
//!
//! Commands represent intent to modify the content repository. They are immutable,
//! JSON-serializable and carry every identifier the handlers need, including the
//! initiating user.

mod content_stream;
mod errors;
mod node_aggregate;
mod workspace;

pub use content_stream::*;
pub use errors::{CommandError, CommandHandlingResult};
pub use node_aggregate::*;
pub(crate) use node_aggregate::path_key;
pub use workspace::*;

use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};
use serde::{Deserialize, Serialize};

/// Every command the content repository accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ContentRepositoryCommand {
    CreateContentStream(CreateContentStream),
    ForkContentStream(ForkContentStream),
    RemoveContentStream(RemoveContentStream),
    CreateRootNodeAggregateWithNode(CreateRootNodeAggregateWithNode),
    CreateNodeAggregateWithNode(CreateNodeAggregateWithNode),
    CreateNodeVariant(CreateNodeVariant),
    MoveNodeAggregate(MoveNodeAggregate),
    RemoveNodeAggregate(RemoveNodeAggregate),
    DisableNodeAggregate(DisableNodeAggregate),
    EnableNodeAggregate(EnableNodeAggregate),
    SetNodeProperties(SetNodeProperties),
    SetNodeReferences(SetNodeReferences),
    ChangeNodeAggregateName(ChangeNodeAggregateName),
    CreateRootWorkspace(CreateRootWorkspace),
    CreateWorkspace(CreateWorkspace),
    RebaseWorkspace(RebaseWorkspace),
    PublishWorkspace(PublishWorkspace),
    DiscardWorkspace(DiscardWorkspace),
}

impl ContentRepositoryCommand {
    /// Name of the command variant, as stored in event metadata
    pub fn command_type(&self) -> &'static str {
        match self {
            Self::CreateContentStream(_) => "CreateContentStream",
            Self::ForkContentStream(_) => "ForkContentStream",
            Self::RemoveContentStream(_) => "RemoveContentStream",
            Self::CreateRootNodeAggregateWithNode(_) => "CreateRootNodeAggregateWithNode",
            Self::CreateNodeAggregateWithNode(_) => "CreateNodeAggregateWithNode",
            Self::CreateNodeVariant(_) => "CreateNodeVariant",
            Self::MoveNodeAggregate(_) => "MoveNodeAggregate",
            Self::RemoveNodeAggregate(_) => "RemoveNodeAggregate",
            Self::DisableNodeAggregate(_) => "DisableNodeAggregate",
            Self::EnableNodeAggregate(_) => "EnableNodeAggregate",
            Self::SetNodeProperties(_) => "SetNodeProperties",
            Self::SetNodeReferences(_) => "SetNodeReferences",
            Self::ChangeNodeAggregateName(_) => "ChangeNodeAggregateName",
            Self::CreateRootWorkspace(_) => "CreateRootWorkspace",
            Self::CreateWorkspace(_) => "CreateWorkspace",
            Self::RebaseWorkspace(_) => "RebaseWorkspace",
            Self::PublishWorkspace(_) => "PublishWorkspace",
            Self::DiscardWorkspace(_) => "DiscardWorkspace",
        }
    }

    /// Rebuild a command from the type and payload stored in event metadata
    pub fn from_parts(command_type: &str, payload: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(serde_json::json!({ "type": command_type, "payload": payload }))
    }

    /// The command payload without the type tag
    pub fn payload(&self) -> serde_json::Result<serde_json::Value> {
        let mut value = serde_json::to_value(self)?;
        Ok(value
            .get_mut("payload")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null))
    }

    /// Whether the command operates on the nodes of one content stream
    pub fn is_node_aggregate_command(&self) -> bool {
        self.node_content_stream_identifier().is_some()
    }

    /// The content stream a node aggregate command addresses
    pub fn node_content_stream_identifier(&self) -> Option<ContentStreamIdentifier> {
        match self {
            Self::CreateRootNodeAggregateWithNode(c) => Some(c.content_stream_identifier),
            Self::CreateNodeAggregateWithNode(c) => Some(c.content_stream_identifier),
            Self::CreateNodeVariant(c) => Some(c.content_stream_identifier),
            Self::MoveNodeAggregate(c) => Some(c.content_stream_identifier),
            Self::RemoveNodeAggregate(c) => Some(c.content_stream_identifier),
            Self::DisableNodeAggregate(c) => Some(c.content_stream_identifier),
            Self::EnableNodeAggregate(c) => Some(c.content_stream_identifier),
            Self::SetNodeProperties(c) => Some(c.content_stream_identifier),
            Self::SetNodeReferences(c) => Some(c.content_stream_identifier),
            Self::ChangeNodeAggregateName(c) => Some(c.content_stream_identifier),
            _ => None,
        }
    }

    pub fn initiating_user_identifier(&self) -> &UserIdentifier {
        match self {
            Self::CreateContentStream(c) => &c.initiating_user_identifier,
            Self::ForkContentStream(c) => &c.initiating_user_identifier,
            Self::RemoveContentStream(c) => &c.initiating_user_identifier,
            Self::CreateRootNodeAggregateWithNode(c) => &c.initiating_user_identifier,
            Self::CreateNodeAggregateWithNode(c) => &c.initiating_user_identifier,
            Self::CreateNodeVariant(c) => &c.initiating_user_identifier,
            Self::MoveNodeAggregate(c) => &c.initiating_user_identifier,
            Self::RemoveNodeAggregate(c) => &c.initiating_user_identifier,
            Self::DisableNodeAggregate(c) => &c.initiating_user_identifier,
            Self::EnableNodeAggregate(c) => &c.initiating_user_identifier,
            Self::SetNodeProperties(c) => &c.initiating_user_identifier,
            Self::SetNodeReferences(c) => &c.initiating_user_identifier,
            Self::ChangeNodeAggregateName(c) => &c.initiating_user_identifier,
            Self::CreateRootWorkspace(c) => &c.initiating_user_identifier,
            Self::CreateWorkspace(c) => &c.initiating_user_identifier,
            Self::RebaseWorkspace(c) => &c.initiating_user_identifier,
            Self::PublishWorkspace(c) => &c.initiating_user_identifier,
            Self::DiscardWorkspace(c) => &c.initiating_user_identifier,
        }
    }

    /// A copy of a node aggregate command addressing another content stream
    pub fn create_copy_for_content_stream(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
    ) -> Option<Self> {
        let csi = content_stream_identifier;
        Some(match self {
            Self::CreateRootNodeAggregateWithNode(c) => {
                Self::CreateRootNodeAggregateWithNode(c.create_copy_for_content_stream(csi))
            }
            Self::CreateNodeAggregateWithNode(c) => {
                Self::CreateNodeAggregateWithNode(c.create_copy_for_content_stream(csi))
            }
            Self::CreateNodeVariant(c) => Self::CreateNodeVariant(c.create_copy_for_content_stream(csi)),
            Self::MoveNodeAggregate(c) => Self::MoveNodeAggregate(c.create_copy_for_content_stream(csi)),
            Self::RemoveNodeAggregate(c) => Self::RemoveNodeAggregate(c.create_copy_for_content_stream(csi)),
            Self::DisableNodeAggregate(c) => Self::DisableNodeAggregate(c.create_copy_for_content_stream(csi)),
            Self::EnableNodeAggregate(c) => Self::EnableNodeAggregate(c.create_copy_for_content_stream(csi)),
            Self::SetNodeProperties(c) => Self::SetNodeProperties(c.create_copy_for_content_stream(csi)),
            Self::SetNodeReferences(c) => Self::SetNodeReferences(c.create_copy_for_content_stream(csi)),
            Self::ChangeNodeAggregateName(c) => {
                Self::ChangeNodeAggregateName(c.create_copy_for_content_stream(csi))
            }
            _ => return None,
        })
    }
}

macro_rules! into_command {
    ($($command:ident),* $(,)?) => {
        $(
            impl From<$command> for ContentRepositoryCommand {
                fn from(command: $command) -> Self {
                    Self::$command(command)
                }
            }
        )*
    };
}

into_command!(
    CreateContentStream,
    ForkContentStream,
    RemoveContentStream,
    CreateRootNodeAggregateWithNode,
    CreateNodeAggregateWithNode,
    CreateNodeVariant,
    MoveNodeAggregate,
    RemoveNodeAggregate,
    DisableNodeAggregate,
    EnableNodeAggregate,
    SetNodeProperties,
    SetNodeReferences,
    ChangeNodeAggregateName,
    CreateRootWorkspace,
    CreateWorkspace,
    RebaseWorkspace,
    PublishWorkspace,
    DiscardWorkspace,
);
