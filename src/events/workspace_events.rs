//! Workspace events

use crate::value_objects::{ContentStreamIdentifier, UserIdentifier, WorkspaceName, WorkspaceTitle};
use serde::{Deserialize, Serialize};

/// The base-less root workspace was created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootWorkspaceWasCreated {
    pub workspace_name: WorkspaceName,
    pub workspace_title: WorkspaceTitle,
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// A workspace was created on top of a base workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceWasCreated {
    pub workspace_name: WorkspaceName,
    pub base_workspace_name: WorkspaceName,
    pub workspace_title: WorkspaceTitle,
    pub workspace_owner: Option<UserIdentifier>,
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// The workspace's changes were replayed on top of its base's tip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceWasRebased {
    pub workspace_name: WorkspaceName,
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub previous_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// One command that could not be replayed during a rebase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebaseErrorRecord {
    /// Sequence number of the event whose command failed
    pub sequence_number: u64,
    pub command_type: String,
    pub message: String,
}

/// A rebase failed; the workspace stays on its content stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceRebaseFailed {
    pub workspace_name: WorkspaceName,
    /// The discarded replay target
    pub candidate_content_stream_identifier: ContentStreamIdentifier,
    /// The content stream the workspace keeps
    pub source_content_stream_identifier: ContentStreamIdentifier,
    pub errors: Vec<RebaseErrorRecord>,
    pub initiating_user_identifier: UserIdentifier,
}

/// The workspace's changes were published into its base workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceWasPublished {
    pub source_workspace_name: WorkspaceName,
    pub target_workspace_name: WorkspaceName,
    pub new_source_content_stream_identifier: ContentStreamIdentifier,
    pub previous_source_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// The workspace's changes were dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceWasDiscarded {
    pub workspace_name: WorkspaceName,
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub previous_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}
