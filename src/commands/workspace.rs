//! Workspace commands

use crate::value_objects::{ContentStreamIdentifier, UserIdentifier, WorkspaceName, WorkspaceTitle};
use serde::{Deserialize, Serialize};

/// Create the base-less root workspace on a fresh content stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRootWorkspace {
    pub workspace_name: WorkspaceName,
    pub workspace_title: WorkspaceTitle,
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// Create a workspace forked from a base workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateWorkspace {
    pub workspace_name: WorkspaceName,
    pub base_workspace_name: WorkspaceName,
    pub workspace_title: WorkspaceTitle,
    #[serde(default)]
    pub workspace_owner: Option<UserIdentifier>,
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// Replay the workspace's changes on top of its base's current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebaseWorkspace {
    pub workspace_name: WorkspaceName,
    /// The content stream the changes are replayed onto
    #[serde(default = "ContentStreamIdentifier::new")]
    pub rebased_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// Copy the workspace's changes into its base workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishWorkspace {
    pub workspace_name: WorkspaceName,
    /// The content stream the workspace continues on after publishing
    #[serde(default = "ContentStreamIdentifier::new")]
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// Drop all changes of the workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscardWorkspace {
    pub workspace_name: WorkspaceName,
    #[serde(default = "ContentStreamIdentifier::new")]
    pub new_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

impl RebaseWorkspace {
    pub fn new(workspace_name: WorkspaceName, initiating_user_identifier: UserIdentifier) -> Self {
        Self {
            workspace_name,
            rebased_content_stream_identifier: ContentStreamIdentifier::new(),
            initiating_user_identifier,
        }
    }
}

impl PublishWorkspace {
    pub fn new(workspace_name: WorkspaceName, initiating_user_identifier: UserIdentifier) -> Self {
        Self {
            workspace_name,
            new_content_stream_identifier: ContentStreamIdentifier::new(),
            initiating_user_identifier,
        }
    }
}

impl DiscardWorkspace {
    pub fn new(workspace_name: WorkspaceName, initiating_user_identifier: UserIdentifier) -> Self {
        Self {
            workspace_name,
            new_content_stream_identifier: ContentStreamIdentifier::new(),
            initiating_user_identifier,
        }
    }
}
