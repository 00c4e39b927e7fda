//! Workspace entity

use crate::value_objects::{ContentStreamIdentifier, UserIdentifier, WorkspaceName, WorkspaceTitle};
use serde::{Deserialize, Serialize};

/// Whether a workspace's content stream still builds on its base's current state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceStatus {
    UpToDate,
    /// The base workspace changed since the last fork; a rebase is required before publishing
    Outdated,
    /// The last rebase failed
    OutdatedConflict,
}

/// A named pointer to a current content stream, with an optional base workspace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub workspace_name: WorkspaceName,
    /// `None` only for the root workspace
    pub base_workspace_name: Option<WorkspaceName>,
    pub workspace_title: WorkspaceTitle,
    pub workspace_owner: Option<UserIdentifier>,
    pub current_content_stream_identifier: ContentStreamIdentifier,
    pub status: WorkspaceStatus,
}

impl Workspace {
    pub fn is_root_workspace(&self) -> bool {
        self.base_workspace_name.is_none()
    }

    pub fn is_up_to_date(&self) -> bool {
        self.status == WorkspaceStatus::UpToDate
    }
}
