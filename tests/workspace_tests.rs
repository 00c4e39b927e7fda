//! Workspace Lifecycle Tests
//!
//! ## Test Coverage
//!
//! ```mermaid
//! graph TD
//!     A[Root Workspace] --> B[Create User Workspace]
//!     B --> C[Isolated Changes]
//!     C --> D[Publish]
//!     D --> J[Causation Chain Kept]
//!     C --> E[Outdated Publish Rejected]
//!     E --> F[Rebase]
//!     F --> G[Rebase Conflict]
//!     C --> H[Discard]
//!     F --> I[Remove Unused Content Streams]
//! ```

mod common;

use cim_content_repository::commands::{
    CreateRootWorkspace, CreateWorkspace, DiscardWorkspace, PublishWorkspace, RebaseWorkspace, RemoveNodeAggregate,
    SetNodeProperties,
};
use cim_content_repository::value_objects::WorkspaceTitle;
use cim_content_repository::{
    CommandError, ContentStreamIdentifier, NodeAggregateIdentifier, NodeVariantSelectionStrategy,
    PropertyValuesToWrite, StreamName, VisibilityConstraints, WorkspaceName, WorkspaceStatus,
};
use common::{de, mul, user, Fixture};
use serde_json::json;

async fn sees(fx: &Fixture, content_stream_identifier: ContentStreamIdentifier, node: NodeAggregateIdentifier) -> bool {
    let graph = fx.repository.content_graph().await;
    graph
        .subgraph(content_stream_identifier, mul(), VisibilityConstraints::frontend())
        .find_node_by_node_aggregate_identifier(&node)
        .is_some()
}

async fn status(fx: &Fixture, workspace_name: &str) -> WorkspaceStatus {
    fx.repository
        .workspace_finder()
        .await
        .find_by_name(&WorkspaceName::new(workspace_name))
        .unwrap()
        .status
}

fn publish(workspace_name: &str) -> PublishWorkspace {
    PublishWorkspace::new(WorkspaceName::new(workspace_name), user())
}

fn rebase(workspace_name: &str) -> RebaseWorkspace {
    RebaseWorkspace::new(WorkspaceName::new(workspace_name), user())
}

#[tokio::test]
async fn test_user_workspace_changes_are_isolated() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    assert_ne!(user_stream, fx.live);

    let draft = fx.create_document(user_stream, fx.root, "draft", mul()).await;
    assert!(sees(&fx, user_stream, draft).await);
    assert!(!sees(&fx, fx.live, draft).await);

    let workspaces = fx.repository.workspace_finder().await;
    let workspace = workspaces.find_by_name(&WorkspaceName::new("user-editor")).unwrap();
    assert_eq!(workspace.base_workspace_name, Some(WorkspaceName::for_live()));
    assert_eq!(workspace.workspace_owner, Some(user()));
    assert!(workspace.is_up_to_date());
    assert_eq!(workspaces.find_dependent_workspaces(&WorkspaceName::for_live()).len(), 1);
}

#[tokio::test]
async fn test_live_changes_are_visible_in_forks_created_afterwards_only() {
    let fx = Fixture::new().await;
    let before = fx.create_user_workspace("before").await;
    let page = fx.create_document(fx.live, fx.root, "page", mul()).await;
    let after = fx.create_user_workspace("after").await;

    assert!(!sees(&fx, before, page).await);
    assert!(sees(&fx, after, page).await);
    assert_eq!(status(&fx, "before").await, WorkspaceStatus::Outdated);
    assert_eq!(status(&fx, "after").await, WorkspaceStatus::UpToDate);
}

#[tokio::test]
async fn test_publish_copies_changes_into_base() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    let draft = fx.create_document(user_stream, fx.root, "draft", mul()).await;
    fx.repository
        .handle(SetNodeProperties {
            content_stream_identifier: user_stream,
            node_aggregate_identifier: draft,
            origin_dimension_space_point: mul().into(),
            property_values: PropertyValuesToWrite::empty().with("title", json!("Draft")),
            initiating_user_identifier: user(),
        })
        .await
        .unwrap();

    fx.repository.handle(publish("user-editor")).await.unwrap();

    assert!(sees(&fx, fx.live, draft).await);
    let graph = fx.repository.content_graph().await;
    let node = graph
        .subgraph(fx.live, de(), VisibilityConstraints::frontend())
        .find_node_by_node_aggregate_identifier(&draft)
        .unwrap();
    assert_eq!(node.property("title"), Some(&json!("Draft")));
    drop(graph);

    let new_stream = fx.current_stream("user-editor").await;
    assert_ne!(new_stream, user_stream);
    assert!(sees(&fx, new_stream, draft).await);
    assert_eq!(status(&fx, "user-editor").await, WorkspaceStatus::UpToDate);
    let content_streams = fx.repository.content_stream_finder().await;
    assert!(content_streams.find(&user_stream).unwrap().is_removed());
}

#[tokio::test]
async fn test_published_batches_keep_their_causation_chain() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    // the document and its tethered collection are one batch
    fx.create_document(user_stream, fx.root, "draft", mul()).await;
    let drafted = fx
        .repository
        .event_store()
        .load_stream(&StreamName::for_content_stream(&user_stream))
        .await
        .unwrap();

    fx.repository.handle(publish("user-editor")).await.unwrap();

    let events = fx
        .repository
        .event_store()
        .load_stream(&StreamName::for_content_stream(&fx.live))
        .await
        .unwrap();
    let n = events.len();
    assert!(n >= 2);
    assert_eq!(events[n - 2].causation_id, None);
    assert_eq!(events[n - 1].causation_id, Some(events[n - 2].event_id));
    assert!(drafted.iter().all(|original| original.event_id != events[n - 2].event_id));
}

#[tokio::test]
async fn test_publishing_outdated_workspace_requires_rebase() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    let draft = fx.create_document(user_stream, fx.root, "draft", mul()).await;
    let page = fx.create_document(fx.live, fx.root, "page", mul()).await;

    let err = fx.repository.handle(publish("user-editor")).await.unwrap_err();
    assert!(matches!(err, CommandError::BaseWorkspaceHasBeenModifiedInTheMeantime { .. }));
    assert!(err.is_retryable());
    assert!(!sees(&fx, fx.live, draft).await);

    fx.repository.handle(rebase("user-editor")).await.unwrap();
    let rebased = fx.current_stream("user-editor").await;
    assert_ne!(rebased, user_stream);
    assert!(sees(&fx, rebased, draft).await);
    assert!(sees(&fx, rebased, page).await);
    assert_eq!(status(&fx, "user-editor").await, WorkspaceStatus::UpToDate);

    fx.repository.handle(publish("user-editor")).await.unwrap();
    assert!(sees(&fx, fx.live, draft).await);
}

#[tokio::test]
async fn test_rebase_of_up_to_date_workspace_keeps_content_stream() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    fx.create_document(user_stream, fx.root, "draft", mul()).await;

    fx.repository.handle(rebase("user-editor")).await.unwrap();
    assert_eq!(fx.current_stream("user-editor").await, user_stream);
}

#[tokio::test]
async fn test_rebase_conflict_keeps_workspace_on_its_stream() {
    let fx = Fixture::new().await;
    let page = fx.create_document(fx.live, fx.root, "page", mul()).await;
    let user_stream = fx.create_user_workspace("user-editor").await;

    fx.repository
        .handle(SetNodeProperties {
            content_stream_identifier: user_stream,
            node_aggregate_identifier: page,
            origin_dimension_space_point: mul().into(),
            property_values: PropertyValuesToWrite::empty().with("title", json!("Edited")),
            initiating_user_identifier: user(),
        })
        .await
        .unwrap();
    fx.repository
        .handle(RemoveNodeAggregate {
            content_stream_identifier: fx.live,
            node_aggregate_identifier: page,
            covered_dimension_space_point: mul(),
            node_variant_selection_strategy: NodeVariantSelectionStrategy::AllVariants,
            initiating_user_identifier: user(),
        })
        .await
        .unwrap();

    let err = fx.repository.handle(rebase("user-editor")).await.unwrap_err();
    match err {
        CommandError::WorkspaceRebaseFailed { workspace_name, errors } => {
            assert_eq!(workspace_name, WorkspaceName::new("user-editor"));
            assert_eq!(errors.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(fx.current_stream("user-editor").await, user_stream);
    assert_eq!(status(&fx, "user-editor").await, WorkspaceStatus::OutdatedConflict);
    let graph = fx.repository.content_graph().await;
    let node = graph
        .subgraph(user_stream, mul(), VisibilityConstraints::frontend())
        .find_node_by_node_aggregate_identifier(&page)
        .unwrap();
    assert_eq!(node.property("title"), Some(&json!("Edited")));
}

#[tokio::test]
async fn test_discard_drops_changes() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    let draft = fx.create_document(user_stream, fx.root, "draft", mul()).await;
    let page = fx.create_document(fx.live, fx.root, "page", mul()).await;

    fx.repository
        .handle(DiscardWorkspace::new(WorkspaceName::new("user-editor"), user()))
        .await
        .unwrap();

    let discarded = fx.current_stream("user-editor").await;
    assert_ne!(discarded, user_stream);
    assert!(!sees(&fx, discarded, draft).await);
    assert!(sees(&fx, discarded, page).await);
    assert_eq!(status(&fx, "user-editor").await, WorkspaceStatus::UpToDate);
    assert!(!fx.repository.content_graph().await.has_content_stream(&user_stream));
}

#[tokio::test]
async fn test_remove_unused_content_streams_after_rebase() {
    let fx = Fixture::new().await;
    let user_stream = fx.create_user_workspace("user-editor").await;
    fx.create_document(user_stream, fx.root, "draft", mul()).await;
    fx.create_document(fx.live, fx.root, "page", mul()).await;
    fx.repository.handle(rebase("user-editor")).await.unwrap();

    let removed = fx.repository.remove_unused_content_streams().await.unwrap();
    assert_eq!(removed, vec![user_stream]);
    assert!(!fx.repository.content_stream_finder().await.exists(&user_stream));
    assert!(!fx.repository.content_graph().await.has_content_stream(&user_stream));

    assert!(fx.repository.remove_unused_content_streams().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_workspace_command_preconditions() {
    let fx = Fixture::new().await;

    let err = fx
        .repository
        .handle(CreateRootWorkspace {
            workspace_name: WorkspaceName::new("other"),
            workspace_title: WorkspaceTitle::new("Other"),
            new_content_stream_identifier: ContentStreamIdentifier::new(),
            initiating_user_identifier: user(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::RootWorkspaceAlreadyExists(_)));

    let err = fx
        .repository
        .handle(CreateWorkspace {
            workspace_name: WorkspaceName::new("orphan"),
            base_workspace_name: WorkspaceName::new("missing"),
            workspace_title: WorkspaceTitle::new("Orphan"),
            workspace_owner: None,
            new_content_stream_identifier: ContentStreamIdentifier::new(),
            initiating_user_identifier: user(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::BaseWorkspaceDoesNotExist(_)));

    fx.create_user_workspace("user-editor").await;
    let err = fx
        .repository
        .handle(CreateWorkspace {
            workspace_name: WorkspaceName::new("user-editor"),
            base_workspace_name: WorkspaceName::for_live(),
            workspace_title: WorkspaceTitle::new("Again"),
            workspace_owner: None,
            new_content_stream_identifier: ContentStreamIdentifier::new(),
            initiating_user_identifier: user(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::WorkspaceAlreadyExists(_)));

    let err = fx.repository.handle(publish("live")).await.unwrap_err();
    assert!(matches!(err, CommandError::WorkspaceHasNoBaseWorkspace(_)));

    let err = fx.repository.handle(rebase("missing")).await.unwrap_err();
    assert!(matches!(err, CommandError::WorkspaceDoesNotExist(_)));
}

#[tokio::test]
async fn test_nested_workspaces_publish_step_by_step() {
    let fx = Fixture::new().await;
    fx.create_user_workspace("review").await;
    let review_stream = fx.current_stream("review").await;

    let nested_stream = ContentStreamIdentifier::new();
    fx.repository
        .handle(CreateWorkspace {
            workspace_name: WorkspaceName::new("user-editor"),
            base_workspace_name: WorkspaceName::new("review"),
            workspace_title: WorkspaceTitle::new("Editor"),
            workspace_owner: Some(user()),
            new_content_stream_identifier: nested_stream,
            initiating_user_identifier: user(),
        })
        .await
        .unwrap();
    let draft = fx.create_document(nested_stream, fx.root, "draft", mul()).await;

    fx.repository.handle(publish("user-editor")).await.unwrap();
    assert!(sees(&fx, review_stream, draft).await);
    assert!(!sees(&fx, fx.live, draft).await);

    fx.repository.handle(publish("review")).await.unwrap();
    assert!(sees(&fx, fx.live, draft).await);
    assert_eq!(status(&fx, "user-editor").await, WorkspaceStatus::Outdated);
}
