//! Projection Tests
//!
//! ## Test Coverage
//!
//! ```mermaid
//! graph TD
//!     A[Commands] --> B[Event Store]
//!     B --> C[Catch Up]
//!     C --> D[Content Graph]
//!     C --> E[Workspaces]
//!     C --> F[Content Streams]
//!     B --> G[Replay From Zero]
//!     G --> H[Identical Projections]
//!     C --> I[Manual Mode Conflicts]
//! ```

mod common;

use cim_content_repository::commands::{
    CreateNodeVariant, DisableNodeAggregate, MoveNodeAggregate, SetNodeProperties, SetNodeReferences,
};
use cim_content_repository::value_objects::ReferenceName;
use cim_content_repository::{
    ContentRepository, NodeAggregateIdentifier, NodeFilter, NodeVariantSelectionStrategy, ProjectionMode,
    PropertyValuesToWrite, RelationDistributionStrategy, VisibilityConstraints,
};
use common::{config, en, en_us, mul, user, Fixture};
use serde_json::json;

fn set_title(fx: &Fixture, node: NodeAggregateIdentifier, title: &str) -> SetNodeProperties {
    SetNodeProperties {
        content_stream_identifier: fx.live,
        node_aggregate_identifier: node,
        origin_dimension_space_point: mul().into(),
        property_values: PropertyValuesToWrite::empty().with("title", json!(title)),
        initiating_user_identifier: user(),
    }
}

/// Documents with variants, references, a move, a disabled node and a user workspace
async fn populate(fx: &Fixture) {
    let first = fx.create_document(fx.live, fx.root, "first", mul()).await;
    let second = fx.create_document(fx.live, fx.root, "second", mul()).await;
    let nested = fx.create_document(fx.live, first, "nested", en()).await;

    let commands: Vec<cim_content_repository::ContentRepositoryCommand> = vec![
        CreateNodeVariant {
            content_stream_identifier: fx.live,
            node_aggregate_identifier: first,
            source_origin: mul().into(),
            target_origin: en_us().into(),
            initiating_user_identifier: user(),
        }
        .into(),
        set_title(fx, first, "First").into(),
        SetNodeReferences {
            content_stream_identifier: fx.live,
            source_node_aggregate_identifier: second,
            source_origin_dimension_space_point: mul().into(),
            reference_name: ReferenceName::new("related"),
            destination_node_aggregate_identifiers: vec![first],
            initiating_user_identifier: user(),
        }
        .into(),
        MoveNodeAggregate {
            content_stream_identifier: fx.live,
            node_aggregate_identifier: nested,
            dimension_space_point: en(),
            new_parent_node_aggregate_identifier: Some(second),
            new_succeeding_sibling_node_aggregate_identifier: None,
            relation_distribution_strategy: RelationDistributionStrategy::GatherAll,
            initiating_user_identifier: user(),
        }
        .into(),
        DisableNodeAggregate {
            content_stream_identifier: fx.live,
            node_aggregate_identifier: second,
            covered_dimension_space_point: en_us(),
            node_variant_selection_strategy: NodeVariantSelectionStrategy::OnlyGivenVariant,
            initiating_user_identifier: user(),
        }
        .into(),
    ];
    for command in commands {
        fx.repository.handle(command).await.unwrap();
    }

    let user_stream = fx.create_user_workspace("user-editor").await;
    fx.create_document(user_stream, second, "draft", mul()).await;
}

#[tokio::test]
async fn test_replay_reproduces_identical_projections() {
    let fx = Fixture::new().await;
    populate(&fx).await;

    let graph = (*fx.repository.content_graph().await).clone();
    let workspaces = (*fx.repository.workspace_finder().await).clone();
    let content_streams = (*fx.repository.content_stream_finder().await).clone();

    fx.repository.replay_projections().await.unwrap();

    assert_eq!(*fx.repository.content_graph().await, graph);
    assert_eq!(*fx.repository.workspace_finder().await, workspaces);
    assert_eq!(*fx.repository.content_stream_finder().await, content_streams);
}

#[tokio::test]
async fn test_second_repository_on_same_store_catches_up() {
    let fx = Fixture::new().await;
    populate(&fx).await;

    let follower =
        ContentRepository::from_config(config(ProjectionMode::Manual), fx.repository.event_store().clone()).unwrap();
    assert_eq!(follower.content_graph().await.count_nodes(), 0);

    follower.catch_up_projections().await.unwrap();
    assert_eq!(*follower.content_graph().await, *fx.repository.content_graph().await);
    assert_eq!(*follower.workspace_finder().await, *fx.repository.workspace_finder().await);
}

#[tokio::test]
async fn test_manual_mode_rejects_commands_on_stale_projections() {
    let fx = Fixture::with_mode(ProjectionMode::Manual).await;
    let document = fx.create_document(fx.live, fx.root, "about", mul()).await;

    let first = fx.repository.handle(set_title(&fx, document, "One")).await.unwrap();
    let err = fx
        .repository
        .handle(set_title(&fx, document, "Two"))
        .await
        .unwrap_err();
    assert!(err.is_retryable(), "unexpected error: {err}");

    first.block_until_projections_are_up_to_date().await.unwrap();
    fx.repository
        .handle(set_title(&fx, document, "Two"))
        .await
        .unwrap()
        .block_until_projections_are_up_to_date()
        .await
        .unwrap();

    let graph = fx.repository.content_graph().await;
    let node = graph
        .subgraph(fx.live, mul(), VisibilityConstraints::frontend())
        .find_node_by_node_aggregate_identifier(&document)
        .unwrap();
    assert_eq!(node.property("title"), Some(&json!("Two")));
}

#[tokio::test]
async fn test_subgraph_queries_over_populated_graph() {
    let fx = Fixture::new().await;
    populate(&fx).await;

    let graph = fx.repository.content_graph().await;
    let subgraph = graph.subgraph(fx.live, en(), VisibilityConstraints::frontend());
    assert_eq!(subgraph.find_child_nodes(&fx.root, &NodeFilter::all()).len(), 2);
    assert_eq!(subgraph.find_child_nodes(&fx.root, &NodeFilter::all().paginated(1, 5)).len(), 1);

    let roots = [fx.root];
    let subtrees = subgraph.find_subtrees(&roots, 10, &cim_content_repository::NodeTypeConstraints::allow_all());
    assert_eq!(subtrees.len(), 1);
    // root, two documents with their tethered collections, and the moved document with its collection
    assert_eq!(subtrees[0].node_count(), 7);

    let found = subgraph.find_descendants(
        &roots,
        &cim_content_repository::NodeTypeConstraints::parse("Acme:Document"),
        Some("first"),
        None,
    );
    assert_eq!(found.len(), 1);

    let hidden = graph.subgraph(fx.live, en_us(), VisibilityConstraints::frontend());
    assert_eq!(hidden.find_child_nodes(&fx.root, &NodeFilter::all()).len(), 1);
    let shown = graph.subgraph(fx.live, en_us(), VisibilityConstraints::without_restrictions());
    assert_eq!(shown.find_child_nodes(&fx.root, &NodeFilter::all()).len(), 2);
}
