//! Shared fixture for the content repository integration tests
#![allow(dead_code)]

use cim_content_repository::commands::{
    CreateNodeAggregateWithNode, CreateRootNodeAggregateWithNode, CreateRootWorkspace, CreateWorkspace,
};
use cim_content_repository::value_objects::WorkspaceTitle;
use cim_content_repository::{
    ContentRepository, ContentRepositoryConfig, ContentStreamIdentifier, DimensionSpacePoint,
    NodeAggregateIdentifier, NodeName, ProjectionMode, UserIdentifier, WorkspaceName,
};

/// Language `mul -> en -> en-US` and `mul -> de`, market `world -> CH`; `en-US` only exists
/// in the `world` market.
pub const CONFIG: &str = r#"
    identifier = "acme"

    [[dimensions]]
    identifier = "language"
    default = "mul"
    values = [
        { value = "mul" },
        { value = "en", generalization = "mul" },
        { value = "en-US", generalization = "en", constraints = { market = { "CH" = false } } },
        { value = "de", generalization = "mul" },
    ]

    [[dimensions]]
    identifier = "market"
    default = "world"
    values = [
        { value = "world" },
        { value = "CH", generalization = "world" },
    ]

    [node_types."Acme:Root"]
    root = true

    [node_types."Acme:Document"]
    properties.title = { type = "string", default_value = "untitled" }
    properties.uriPathSegment = { type = "string", scope = "nodeAggregate" }
    properties.teaser = { type = "string", scope = "specializations" }
    properties.weight = { type = "integer" }
    references.related = { max_items = 2, node_types = { "Acme:Document" = true } }
    child_nodes.main = { type = "Acme:ContentCollection", constraints = { "Acme:Content" = true, "*" = false } }
    constraints = { "Acme:Document" = true, "*" = false }

    [node_types."Acme:ContentCollection"]
    constraints = { "*" = true }

    [node_types."Acme:Content"]
    abstract = true

    [node_types."Acme:Text"]
    super_types = ["Acme:Content"]
    properties.text = { type = "string" }

    [node_types."Acme:Image"]
    properties.src = { type = "string" }
"#;

pub fn config(projection_mode: ProjectionMode) -> ContentRepositoryConfig {
    let mut config = ContentRepositoryConfig::from_toml_str(CONFIG).unwrap();
    config.projection_mode = projection_mode;
    config
}

pub fn dsp(language: &str, market: &str) -> DimensionSpacePoint {
    DimensionSpacePoint::from_pairs([("language", language), ("market", market)])
}

pub fn mul() -> DimensionSpacePoint {
    dsp("mul", "world")
}

pub fn en() -> DimensionSpacePoint {
    dsp("en", "world")
}

pub fn en_us() -> DimensionSpacePoint {
    dsp("en-US", "world")
}

pub fn de() -> DimensionSpacePoint {
    dsp("de", "world")
}

pub fn name(value: &str) -> NodeName {
    NodeName::new(value).unwrap()
}

pub fn user() -> UserIdentifier {
    UserIdentifier::new("editor")
}

/// A repository with a `live` root workspace holding one `Acme:Root` node
pub struct Fixture {
    pub repository: ContentRepository,
    pub live: ContentStreamIdentifier,
    pub root: NodeAggregateIdentifier,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_mode(ProjectionMode::Synchronous).await
    }

    pub async fn with_mode(projection_mode: ProjectionMode) -> Self {
        let repository = ContentRepository::in_memory(config(projection_mode)).unwrap();
        let live = ContentStreamIdentifier::new();
        let root = NodeAggregateIdentifier::new();

        repository
            .handle(CreateRootWorkspace {
                workspace_name: WorkspaceName::for_live(),
                workspace_title: WorkspaceTitle::new("Live"),
                new_content_stream_identifier: live,
                initiating_user_identifier: user(),
            })
            .await
            .unwrap()
            .block_until_projections_are_up_to_date()
            .await
            .unwrap();
        repository
            .handle(CreateRootNodeAggregateWithNode {
                content_stream_identifier: live,
                node_aggregate_identifier: root,
                node_type_name: "Acme:Root".into(),
                initiating_user_identifier: user(),
            })
            .await
            .unwrap()
            .block_until_projections_are_up_to_date()
            .await
            .unwrap();

        Self {
            repository,
            live,
            root,
        }
    }

    /// Create a document named `node_name` below `parent` at `origin`
    pub async fn create_document(
        &self,
        content_stream_identifier: ContentStreamIdentifier,
        parent: NodeAggregateIdentifier,
        node_name: &str,
        origin: DimensionSpacePoint,
    ) -> NodeAggregateIdentifier {
        let document = NodeAggregateIdentifier::new();
        self.repository
            .handle(
                CreateNodeAggregateWithNode::new(
                    content_stream_identifier,
                    document,
                    "Acme:Document",
                    origin,
                    parent,
                    user(),
                )
                .with_node_name(name(node_name)),
            )
            .await
            .unwrap()
            .block_until_projections_are_up_to_date()
            .await
            .unwrap();
        document
    }

    /// Fork a user workspace from `live`, returning its content stream
    pub async fn create_user_workspace(&self, workspace_name: &str) -> ContentStreamIdentifier {
        let content_stream_identifier = ContentStreamIdentifier::new();
        self.repository
            .handle(CreateWorkspace {
                workspace_name: WorkspaceName::new(workspace_name),
                base_workspace_name: WorkspaceName::for_live(),
                workspace_title: WorkspaceTitle::new(workspace_name),
                workspace_owner: Some(user()),
                new_content_stream_identifier: content_stream_identifier,
                initiating_user_identifier: user(),
            })
            .await
            .unwrap()
            .block_until_projections_are_up_to_date()
            .await
            .unwrap();
        content_stream_identifier
    }

    /// The current content stream of a workspace
    pub async fn current_stream(&self, workspace_name: &str) -> ContentStreamIdentifier {
        self.repository
            .workspace_finder()
            .await
            .find_by_name(&WorkspaceName::new(workspace_name))
            .unwrap()
            .current_content_stream_identifier
    }
}
