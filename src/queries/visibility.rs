//! Visibility constraints of subgraph queries

use serde::{Deserialize, Serialize};

/// Which nodes a subgraph hides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisibilityConstraints {
    /// Show disabled nodes and everything below them
    pub disabled_content_shown: bool,
}

impl VisibilityConstraints {
    /// What visitors see: disabled nodes and their descendants are hidden
    pub fn frontend() -> Self {
        Self {
            disabled_content_shown: false,
        }
    }

    /// Every node is visible
    pub fn without_restrictions() -> Self {
        Self {
            disabled_content_shown: true,
        }
    }

    pub fn is_disabled_content_shown(&self) -> bool {
        self.disabled_content_shown
    }
}

impl Default for VisibilityConstraints {
    fn default() -> Self {
        Self::frontend()
    }
}
