//! Identifiers used throughout the content repository

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Parse from the hyphenated string form
            pub fn parse(value: &str) -> Result<Self, uuid::Error> {
                Uuid::parse_str(value).map(Self)
            }

            /// The underlying UUID
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create from any string-like value
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Borrow the raw value
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

uuid_identifier!(
    /// Identifies an isolated, append-only sequence of node-mutation events
    ContentStreamIdentifier
);

uuid_identifier!(
    /// Stable logical identity of a node across dimension variants and history
    NodeAggregateIdentifier
);

uuid_identifier!(
    /// Unique identifier of a stored event
    EventId
);

uuid_identifier!(
    /// Groups all events caused by one logical command
    CorrelationId
);

string_identifier!(
    /// Human-facing workspace name, e.g. `live` or `user-alice`
    WorkspaceName
);

string_identifier!(
    /// Identifies the user on whose behalf a command is issued
    UserIdentifier
);

string_identifier!(
    /// Fully qualified node type name, e.g. `Acme:Document.Page`
    NodeTypeName
);

string_identifier!(
    /// Name of a node property
    PropertyName
);

string_identifier!(
    /// Name of a named, ordered reference
    ReferenceName
);

string_identifier!(
    /// Human-readable workspace title
    WorkspaceTitle
);

impl WorkspaceName {
    /// The conventional name of the root workspace
    pub fn for_live() -> Self {
        Self::new("live")
    }

    /// Whether this is the conventional live workspace
    pub fn is_live(&self) -> bool {
        self.0 == "live"
    }
}

impl UserIdentifier {
    /// Commands issued by the system itself
    pub fn system_user() -> Self {
        Self::new("system")
    }
}

impl NodeAggregateIdentifier {
    /// Derive a stable identifier from a parent and a tethered child path.
    ///
    /// Used when a tethered descendant id was not supplied by the caller.
    pub fn for_tethered_descendant(parent: &NodeAggregateIdentifier, path: &str) -> Self {
        let digest = blake3::hash(format!("{}/{}", parent, path).as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest.as_bytes()[..16]);
        Self(uuid::Builder::from_random_bytes(bytes).into_uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_identifier_roundtrip() {
        let id = ContentStreamIdentifier::new();
        let parsed = ContentStreamIdentifier::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_tethered_descendant_ids_are_stable() {
        let parent = NodeAggregateIdentifier::new();
        let a = NodeAggregateIdentifier::for_tethered_descendant(&parent, "main");
        let b = NodeAggregateIdentifier::for_tethered_descendant(&parent, "main");
        let c = NodeAggregateIdentifier::for_tethered_descendant(&parent, "footer");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_live_workspace_name() {
        assert!(WorkspaceName::for_live().is_live());
        assert!(!WorkspaceName::new("user-alice").is_live());
    }
}
