//! Node type schema
//!
//! Node types declare properties, references, tethered child nodes and which child node
//! types they accept. They are resolved once at startup; inheritance is flattened so that
//! lookups at command time never walk the type hierarchy.

mod constraints;
mod manager;
mod node_type;
mod property_type;

pub use constraints::NodeTypeConstraints;
pub use manager::NodeTypeManager;
pub use node_type::{NodeType, TetheredNodeDefinition};
pub use property_type::serialize_property_value;
