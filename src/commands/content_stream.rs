//! Content stream commands

use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};
use serde::{Deserialize, Serialize};

/// Create an empty content stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateContentStream {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// Create a content stream starting as a copy of another one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForkContentStream {
    /// The new content stream
    pub content_stream_identifier: ContentStreamIdentifier,
    pub source_content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}

/// Retire a content stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveContentStream {
    pub content_stream_identifier: ContentStreamIdentifier,
    pub initiating_user_identifier: UserIdentifier,
}
