//! Content stream lifecycle events

use crate::value_objects::{ContentStreamIdentifier, UserIdentifier};
use serde::{Deserialize, Serialize};

/// An empty content stream was created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStreamWasCreated {
    /// The new content stream
    pub content_stream_identifier: ContentStreamIdentifier,
    /// Who created it
    pub initiating_user_identifier: UserIdentifier,
}

/// A content stream was forked from another one at a given version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStreamWasForked {
    /// The new content stream
    pub new_content_stream_identifier: ContentStreamIdentifier,
    /// The stream it starts as a copy of
    pub source_content_stream_identifier: ContentStreamIdentifier,
    /// Version of the source stream at the time of forking
    pub version_of_source_content_stream: u64,
    /// Who forked it
    pub initiating_user_identifier: UserIdentifier,
}

/// A content stream was retired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentStreamWasRemoved {
    /// The removed content stream
    pub content_stream_identifier: ContentStreamIdentifier,
    /// Who removed it
    pub initiating_user_identifier: UserIdentifier,
}
