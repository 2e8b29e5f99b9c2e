//! Posts and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::ids::{CommentId, IdentityId, PostId};

/// A post in the public feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post identifier.
    pub id: PostId,
    /// Author of the post.
    pub author_id: IdentityId,
    /// Text content. May be empty when the post carries media.
    pub content: String,
    /// Attached image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Trade the post refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_ref_id: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last time the post or its counters changed.
    pub updated_at: DateTime<Utc>,
    /// Likes received.
    pub likes_count: u64,
    /// Comments received.
    pub comments_count: u64,
    /// Reposts received.
    pub reposts_count: u64,
}

/// A comment on a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment identifier.
    pub id: CommentId,
    /// Post the comment belongs to.
    pub post_id: PostId,
    /// Author of the comment.
    pub author_id: IdentityId,
    /// Text content.
    pub content: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
