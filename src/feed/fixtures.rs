//! Demo posts and comments used to seed the feed at startup.

use chrono::{DateTime, Duration, Utc};

use crate::core::errors::TradenomixResult;
use crate::core::ids::{CommentId, IdentityId, PostId};
use crate::feed::types::{Comment, Post};

/// (post id, author, content, minutes ago, likes, reposts)
const POSTS: &[(&str, &str, &str, i64, u64, u64)] = &[
    (
        "1",
        "Alex",
        "Long BTC/USD from the 4h demand zone. Stop under the wick, targeting 2R.",
        120,
        12,
        2,
    ),
    (
        "2",
        "Marcus",
        "Risking 0.5% per trade this week while NASDAQ volatility stays this high.",
        15,
        5,
        0,
    ),
];

/// (comment id, post id, author, content, minutes ago)
const COMMENTS: &[(&str, &str, &str, &str, i64)] = &[
    ("c1", "1", "Alice", "This trade setup looks solid 🔥", 60),
    ("c2", "1", "Bob", "I tried something similar yesterday!", 30),
    ("c3", "2", "Charlie", "Interesting risk management approach.", 5),
];

/// Build the seed posts and comments relative to `now`. Comment counters match the
/// seeded comments.
///
/// # Errors
/// Returns an error if a seed identifier fails validation.
pub fn seed_feed(now: DateTime<Utc>) -> TradenomixResult<(Vec<Post>, Vec<Comment>)> {
    let comments = COMMENTS
        .iter()
        .map(|&(id, post_id, author, content, minutes_ago)| {
            Ok(Comment {
                id: CommentId::new(id)?,
                post_id: PostId::new(post_id)?,
                author_id: IdentityId::new(author)?,
                content: content.to_string(),
                created_at: now - Duration::minutes(minutes_ago),
            })
        })
        .collect::<TradenomixResult<Vec<_>>>()?;

    let posts = POSTS
        .iter()
        .map(|&(id, author, content, minutes_ago, likes, reposts)| {
            let id = PostId::new(id)?;
            let created_at = now - Duration::minutes(minutes_ago);
            let comments_count = comments.iter().filter(|c| c.post_id == id).count() as u64;
            Ok(Post {
                id,
                author_id: IdentityId::new(author)?,
                content: content.to_string(),
                media_url: None,
                trade_ref_id: None,
                created_at,
                updated_at: created_at,
                likes_count: likes,
                comments_count,
                reposts_count: reposts,
            })
        })
        .collect::<TradenomixResult<Vec<_>>>()?;

    Ok((posts, comments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_counters_match_comments() {
        let (posts, comments) = seed_feed(Utc::now()).unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(comments.len(), 3);
        assert_eq!(posts[0].comments_count, 2);
        assert_eq!(posts[1].comments_count, 1);
        assert!(comments.iter().all(|c| posts.iter().any(|p| p.id == c.post_id)));
    }
}
