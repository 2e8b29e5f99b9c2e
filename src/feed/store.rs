//! In-process post store backing the feed.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use crate::core::errors::{TradenomixError, TradenomixResult, ValidationError};
use crate::core::ids::{CommentId, IdentityId, PostId};
use crate::feed::fixtures::seed_feed;
use crate::feed::types::{Comment, Post};

#[derive(Default)]
struct FeedState {
    posts: Vec<Post>,
    comments: Vec<Comment>,
}

impl FeedState {
    fn post_mut(&mut self, id: &PostId) -> TradenomixResult<&mut Post> {
        self.posts
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| TradenomixError::PostNotFound(id.clone()))
    }

    fn next_post_id(&self) -> TradenomixResult<PostId> {
        let next = self
            .posts
            .iter()
            .filter_map(|p| p.id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        Ok(PostId::new(next.to_string())?)
    }
}

/// Posts and their comments. Reads hand out owned copies.
#[derive(Default)]
pub struct PostStore {
    state: Mutex<FeedState>,
}

impl PostStore {
    /// Create a store owning `posts` and `comments`.
    #[must_use]
    pub fn new(posts: Vec<Post>, comments: Vec<Comment>) -> Self {
        Self {
            state: Mutex::new(FeedState { posts, comments }),
        }
    }

    /// Create a store seeded with the demo posts.
    ///
    /// # Errors
    /// Returns an error if the seed data fails validation.
    pub fn seeded() -> TradenomixResult<Self> {
        let (posts, comments) = seed_feed(Utc::now())?;
        Ok(Self::new(posts, comments))
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a post with zeroed counters.
    ///
    /// Text is trimmed; a post needs text or media.
    ///
    /// # Errors
    /// Returns `EmptyPost` when both are missing.
    pub fn create_post(
        &self,
        author_id: IdentityId,
        content: &str,
        media_url: Option<String>,
    ) -> TradenomixResult<Post> {
        let content = content.trim();
        let media_url = media_url.filter(|url| !url.trim().is_empty());
        if content.is_empty() && media_url.is_none() {
            return Err(ValidationError::EmptyPost.into());
        }

        let mut state = self.lock();
        let now = Utc::now();
        let post = Post {
            id: state.next_post_id()?,
            author_id,
            content: content.to_string(),
            media_url,
            trade_ref_id: None,
            created_at: now,
            updated_at: now,
            likes_count: 0,
            comments_count: 0,
            reposts_count: 0,
        };
        state.posts.push(post.clone());
        debug!("Created post {} by {}", post.id, post.author_id);
        Ok(post)
    }

    /// Up to `limit` posts, newest first.
    #[must_use]
    pub fn feed(&self, limit: usize) -> Vec<Post> {
        let state = self.lock();
        let mut posts: Vec<&Post> = state.posts.iter().collect();
        // Later insertions win ties.
        posts.reverse();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.into_iter().take(limit).cloned().collect()
    }

    /// Copy of the post with `id`, if any.
    #[must_use]
    pub fn get_post(&self, id: &PostId) -> Option<Post> {
        self.lock().posts.iter().find(|p| &p.id == id).cloned()
    }

    /// Add one like and bump `updated_at`.
    ///
    /// # Errors
    /// Returns `PostNotFound` for an unknown id.
    pub fn like_post(&self, id: &PostId) -> TradenomixResult<Post> {
        let mut state = self.lock();
        let post = state.post_mut(id).inspect_err(|_| {
            warn!("like_post: unknown post {id}");
        })?;
        post.likes_count += 1;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    /// Comments on a post, oldest first.
    ///
    /// # Errors
    /// Returns `PostNotFound` for an unknown id.
    pub fn comments(&self, post_id: &PostId) -> TradenomixResult<Vec<Comment>> {
        let mut state = self.lock();
        state.post_mut(post_id)?;
        let mut comments: Vec<Comment> = state
            .comments
            .iter()
            .filter(|c| &c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    /// Comment on a post and count it on the post.
    ///
    /// # Errors
    /// Returns `EmptyComment` for blank content, or `PostNotFound`.
    pub fn add_comment(
        &self,
        post_id: &PostId,
        author_id: IdentityId,
        content: &str,
    ) -> TradenomixResult<Comment> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyComment.into());
        }

        let mut state = self.lock();
        let post = state.post_mut(post_id)?;
        post.comments_count += 1;

        let comment = Comment {
            id: CommentId::generate(),
            post_id: post_id.clone(),
            author_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        state.comments.push(comment.clone());
        debug!("Comment {} added to post {post_id}", comment.id);
        Ok(comment)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn pid(raw: &str) -> PostId {
        PostId::new(raw).unwrap()
    }

    fn uid(raw: &str) -> IdentityId {
        IdentityId::new(raw).unwrap()
    }

    fn post_at(id: &str, minutes_ago: i64) -> Post {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        Post {
            id: pid(id),
            author_id: uid("you"),
            content: format!("post {id}"),
            media_url: None,
            trade_ref_id: None,
            created_at: at,
            updated_at: at,
            likes_count: 0,
            comments_count: 0,
            reposts_count: 0,
        }
    }

    #[test]
    fn test_feed_is_newest_first() {
        let store = PostStore::new(
            vec![post_at("1", 30), post_at("2", 90), post_at("3", 5)],
            Vec::new(),
        );
        let ids: Vec<String> = store
            .feed(20)
            .into_iter()
            .map(|p| p.id.into_string())
            .collect();
        assert_eq!(ids, ["3", "1", "2"]);
    }

    #[test]
    fn test_feed_respects_limit() {
        let posts = (1..=30).map(|i| post_at(&i.to_string(), i)).collect();
        let store = PostStore::new(posts, Vec::new());
        let feed = store.feed(20);
        assert_eq!(feed.len(), 20);
        assert_eq!(feed[0].id, pid("1"));
        assert!(store.feed(0).is_empty());
    }

    #[test]
    fn test_create_post_zeroes_counters_and_leads_feed() {
        let store = PostStore::seeded().unwrap();
        let post = store
            .create_post(uid("you"), "  Closed EUR/USD +40 pips ", None)
            .unwrap();

        assert_eq!(post.id, pid("3"));
        assert_eq!(post.content, "Closed EUR/USD +40 pips");
        assert_eq!(
            (post.likes_count, post.comments_count, post.reposts_count),
            (0, 0, 0)
        );
        assert_eq!(post.created_at, post.updated_at);
        assert_eq!(store.feed(1)[0].id, post.id);
    }

    #[test]
    fn test_create_post_needs_text_or_media() {
        let store = PostStore::default();
        let err = store.create_post(uid("you"), "   ", None).unwrap_err();
        assert!(matches!(
            err,
            TradenomixError::Validation(ValidationError::EmptyPost)
        ));

        let image = store
            .create_post(uid("you"), "", Some("https://img.example/chart.png".into()))
            .unwrap();
        assert_eq!(image.id, pid("1"));
    }

    #[test]
    fn test_like_increments_and_bumps_updated_at() {
        let store = PostStore::new(vec![post_at("1", 60)], Vec::new());
        let before = store.get_post(&pid("1")).unwrap();

        store.like_post(&pid("1")).unwrap();
        let liked = store.like_post(&pid("1")).unwrap();

        assert_eq!(liked.likes_count, 2);
        assert!(liked.updated_at > before.updated_at);
        assert_eq!(liked.created_at, before.created_at);
        assert_eq!(store.get_post(&pid("1")).unwrap().likes_count, 2);
    }

    #[test]
    fn test_like_unknown_post() {
        let store = PostStore::seeded().unwrap();
        let err = store.like_post(&pid("404")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_comments_are_listed_oldest_first_and_counted() {
        let store = PostStore::seeded().unwrap();
        let seeded = store.comments(&pid("1")).unwrap();
        assert_eq!(seeded.len(), 2);
        assert_eq!(seeded[0].content, "This trade setup looks solid 🔥");

        let added = store
            .add_comment(&pid("1"), uid("you"), " Nice entry ")
            .unwrap();
        assert_eq!(added.content, "Nice entry");

        let comments = store.comments(&pid("1")).unwrap();
        assert_eq!(comments.last().unwrap().id, added.id);
        assert_eq!(store.get_post(&pid("1")).unwrap().comments_count, 3);
    }

    #[test]
    fn test_add_comment_rejects_blank_and_unknown_post() {
        let store = PostStore::seeded().unwrap();
        assert!(matches!(
            store.add_comment(&pid("1"), uid("you"), "  "),
            Err(TradenomixError::Validation(ValidationError::EmptyComment))
        ));
        assert!(
            store
                .add_comment(&pid("9"), uid("you"), "hi")
                .unwrap_err()
                .is_not_found()
        );
        assert!(store.comments(&pid("9")).unwrap_err().is_not_found());
    }
}
