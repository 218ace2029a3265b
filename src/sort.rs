//! Ordering and publication filtering for collections of
//! [`crate::post::Post`]s.

use crate::post::Post;
use chrono::{DateTime, Duration, Utc};
use std::borrow::Borrow;
use std::cmp::Ordering;

/// Orders two posts most recent first by effective date. Posts with the same
/// effective date fall back to their ids so the order is total.
pub fn recency(a: &Post, b: &Post) -> Ordering {
    b.effective_date()
        .cmp(&a.effective_date())
        .then_with(|| a.id.cmp(&b.id))
}

/// Sorts posts (owned or borrowed) by [`recency`].
pub fn sort_posts<P: Borrow<Post>>(posts: &mut [P]) {
    posts.sort_by(|a, b| recency(a.borrow(), b.borrow()));
}

/// Decides which posts are visible in a build.
#[derive(Clone, Copy, Debug)]
pub struct PublishFilter {
    /// The build time.
    pub now: DateTime<Utc>,

    /// Posts scheduled up to this far past `now` are published anyway, so a
    /// post timed for "a few minutes from now" does not miss the build.
    pub margin: Duration,

    /// Keep drafts (useful for previews).
    pub show_drafts: bool,
}

impl PublishFilter {
    pub fn new(now: DateTime<Utc>, margin: Duration) -> PublishFilter {
        PublishFilter {
            now,
            margin,
            show_drafts: false,
        }
    }

    /// True when `post` is neither a hidden draft nor scheduled beyond the
    /// margin.
    pub fn admits(&self, post: &Post) -> bool {
        if post.data.draft && !self.show_drafts {
            log::debug!("skipping draft `{}`", post.id);
            return false;
        }
        if post.data.pub_datetime.with_timezone(&Utc) > self.now + self.margin {
            log::debug!(
                "skipping `{}` scheduled for {}",
                post.id,
                post.data.pub_datetime
            );
            return false;
        }
        true
    }

    /// Filters `posts`, preserving their order.
    pub fn apply(&self, posts: Vec<Post>) -> Vec<Post> {
        posts.into_iter().filter(|p| self.admits(p)).collect()
    }
}

/// Filters `posts` through `filter` and sorts the survivors by [`recency`].
pub fn published_posts(posts: Vec<Post>, filter: &PublishFilter) -> Vec<Post> {
    let mut posts = filter.apply(posts);
    sort_posts(&mut posts);
    posts
}

/// Returns the featured posts among `posts`, in input order.
pub fn featured_posts(posts: &[Post]) -> Vec<&Post> {
    posts.iter().filter(|p| p.data.featured).collect()
}
