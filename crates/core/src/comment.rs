//! Comment rules and reply threading.
//!
//! Comments form a forest through a single `parent_id` self-reference. There
//! is no depth limit. Top-level comments are shown newest first; replies under
//! any comment are shown oldest first so conversations read top to bottom.

use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_COMMENT_LEN: usize = 1000;

/// Validate comment content, returning it trimmed.
pub fn validate_comment_content(content: &str) -> Result<String> {
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::validation("content", "must not be empty"));
    }
    if content.chars().count() > MAX_COMMENT_LEN {
        return Err(Error::validation(
            "content",
            format!("must be at most {MAX_COMMENT_LEN} characters"),
        ));
    }
    Ok(content.to_string())
}

/// Anything that can be placed in a reply tree.
pub trait Threaded {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn created_at(&self) -> OffsetDateTime;
}

/// A comment together with its (recursively threaded) replies.
#[derive(Clone, Debug, Serialize)]
pub struct Thread<T> {
    #[serde(flatten)]
    pub comment: T,
    pub replies: Vec<Thread<T>>,
}

impl<T> Thread<T> {
    /// Total number of comments in this thread, including the root.
    pub fn count(&self) -> usize {
        1 + self.replies.iter().map(Thread::count).sum::<usize>()
    }
}

/// Arrange a flat list of comments into threads.
///
/// Replies whose parent is absent from `items` are dropped: the parent was
/// either unpublished or deleted, and its subtree is hidden with it.
pub fn build_threads<T: Threaded>(items: Vec<T>) -> Vec<Thread<T>> {
    let present: HashSet<Uuid> = items.iter().map(Threaded::id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<Uuid, Vec<T>> = HashMap::new();
    for item in items {
        match item.parent_id() {
            None => roots.push(item),
            Some(parent) if present.contains(&parent) => {
                children.entry(parent).or_default().push(item)
            }
            Some(_) => {}
        }
    }

    roots.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });

    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

fn attach<T: Threaded>(comment: T, children: &mut HashMap<Uuid, Vec<T>>) -> Thread<T> {
    let mut direct = children.remove(&comment.id()).unwrap_or_default();
    direct.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
    let replies = direct
        .into_iter()
        .map(|reply| attach(reply, children))
        .collect();
    Thread { comment, replies }
}
