use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::models::Comment;

/// One comment placed at its depth in the thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadLine {
    pub id: i64,
    pub depth: usize,
    pub author: String,
    pub score: i64,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Walk a backend-threaded comment list depth-first: each comment, then its
/// replies in the order given.
///
/// Nesting past `max_depth` levels fails with [`AppError::ThreadTooDeep`];
/// a comment id repeated inside its own reply chain fails with
/// [`AppError::CommentCycle`].
pub fn flatten(comments: &[Comment], max_depth: usize) -> AppResult<Vec<ThreadLine>> {
    let mut lines = Vec::new();
    let mut ancestors = Vec::new();
    walk(comments, 0, max_depth, &mut ancestors, &mut lines)?;
    Ok(lines)
}

fn walk(
    comments: &[Comment],
    depth: usize,
    max_depth: usize,
    ancestors: &mut Vec<i64>,
    lines: &mut Vec<ThreadLine>,
) -> AppResult<()> {
    for comment in comments {
        if depth >= max_depth {
            return Err(AppError::ThreadTooDeep(max_depth));
        }
        if ancestors.contains(&comment.id) {
            return Err(AppError::CommentCycle(comment.id));
        }

        lines.push(ThreadLine {
            id: comment.id,
            depth,
            author: comment.author_name.clone(),
            score: comment.votes,
            content: comment.content.clone(),
            image: comment.image.clone(),
            created_at: comment.created_at,
        });

        ancestors.push(comment.id);
        walk(&comment.replies, depth + 1, max_depth, ancestors, lines)?;
        ancestors.pop();
    }
    Ok(())
}
