use crate::api::{CommentForm, PostForm};
use crate::commands::{recover, CommentCommand, PostCommand};
use crate::error::AppResult;
use crate::interactions::{self, VoteSnapshot};
use crate::models::{Direction, EntityKind};
use crate::state::AppState;
use crate::views;

pub async fn post(state: &mut AppState, command: PostCommand) -> AppResult<String> {
    match command {
        PostCommand::Show { id, order } => {
            let post = state.api.post(id).await?;
            let (comments, notice) = recover(state.api.post_comments(id, order).await, "comments");
            views::post(&post, &comments, &state.markers(), &state.config.display, notice)
        }
        PostCommand::Create {
            title,
            content,
            url,
            image,
            communities,
        } => {
            let form = PostForm {
                title,
                content,
                url,
                image,
                communities,
            };
            let post = state.api.create_post(form).await?;
            Ok(format!("Created post #{}: {}", post.id, post.title))
        }
        PostCommand::Edit {
            id,
            title,
            content,
            url,
            image,
            communities,
        } => {
            state.user()?;
            let current = state.api.post(id).await?;
            let form = PostForm {
                title: title.unwrap_or(current.title),
                content: content.unwrap_or(current.content),
                url: edited_link(url, current.url),
                image,
                communities: if communities.is_empty() {
                    current.communities
                } else {
                    communities
                },
            };
            let post = state.api.update_post(id, form).await?;
            tracing::info!("Updated post {}", post.id);
            Ok(format!("Updated post #{}: {}", post.id, post.title))
        }
        PostCommand::Delete { id } => {
            state.api.delete_post(id).await?;
            Ok(format!("Deleted post #{}", id))
        }
        PostCommand::Upvote { id } => cast_vote(state, EntityKind::Post, id, Direction::Up).await,
        PostCommand::Downvote { id } => cast_vote(state, EntityKind::Post, id, Direction::Down).await,
        PostCommand::Save { id } => toggle_save(state, EntityKind::Post, id).await,
    }
}

pub async fn comment(state: &mut AppState, command: CommentCommand) -> AppResult<String> {
    match command {
        CommentCommand::Create {
            post_id,
            parent_id,
            content,
            image,
        } => {
            let form = CommentForm {
                post_id: Some(post_id),
                parent_id,
                content,
                image,
            };
            let comment = state.api.create_comment(form).await?;
            Ok(format!("Created comment #{} on post #{}", comment.id, comment.post_id))
        }
        CommentCommand::Edit { id, content, image } => {
            let form = CommentForm {
                post_id: None,
                parent_id: None,
                content,
                image,
            };
            let comment = state.api.update_comment(id, form).await?;
            tracing::info!("Updated comment {}", comment.id);
            Ok(format!("Updated comment #{}", comment.id))
        }
        CommentCommand::Delete { id } => {
            state.api.delete_comment(id).await?;
            Ok(format!("Deleted comment #{}", id))
        }
        CommentCommand::Upvote { id } => {
            cast_vote(state, EntityKind::Comment, id, Direction::Up).await
        }
        CommentCommand::Downvote { id } => {
            cast_vote(state, EntityKind::Comment, id, Direction::Down).await
        }
        CommentCommand::Save { id } => toggle_save(state, EntityKind::Comment, id).await,
    }
}

/// Vote against the backend's current score. A failed request leaves the
/// mirror as it was and surfaces the error.
async fn cast_vote(
    state: &mut AppState,
    kind: EntityKind,
    id: i64,
    clicked: Direction,
) -> AppResult<String> {
    let user = state.user()?;
    let score = match kind {
        EntityKind::Post => state.api.post(id).await?.votes,
        EntityKind::Comment => state.api.comment(id).await?.votes,
    };

    let outcome = interactions::vote(
        &state.api,
        state.mirrors.votes_mut(kind),
        &state.in_flight,
        user,
        id,
        score,
        clicked,
    )
    .await?;

    let snapshot = outcome.into_result()?;
    Ok(describe_vote(kind, id, snapshot))
}

async fn toggle_save(state: &mut AppState, kind: EntityKind, id: i64) -> AppResult<String> {
    let user = state.user()?;
    let saved = interactions::toggle_save(
        &state.api,
        state.mirrors.saved_mut(kind),
        &state.in_flight,
        user,
        id,
    )
    .await?;

    Ok(format!(
        "{} {} #{}",
        if saved { "Saved" } else { "Unsaved" },
        kind,
        id
    ))
}

/// The link to send on edit. An empty `--url` clears the current one.
fn edited_link(requested: Option<String>, current: Option<String>) -> Option<String> {
    match requested {
        Some(link) if link.trim().is_empty() => current.map(|_| String::new()),
        Some(link) => Some(link),
        None => current,
    }
}

fn describe_vote(kind: EntityKind, id: i64, snapshot: VoteSnapshot) -> String {
    let action = match snapshot.direction {
        Direction::Up => "Upvoted",
        Direction::Down => "Downvoted",
        Direction::Neutral => "Cleared vote on",
    };
    format!("{} {} #{} (score {})", action, kind, id, snapshot.score)
}
