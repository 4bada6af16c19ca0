use crate::mirror::Mirrors;
use crate::models::{Comment, Community, Direction, EntityKind, Post, UserId};
use crate::thread::ThreadLine;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Vote and saved markers for the acting user.
pub struct Markers<'a> {
    user: Option<UserId>,
    mirrors: &'a Mirrors,
}

impl<'a> Markers<'a> {
    pub fn new(user: Option<UserId>, mirrors: &'a Mirrors) -> Self {
        Self { user, mirrors }
    }

    pub fn vote(&self, kind: EntityKind, id: i64) -> Direction {
        self.user
            .map(|user| self.mirrors.votes(kind).get_vote(user, id))
            .unwrap_or_default()
    }

    pub fn saved(&self, kind: EntityKind, id: i64) -> bool {
        self.user
            .map(|user| self.mirrors.saved(kind).is_saved(user, id))
            .unwrap_or(false)
    }

    fn saved_marker(&self, kind: EntityKind, id: i64) -> &'static str {
        if self.saved(kind, id) {
            "★"
        } else {
            " "
        }
    }
}

pub struct PostRow {
    pub id: i64,
    pub title: String,
    pub score: i64,
    pub vote: &'static str,
    pub saved: &'static str,
    pub author: String,
    pub posted: String,
    pub link: String,
    pub communities: String,
    pub comments: i64,
}

impl PostRow {
    pub fn new(post: &Post, markers: &Markers<'_>) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            score: post.votes,
            vote: markers.vote(EntityKind::Post, post.id).marker(),
            saved: markers.saved_marker(EntityKind::Post, post.id),
            author: post.author_name.clone(),
            posted: post.created_at.format(TIME_FORMAT).to_string(),
            link: post.url.clone().unwrap_or_default(),
            communities: post.communities.join(", "),
            comments: post.comment_count,
        }
    }
}

pub struct CommentRow {
    pub id: i64,
    pub prefix: String,
    pub score: i64,
    pub vote: &'static str,
    pub saved: &'static str,
    pub author: String,
    pub posted: String,
    pub body: String,
    pub image: String,
}

impl CommentRow {
    /// A comment at its thread depth, indented `indent` spaces per level.
    pub fn from_line(line: &ThreadLine, markers: &Markers<'_>, indent: usize) -> Self {
        let prefix = " ".repeat(line.depth * indent);
        Self {
            id: line.id,
            body: indent_body(&line.content, &prefix),
            prefix,
            score: line.score,
            vote: markers.vote(EntityKind::Comment, line.id).marker(),
            saved: markers.saved_marker(EntityKind::Comment, line.id),
            author: line.author.clone(),
            posted: line.created_at.format(TIME_FORMAT).to_string(),
            image: line.image.clone().unwrap_or_default(),
        }
    }

    /// A comment outside its thread, as in search results.
    pub fn flat(comment: &Comment, markers: &Markers<'_>) -> Self {
        Self {
            id: comment.id,
            prefix: String::new(),
            score: comment.votes,
            vote: markers.vote(EntityKind::Comment, comment.id).marker(),
            saved: markers.saved_marker(EntityKind::Comment, comment.id),
            author: comment.author_name.clone(),
            posted: comment.created_at.format(TIME_FORMAT).to_string(),
            body: indent_body(&comment.content, ""),
            image: comment.image.clone().unwrap_or_default(),
        }
    }
}

pub struct CommunityRow {
    pub name: String,
    pub subscribed: &'static str,
    pub subscribers: i64,
    pub posts: i64,
    pub comments: i64,
}

impl CommunityRow {
    pub fn new(community: &Community) -> Self {
        Self {
            name: community.name.clone(),
            subscribed: if community.subscribed == Some(true) {
                "+"
            } else {
                " "
            },
            subscribers: community.subscribers,
            posts: community.post_count,
            comments: community.comment_count,
        }
    }
}

// Body text sits four columns right of its header line
fn indent_body(content: &str, prefix: &str) -> String {
    content
        .lines()
        .map(|line| format!("{}    {}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}
