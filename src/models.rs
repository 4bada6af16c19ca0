use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two kinds of entity a user can vote on or save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Post,
    Comment,
}

impl EntityKind {
    /// Path segment of the backend resource group.
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Post => "posts",
            Self::Comment => "comments",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The current user's vote on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    #[default]
    #[serde(rename = "none")]
    Neutral,
}

impl Direction {
    /// Direction after the user clicks `clicked`. Clicking the active
    /// direction again retracts the vote.
    pub fn after_click(self, clicked: Direction) -> Direction {
        if clicked == Direction::Neutral || self == clicked {
            Direction::Neutral
        } else {
            clicked
        }
    }

    /// Contribution of this vote to an entity's score.
    pub fn weight(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
            Self::Neutral => 0,
        }
    }

    /// Score change when moving from `self` to `to`.
    pub fn delta_to(self, to: Direction) -> i64 {
        to.weight() - self.weight()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Neutral => "none",
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            Self::Up => "▲",
            Self::Down => "▼",
            Self::Neutral => " ",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub communities: Vec<String>,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    pub author_id: i64,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub replies: Vec<Comment>,
    #[serde(default)]
    pub saved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Community {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub subscribers: i64,
    #[serde(default)]
    pub post_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default)]
    pub subscribed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub banner: Option<String>,
    /// Only present on the caller's own profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedResponse {
    pub saved: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FeedFilter {
    #[default]
    All,
    Subscribed,
    Local,
}

impl FeedFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Subscribed => "subscribed",
            Self::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PostOrder {
    #[default]
    New,
    Old,
    Comments,
    Votes,
}

impl PostOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Old => "old",
            Self::Comments => "comments",
            Self::Votes => "votes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CommentOrder {
    #[default]
    Top,
    New,
    Old,
}

impl CommentOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::New => "new",
            Self::Old => "old",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SearchType {
    Posts,
    Comments,
    #[default]
    Both,
}

impl SearchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Comments => "comments",
            Self::Both => "both",
        }
    }
}
