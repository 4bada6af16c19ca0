pub mod rows;

use askama::Template;

use crate::config::DisplayConfig;
use crate::error::AppResult;
use crate::models::{Comment, Community, Post, SearchResults, SearchType, UserProfile};
use crate::session::EnrichedProfile;
use crate::thread;

pub use rows::{CommentRow, CommunityRow, Markers, PostRow};

#[derive(Template)]
#[template(path = "feed.txt")]
pub struct FeedTemplate {
    pub heading: String,
    pub notice: String,
    pub posts: Vec<PostRow>,
}

#[derive(Template)]
#[template(path = "post.txt")]
pub struct PostTemplate {
    pub post: PostRow,
    pub content: String,
    pub image: String,
    pub comment_total: usize,
    pub notice: String,
    pub comments: Vec<CommentRow>,
}

#[derive(Template)]
#[template(path = "profile.txt")]
pub struct ProfileTemplate {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar: String,
    pub banner: String,
    pub is_self: bool,
    pub notice: String,
}

#[derive(Template)]
#[template(path = "communities.txt")]
pub struct CommunitiesTemplate {
    pub notice: String,
    pub communities: Vec<CommunityRow>,
}

#[derive(Template)]
#[template(path = "community.txt")]
pub struct CommunityTemplate {
    pub community: CommunityRow,
    pub description: String,
    pub notice: String,
    pub posts: Vec<PostRow>,
}

#[derive(Template)]
#[template(path = "search.txt")]
pub struct SearchTemplate {
    pub query: String,
    pub notice: String,
    pub show_posts: bool,
    pub show_comments: bool,
    pub posts: Vec<PostRow>,
    pub comments: Vec<CommentRow>,
}

#[derive(Template)]
#[template(path = "saved.txt")]
pub struct SavedTemplate {
    pub notice: String,
    pub posts: Vec<PostRow>,
    pub comments: Vec<CommentRow>,
}

pub fn feed(heading: &str, posts: &[Post], markers: &Markers<'_>, notice: Option<String>) -> AppResult<String> {
    let template = FeedTemplate {
        heading: heading.to_string(),
        notice: notice.unwrap_or_default(),
        posts: posts.iter().map(|p| PostRow::new(p, markers)).collect(),
    };
    Ok(template.render()?)
}

/// A post followed by its comment thread.
pub fn post(
    post: &Post,
    comments: &[Comment],
    markers: &Markers<'_>,
    display: &DisplayConfig,
    notice: Option<String>,
) -> AppResult<String> {
    let lines = thread::flatten(comments, display.max_depth)?;
    let template = PostTemplate {
        post: PostRow::new(post, markers),
        content: post.content.clone(),
        image: post.image.clone().unwrap_or_default(),
        comment_total: lines.len(),
        notice: notice.unwrap_or_default(),
        comments: lines
            .iter()
            .map(|line| CommentRow::from_line(line, markers, display.indent))
            .collect(),
    };
    Ok(template.render()?)
}

/// Someone's public profile. `own` marks the logged-in user's view.
pub fn profile(profile: &UserProfile, own: bool, notice: Option<String>) -> AppResult<String> {
    let template = ProfileTemplate {
        username: profile.username.clone(),
        display_name: profile
            .display_name
            .clone()
            .unwrap_or_else(|| profile.username.clone()),
        bio: profile.bio.clone().unwrap_or_default(),
        avatar: profile.avatar.clone().unwrap_or_default(),
        banner: profile.banner.clone().unwrap_or_default(),
        is_self: own,
        notice: notice.unwrap_or_default(),
    };
    Ok(template.render()?)
}

/// The logged-in user as far as the session knows.
pub fn whoami(enriched: &EnrichedProfile) -> AppResult<String> {
    let template = ProfileTemplate {
        username: enriched.username.clone(),
        display_name: enriched.display_name.clone(),
        bio: enriched.bio.clone().unwrap_or_default(),
        avatar: enriched.avatar.clone().unwrap_or_default(),
        banner: enriched.banner.clone().unwrap_or_default(),
        is_self: true,
        notice: if enriched.profile_loaded {
            String::new()
        } else {
            "Profile details unavailable".to_string()
        },
    };
    Ok(template.render()?)
}

pub fn communities(communities: &[Community], notice: Option<String>) -> AppResult<String> {
    let template = CommunitiesTemplate {
        notice: notice.unwrap_or_default(),
        communities: communities.iter().map(CommunityRow::new).collect(),
    };
    Ok(template.render()?)
}

pub fn community(
    community: &Community,
    posts: &[Post],
    markers: &Markers<'_>,
    notice: Option<String>,
) -> AppResult<String> {
    let template = CommunityTemplate {
        community: CommunityRow::new(community),
        description: community.description.clone().unwrap_or_default(),
        notice: notice.unwrap_or_default(),
        posts: posts.iter().map(|p| PostRow::new(p, markers)).collect(),
    };
    Ok(template.render()?)
}

pub fn search(
    query: &str,
    search_type: SearchType,
    results: &SearchResults,
    markers: &Markers<'_>,
    notice: Option<String>,
) -> AppResult<String> {
    let template = SearchTemplate {
        query: query.to_string(),
        notice: notice.unwrap_or_default(),
        show_posts: search_type != SearchType::Comments,
        show_comments: search_type != SearchType::Posts,
        posts: results
            .posts
            .iter()
            .map(|p| PostRow::new(p, markers))
            .collect(),
        comments: results
            .comments
            .iter()
            .map(|c| CommentRow::flat(c, markers))
            .collect(),
    };
    Ok(template.render()?)
}

pub fn saved(
    posts: &[Post],
    comments: &[Comment],
    markers: &Markers<'_>,
    notice: Option<String>,
) -> AppResult<String> {
    let template = SavedTemplate {
        notice: notice.unwrap_or_default(),
        posts: posts.iter().map(|p| PostRow::new(p, markers)).collect(),
        comments: comments.iter().map(|c| CommentRow::flat(c, markers)).collect(),
    };
    Ok(template.render()?)
}
