use crate::commands::recover;
use crate::error::AppResult;
use crate::models::{FeedFilter, PostOrder, SearchType};
use crate::state::AppState;
use crate::views;

pub async fn feed(state: &mut AppState, filter: FeedFilter, order: PostOrder) -> AppResult<String> {
    let (posts, notice) = recover(state.api.list_posts(filter, order).await, "posts");
    let heading = format!("Posts: {}, {}", filter.as_str(), order.as_str());
    views::feed(&heading, &posts, &state.markers(), notice)
}

pub async fn saved(state: &mut AppState) -> AppResult<String> {
    state.user()?;
    let (posts, post_notice) = recover(state.api.saved_posts().await, "saved posts");
    let (comments, comment_notice) = recover(state.api.saved_comments().await, "saved comments");

    let notice = match (post_notice, comment_notice) {
        (Some(a), Some(b)) => Some(format!("{}\n! {}", a, b)),
        (a, b) => a.or(b),
    };
    views::saved(&posts, &comments, &state.markers(), notice)
}

pub async fn search(state: &mut AppState, query: &str, search_type: SearchType) -> AppResult<String> {
    let (results, notice) = recover(state.api.search(query, search_type).await, "search results");
    views::search(query, search_type, &results, &state.markers(), notice)
}
