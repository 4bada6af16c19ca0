pub mod account;
pub mod communities;
pub mod feed;
pub mod items;

use clap::Subcommand;
use std::path::PathBuf;

use crate::error::AppResult;
use crate::models::{CommentOrder, FeedFilter, PostOrder, SearchType};
use crate::state::AppState;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and remember the session
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the session and its local votes
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Show a user's profile (your own without USERNAME)
    Profile { username: Option<String> },
    /// Update your profile
    ProfileEdit {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
        #[arg(long)]
        banner: Option<PathBuf>,
    },
    /// List posts
    Feed {
        #[arg(long, value_enum, default_value_t = FeedFilter::All)]
        filter: FeedFilter,
        #[arg(long, value_enum, default_value_t = PostOrder::New)]
        order: PostOrder,
    },
    /// List your saved posts and comments
    Saved,
    #[command(subcommand)]
    Post(PostCommand),
    #[command(subcommand)]
    Comment(CommentCommand),
    #[command(subcommand)]
    Community(CommunityCommand),
    /// Search posts and comments
    Search {
        query: String,
        #[arg(long = "type", value_enum, default_value_t = SearchType::Both)]
        search_type: SearchType,
    },
}

#[derive(Subcommand, Debug)]
pub enum PostCommand {
    /// Show a post and its comments
    Show {
        id: i64,
        #[arg(long, value_enum, default_value_t = CommentOrder::Top)]
        order: CommentOrder,
    },
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        /// Community to post in; repeatable
        #[arg(long = "community")]
        communities: Vec<String>,
    },
    /// Edit a post; omitted fields keep their current value
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// New link; an empty value removes the current one
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long = "community")]
        communities: Vec<String>,
    },
    Delete { id: i64 },
    Upvote { id: i64 },
    Downvote { id: i64 },
    /// Save or unsave a post
    Save { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommand {
    Create {
        #[arg(long = "post")]
        post_id: i64,
        #[arg(long = "parent")]
        parent_id: Option<i64>,
        #[arg(long)]
        content: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Edit {
        id: i64,
        #[arg(long)]
        content: String,
        #[arg(long)]
        image: Option<PathBuf>,
    },
    Delete { id: i64 },
    Upvote { id: i64 },
    Downvote { id: i64 },
    /// Save or unsave a comment
    Save { id: i64 },
}

#[derive(Subcommand, Debug)]
pub enum CommunityCommand {
    List,
    Show {
        name: String,
        #[arg(long, value_enum, default_value_t = PostOrder::New)]
        order: PostOrder,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        avatar: Option<PathBuf>,
        #[arg(long)]
        banner: Option<PathBuf>,
    },
    Subscribe { name: String },
    Unsubscribe { name: String },
}

/// Run one command and return its rendered output.
pub async fn run(state: &mut AppState, command: Command) -> AppResult<String> {
    match command {
        Command::Login { username, password } => account::login(state, &username, &password).await,
        Command::Logout => account::logout(state),
        Command::Whoami => account::whoami(state).await,
        Command::Profile { username } => account::profile(state, username.as_deref()).await,
        Command::ProfileEdit {
            display_name,
            bio,
            avatar,
            banner,
        } => {
            let form = crate::api::ProfileForm {
                display_name,
                bio,
                avatar,
                banner,
            };
            account::edit_profile(state, form).await
        }
        Command::Feed { filter, order } => feed::feed(state, filter, order).await,
        Command::Saved => feed::saved(state).await,
        Command::Post(cmd) => items::post(state, cmd).await,
        Command::Comment(cmd) => items::comment(state, cmd).await,
        Command::Community(cmd) => communities::run(state, cmd).await,
        Command::Search { query, search_type } => feed::search(state, &query, search_type).await,
    }
}

/// Turn a failed read into default data plus a notice for the view.
pub(crate) fn recover<T: Default>(result: AppResult<T>, what: &str) -> (T, Option<String>) {
    match result {
        Ok(value) => (value, None),
        Err(e) => {
            tracing::warn!("Could not load {}: {}", what, e);
            (T::default(), Some(format!("Could not load {}: {}", what, e.user_message())))
        }
    }
}
