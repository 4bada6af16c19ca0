use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::api::forms::{CommentForm, CommunityForm, LoginRequest, PostForm, ProfileForm};
use crate::api::Backend;
use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Comment, CommentOrder, Community, Direction, EntityKind, FeedFilter, Post, PostOrder,
    SavedResponse, SearchResults, SearchType, UserProfile, VoteResponse,
};

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// HTTP client for the link-aggregator REST API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    key_header: String,
    api_key: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        // Url::join replaces the last segment unless the base ends in '/'
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            key_header: config.key_header.clone(),
            api_key: None,
        })
    }

    /// A client that sends `api_key` with every request.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..self.clone()
        }
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The base URL extended by `segments`, each percent-encoded as exactly
    /// one path segment.
    pub fn endpoint(&self, segments: &[&str]) -> AppResult<Url> {
        for segment in segments {
            check_segment(segment)?;
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> AppResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let mut builder = self.client.request(method, url);
        if let Some(ref key) = self.api_key {
            builder = builder.header(self.key_header.as_str(), key.as_str());
        }
        Ok(builder)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = check_status(builder.send().await?).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> AppResult<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }

    // -- Accounts --

    pub async fn login(&self, username: &str, password: &str) -> AppResult<UserProfile> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let builder = self.request(Method::POST, &["accounts", "login"])?.json(&request);
        let profile: UserProfile = self.send_json(builder).await?;
        tracing::info!("Logged in as {}", profile.username);
        Ok(profile)
    }

    pub async fn me(&self) -> AppResult<UserProfile> {
        self.require_credential()?;
        self.send_json(self.request(Method::GET, &["accounts", "me"])?)
            .await
    }

    pub async fn update_me(&self, form: ProfileForm) -> AppResult<UserProfile> {
        self.require_credential()?;
        let form = form.into_multipart().await?;
        let builder = self.request(Method::PUT, &["accounts", "me"])?.multipart(form);
        self.send_json(builder).await
    }

    pub async fn profile(&self, username: &str) -> AppResult<UserProfile> {
        self.send_json(self.request(Method::GET, &["accounts", username])?)
            .await
    }

    // -- Posts --

    pub async fn list_posts(&self, filter: FeedFilter, order: PostOrder) -> AppResult<Vec<Post>> {
        let builder = self
            .request(Method::GET, &["posts"])?
            .query(&[("filter", filter.as_str()), ("order", order.as_str())]);
        self.send_json(builder).await
    }

    pub async fn post(&self, id: i64) -> AppResult<Post> {
        self.send_json(self.request(Method::GET, &["posts", &id.to_string()])?)
            .await
    }

    pub async fn create_post(&self, form: PostForm) -> AppResult<Post> {
        self.require_credential()?;
        let form = form.into_multipart().await?;
        let builder = self.request(Method::POST, &["posts"])?.multipart(form);
        let post: Post = self.send_json(builder).await?;
        tracing::info!("Created post {}", post.id);
        Ok(post)
    }

    pub async fn update_post(&self, id: i64, form: PostForm) -> AppResult<Post> {
        self.require_credential()?;
        let form = form.into_multipart().await?;
        let builder = self
            .request(Method::PUT, &["posts", &id.to_string()])?
            .multipart(form);
        self.send_json(builder).await
    }

    pub async fn delete_post(&self, id: i64) -> AppResult<()> {
        self.require_credential()?;
        self.send_empty(self.request(Method::DELETE, &["posts", &id.to_string()])?)
            .await?;
        tracing::info!("Deleted post {}", id);
        Ok(())
    }

    pub async fn post_comments(&self, post_id: i64, order: CommentOrder) -> AppResult<Vec<Comment>> {
        let builder = self
            .request(Method::GET, &["posts", &post_id.to_string(), "comments"])?
            .query(&[("order", order.as_str())]);
        self.send_json(builder).await
    }

    pub async fn saved_posts(&self) -> AppResult<Vec<Post>> {
        self.require_credential()?;
        self.send_json(self.request(Method::GET, &["posts", "saved"])?)
            .await
    }

    // -- Comments --

    pub async fn comment(&self, id: i64) -> AppResult<Comment> {
        self.send_json(self.request(Method::GET, &["comments", &id.to_string()])?)
            .await
    }

    pub async fn create_comment(&self, form: CommentForm) -> AppResult<Comment> {
        self.require_credential()?;
        if form.post_id.is_none() {
            return Err(AppError::BadRequest("A comment needs a post".into()));
        }
        let form = form.into_multipart().await?;
        let builder = self.request(Method::POST, &["comments"])?.multipart(form);
        let comment: Comment = self.send_json(builder).await?;
        tracing::info!("Created comment {} on post {}", comment.id, comment.post_id);
        Ok(comment)
    }

    pub async fn update_comment(&self, id: i64, form: CommentForm) -> AppResult<Comment> {
        self.require_credential()?;
        let form = form.into_multipart().await?;
        let builder = self
            .request(Method::PUT, &["comments", &id.to_string()])?
            .multipart(form);
        self.send_json(builder).await
    }

    pub async fn delete_comment(&self, id: i64) -> AppResult<()> {
        self.require_credential()?;
        self.send_empty(self.request(Method::DELETE, &["comments", &id.to_string()])?)
            .await?;
        tracing::info!("Deleted comment {}", id);
        Ok(())
    }

    pub async fn saved_comments(&self) -> AppResult<Vec<Comment>> {
        self.require_credential()?;
        self.send_json(self.request(Method::GET, &["comments", "saved"])?)
            .await
    }

    // -- Communities --

    pub async fn communities(&self) -> AppResult<Vec<Community>> {
        self.send_json(self.request(Method::GET, &["communities"])?)
            .await
    }

    pub async fn community(&self, name: &str) -> AppResult<Community> {
        self.send_json(self.request(Method::GET, &["communities", name])?)
            .await
    }

    pub async fn community_posts(&self, name: &str, order: PostOrder) -> AppResult<Vec<Post>> {
        let builder = self
            .request(Method::GET, &["communities", name, "posts"])?
            .query(&[("order", order.as_str())]);
        self.send_json(builder).await
    }

    pub async fn create_community(&self, form: CommunityForm) -> AppResult<Community> {
        self.require_credential()?;
        let form = form.into_multipart().await?;
        let builder = self.request(Method::POST, &["communities"])?.multipart(form);
        let community: Community = self.send_json(builder).await?;
        tracing::info!("Created community {}", community.name);
        Ok(community)
    }

    pub async fn subscribe(&self, name: &str) -> AppResult<()> {
        self.require_credential()?;
        self.send_empty(self.request(Method::POST, &["communities", name, "subscribe"])?)
            .await
    }

    pub async fn unsubscribe(&self, name: &str) -> AppResult<()> {
        self.require_credential()?;
        self.send_empty(self.request(Method::POST, &["communities", name, "unsubscribe"])?)
            .await
    }

    // -- Search --

    pub async fn search(&self, query: &str, search_type: SearchType) -> AppResult<SearchResults> {
        let builder = self
            .request(Method::GET, &["search"])?
            .query(&[("q", query), ("type", search_type.as_str())]);
        self.send_json(builder).await
    }

    fn require_credential(&self) -> AppResult<()> {
        if self.api_key.is_none() {
            return Err(AppError::NotLoggedIn);
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for ApiClient {
    async fn vote(
        &self,
        kind: EntityKind,
        id: i64,
        clicked: Direction,
    ) -> AppResult<VoteResponse> {
        self.require_credential()?;
        let action = match clicked {
            Direction::Up => "upvote",
            Direction::Down => "downvote",
            Direction::Neutral => {
                return Err(AppError::BadRequest("A vote needs a direction".into()))
            }
        };
        let id = id.to_string();
        let path = [kind.resource(), id.as_str(), action];
        self.send_json(self.request(Method::POST, &path)?).await
    }

    async fn toggle_saved(&self, kind: EntityKind, id: i64) -> AppResult<SavedResponse> {
        self.require_credential()?;
        let id = id.to_string();
        let path = [kind.resource(), id.as_str(), "save"];
        self.send_json(self.request(Method::POST, &path)?).await
    }

    async fn saved_ids(&self, kind: EntityKind) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = match kind {
            EntityKind::Post => self.saved_posts().await?.iter().map(|p| p.id).collect(),
            EntityKind::Comment => self.saved_comments().await?.iter().map(|c| c.id).collect(),
        };
        Ok(ids)
    }

    async fn fetch_profile(&self) -> AppResult<UserProfile> {
        self.me().await
    }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check_status(response: Response) -> AppResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.or(b.detail))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

    tracing::warn!("Request failed ({}): {}", status, message);
    Err(AppError::from_status(status, message))
}

/// Reject names a URL would collapse into a different path.
fn check_segment(segment: &str) -> AppResult<()> {
    if segment.trim().is_empty() || segment == "." || segment == ".." {
        return Err(AppError::BadRequest(format!("Invalid name {:?}", segment)));
    }
    // The URL parser drops tabs and newlines silently
    if segment.chars().any(char::is_control) {
        return Err(AppError::BadRequest(format!(
            "Invalid name {:?}: control characters are not allowed",
            segment
        )));
    }
    Ok(())
}
