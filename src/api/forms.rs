use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    /// `Some("")` sends an empty link, which removes it on update.
    pub url: Option<String>,
    pub image: Option<PathBuf>,
    pub communities: Vec<String>,
}

impl PostForm {
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("A post needs a title".into()));
        }
        if let Some(url) = self.url.as_deref().filter(|u| !u.is_empty()) {
            url::Url::parse(url)
                .map_err(|e| AppError::BadRequest(format!("Invalid link {}: {}", url, e)))?;
        }
        Ok(())
    }

    pub async fn into_multipart(self) -> AppResult<Form> {
        self.validate()?;

        let mut form = Form::new()
            .text("title", self.title)
            .text("content", self.content);
        if let Some(url) = self.url {
            form = form.text("url", url);
        }
        for community in self.communities {
            form = form.text("communities", community);
        }
        if let Some(ref image) = self.image {
            form = form.part("image", file_part(image).await?);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommentForm {
    /// Required on create, ignored by the backend on update.
    pub post_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub content: String,
    pub image: Option<PathBuf>,
}

impl CommentForm {
    pub async fn into_multipart(self) -> AppResult<Form> {
        if self.content.trim().is_empty() {
            return Err(AppError::BadRequest("A comment cannot be empty".into()));
        }

        let mut form = Form::new().text("content", self.content);
        if let Some(post_id) = self.post_id {
            form = form.text("post_id", post_id.to_string());
        }
        if let Some(parent_id) = self.parent_id {
            form = form.text("parent_id", parent_id.to_string());
        }
        if let Some(ref image) = self.image {
            form = form.part("image", file_part(image).await?);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommunityForm {
    pub name: String,
    pub description: Option<String>,
    pub avatar: Option<PathBuf>,
    pub banner: Option<PathBuf>,
}

impl CommunityForm {
    pub async fn into_multipart(self) -> AppResult<Form> {
        let name = self.name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(AppError::BadRequest(
                "Community names must be a single word".into(),
            ));
        }

        let mut form = Form::new().text("name", name.to_string());
        if let Some(description) = self.description {
            form = form.text("description", description);
        }
        if let Some(ref avatar) = self.avatar {
            form = form.part("avatar", file_part(avatar).await?);
        }
        if let Some(ref banner) = self.banner {
            form = form.part("banner", file_part(banner).await?);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar: Option<PathBuf>,
    pub banner: Option<PathBuf>,
}

impl ProfileForm {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.avatar.is_none()
            && self.banner.is_none()
    }

    pub async fn into_multipart(self) -> AppResult<Form> {
        if self.is_empty() {
            return Err(AppError::BadRequest("Nothing to update".into()));
        }

        let mut form = Form::new();
        if let Some(display_name) = self.display_name {
            form = form.text("display_name", display_name);
        }
        if let Some(bio) = self.bio {
            form = form.text("bio", bio);
        }
        if let Some(ref avatar) = self.avatar {
            form = form.part("avatar", file_part(avatar).await?);
        }
        if let Some(ref banner) = self.banner {
            form = form.part("banner", file_part(banner).await?);
        }
        Ok(form)
    }
}

/// Read a local file into a multipart part with a guessed content type.
async fn file_part(path: &Path) -> AppResult<Part> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    Ok(Part::bytes(bytes)
        .file_name(file_name)
        .mime_str(mime.essence_str())?)
}
