use crate::api::ProfileForm;
use crate::error::{AppError, AppResult};
use crate::models::UserProfile;
use crate::session::Identity;
use crate::state::AppState;
use crate::views;

pub async fn login(state: &mut AppState, username: &str, password: &str) -> AppResult<String> {
    let profile = state.api.login(username, password).await?;
    let identity = Identity::from_login(&profile)?;

    let handle = state.begin_session(identity)?;
    handle
        .await
        .map_err(|e| AppError::Internal(format!("Profile task failed: {}", e)))?;
    state.sync_saved().await;

    match state.session.enriched() {
        Some(enriched) => views::whoami(&enriched),
        None => Err(AppError::NotLoggedIn),
    }
}

pub fn logout(state: &mut AppState) -> AppResult<String> {
    let username = state.session.identity().map(|i| i.username);
    state.end_session()?;
    Ok(match username {
        Some(name) => format!("Logged out {}", name),
        None => "Not logged in".to_string(),
    })
}

pub async fn whoami(state: &mut AppState) -> AppResult<String> {
    state.session.require()?;
    if let Err(e) = state.session.refresh_profile(&state.api).await {
        tracing::warn!("Could not refresh profile: {}", e);
    }
    let enriched = state.session.enriched().ok_or(AppError::NotLoggedIn)?;
    views::whoami(&enriched)
}

/// Another user's profile, or the caller's own when `username` is `None`.
pub async fn profile(state: &mut AppState, username: Option<&str>) -> AppResult<String> {
    let own_name = state.session.identity().map(|i| i.username);

    let Some(username) = username.or(own_name.as_deref()) else {
        return Err(AppError::NotLoggedIn);
    };
    let own = own_name.as_deref() == Some(username);

    let result = if own {
        state.api.me().await
    } else {
        state.api.profile(username).await
    };

    match result {
        Ok(profile) => views::profile(&profile, own, None),
        Err(e) => {
            tracing::warn!("Could not load profile {}: {}", username, e);
            let placeholder = UserProfile {
                id: 0,
                username: username.to_string(),
                display_name: None,
                bio: None,
                avatar: None,
                banner: None,
                api_key: None,
            };
            let notice = format!("Could not load profile: {}", e.user_message());
            views::profile(&placeholder, own, Some(notice))
        }
    }
}

pub async fn edit_profile(state: &mut AppState, form: ProfileForm) -> AppResult<String> {
    state.session.require()?;
    let updated = state.api.update_me(form).await?;
    tracing::info!("Updated profile for {}", updated.username);

    if let Err(e) = state.session.refresh_profile(&state.api).await {
        tracing::warn!("Could not refresh profile: {}", e);
    }
    views::profile(&updated, true, None)
}
