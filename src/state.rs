use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::config::Config;
use crate::db::LocalStore;
use crate::error::{AppError, AppResult};
use crate::mirror::{InFlight, Mirrors};
use crate::models::UserId;
use crate::session::{Identity, Session};
use crate::views::Markers;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Everything a command needs, passed explicitly.
pub struct AppState {
    pub config: Config,
    pub store: LocalStore,
    pub api: ApiClient,
    pub session: Session,
    pub mirrors: Mirrors,
    pub in_flight: InFlight,
}

impl AppState {
    /// Restore the persisted session and, if there is one, its mirrors.
    pub fn open(config: Config, pool: DbPool) -> AppResult<Self> {
        let store = LocalStore::new(pool);
        let session = Session::load(store.clone())?;
        let anonymous = ApiClient::new(&config.api)?;

        let (api, mirrors) = match session.identity() {
            Some(identity) => (
                anonymous.with_api_key(identity.api_key.as_str()),
                Mirrors::load(&store, identity.user_id)?,
            ),
            None => (anonymous, Mirrors::empty(&store)),
        };

        Ok(Self {
            config,
            store,
            api,
            session,
            mirrors,
            in_flight: InFlight::new(),
        })
    }

    /// The acting user, or [`AppError::NotLoggedIn`].
    pub fn user(&self) -> AppResult<UserId> {
        self.session.user_id().ok_or(AppError::NotLoggedIn)
    }

    /// Vote and saved markers for the active user.
    pub fn markers(&self) -> Markers<'_> {
        Markers::new(self.session.user_id(), &self.mirrors)
    }

    /// Load saved sets for the active user. Failures leave them empty.
    pub async fn sync_saved(&mut self) {
        let Some(user) = self.session.user_id() else {
            return;
        };
        if let Err(e) = self.mirrors.refresh_saved(user, &self.api).await {
            tracing::warn!("Saved items unavailable: {}", e);
        }
    }

    /// Switch to `identity`: new credential, fresh mirrors, background
    /// profile fetch.
    pub fn begin_session(&mut self, identity: Identity) -> AppResult<tokio::task::JoinHandle<()>> {
        let user = identity.user_id;
        self.api = ApiClient::new(&self.config.api)?.with_api_key(identity.api_key.as_str());
        self.mirrors.switch_user(&self.store, user)?;
        self.session.login(identity, Arc::new(self.api.clone()))
    }

    /// Log out and drop all per-user local state.
    pub fn end_session(&mut self) -> AppResult<()> {
        self.mirrors.clear_all()?;
        self.mirrors = Mirrors::empty(&self.store);
        self.session.logout()?;
        self.api = ApiClient::new(&self.config.api)?;
        Ok(())
    }
}
