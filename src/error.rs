use reqwest::StatusCode;

use crate::models::EntityKind;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Malformed response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A {kind} action on {id} is still in flight")]
    InFlight { kind: EntityKind, id: i64 },

    #[error("Local state belongs to a different user")]
    UserMismatch,

    #[error("Comment thread deeper than {0} levels")]
    ThreadTooDeep(usize),

    #[error("Comment {0} appears inside its own reply chain")]
    CommentCycle(i64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a non-2xx status and its decoded message to an error.
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::NOT_FOUND => AppError::NotFound,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::BadRequest(message)
            }
            _ => AppError::Http {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Short message for the terminal. Internal details go to the log.
    pub fn user_message(&self) -> String {
        match self {
            AppError::NotLoggedIn => "Not logged in. Run `linkdeck login` first.".to_string(),
            AppError::NotFound => "Not found".to_string(),
            AppError::Unauthorized => "The server rejected your credentials".to_string(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Http { status, message } => format!("Server error ({status}): {message}"),
            AppError::Network(e) => {
                tracing::error!("Network error: {}", e);
                "Could not reach the server".to_string()
            }
            AppError::Url(e) => format!("Invalid server address: {}", e),
            AppError::Json(e) => {
                tracing::error!("JSON error: {}", e);
                "The server sent a response that could not be read".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Local storage error".to_string()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                "Local storage error".to_string()
            }
            AppError::Template(e) => {
                tracing::error!("Template render error: {}", e);
                "Could not render output".to_string()
            }
            AppError::Io(e) => e.to_string(),
            AppError::InFlight { .. } | AppError::UserMismatch => self.to_string(),
            AppError::ThreadTooDeep(_) | AppError::CommentCycle(_) => {
                tracing::error!("Comment data integrity error: {}", self);
                format!("Comment thread could not be displayed: {}", self)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal error".to_string()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
