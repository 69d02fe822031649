use axum::http::StatusCode;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure kinds shared by the habit store, the gateway and the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HabitError {
    InvalidInput(String),
    NotFound(String),
    Transport(String),
    Conflict(String),
}

impl HabitError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn not_found(id: impl Display) -> Self {
        Self::NotFound(format!("habit not found: {id}"))
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl Display for HabitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::NotFound(message) => write!(f, "{message}"),
            Self::Transport(message) => write!(f, "sync failed: {message}"),
            Self::Conflict(message) => write!(f, "conflict: {message}"),
        }
    }
}

impl Error for HabitError {}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<HabitError> for AppError {
    fn from(err: HabitError) -> Self {
        let status = match &err {
            HabitError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            HabitError::NotFound(_) => StatusCode::NOT_FOUND,
            HabitError::Transport(_) => StatusCode::BAD_GATEWAY,
            HabitError::Conflict(_) => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
