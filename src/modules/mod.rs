use std::fmt;

pub mod resources;
pub mod users;

/// Error surfaced by the gateway services.
#[derive(Debug)]
pub enum ServiceError {
    /// Request rejected before touching the backend; safe to show verbatim.
    Validation(String),
    /// The referenced row does not exist. Carries the display noun.
    NotFound(&'static str),
    /// Backend failure; callers show a generic message, detail goes to the log.
    Backend(anyhow::Error),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Validation(message) => write!(f, "{message}"),
            ServiceError::NotFound(what) => write!(f, "{what} not found"),
            ServiceError::Backend(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Backend(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Backend(err.into())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Backend(err)
    }
}
