//! Error types for messaging operations

use thiserror::Error;

use crate::auth::{DirectoryError, TokenError};

/// Result type for [`crate::service::MessagingService`] operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures surfaced to callers of the messaging operations
///
/// Messages are stable and safe to show to end users; [`ServiceError::code`]
/// gives a machine-readable discriminator for transports.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing, invalid or expired credential on a protected operation
    #[error("Access denied: Unauthorized")]
    Unauthorized,

    /// Login lookup or password comparison failed
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("You must provide either receiverID or receiverEmail")]
    MissingReceiver,

    #[error("Message text must not be empty")]
    EmptyMessage,

    /// Credential could not be issued; the caller may retry
    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("User directory error: {0}")]
    Directory(#[from] DirectoryError),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized => "UNAUTHORIZED",
            ServiceError::InvalidCredentials => "INVALID_CREDENTIALS",
            ServiceError::MissingReceiver => "MISSING_RECEIVER",
            ServiceError::EmptyMessage => "EMPTY_MESSAGE",
            ServiceError::Token(_) => "TOKEN_ERROR",
            ServiceError::Directory(_) => "DIRECTORY_ERROR",
        }
    }
}
