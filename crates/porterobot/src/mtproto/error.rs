//! MTProto-specific error types

use thiserror::Error;

/// Errors that can occur during MTProto operations
#[derive(Error, Debug)]
pub enum MtProtoError {
    /// Message not found in chat
    #[error("Message not found")]
    MessageNotFound,

    /// Message has no media attachment
    #[error("No media in message")]
    NoMediaInMessage,

    /// CDN redirect not supported (would require additional implementation)
    #[error("CDN redirect not supported")]
    CdnRedirectNotSupported,

    /// Grammers client invocation error
    #[error("MTProto client error: {0}")]
    Invocation(#[from] grammers_mtsender::InvocationError),

    /// Session-related errors
    #[error("Session error: {0}")]
    Session(String),

    /// Sign-in failed
    #[error("Sign-in failed: {0}")]
    SignIn(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MtProtoError> for porterocore::AppError {
    fn from(err: MtProtoError) -> Self {
        porterocore::AppError::External(format!("MTProto error: {}", err))
    }
}
