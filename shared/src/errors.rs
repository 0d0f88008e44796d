//! Shared error types for the companion host

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid endpoint URL: {input}")]
    InvalidEndpoint { input: String },

    #[error("Message protocol error: {message}")]
    ProtocolError { message: String },
}

impl SharedError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError { message: message.into() }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_data() || e.is_syntax() || e.is_eof() {
            Self::DeserializationError { message: e.to_string() }
        } else {
            Self::SerializationError { message: e.to_string() }
        }
    }
}

pub type SharedResult<T> = Result<T, SharedError>;
