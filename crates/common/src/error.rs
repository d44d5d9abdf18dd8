//! Error types shared across Patchbay crates.

/// Top-level error type for Patchbay operations.
#[derive(Debug, thiserror::Error)]
pub enum PatchbayError {
    #[error("Contract violation: {message}")]
    Contract { message: String },

    #[error("Routing error: {message}")]
    Routing { message: String },

    #[error("Compositor error: {message}")]
    Compositor { message: String },

    #[error("Media error: {message}")]
    Media { message: String },

    #[error("IPC error: {message}")]
    Ipc { message: String },

    #[error("IPC channel already has a writer: {name}")]
    ChannelExists { name: String },

    #[error("IPC channel has no writer: {name}")]
    ChannelNotFound { name: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using PatchbayError.
pub type PatchbayResult<T> = Result<T, PatchbayError>;

impl PatchbayError {
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract {
            message: msg.into(),
        }
    }

    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing {
            message: msg.into(),
        }
    }

    pub fn compositor(msg: impl Into<String>) -> Self {
        Self::Compositor {
            message: msg.into(),
        }
    }

    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn ipc(msg: impl Into<String>) -> Self {
        Self::Ipc {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
