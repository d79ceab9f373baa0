use thiserror::Error;

/// Errors produced by the image store and its subsystems.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No manifest exists for the requested image ID
    #[error("image not found: {id}")]
    NotFound { id: String },

    /// Image decode or encode failure at the codec boundary
    #[error("codec error: {message}")]
    Codec { message: String },

    /// A manifest references a tile or delta that cannot be resolved,
    /// or stored data fails its structural checks
    #[error("corrupt store: {message}")]
    CorruptStore { message: String },

    /// Compressor or decompressor failure
    #[error("compression error: {message}")]
    Compression { message: String },

    /// Backing store I/O or batch-commit failure
    #[error("persistence error: {0}")]
    Persistence(#[from] sled::Error),

    /// Tile data size mismatch or configuration out of range
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
}

impl StoreError {
    /// Shorthand for a [`StoreError::Codec`].
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Shorthand for a [`StoreError::CorruptStore`].
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptStore {
            message: message.into(),
        }
    }

    /// Shorthand for a [`StoreError::Compression`].
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression {
            message: message.into(),
        }
    }

    /// Shorthand for a [`StoreError::InvalidInput`].
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Whether this error indicates a missing image rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
