use thiserror::Error;

/// Main error type for the FontPrint pipeline
#[derive(Error, Debug)]
pub enum FontPrintError {
    #[error("Fingerprint hashing unavailable: {reason}")]
    HashingUnavailable { reason: String },

    #[error("Invalid layout input: {message}")]
    InvalidInput { message: String },

    #[error("Fingerprint repository error: {path}")]
    Repository {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File I/O error: {path}")]
    FileIO {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl FontPrintError {
    /// Create a hashing error with context
    pub fn hashing_unavailable(reason: impl Into<String>) -> Self {
        Self::HashingUnavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a repository I/O error
    pub fn repository(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Repository {
            path: path.into(),
            source,
        }
    }

    /// Create a file I/O error
    pub fn file_io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileIO {
            path: path.into(),
            source,
        }
    }

    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Check if error is recoverable (a caller may retry with different input)
    ///
    /// A missing hash is never recoverable: the hash is the record's identity.
    pub fn is_recoverable(&self) -> bool {
        match self {
            FontPrintError::HashingUnavailable { .. } => false,
            FontPrintError::Repository { .. } => false,
            FontPrintError::FileIO { .. } => true,
            FontPrintError::InvalidInput { .. } => true,
            FontPrintError::Serialization { .. } => true,
            FontPrintError::Configuration { .. } => true,
        }
    }
}

/// Result type alias for convenience
pub type FontPrintResult<T> = Result<T, FontPrintError>;
