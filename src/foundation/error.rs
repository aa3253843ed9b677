/// Convenience result type used across strokecast.
pub type StrokeResult<T> = Result<T, StrokeError>;

/// Top-level error taxonomy used by compositor APIs.
#[derive(thiserror::Error, Debug)]
pub enum StrokeError {
    /// Invalid user-provided specs or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Surfaces, chrome or capture resources could not be created.
    #[error("setup error: {message}")]
    Setup {
        message: String,
        #[source]
        source: Option<Box<StrokeError>>,
    },

    /// The stroke animator failed for a glyph.
    #[error("animation error: {message}")]
    Animation {
        message: String,
        #[source]
        source: Option<Box<StrokeError>>,
    },

    /// Speech fetch or decode failed. Jobs recover from this by running silent.
    #[error("audio error: {0}")]
    Audio(String),

    /// The capture session or its encoder failed.
    #[error("capture error: {message}")]
    Capture {
        message: String,
        #[source]
        source: Option<Box<StrokeError>>,
    },

    /// Writing the batch archive failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StrokeError {
    /// Build a [`StrokeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StrokeError::Setup`] value.
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup {
            message: msg.into(),
            source: None,
        }
    }

    /// Reclassify `err` as a setup failure, keeping it as the source.
    pub fn setup_from(err: StrokeError) -> Self {
        Self::Setup {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Build a [`StrokeError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation {
            message: msg.into(),
            source: None,
        }
    }

    /// Reclassify `err` as an animation failure, keeping it as the source.
    pub fn animation_from(err: StrokeError) -> Self {
        Self::Animation {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Build a [`StrokeError::Audio`] value.
    pub fn audio(msg: impl Into<String>) -> Self {
        Self::Audio(msg.into())
    }

    /// Build a [`StrokeError::Capture`] value.
    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
            source: None,
        }
    }

    /// Reclassify `err` as a capture failure, keeping it as the source.
    pub fn capture_from(err: StrokeError) -> Self {
        Self::Capture {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Build a [`StrokeError::Archive`] value.
    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }

    /// Build a [`StrokeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
