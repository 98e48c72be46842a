use thiserror::Error;

/// Reasons a submitted URL cannot become an audio request.
///
/// These are surfaced to the submitter; a request that fails classification
/// is never enqueued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("`{0}` doesn't look like a valid URL")]
    InvalidUrl(String),

    #[error("could not find a file name in `{0}`")]
    MissingFilename(String),

    #[error("could not resolve the title of `{url}`: {reason}")]
    TitleUnavailable { url: String, reason: String },

    #[error("duration cap must be at least one second")]
    InvalidDurationCap,

    #[error("could not expand playlist `{url}`: {reason}")]
    CollectionUnavailable { url: String, reason: String },
}

/// Errors raised by the queue, the playback loop and the voice transport.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error("could not create audio resource for `{url}`: {reason}")]
    ResourceConstruction { url: String, reason: String },

    #[error("voice connection failed: {0}")]
    VoiceConnection(String),

    #[error("queue store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("nothing is currently playing")]
    NothingPlaying,
}

impl AudioError {
    pub fn store(err: impl std::fmt::Display) -> Self {
        AudioError::StoreUnavailable(err.to_string())
    }

    pub fn resource(url: &str, err: impl std::fmt::Display) -> Self {
        AudioError::ResourceConstruction {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}
