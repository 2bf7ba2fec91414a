/// Convenience result type used across storyreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid user-provided script, config or argument data.
    #[error("validation error: {0}")]
    Validation(String),

    /// An image, narration or font failed to load; fatal to the batch that needed it.
    #[error("asset load error: '{asset}': {reason}")]
    AssetLoad {
        /// Asset or segment id that failed.
        asset: String,
        /// Underlying failure description.
        reason: String,
    },

    /// Background music failed to load. Non-fatal: music is omitted.
    #[error("music load error: {0}")]
    MusicLoad(String),

    /// An element's exit starts before its entrance finishes. Tolerated, never raised as fatal.
    #[error(
        "timing inconsistency: scene '{scene}' element '{element}' exits at {exit_start}s before its entrance ends at {entrance_end}s"
    )]
    TimingInconsistency {
        /// Scene id.
        scene: String,
        /// Element id.
        element: String,
        /// Exit start, scene-relative seconds.
        exit_start: f64,
        /// Entrance end, scene-relative seconds.
        entrance_end: f64,
    },

    /// Capture/encode sink failure during export.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Audio concatenation or mixing failure.
    #[error("mix error: {0}")]
    Mix(String),

    /// Errors while evaluating or rasterizing a frame.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::AssetLoad`] value.
    pub fn asset_load(asset: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            asset: asset.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`ReelError::MusicLoad`] value.
    pub fn music_load(msg: impl Into<String>) -> Self {
        Self::MusicLoad(msg.into())
    }

    /// Build a [`ReelError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`ReelError::Mix`] value.
    pub fn mix(msg: impl Into<String>) -> Self {
        Self::Mix(msg.into())
    }

    /// Build a [`ReelError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for errors that must not stop playback or export from starting.
    pub fn is_non_fatal(&self) -> bool {
        matches!(self, Self::MusicLoad(_) | Self::TimingInconsistency { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
