use crate::encode::tier::{EncodeAttempt, EncodeTier};

/// Convenience result alias used across the crate.
pub type ShortsResult<T> = Result<T, ShortsError>;

/// Error taxonomy for timeline, rendering and encoding stages.
#[derive(thiserror::Error, Debug)]
pub enum ShortsError {
    #[error("validation error: {0}")]
    Validation(String),

    /// No narration segments were provided; nothing can be rendered.
    #[error("empty input: no narration segments to render")]
    EmptyInput,

    /// A background or font could not be loaded. Recovered locally by substitution.
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// At least one render chunk failed; fewer frames exist than expected.
    #[error("partial render: {rendered} of {expected} frames written ({failed_chunks} chunk(s) failed)")]
    PartialRender {
        expected: u64,
        rendered: u64,
        failed_chunks: usize,
    },

    /// One encoding strategy failed. The orchestrator escalates to the next tier.
    #[error("{tier} encode failed: {detail}")]
    EncodeTierFailure { tier: EncodeTier, detail: String },

    /// Every encoding strategy failed.
    #[error("all encode tiers failed:\n{}", format_attempts(.attempts))]
    EncodeExhausted { attempts: Vec<EncodeAttempt> },

    /// A speed plan produced a filter factor outside `[0.5, 100]`. Indicates a reconciler bug.
    #[error("speed factor {factor} is outside the filter range [0.5, 100]")]
    SpeedFactorOutOfRange { factor: f64 },

    #[error("external tool error: {0}")]
    Tool(String),

    #[error("'{program}' timed out after {secs:.1}s and was killed")]
    ToolTimeout { program: String, secs: f64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShortsError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        Self::ResourceUnavailable(msg.into())
    }

    pub fn tool(msg: impl Into<String>) -> Self {
        Self::Tool(msg.into())
    }

    /// `true` when the error originates from job cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

fn format_attempts(attempts: &[EncodeAttempt]) -> String {
    attempts
        .iter()
        .map(|a| format!("  - {a}"))
        .collect::<Vec<_>>()
        .join("\n")
}
