use lrformal::linear::LinearError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LrError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration file '{file}': {source}")]
    ConfigParseError {
        source: toml::de::Error,
        file: String,
    },

    #[error("Failed to build path formula: {0}")]
    PathFormula(String),

    #[error("Formula is not linear: {0}")]
    NotLinear(#[from] LinearError),

    #[error("Solver failure: {0}")]
    Solver(String),

    #[error("Synthesis failure: {0}")]
    Synthesis(String),

    /// Internal assertion raised by a synthesizer.
    #[error("Synthesis assertion failed: {0}")]
    SynthesisAssertion(String),

    #[error("Cannot build ranking relation: {0}")]
    RankingRelation(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Interrupted: {0}")]
    Interrupted(String),
}

pub type LrResult<T> = Result<T, LrError>;

impl LrError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, LrError::Interrupted(_))
    }
}
