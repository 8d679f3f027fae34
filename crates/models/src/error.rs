use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourtsideError {
    #[error("Upstream statistics unavailable: {reason}")]
    UpstreamDataUnavailable { reason: String },

    #[error("Feature schema mismatch: {detail}")]
    SchemaMismatch { detail: String },

    #[error("Model artifact not found: {version}")]
    ArtifactNotFound { version: String },

    #[error("Model artifact {version} is corrupt: {reason}")]
    ArtifactCorrupt { version: String, reason: String },

    #[error("Invalid probability: {prob}, must be between 0.0 and 1.0")]
    InvalidProbability { prob: f64 },

    #[error("No model loaded")]
    NotLoaded,

    #[error("Insufficient training data: {available} samples, need {required}")]
    InsufficientTrainingData { available: usize, required: usize },

    #[error("Model training failed: {reason}")]
    TrainingFailed { reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metrics error: {0}")]
    Metrics(String),
}

impl CourtsideError {
    pub fn schema_mismatch(detail: impl Into<String>) -> Self {
        Self::SchemaMismatch { detail: detail.into() }
    }

    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::UpstreamDataUnavailable { reason: reason.into() }
    }

    /// Short machine-readable label, used for metrics and API error codes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpstreamDataUnavailable { .. } => "upstream_data_unavailable",
            Self::SchemaMismatch { .. } => "schema_mismatch",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::ArtifactCorrupt { .. } => "artifact_corrupt",
            Self::InvalidProbability { .. } => "invalid_probability",
            Self::NotLoaded => "not_loaded",
            Self::InsufficientTrainingData { .. } => "insufficient_training_data",
            Self::TrainingFailed { .. } => "training_failed",
            Self::InvalidInput(_) => "invalid_input",
            Self::NotFound(_) => "not_found",
            Self::Cache(_) => "cache",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Config(_) => "config",
            Self::Metrics(_) => "metrics",
        }
    }
}

/// Failure of the external statistics provider. Callers must handle it
/// explicitly; there is no fallback to placeholder numbers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct StatsUnavailable {
    pub reason: String,
}

impl StatsUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl From<StatsUnavailable> for CourtsideError {
    fn from(err: StatsUnavailable) -> Self {
        Self::UpstreamDataUnavailable { reason: err.reason }
    }
}

pub type Result<T> = std::result::Result<T, CourtsideError>;

/// Outcome of a statistics fetch: the data, or the reason it is unavailable.
pub type StatsResult<T> = std::result::Result<T, StatsUnavailable>;
