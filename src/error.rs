use thiserror::Error;

/// Errors raised at the edges of the dashboard pipeline: loading the dataset,
/// parsing user-supplied names and reading configuration.
///
/// The pipeline itself (filter, aggregate, shape) never fails; degenerate
/// input is reported through the renderable's status instead.
#[derive(Debug, Error)]
pub enum DashError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse or serialise error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension the loader does not understand
    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    /// The same country resolved to two different continents
    #[error("Country '{country}' maps to both {first} and {second}")]
    InconsistentContinent {
        country: String,
        first: String,
        second: String,
    },

    /// Metric name not known to the catalog
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    /// Dimension name not known to the catalog
    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),

    /// Chart kind not known to the shaper
    #[error("Unknown chart kind: {0}")]
    UnknownChartKind(String),

    /// Aggregation operation not recognised
    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),

    /// A value that could not be parsed for the given field
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Configuration error (bad file, bad environment override)
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Type alias for Results using DashError
pub type Result<T> = std::result::Result<T, DashError>;
