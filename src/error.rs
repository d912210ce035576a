use thiserror::Error;

/// Errors surfaced by the analytics engine.
///
/// Degenerate-but-valid inputs (empty graphs, isolated actors, removal
/// targets that are not in the graph) never produce an error; they have
/// defined numeric results instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid interaction at row {index}: sender={sender:?} recipient={recipient:?}")]
    InvalidEdge {
        index: usize,
        sender: String,
        recipient: String,
    },

    #[error("partition assigns no community to any node")]
    EmptyPartition,

    #[error("invalid timestamp at row {row}: {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
