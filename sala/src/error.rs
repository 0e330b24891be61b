use thiserror::Error;

#[derive(Debug, Error)]
pub enum SalaError {
    /// The probe point lies on a polygon edge (within tolerance).
    #[error("point lies on the boundary")]
    OnBoundary,
    #[error("analysis cancelled")]
    Cancelled,
    #[error("duplicate layer name: {0}")]
    DuplicateLayer(String),
    #[error("no more layers available")]
    OutOfLayers,
    #[error("unknown layer index {0}")]
    UnknownLayer(usize),
    #[error("column {0} is locked")]
    LockedColumn(String),
    #[error("unknown column {0}")]
    UnknownColumn(String),
    #[error("column {0} already exists")]
    DuplicateColumn(String),
    #[error("duplicate row key {0}")]
    DuplicateRow(u32),
    #[error("unknown node {0}")]
    UnknownNode(u32),
    #[error("invalid radius: {0}")]
    InvalidRadius(String),
    #[error("grid spacing must be positive and finite, got {0}")]
    InvalidSpacing(f64),
    #[error("parameter '{0}' must be finite")]
    NonFinite(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed data: {0}")]
    Format(String),
}

pub type Result<T> = std::result::Result<T, SalaError>;
