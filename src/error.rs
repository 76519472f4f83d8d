//! Error types for cluster evaluation

use ndarray::ShapeError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("n_clusters cannot be 0")]
    NClusters,
    #[error("n_clusters ({n_clusters}) cannot exceed the number of samples ({n_samples})")]
    TooManyClusters { n_clusters: usize, n_samples: usize },
    #[error("step cannot be 0")]
    Step,
    #[error("invalid parameter {0}")]
    InvalidParams(String),
    #[error("dataset has no samples")]
    EmptyData,
    #[error("found {labels} labels for {samples} samples")]
    LabelLength { labels: usize, samples: usize },
    #[error(
        "number of labels is {n_labels}, valid values are 2 to n_samples - 1 ({n_samples} samples)"
    )]
    InvalidLabelCount { n_labels: usize, n_samples: usize },
    #[error("precomputed distance matrix must be square, got {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    #[error("precomputed distance matrix has non-zero elements on the diagonal")]
    NonZeroDiagonal,
    #[error("a precomputed distance matrix has no features to cluster")]
    PrecomputedFeatures,
    #[error("unknown distance metric `{0}`")]
    UnknownMetric(String),
    #[error("cluster {0} has no samples")]
    UnknownCluster(usize),
    #[error("found {ids} sample ids for {samples} samples")]
    IdLength { ids: usize, samples: usize },
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("rendering failed: {0}")]
    Plot(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
