//! Cluster evaluation helpers: elbow curves for choosing the number of
//! k-means clusters, and silhouette coefficients with bar charts for judging
//! a clustering.
//!
//! ```no_run
//! use cluster_metrics::{elbow, plot, silhouette_score, Metric};
//! use ndarray::array;
//!
//! let x = array![[1.0, 2.0], [1.5, 1.8], [5.0, 8.0], [8.0, 8.0], [1.0, 0.6], [9.0, 11.0]];
//! let curve = elbow(&x, 4, 1)?;
//! let svg = plot::render_elbow(&curve, plot::FigureSize::default())?;
//! plot::save_svg("elbow.svg", &svg)?;
//!
//! let labels = array![0, 0, 1, 1, 0, 1];
//! let score = silhouette_score(&x, &labels, &Metric::default(), None, None)?;
//! # Ok::<(), cluster_metrics::Error>(())
//! ```

pub mod dataset;
pub mod distance;
pub mod elbow;
pub mod error;
pub mod evaluation;
pub mod kmeans;
pub mod plot;
pub mod silhouette;

pub use dataset::{blobs, read_labels, Dataset, DelimitedOptions};
pub use distance::{cdist, pairwise_distances, Distance, Metric};
pub use elbow::{elbow, elbow_with, ElbowCurve, ElbowPoint};
pub use error::{Error, Result};
pub use evaluation::{CandidateScore, ClusterEvaluation, ClusterMetrics};
pub use kmeans::{FittedKMeans, KMeans, KMeansInit};
pub use silhouette::{
    cluster_means, silhouette_samples, silhouette_score, ClusterSilhouette, SilhouettePlot,
};
