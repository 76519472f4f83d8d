//! Evaluating a stored clustering against k-means alternatives
use crate::distance::Metric;
use crate::elbow::{elbow_with, ElbowCurve};
use crate::error::{Error, Result};
use crate::kmeans::KMeans;
use crate::plot::BarChart;
use crate::silhouette::{cluster_means, silhouette_samples, ClusterSilhouette, SilhouettePlot};
use log::{info, warn};
use ndarray::{Array1, Array2};

/// A feature matrix together with the clustering under evaluation.
#[derive(Clone, Debug)]
pub struct ClusterMetrics {
    data: Array2<f64>,
    labels: Array1<usize>,
    kmeans: KMeans,
}

/// Silhouette score of a k-means clustering with `k` clusters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateScore {
    pub k: usize,
    pub score: f64,
}

#[derive(Clone, Debug)]
pub struct ClusterEvaluation {
    /// Mean silhouette of the stored labels.
    pub score: f64,
    pub samples: Array1<f64>,
    pub cluster_means: Vec<ClusterSilhouette>,
    /// One entry per `k` in `2..=max_clusters`, capped at `n_samples - 1`.
    /// A `k` whose clustering collapses to a single label is left out.
    pub candidates: Vec<CandidateScore>,
}

impl ClusterEvaluation {
    /// The candidate cluster count with the highest silhouette score.
    pub fn best_k(&self) -> Option<CandidateScore> {
        self.candidates
            .iter()
            .copied()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

impl ClusterMetrics {
    /// Pairs `data` with one label per row. K-means defaults to
    /// [`KMeans::new`] until replaced with [`with_kmeans`](Self::with_kmeans).
    pub fn new(data: Array2<f64>, labels: Array1<usize>) -> Result<Self> {
        if data.nrows() != labels.len() {
            return Err(Error::LabelLength {
                labels: labels.len(),
                samples: data.nrows(),
            });
        }
        Ok(ClusterMetrics {
            data,
            labels,
            kmeans: KMeans::new(1),
        })
    }

    /// K-means settings used by [`elbow`](Self::elbow) and the candidate
    /// sweep of [`cluster_evaluation`](Self::cluster_evaluation).
    pub fn with_kmeans(mut self, kmeans: KMeans) -> Self {
        self.kmeans = kmeans;
        self
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    pub fn elbow(&self, max_clusters: usize, step: usize) -> Result<ElbowCurve> {
        elbow_with(&self.data, max_clusters, step, &self.kmeans)
    }

    /// Silhouette analysis of the stored labels, plus the silhouette score
    /// of a fresh k-means clustering for every `k` in `2..=max_clusters`.
    pub fn cluster_evaluation(
        &self,
        metric: &Metric,
        max_clusters: usize,
    ) -> Result<ClusterEvaluation> {
        if max_clusters < 2 {
            return Err(Error::NClusters);
        }
        if let Metric::Precomputed = metric {
            return Err(Error::PrecomputedFeatures);
        }

        let samples = silhouette_samples(&self.data, &self.labels, metric)?;
        let score = samples.mean().unwrap_or(0.0);
        let means = cluster_means(&samples, &self.labels)?;
        info!("silhouette of the given labels: {:.4}", score);

        // silhouettes need at most n_samples - 1 clusters
        let n_samples = self.data.nrows();
        let max_k = max_clusters.min(n_samples - 1);
        if max_k < max_clusters {
            warn!(
                "max_clusters {} capped at {} for {} samples",
                max_clusters, max_k, n_samples
            );
        }

        let mut candidates = Vec::new();
        for k in 2..=max_k {
            let fitted = self.kmeans.clone().with_n_clusters(k).fit(&self.data)?;
            let score = match silhouette_samples(&self.data, fitted.labels(), metric) {
                Ok(samples) => samples.mean().unwrap_or(0.0),
                Err(Error::InvalidLabelCount { n_labels, .. }) => {
                    warn!("k={}: k-means found {} distinct clusters, skipped", k, n_labels);
                    continue;
                }
                Err(e) => return Err(e),
            };
            info!("k={}: silhouette {:.4}", k, score);
            candidates.push(CandidateScore { k, score });
        }

        Ok(ClusterEvaluation {
            score,
            samples,
            cluster_means: means,
            candidates,
        })
    }

    /// Silhouette bar chart of the stored labels.
    pub fn silhouette_plot(&self, metric: &Metric, plot: &SilhouettePlot) -> Result<BarChart> {
        plot.build(&self.data, &self.labels, metric)
    }
}
