use crate::error::{Error, Result};
use log::debug;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;
use rayon::prelude::*;

/// Strategy used to pick the starting centroids of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KMeansInit {
    /// Distinct samples chosen uniformly at random.
    Random,
    /// k-means++: each new centroid is drawn with probability proportional
    /// to its squared distance from the closest centroid picked so far.
    KMeansPlusPlus,
}

/// Standard (Lloyd) K-Means clustering.
#[derive(Clone, Debug)]
pub struct KMeans {
    pub n_clusters: usize,
    pub max_iters: usize,
    pub n_runs: usize,
    pub tolerance: f64,
    pub init: KMeansInit,
    pub seed: Option<u64>,
}

/// Outcome of [`KMeans::fit`]: the best run out of `n_runs`.
#[derive(Clone, Debug)]
pub struct FittedKMeans {
    centroids: Array2<f64>,
    labels: Array1<usize>,
    inertia: f64,
    n_iters: usize,
}

impl KMeans {
    /// Creates a new KMeans instance with the given number of clusters.
    pub fn new(n_clusters: usize) -> Self {
        KMeans {
            n_clusters,
            max_iters: 300,
            n_runs: 10,
            tolerance: 1e-4,
            init: KMeansInit::KMeansPlusPlus,
            seed: None,
        }
    }

    /// Sets the number of clusters.
    pub fn with_n_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    /// Sets the maximum number of Lloyd iterations per run.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets how many runs with different starting centroids are made.
    pub fn with_runs(mut self, n_runs: usize) -> Self {
        self.n_runs = n_runs;
        self
    }

    /// Sets the convergence tolerance, relative to the mean feature variance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the centroid initialisation strategy.
    pub fn with_init(mut self, init: KMeansInit) -> Self {
        self.init = init;
        self
    }

    /// Seeds the random number generator so fits are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn validate(&self, n_samples: usize) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(Error::NClusters);
        }
        if self.n_runs == 0 {
            return Err(Error::InvalidParams("n_runs cannot be 0".into()));
        }
        if self.max_iters == 0 {
            return Err(Error::InvalidParams("max_iters cannot be 0".into()));
        }
        if !(self.tolerance >= 0.0) {
            return Err(Error::InvalidParams(format!(
                "tolerance must be non-negative, got {}",
                self.tolerance
            )));
        }
        if n_samples == 0 {
            return Err(Error::EmptyData);
        }
        if self.n_clusters > n_samples {
            return Err(Error::TooManyClusters {
                n_clusters: self.n_clusters,
                n_samples,
            });
        }
        Ok(())
    }

    /// Fits the model to the data, keeping the run with the lowest inertia.
    pub fn fit<S>(&self, x: &ArrayBase<S, Ix2>) -> Result<FittedKMeans>
    where
        S: Data<Elem = f64> + Sync,
    {
        self.validate(x.nrows())?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let threshold = self.tolerance * mean_variance(x);

        let mut best: Option<FittedKMeans> = None;
        for run in 0..self.n_runs {
            let fitted = self.run_once(x, threshold, &mut rng);
            debug!(
                "k-means run {}/{} with k={}: inertia {:.6} after {} iterations",
                run + 1,
                self.n_runs,
                self.n_clusters,
                fitted.inertia,
                fitted.n_iters
            );
            if best.as_ref().map_or(true, |b| fitted.inertia < b.inertia) {
                best = Some(fitted);
            }
        }
        best.ok_or_else(|| Error::InvalidParams("n_runs cannot be 0".into()))
    }

    fn run_once<S>(
        &self,
        x: &ArrayBase<S, Ix2>,
        threshold: f64,
        rng: &mut StdRng,
    ) -> FittedKMeans
    where
        S: Data<Elem = f64> + Sync,
    {
        let centroids = match self.init {
            KMeansInit::Random => random_init(self.n_clusters, x, rng),
            KMeansInit::KMeansPlusPlus => k_means_pp(self.n_clusters, x, rng),
        };
        lloyd(x, centroids, self.max_iters, threshold)
    }
}

/// Lloyd iterations from the given starting centroids. Stops after
/// `max_iters` updates or once the squared centroid shift is at most
/// `threshold`.
fn lloyd<S>(
    x: &ArrayBase<S, Ix2>,
    mut centroids: Array2<f64>,
    max_iters: usize,
    threshold: f64,
) -> FittedKMeans
where
    S: Data<Elem = f64> + Sync,
{
    let (n_clusters, n_features) = centroids.dim();
    let (mut labels, mut sq_dists) = assign_labels(x, &centroids);
    let mut n_iters = 0;

    for _ in 0..max_iters {
        n_iters += 1;

        // Compute new centroids.
        let mut new_centroids = Array2::<f64>::zeros((n_clusters, n_features));
        let mut counts = vec![0usize; n_clusters];
        x.axis_iter(Axis(0))
            .zip(labels.iter())
            .for_each(|(row, &label)| {
                new_centroids
                    .row_mut(label)
                    .zip_mut_with(&row, |a, &b| *a += b);
                counts[label] += 1;
            });
        new_centroids
            .axis_iter_mut(Axis(0))
            .zip(centroids.axis_iter(Axis(0)))
            .enumerate()
            .for_each(|(i, (mut c, old))| {
                if counts[i] > 0 {
                    c.mapv_inplace(|v| v / counts[i] as f64);
                } else {
                    // empty cluster keeps its centroid
                    c.assign(&old);
                }
            });

        let shift: f64 = (&new_centroids - &centroids).mapv(|v| v * v).sum();
        centroids = new_centroids;
        (labels, sq_dists) = assign_labels(x, &centroids);
        if shift <= threshold {
            break;
        }
    }

    FittedKMeans {
        centroids,
        labels,
        inertia: sq_dists.sum(),
        n_iters,
    }
}

impl FittedKMeans {
    /// Cluster centroids, one row per cluster.
    pub fn centroids(&self) -> &Array2<f64> {
        &self.centroids
    }

    /// Cluster index of each training sample.
    pub fn labels(&self) -> &Array1<usize> {
        &self.labels
    }

    /// Sum of squared distances of the samples to their closest centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Number of Lloyd iterations performed by the best run.
    pub fn n_iters(&self) -> usize {
        self.n_iters
    }

    /// Predicts the closest cluster each sample in `x` belongs to.
    pub fn predict<S>(&self, x: &ArrayBase<S, Ix2>) -> Array1<usize>
    where
        S: Data<Elem = f64> + Sync,
    {
        assign_labels(x, &self.centroids).0
    }
}

/// Assigns each sample to its closest centroid, returning the labels and the
/// squared distance to that centroid.
pub(crate) fn assign_labels<S1, S2>(
    x: &ArrayBase<S1, Ix2>,
    centroids: &ArrayBase<S2, Ix2>,
) -> (Array1<usize>, Array1<f64>)
where
    S1: Data<Elem = f64> + Sync,
    S2: Data<Elem = f64> + Sync,
{
    let n_samples = x.len_of(Axis(0));
    let (labels, dists): (Vec<usize>, Vec<f64>) = (0..n_samples)
        .into_par_iter()
        .map(|i| closest_centroid(centroids, &x.row(i)))
        .unzip();
    (Array1::from(labels), Array1::from(dists))
}

fn closest_centroid<S1, S2>(
    centroids: &ArrayBase<S1, Ix2>,
    x: &ArrayBase<S2, Ix1>,
) -> (usize, f64)
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    let mut min_dist = f64::INFINITY;
    let mut min_j = 0;
    for (j, c) in centroids.axis_iter(Axis(0)).enumerate() {
        let dist: f64 = x
            .iter()
            .zip(c.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if dist < min_dist {
            min_dist = dist;
            min_j = j;
        }
    }
    (min_j, min_dist)
}

/// Mean of the per-feature variances, used to scale the tolerance.
fn mean_variance<S>(x: &ArrayBase<S, Ix2>) -> f64
where
    S: Data<Elem = f64>,
{
    if x.is_empty() {
        return 0.0;
    }
    x.var_axis(Axis(0), 0.0).mean().unwrap_or(0.0)
}

fn random_init<S>(n_clusters: usize, x: &ArrayBase<S, Ix2>, rng: &mut StdRng) -> Array2<f64>
where
    S: Data<Elem = f64>,
{
    let indices = rand::seq::index::sample(rng, x.nrows(), n_clusters).into_vec();
    x.select(Axis(0), &indices)
}

fn k_means_pp<S>(n_clusters: usize, x: &ArrayBase<S, Ix2>, rng: &mut StdRng) -> Array2<f64>
where
    S: Data<Elem = f64> + Sync,
{
    let (n_samples, n_features) = x.dim();
    let mut centroids = Array2::<f64>::zeros((n_clusters, n_features));
    let first = rng.gen_range(0..n_samples);
    centroids.row_mut(0).assign(&x.row(first));

    for c in 1..n_clusters {
        let (_, dists) = assign_labels(x, &centroids.slice(ndarray::s![0..c, ..]));
        // all samples already coincide with a centroid
        let idx = match WeightedIndex::new(dists.iter()) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.gen_range(0..n_samples),
        };
        centroids.row_mut(c).assign(&x.row(idx));
    }
    centroids
}
