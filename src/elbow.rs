//! The elbow method: distortion as a function of the number of clusters
use crate::distance::{cdist, Distance};
use crate::error::{Error, Result};
use crate::kmeans::KMeans;
use log::info;
use ndarray::{ArrayBase, Axis, Data, Ix2};

/// One fitted cluster count on an elbow curve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElbowPoint {
    pub k: usize,
    /// Mean Euclidean distance from each sample to its closest centroid.
    pub distortion: f64,
    /// Sum of squared distances from each sample to its closest centroid.
    pub inertia: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElbowCurve {
    pub points: Vec<ElbowPoint>,
}

impl ElbowCurve {
    /// The fitted cluster counts, in increasing order.
    pub fn ks(&self) -> Vec<usize> {
        self.points.iter().map(|p| p.k).collect()
    }

    /// Distortion at each fitted cluster count.
    pub fn distortions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.distortion).collect()
    }
}

/// Fits k-means for `k = 1, 1 + step, ...` up to `max_clusters` and records
/// the distortion of each fit.
pub fn elbow<S>(data: &ArrayBase<S, Ix2>, max_clusters: usize, step: usize) -> Result<ElbowCurve>
where
    S: Data<Elem = f64> + Sync,
{
    elbow_with(data, max_clusters, step, &KMeans::new(1))
}

/// Same as [`elbow`], with every fit configured from `template`. Its
/// `n_clusters` is replaced by each candidate `k`.
pub fn elbow_with<S>(
    data: &ArrayBase<S, Ix2>,
    max_clusters: usize,
    step: usize,
    template: &KMeans,
) -> Result<ElbowCurve>
where
    S: Data<Elem = f64> + Sync,
{
    if step == 0 {
        return Err(Error::Step);
    }
    if max_clusters == 0 {
        return Err(Error::NClusters);
    }
    let n_samples = data.nrows();
    if n_samples == 0 {
        return Err(Error::EmptyData);
    }
    if max_clusters > n_samples {
        return Err(Error::TooManyClusters {
            n_clusters: max_clusters,
            n_samples,
        });
    }

    let mut curve = ElbowCurve::default();
    for k in (1..=max_clusters).step_by(step) {
        let fitted = template.clone().with_n_clusters(k).fit(data)?;
        let distances = cdist(data, fitted.centroids(), &Distance::Euclidean);
        let closest = distances.map_axis(Axis(1), |row| row.fold(f64::INFINITY, |a, &b| a.min(b)));
        let distortion = closest.sum() / n_samples as f64;
        info!(
            "k={}: distortion {:.6}, inertia {:.6}",
            k,
            distortion,
            fitted.inertia()
        );
        curve.points.push(ElbowPoint {
            k,
            distortion,
            inertia: fitted.inertia(),
        });
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::blobs;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn visits_every_step() {
        let mut rng = StdRng::seed_from_u64(3);
        let x = blobs(10, &array![[0.0, 0.0], [30.0, 0.0]], &mut rng);
        let curve = elbow_with(&x, 10, 3, &KMeans::new(1).with_seed(1)).unwrap();
        assert_eq!(curve.ks(), vec![1, 4, 7, 10]);
        assert_eq!(curve.distortions().len(), 4);
    }

    #[test]
    fn distortion_of_single_cluster_is_mean_distance_to_centre() {
        let x = array![[1.0, 0.0], [-1.0, 0.0], [0.0, 3.0], [0.0, -3.0]];
        let curve = elbow(&x, 1, 1).unwrap();
        assert_eq!(curve.points.len(), 1);
        assert_abs_diff_eq!(curve.points[0].distortion, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.points[0].inertia, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn distortion_drops_at_the_true_cluster_count() {
        let mut rng = StdRng::seed_from_u64(8);
        let centroids = array![[0.0, 0.0], [50.0, 50.0], [-50.0, 50.0]];
        let x = blobs(40, &centroids, &mut rng);
        let curve = elbow_with(&x, 5, 1, &KMeans::new(1).with_seed(21)).unwrap();
        let d = curve.distortions();
        // large gains until k = 3, marginal afterwards
        assert!(d[1] < d[0] * 0.8);
        assert!(d[2] < d[1] * 0.5);
        assert!(d[3] > d[2] * 0.5);
        assert!(d[2] < 2.0);
    }

    #[test]
    fn invalid_arguments() {
        let x = array![[0.0], [1.0], [2.0]];
        assert!(matches!(elbow(&x, 2, 0), Err(Error::Step)));
        assert!(matches!(elbow(&x, 0, 1), Err(Error::NClusters)));
        assert!(matches!(
            elbow(&x, 4, 1),
            Err(Error::TooManyClusters { n_clusters: 4, n_samples: 3 })
        ));
    }
}
