//! Silhouette coefficients
//!
//! The silhouette of a sample compares `a`, its mean distance to the other
//! members of its own cluster, with `b`, its smallest mean distance to the
//! members of any other cluster: `s = (b - a) / max(a, b)`. Values lie in
//! `[-1, 1]`; values near 1 indicate dense, well separated clusters, values
//! near 0 overlapping clusters and negative values samples that are closer
//! to another cluster than to their own.
//!
//! The coefficient is only defined when the number of distinct labels lies
//! between 2 and `n_samples - 1` inclusive.
use crate::distance::{check_precomputed, pairwise_distances, Metric};
use crate::error::{Error, Result};
use crate::plot::{Bar, BarChart, FigureSize};
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, Ix1, Ix2};
use rand::prelude::*;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Silhouette coefficient of every sample.
///
/// `x` is a feature matrix, or a square distance matrix when `metric` is
/// [`Metric::Precomputed`]. A sample alone in its cluster gets 0.
pub fn silhouette_samples<S, L>(
    x: &ArrayBase<S, Ix2>,
    labels: &ArrayBase<L, Ix1>,
    metric: &Metric,
) -> Result<Array1<f64>>
where
    S: Data<Elem = f64> + Sync,
    L: Data<Elem = usize>,
{
    check_label_length(x.nrows(), labels.len())?;
    let labels: Vec<usize> = labels.to_vec();
    check_label_count(&labels)?;
    let distances = pairwise_distances(x, metric)?;
    Ok(from_distances(&distances, &labels))
}

/// Mean silhouette coefficient over all samples.
///
/// With `sample_size` set, the mean is taken over a random subset of that
/// many samples, drawn without replacement from an rng seeded with `seed`.
/// Sizes at or above the number of samples use every sample.
pub fn silhouette_score<S, L>(
    x: &ArrayBase<S, Ix2>,
    labels: &ArrayBase<L, Ix1>,
    metric: &Metric,
    sample_size: Option<usize>,
    seed: Option<u64>,
) -> Result<f64>
where
    S: Data<Elem = f64> + Sync,
    L: Data<Elem = usize>,
{
    check_label_length(x.nrows(), labels.len())?;
    let n_samples = labels.len();

    let samples = match sample_size {
        Some(0) => return Err(Error::InvalidParams("sample_size cannot be 0".into())),
        Some(size) if size < n_samples => {
            if let Metric::Precomputed = metric {
                check_precomputed(x)?;
            }
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let mut indices = rand::seq::index::sample(&mut rng, n_samples, size).into_vec();
            indices.sort_unstable();

            let subset: Array2<f64> = match metric {
                Metric::Precomputed => x.select(Axis(0), &indices).select(Axis(1), &indices),
                Metric::Distance(_) => x.select(Axis(0), &indices),
            };
            let sub_labels = labels.select(Axis(0), &indices);
            silhouette_samples(&subset, &sub_labels, metric)?
        }
        _ => silhouette_samples(x, labels, metric)?,
    };
    Ok(samples.mean().unwrap_or(0.0))
}

/// Mean silhouette of one cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterSilhouette {
    pub cluster: usize,
    pub mean: f64,
    pub size: usize,
}

/// Groups per-sample silhouettes by label and averages them, best cluster
/// first.
pub fn cluster_means<S, L>(
    samples: &ArrayBase<S, Ix1>,
    labels: &ArrayBase<L, Ix1>,
) -> Result<Vec<ClusterSilhouette>>
where
    S: Data<Elem = f64>,
    L: Data<Elem = usize>,
{
    check_label_length(samples.len(), labels.len())?;
    let mut groups: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
    for (&s, &label) in samples.iter().zip(labels.iter()) {
        let entry = groups.entry(label).or_insert((0.0, 0));
        entry.0 += s;
        entry.1 += 1;
    }
    let mut means: Vec<ClusterSilhouette> = groups
        .into_iter()
        .map(|(cluster, (sum, size))| ClusterSilhouette {
            cluster,
            mean: sum / size as f64,
            size,
        })
        .collect();
    means.sort_by(|a, b| b.mean.total_cmp(&a.mean));
    Ok(means)
}

/// Builds silhouette bar charts.
///
/// Without a `cluster`, the chart has one bar per cluster holding its mean
/// silhouette. With one, it has a bar per member sample of that cluster,
/// labelled by `sample_ids` when given and by row index otherwise. Bars are
/// sorted by value, largest first.
#[derive(Clone, Debug, Default)]
pub struct SilhouettePlot {
    pub fig_size: Option<FigureSize>,
    pub cluster: Option<usize>,
    pub sample_ids: Option<Vec<String>>,
}

impl SilhouettePlot {
    /// A chart of per-cluster means with an automatic figure size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a fixed figure size instead of sizing by bar count.
    pub fn with_fig_size(mut self, fig_size: FigureSize) -> Self {
        self.fig_size = Some(fig_size);
        self
    }

    /// Plots the samples of one cluster instead of the cluster means.
    pub fn with_cluster(mut self, cluster: usize) -> Self {
        self.cluster = Some(cluster);
        self
    }

    /// Names the bars of a single-cluster chart, one id per sample.
    pub fn with_sample_ids(mut self, ids: Vec<String>) -> Self {
        self.sample_ids = Some(ids);
        self
    }

    /// Computes the silhouettes of the clustering and lays out the chart.
    pub fn build<S, L>(
        &self,
        x: &ArrayBase<S, Ix2>,
        labels: &ArrayBase<L, Ix1>,
        metric: &Metric,
    ) -> Result<BarChart>
    where
        S: Data<Elem = f64> + Sync,
        L: Data<Elem = usize>,
    {
        if let Some(ids) = &self.sample_ids {
            if ids.len() != labels.len() {
                return Err(Error::IdLength {
                    ids: ids.len(),
                    samples: labels.len(),
                });
            }
        }
        let samples = silhouette_samples(x, labels, metric)?;

        let (bars, y_desc, title) = match self.cluster {
            None => {
                let bars: Vec<Bar> = cluster_means(&samples, labels)?
                    .into_iter()
                    .map(|c| Bar {
                        label: c.cluster.to_string(),
                        value: c.mean,
                    })
                    .collect();
                (bars, "Cluster", "Mean silhouette per cluster".to_string())
            }
            Some(cluster) => {
                let mut members: Vec<(usize, f64)> = labels
                    .iter()
                    .zip(samples.iter())
                    .enumerate()
                    .filter(|(_, (&label, _))| label == cluster)
                    .map(|(row, (_, &s))| (row, s))
                    .collect();
                if members.is_empty() {
                    return Err(Error::UnknownCluster(cluster));
                }
                members.sort_by(|a, b| b.1.total_cmp(&a.1));
                let bars: Vec<Bar> = members
                    .into_iter()
                    .map(|(row, value)| Bar {
                        label: match &self.sample_ids {
                            Some(ids) => ids[row].clone(),
                            None => row.to_string(),
                        },
                        value,
                    })
                    .collect();
                (bars, "ID samples", format!("Silhouette of cluster {}", cluster))
            }
        };

        let size = self.fig_size.unwrap_or_else(|| FigureSize::for_bars(bars.len()));
        Ok(BarChart {
            title,
            x_desc: "Silhouette coefficient".to_string(),
            y_desc: y_desc.to_string(),
            bars,
            size,
        })
    }
}

fn check_label_length(n_samples: usize, n_labels: usize) -> Result<()> {
    if n_samples != n_labels {
        return Err(Error::LabelLength {
            labels: n_labels,
            samples: n_samples,
        });
    }
    Ok(())
}

fn check_label_count(labels: &[usize]) -> Result<()> {
    let n_samples = labels.len();
    let mut distinct = labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    let n_labels = distinct.len();
    if n_labels < 2 || n_labels + 1 > n_samples {
        return Err(Error::InvalidLabelCount { n_labels, n_samples });
    }
    Ok(())
}

/// Silhouettes from a validated square distance matrix.
fn from_distances(distances: &Array2<f64>, labels: &[usize]) -> Array1<f64> {
    // map labels onto 0..k
    let mut index: BTreeMap<usize, usize> = BTreeMap::new();
    for &label in labels {
        let next = index.len();
        index.entry(label).or_insert(next);
    }
    let encoded: Vec<usize> = labels.iter().map(|label| index[label]).collect();
    let k = index.len();
    let mut counts = vec![0usize; k];
    encoded.iter().for_each(|&c| counts[c] += 1);

    let values: Vec<f64> = (0..labels.len())
        .into_par_iter()
        .map(|i| {
            let own = encoded[i];
            if counts[own] <= 1 {
                return 0.0;
            }
            let mut sums = vec![0.0; k];
            for (&c, &d) in encoded.iter().zip(distances.row(i).iter()) {
                sums[c] += d;
            }
            let a = sums[own] / (counts[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own)
                .map(|c| sums[c] / counts[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .collect();
    Array1::from(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{pairwise_distances, Distance};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, concatenate, Array, Array1};

    fn two_far_clusters() -> (Array2<f64>, Array1<usize>) {
        let records = concatenate![
            Axis(0),
            Array::linspace(0f64, 1f64, 10),
            Array::linspace(10000f64, 10001f64, 10)
        ]
        .insert_axis(Axis(1));
        let records = concatenate![Axis(1), records, records];
        let labels = concatenate![Axis(0), Array1::from_elem(10, 0), Array1::from_elem(10, 1)];
        (records, labels)
    }

    #[test]
    fn hand_computed_values() {
        let x = array![[0.0], [1.0], [4.0], [6.0]];
        let labels = array![0, 0, 1, 1];
        let s = silhouette_samples(&x, &labels, &Metric::default()).unwrap();
        // sample 0: a = 1, b = (4 + 6) / 2 = 5
        assert_abs_diff_eq!(s[0], 0.8, epsilon = 1e-12);
        // sample 1: a = 1, b = (3 + 5) / 2 = 4
        assert_abs_diff_eq!(s[1], 0.75, epsilon = 1e-12);
        // sample 2: a = 2, b = (4 + 3) / 2 = 3.5
        assert_abs_diff_eq!(s[2], 1.5 / 3.5, epsilon = 1e-12);
        // sample 3: a = 2, b = (6 + 5) / 2 = 5.5
        assert_abs_diff_eq!(s[3], 3.5 / 5.5, epsilon = 1e-12);
        let score = silhouette_score(&x, &labels, &Metric::default(), None, None).unwrap();
        assert_abs_diff_eq!(score, s.mean().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn well_separated_clusters_score_close_to_one() {
        let (records, labels) = two_far_clusters();
        let score = silhouette_score(&records, &labels, &Metric::default(), None, None).unwrap();
        assert_abs_diff_eq!(score, 1f64, epsilon = 1e-3);
    }

    #[test]
    fn interleaved_clusters_score_negative() {
        let records = concatenate![
            Axis(0),
            Array::linspace(0f64, 1f64, 5),
            Array::linspace(1f64, 2f64, 5),
            Array::linspace(10000f64, 10001f64, 5),
            Array::linspace(10001f64, 10002f64, 5)
        ]
        .insert_axis(Axis(1));
        let labels = concatenate![
            Axis(0),
            Array1::from_elem(5, 0),
            Array1::from_elem(5, 1),
            Array1::from_elem(5, 0),
            Array1::from_elem(5, 1)
        ];
        let score = silhouette_score(&records, &labels, &Metric::default(), None, None).unwrap();
        assert!(score < 0f64);
    }

    #[test]
    fn values_stay_in_range() {
        let records = Array::linspace(0f64, 10f64, 100).insert_axis(Axis(1));
        let labels = Array1::from_shape_fn(100, |i| (i + 3) % 48);
        let s = silhouette_samples(&records, &labels, &Metric::default()).unwrap();
        assert!(s.iter().all(|v| (-1.0..=1.0).contains(v)));
        assert!(s.mean().unwrap() < -0.5);
    }

    #[test]
    fn singleton_cluster_scores_zero() {
        let x = array![[0.0], [1.0], [10.0]];
        let labels = array![0, 0, 1];
        let s = silhouette_samples(&x, &labels, &Metric::default()).unwrap();
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn labels_need_not_be_contiguous() {
        let x = array![[0.0], [1.0], [4.0], [6.0]];
        let a = silhouette_samples(&x, &array![0, 0, 1, 1], &Metric::default()).unwrap();
        let b = silhouette_samples(&x, &array![42, 42, 7, 7], &Metric::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn precomputed_matches_features() {
        let (records, labels) = two_far_clusters();
        let metric = Metric::Distance(Distance::Manhattan);
        let distances = pairwise_distances(&records, &metric).unwrap();
        let from_features = silhouette_samples(&records, &labels, &metric).unwrap();
        let from_matrix = silhouette_samples(&distances, &labels, &Metric::Precomputed).unwrap();
        for (a, b) in from_features.iter().zip(from_matrix.iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn sampled_score_is_seeded() {
        let (records, labels) = two_far_clusters();
        let distances = pairwise_distances(&records, &Metric::default()).unwrap();
        let precomputed = Metric::Precomputed;
        let a = silhouette_score(&distances, &labels, &precomputed, Some(8), Some(5)).unwrap();
        let b = silhouette_score(&distances, &labels, &precomputed, Some(8), Some(5)).unwrap();
        assert_eq!(a, b);
        assert!(a > 0.8);
        // oversized samples fall back to the full score
        let metric = Metric::default();
        let full = silhouette_score(&records, &labels, &metric, None, None).unwrap();
        let big = silhouette_score(&records, &labels, &metric, Some(1000), None).unwrap();
        assert_abs_diff_eq!(full, big, epsilon = 1e-12);
    }

    #[test]
    fn invalid_label_counts() {
        let x = array![[0.0], [1.0], [2.0]];
        assert!(matches!(
            silhouette_samples(&x, &array![0, 0, 0], &Metric::default()),
            Err(Error::InvalidLabelCount { n_labels: 1, n_samples: 3 })
        ));
        assert!(matches!(
            silhouette_samples(&x, &array![0, 1, 2], &Metric::default()),
            Err(Error::InvalidLabelCount { n_labels: 3, n_samples: 3 })
        ));
        assert!(matches!(
            silhouette_samples(&x, &array![0, 1], &Metric::default()),
            Err(Error::LabelLength { labels: 2, samples: 3 })
        ));
        assert!(matches!(
            silhouette_score(&x, &array![0, 0, 1], &Metric::default(), Some(0), None),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn cluster_means_are_sorted() {
        let samples = array![0.2, 0.4, 0.9, 0.7, -0.1];
        let labels = array![0, 0, 1, 1, 2];
        let means = cluster_means(&samples, &labels).unwrap();
        let order: Vec<usize> = means.iter().map(|c| c.cluster).collect();
        assert_eq!(order, vec![1, 0, 2]);
        assert_abs_diff_eq!(means[0].mean, 0.8, epsilon = 1e-12);
        assert_eq!(means[0].size, 2);
        assert_eq!(means[2].size, 1);
    }

    #[test]
    fn plot_of_cluster_means() {
        let x = array![[0.0], [1.0], [4.0], [6.0]];
        let chart = SilhouettePlot::new()
            .build(&x, &array![0, 0, 1, 1], &Metric::default())
            .unwrap();
        assert_eq!(chart.y_desc, "Cluster");
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["0", "1"]);
        assert_eq!(chart.size, FigureSize::default());
    }

    #[test]
    fn plot_of_one_cluster() {
        let x = array![[0.0], [1.0], [4.0], [6.0]];
        let labels = array![0, 0, 1, 1];
        let ids = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        let chart = SilhouettePlot::new()
            .with_cluster(1)
            .with_sample_ids(ids)
            .with_fig_size(FigureSize::new(4.0, 3.0))
            .build(&x, &labels, &Metric::default())
            .unwrap();
        assert_eq!(chart.y_desc, "ID samples");
        let labels: Vec<&str> = chart.bars.iter().map(|b| b.label.as_str()).collect();
        // sample 3 (0.636) beats sample 2 (0.429)
        assert_eq!(labels, vec!["d", "c"]);
        assert_eq!(chart.size, FigureSize::new(4.0, 3.0));

        let plain = SilhouettePlot::new()
            .with_cluster(0)
            .build(&x, &array![0, 0, 1, 1], &Metric::default())
            .unwrap();
        let rows: Vec<&str> = plain.bars.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(rows, vec!["0", "1"]);
    }

    #[test]
    fn plot_errors() {
        let x = array![[0.0], [1.0], [4.0], [6.0]];
        let labels = array![0, 0, 1, 1];
        assert!(matches!(
            SilhouettePlot::new().with_cluster(5).build(&x, &labels, &Metric::default()),
            Err(Error::UnknownCluster(5))
        ));
        assert!(matches!(
            SilhouettePlot::new()
                .with_sample_ids(vec!["a".into()])
                .build(&x, &labels, &Metric::default()),
            Err(Error::IdLength { ids: 1, samples: 4 })
        ));
    }

    #[test]
    fn large_plots_grow_with_bar_count() {
        let records = Array::linspace(0f64, 100f64, 160).insert_axis(Axis(1));
        let labels = Array1::from_shape_fn(160, |i| i / 2);
        let chart = SilhouettePlot::new()
            .build(&records, &labels, &Metric::default())
            .unwrap();
        assert_eq!(chart.bars.len(), 80);
        assert_eq!(chart.size, FigureSize::new(10.0, 20.0));
    }
}
