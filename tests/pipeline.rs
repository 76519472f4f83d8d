use cluster_metrics::plot::{render_bars, render_elbow, save_svg, FigureSize};
use cluster_metrics::{
    blobs, elbow_with, silhouette_score, ClusterMetrics, Dataset, DelimitedOptions, KMeans, Metric,
    SilhouettePlot,
};
use ndarray::{array, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fmt::Write;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("cluster-metrics-{}-{}", std::process::id(), name))
}

fn write_dataset(records: &Array2<f64>) -> PathBuf {
    let mut text = String::from("id,x,y,label\n");
    for (i, row) in records.rows().into_iter().enumerate() {
        writeln!(text, "s{},{},{},{}", i, row[0], row[1], i / 25).unwrap();
    }
    let path = scratch("blobs.csv");
    std::fs::write(&path, text).unwrap();
    path
}

#[test]
fn file_to_charts() {
    let mut rng = StdRng::seed_from_u64(2024);
    let centroids = array![[0.0, 0.0], [25.0, 25.0], [-25.0, 25.0], [0.0, 50.0]];
    let records = blobs(25, &centroids, &mut rng);
    let path = write_dataset(&records);

    let options = DelimitedOptions {
        has_header: true,
        label_column: Some(3),
        id_column: Some(0),
        ..Default::default()
    };
    let dataset = Dataset::from_delimited(&path, &options).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(dataset.records.dim(), (100, 2));
    let labels = dataset.labels.clone().unwrap();
    let ids = dataset.ids.clone().unwrap();
    assert_eq!(ids[26], "s26");

    // elbow
    let curve = elbow_with(&dataset.records, 6, 1, &KMeans::new(1).with_seed(9)).unwrap();
    let distortions = curve.distortions();
    assert!(distortions.windows(2).take(3).all(|w| w[1] < w[0]));
    let svg = render_elbow(&curve, FigureSize::default()).unwrap();
    let out = scratch("elbow.svg");
    save_svg(&out, &svg).unwrap();
    assert!(std::fs::metadata(&out).unwrap().len() > 0);
    std::fs::remove_file(&out).unwrap();

    // silhouette of the generating labels
    let metric = Metric::default();
    let score = silhouette_score(&dataset.records, &labels, &metric, None, None).unwrap();
    assert!(score > 0.7);

    let chart = SilhouettePlot::new()
        .with_cluster(2)
        .with_sample_ids(ids)
        .build(&dataset.records, &labels, &metric)
        .unwrap();
    assert_eq!(chart.bars.len(), 25);
    assert!(chart.bars.iter().all(|b| b.label.starts_with('s')));
    assert!(chart.bars.windows(2).all(|w| w[0].value >= w[1].value));
    let svg = render_bars(&chart).unwrap();
    assert!(svg.contains("ID samples"));

    // evaluation picks the generating cluster count
    let eval = ClusterMetrics::new(dataset.records, labels)
        .unwrap()
        .with_kmeans(KMeans::new(1).with_seed(9))
        .cluster_evaluation(&metric, 6)
        .unwrap();
    assert_eq!(eval.best_k().unwrap().k, 4);
}
