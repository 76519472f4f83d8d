use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use cluster_metrics::plot::{self, FigureSize};
use cluster_metrics::{
    elbow_with, read_labels, silhouette_score, ClusterMetrics, Dataset, DelimitedOptions, KMeans,
    Metric, SilhouettePlot,
};
use log::info;
use ndarray::Array1;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cluster-metrics")]
#[command(about = "Elbow curves and silhouette analysis for clusterings")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plot k-means distortion against the number of clusters
    Elbow {
        #[command(flatten)]
        input: InputArgs,
        /// Largest cluster count to fit
        #[arg(short = 'm', long)]
        max_clusters: usize,
        /// Increment between fitted cluster counts
        #[arg(long, default_value_t = 1)]
        step: usize,
        #[command(flatten)]
        kmeans: KMeansArgs,
        #[command(flatten)]
        figure: FigureArgs,
        #[arg(short, long, default_value = "elbow.svg")]
        output: PathBuf,
    },
    /// Print the mean silhouette coefficient of a clustering
    Score {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        labels: LabelArgs,
        #[command(flatten)]
        kmeans: KMeansArgs,
        /// Distance metric, or `precomputed` when the input is a distance matrix
        #[arg(long, default_value = "euclidean")]
        metric: Metric,
        /// Score a random subset of this many samples
        #[arg(long)]
        sample_size: Option<usize>,
    },
    /// Draw a silhouette bar chart
    Plot {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        labels: LabelArgs,
        #[command(flatten)]
        kmeans: KMeansArgs,
        #[arg(long, default_value = "euclidean")]
        metric: Metric,
        /// Plot the samples of this cluster instead of the cluster means
        #[arg(short, long)]
        cluster: Option<usize>,
        #[command(flatten)]
        figure: FigureArgs,
        #[arg(short, long, default_value = "silhouette.svg")]
        output: PathBuf,
    },
    /// Score the given labels and k-means clusterings for k = 2..=max
    Evaluate {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        labels: LabelArgs,
        #[command(flatten)]
        kmeans: KMeansArgs,
        #[arg(long, default_value = "euclidean")]
        metric: Metric,
        #[arg(short = 'm', long)]
        max_clusters: usize,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Delimited text file with one sample per row
    input: PathBuf,
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,
    /// Skip the first row
    #[arg(long)]
    header: bool,
    /// Zero-based column holding sample ids
    #[arg(long)]
    id_column: Option<usize>,
    /// Zero-based column holding integer cluster labels
    #[arg(long)]
    label_column: Option<usize>,
}

#[derive(Args)]
struct LabelArgs {
    /// File with one integer label per line
    #[arg(long, conflicts_with_all = ["k", "label_column"])]
    labels: Option<PathBuf>,
    /// Label the samples by fitting k-means with this many clusters
    #[arg(short, long, conflicts_with = "label_column")]
    k: Option<usize>,
}

#[derive(Args)]
struct KMeansArgs {
    #[arg(long)]
    seed: Option<u64>,
    /// Number of k-means restarts
    #[arg(long, default_value_t = 10)]
    runs: usize,
    #[arg(long, default_value_t = 300)]
    max_iters: usize,
}

#[derive(Args)]
struct FigureArgs {
    /// Figure width in inches
    #[arg(long)]
    width: Option<f64>,
    /// Figure height in inches
    #[arg(long)]
    height: Option<f64>,
}

impl InputArgs {
    fn load(&self) -> anyhow::Result<Dataset> {
        let options = DelimitedOptions {
            delimiter: self.delimiter,
            has_header: self.header,
            label_column: self.label_column,
            id_column: self.id_column,
        };
        Dataset::from_delimited(&self.input, &options)
            .with_context(|| format!("reading {}", self.input.display()))
    }
}

impl KMeansArgs {
    fn kmeans(&self, n_clusters: usize) -> KMeans {
        let kmeans = KMeans::new(n_clusters)
            .with_runs(self.runs)
            .with_max_iters(self.max_iters);
        match self.seed {
            Some(seed) => kmeans.with_seed(seed),
            None => kmeans,
        }
    }
}

impl FigureArgs {
    fn size(&self) -> Option<FigureSize> {
        let default = FigureSize::default();
        match (self.width, self.height) {
            (None, None) => None,
            (w, h) => Some(FigureSize::new(
                w.unwrap_or(default.width),
                h.unwrap_or(default.height),
            )),
        }
    }
}

/// Labels come from the label column, a labels file, or a k-means fit. The
/// three sources are mutually exclusive on the command line.
fn resolve_labels(
    dataset: &Dataset,
    labels: &LabelArgs,
    kmeans: &KMeansArgs,
    metric: &Metric,
) -> anyhow::Result<Array1<usize>> {
    if let Some(labels) = &dataset.labels {
        return Ok(labels.clone());
    }
    if let Some(path) = &labels.labels {
        return read_labels(path).with_context(|| format!("reading {}", path.display()));
    }
    if let Some(k) = labels.k {
        if let Metric::Precomputed = metric {
            bail!("cannot fit k-means on a precomputed distance matrix, pass --labels instead");
        }
        let fitted = kmeans.kmeans(k).fit(&dataset.records)?;
        info!("fitted k-means with k={}: inertia {:.4}", k, fitted.inertia());
        return Ok(fitted.labels().clone());
    }
    bail!("no labels given: use --label-column, --labels or -k")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Elbow {
            input,
            max_clusters,
            step,
            kmeans,
            figure,
            output,
        } => {
            let dataset = input.load()?;
            let curve = elbow_with(&dataset.records, max_clusters, step, &kmeans.kmeans(1))?;
            println!("{:>6} {:>12} {:>14}", "k", "distortion", "inertia");
            for p in &curve.points {
                println!("{:>6} {:>12.6} {:>14.6}", p.k, p.distortion, p.inertia);
            }
            let svg = plot::render_elbow(&curve, figure.size().unwrap_or_default())?;
            plot::save_svg(&output, &svg)?;
        }
        Commands::Score {
            input,
            labels,
            kmeans,
            metric,
            sample_size,
        } => {
            let dataset = input.load()?;
            let labels = resolve_labels(&dataset, &labels, &kmeans, &metric)?;
            let score =
                silhouette_score(&dataset.records, &labels, &metric, sample_size, kmeans.seed)?;
            println!("{:.6}", score);
        }
        Commands::Plot {
            input,
            labels,
            kmeans,
            metric,
            cluster,
            figure,
            output,
        } => {
            let dataset = input.load()?;
            let labels = resolve_labels(&dataset, &labels, &kmeans, &metric)?;
            let builder = SilhouettePlot {
                fig_size: figure.size(),
                cluster,
                sample_ids: dataset.ids.clone(),
            };
            let chart = builder.build(&dataset.records, &labels, &metric)?;
            let svg = plot::render_bars(&chart)?;
            plot::save_svg(&output, &svg)?;
        }
        Commands::Evaluate {
            input,
            labels,
            kmeans,
            metric,
            max_clusters,
        } => {
            let dataset = input.load()?;
            let labels = resolve_labels(&dataset, &labels, &kmeans, &metric)?;
            let metrics =
                ClusterMetrics::new(dataset.records, labels)?.with_kmeans(kmeans.kmeans(1));
            let eval = metrics.cluster_evaluation(&metric, max_clusters)?;

            println!("silhouette of given labels: {:.6}", eval.score);
            println!("{:>8} {:>8} {:>12}", "cluster", "size", "silhouette");
            for c in &eval.cluster_means {
                println!("{:>8} {:>8} {:>12.6}", c.cluster, c.size, c.mean);
            }
            println!("{:>8} {:>12}", "k", "silhouette");
            for c in &eval.candidates {
                println!("{:>8} {:>12.6}", c.k, c.score);
            }
            if let Some(best) = eval.best_k() {
                println!("best k: {} ({:.6})", best.k, best.score);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn label_sources_conflict() {
        for args in [
            ["cluster-metrics", "score", "x.csv", "--label-column", "2", "-k", "3"],
            ["cluster-metrics", "score", "x.csv", "--label-column", "2", "--labels", "l"],
            ["cluster-metrics", "score", "x.csv", "--labels", "l", "-k", "3"],
        ] {
            let err = Cli::try_parse_from(args).err().unwrap();
            assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
        }
    }

    #[test]
    fn evaluate_arguments() {
        let cli = Cli::try_parse_from([
            "cluster-metrics",
            "evaluate",
            "x.tsv",
            "--delimiter",
            "\t",
            "--label-column",
            "0",
            "-m",
            "6",
            "--metric",
            "manhattan",
        ])
        .unwrap();
        match cli.command {
            Commands::Evaluate {
                input,
                labels,
                max_clusters,
                ..
            } => {
                assert_eq!(input.delimiter, '\t');
                assert_eq!(input.label_column, Some(0));
                assert_eq!(max_clusters, 6);
                assert!(labels.labels.is_none() && labels.k.is_none());
            }
            _ => panic!("expected the evaluate subcommand"),
        }
    }
}
