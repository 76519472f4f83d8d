//! Distance metrics and pairwise distance matrices
use crate::error::{Error, Result};
use ndarray::{Array2, ArrayBase, ArrayView1, Data, Ix1, Ix2, Zip};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type DistanceFn = dyn Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64 + Send + Sync;

/// Distance between two points.
#[derive(Clone)]
pub enum Distance {
    Euclidean,
    SqEuclidean,
    Manhattan,
    Chebyshev,
    /// `1 - cos(x, y)`. A zero vector is treated as having unit norm.
    Cosine,
    Custom(Arc<DistanceFn>),
}

impl Distance {
    /// Wraps a user supplied distance function.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(ArrayView1<f64>, ArrayView1<f64>) -> f64 + Send + Sync + 'static,
    {
        Distance::Custom(Arc::new(f))
    }

    /// Computes the distance between two points.
    pub fn eval<S1, S2>(&self, x: &ArrayBase<S1, Ix1>, y: &ArrayBase<S2, Ix1>) -> f64
    where
        S1: Data<Elem = f64>,
        S2: Data<Elem = f64>,
    {
        match self {
            Distance::Euclidean => sq_euclidean(x, y).sqrt(),
            Distance::SqEuclidean => sq_euclidean(x, y),
            Distance::Manhattan => x
                .iter()
                .zip(y.iter())
                .map(|(a, b)| (a - b).abs())
                .sum(),
            Distance::Chebyshev => x
                .iter()
                .zip(y.iter())
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
            Distance::Cosine => 1.0 - x.dot(y) / (unit_norm(x) * unit_norm(y)),
            Distance::Custom(f) => f(x.view(), y.view()),
        }
    }
}

fn sq_euclidean<S1, S2>(x: &ArrayBase<S1, Ix1>, y: &ArrayBase<S2, Ix1>) -> f64
where
    S1: Data<Elem = f64>,
    S2: Data<Elem = f64>,
{
    x.iter().zip(y.iter()).map(|(a, b)| (a - b) * (a - b)).sum()
}

fn unit_norm<S>(v: &ArrayBase<S, Ix1>) -> f64
where
    S: Data<Elem = f64>,
{
    match v.dot(v).sqrt() {
        n if n == 0.0 => 1.0,
        n => n,
    }
}

impl fmt::Debug for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Distance::Euclidean => f.write_str("Euclidean"),
            Distance::SqEuclidean => f.write_str("SqEuclidean"),
            Distance::Manhattan => f.write_str("Manhattan"),
            Distance::Chebyshev => f.write_str("Chebyshev"),
            Distance::Cosine => f.write_str("Cosine"),
            Distance::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How the input of a silhouette computation is interpreted: either a
/// feature matrix measured with a [`Distance`], or a distance matrix that
/// was computed beforehand.
#[derive(Clone, Debug)]
pub enum Metric {
    Precomputed,
    Distance(Distance),
}

impl Default for Metric {
    fn default() -> Self {
        Metric::Distance(Distance::Euclidean)
    }
}

impl From<Distance> for Metric {
    fn from(distance: Distance) -> Self {
        Metric::Distance(distance)
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let metric = match s.trim().to_ascii_lowercase().as_str() {
            "precomputed" => Metric::Precomputed,
            "euclidean" | "l2" => Distance::Euclidean.into(),
            "sqeuclidean" => Distance::SqEuclidean.into(),
            "manhattan" | "cityblock" | "l1" => Distance::Manhattan.into(),
            "chebyshev" => Distance::Chebyshev.into(),
            "cosine" => Distance::Cosine.into(),
            _ => return Err(Error::UnknownMetric(s.to_string())),
        };
        Ok(metric)
    }
}

/// Distances between every row of `a` and every row of `b`.
pub fn cdist<S1, S2>(
    a: &ArrayBase<S1, Ix2>,
    b: &ArrayBase<S2, Ix2>,
    distance: &Distance,
) -> Array2<f64>
where
    S1: Data<Elem = f64> + Sync,
    S2: Data<Elem = f64> + Sync,
{
    let mut out = Array2::<f64>::zeros((a.nrows(), b.nrows()));
    Zip::from(out.rows_mut())
        .and(a.rows())
        .par_for_each(|mut row, x| {
            for (d, y) in row.iter_mut().zip(b.rows()) {
                *d = distance.eval(&x, &y);
            }
        });
    out
}

/// Square matrix of distances between the rows of `x`.
///
/// With [`Metric::Precomputed`] `x` is taken to be the distance matrix
/// itself; it is checked to be square with a zero diagonal and copied.
pub fn pairwise_distances<S>(x: &ArrayBase<S, Ix2>, metric: &Metric) -> Result<Array2<f64>>
where
    S: Data<Elem = f64> + Sync,
{
    match metric {
        Metric::Precomputed => {
            check_precomputed(x)?;
            Ok(x.to_owned())
        }
        Metric::Distance(distance) => {
            let mut out = cdist(x, x, distance);
            out.diag_mut().fill(0.0);
            Ok(out)
        }
    }
}

pub(crate) fn check_precomputed<S>(x: &ArrayBase<S, Ix2>) -> Result<()>
where
    S: Data<Elem = f64>,
{
    let (rows, cols) = x.dim();
    if rows != cols {
        return Err(Error::NotSquare { rows, cols });
    }
    if x.diag().iter().any(|&d| d.abs() > f64::EPSILON) {
        return Err(Error::NonZeroDiagonal);
    }
    Ok(())
}
