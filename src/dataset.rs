//! Loading feature matrices and generating synthetic ones
use crate::error::{Error, Result};
use csv::{ReaderBuilder, Trim};
use log::info;
use ndarray::{s, Array, Array1, Array2, ArrayBase, Data, Ix2};
use ndarray_rand::RandomExt;
use rand::Rng;
use rand_distr::StandardNormal;
use std::path::Path;

/// A feature matrix with optional per-sample labels and ids.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub records: Array2<f64>,
    pub labels: Option<Array1<usize>>,
    pub ids: Option<Vec<String>>,
}

/// Layout of a delimited text file.
#[derive(Clone, Debug)]
pub struct DelimitedOptions {
    pub delimiter: char,
    pub has_header: bool,
    /// Zero-based column holding integer cluster labels.
    pub label_column: Option<usize>,
    /// Zero-based column holding sample ids.
    pub id_column: Option<usize>,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        DelimitedOptions {
            delimiter: ',',
            has_header: false,
            label_column: None,
            id_column: None,
        }
    }
}

impl Dataset {
    /// Number of samples (rows).
    pub fn nsamples(&self) -> usize {
        self.records.nrows()
    }

    /// Number of features (columns other than labels and ids).
    pub fn nfeatures(&self) -> usize {
        self.records.ncols()
    }

    /// Reads a dataset from a delimited text file.
    pub fn from_delimited(path: impl AsRef<Path>, options: &DelimitedOptions) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let dataset = Self::parse_delimited(&text, options)?;
        info!(
            "loaded {} samples with {} features from {}",
            dataset.nsamples(),
            dataset.nfeatures(),
            path.display()
        );
        Ok(dataset)
    }

    /// Parses delimited text. Fields may be quoted, blank lines and lines
    /// starting with `#` are skipped, and every column other than the label
    /// and id columns must hold a number. The header, when present, is the
    /// first non-blank line whatever it starts with.
    pub fn parse_delimited(text: &str, options: &DelimitedOptions) -> Result<Self> {
        if options.label_column.is_some() && options.label_column == options.id_column {
            return Err(Error::InvalidParams("label and id columns must differ".into()));
        }
        let delimiter = u8::try_from(options.delimiter)
            .ok()
            .filter(|b| b.is_ascii())
            .ok_or_else(|| {
                Error::InvalidParams(format!("delimiter `{}` is not ASCII", options.delimiter))
            })?;

        let (body, line_offset) = if options.has_header {
            split_header(text)
        } else {
            (text, 0)
        };
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(delimiter)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .flexible(false)
            .from_reader(body.as_bytes());

        let mut values = Vec::new();
        let mut labels = Vec::new();
        let mut ids = Vec::new();
        let mut n_columns = None;
        let mut n_rows = 0;

        for record in reader.records() {
            let record = record.map_err(|e| parse_error(e, line_offset))?;
            let line_no = record.position().map_or(0, |p| p.line() as usize) + line_offset;
            n_columns.get_or_insert(record.len());

            for (col, cell) in record.iter().enumerate() {
                if Some(col) == options.label_column {
                    let label = cell.parse::<usize>().map_err(|e| Error::Parse {
                        line: line_no,
                        reason: format!("invalid label `{}`: {}", cell, e),
                    })?;
                    labels.push(label);
                } else if Some(col) == options.id_column {
                    ids.push(cell.to_string());
                } else {
                    let value = cell.parse::<f64>().map_err(|e| Error::Parse {
                        line: line_no,
                        reason: format!("invalid number `{}` in column {}: {}", cell, col, e),
                    })?;
                    values.push(value);
                }
            }
            n_rows += 1;
        }

        let n_columns = n_columns.ok_or(Error::EmptyData)?;
        for column in [options.label_column, options.id_column].into_iter().flatten() {
            if column >= n_columns {
                return Err(Error::InvalidParams(format!(
                    "column {} out of range for {} columns",
                    column, n_columns
                )));
            }
        }
        let n_features = n_columns
            - usize::from(options.label_column.is_some())
            - usize::from(options.id_column.is_some());
        let records = Array2::from_shape_vec((n_rows, n_features), values)?;

        Ok(Dataset {
            records,
            labels: options.label_column.map(|_| Array1::from(labels)),
            ids: options.id_column.map(|_| ids),
        })
    }
}

/// Splits off the first non-blank line, returning the rest and the number of
/// lines consumed.
fn split_header(text: &str) -> (&str, usize) {
    let mut offset = 0;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        offset += line.len();
        if !line.trim().is_empty() {
            return (&text[offset..], idx + 1);
        }
    }
    ("", 0)
}

fn parse_error(err: csv::Error, line_offset: usize) -> Error {
    let line = err.position().map_or(0, |p| p.line() as usize) + line_offset;
    Error::Parse {
        line,
        reason: err.to_string(),
    }
}

/// Reads one integer label per line.
pub fn read_labels(path: impl AsRef<Path>) -> Result<Array1<usize>> {
    let text = std::fs::read_to_string(path)?;
    parse_labels(&text)
}

fn parse_labels(text: &str) -> Result<Array1<usize>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            line.trim().parse::<usize>().map_err(|e| Error::Parse {
                line: idx + 1,
                reason: format!("invalid label `{}`: {}", line.trim(), e),
            })
        })
        .collect::<Result<Vec<_>>>()
        .map(Array1::from)
}

/// Given `blob_centroids` with shape `(n_blobs, n_features)`, generates
/// `blob_size` standard normal points around each centroid. Rows of the
/// same blob are contiguous.
pub fn blobs<S>(
    blob_size: usize,
    blob_centroids: &ArrayBase<S, Ix2>,
    rng: &mut impl Rng,
) -> Array2<f64>
where
    S: Data<Elem = f64>,
{
    let (n_centroids, n_features) = blob_centroids.dim();
    let mut out = Array2::<f64>::zeros((n_centroids * blob_size, n_features));
    for (i, centroid) in blob_centroids.rows().into_iter().enumerate() {
        let blob: Array2<f64> = Array::random_using((blob_size, n_features), StandardNormal, rng);
        out.slice_mut(s![i * blob_size..(i + 1) * blob_size, ..])
            .assign(&(blob + &centroid));
    }
    out
}
