//! Dataset loading and preprocessing: numeric CSV files, feature
//! standardization, and seeded train/test splits.
use crate::error::{DgnError, Result};
use csv::ReaderBuilder;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::path::Path;

/// Feature vectors with a scalar target each.
pub type Dataset = Vec<(Vec<f64>, f64)>;

/// Load a numeric CSV with a header row.
///
/// `target_column` names the column holding the target; `None` selects the
/// last column. Every other column becomes a feature, in file order.
pub fn load_csv(path: impl AsRef<Path>, target_column: Option<&str>) -> Result<Dataset> {
    let file = File::open(path.as_ref())?;
    let mut rdr = ReaderBuilder::new().has_headers(true).trim(csv::Trim::All).from_reader(file);
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(DgnError::EmptyDataset);
    }
    let target_idx = match target_column {
        Some(name) => headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| DgnError::InvalidConfig(format!("no column named {name:?}")))?,
        None => headers.len() - 1,
    };

    let mut dataset = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let mut features = Vec::with_capacity(record.len().saturating_sub(1));
        let mut target = 0.0;
        for (col, value) in record.iter().enumerate() {
            let parsed: f64 = value.parse().map_err(|_| DgnError::Parse {
                row: row + 1,
                field: headers.get(col).unwrap_or_default().to_string(),
                value: value.to_string(),
            })?;
            if col == target_idx {
                target = parsed;
            } else {
                features.push(parsed);
            }
        }
        dataset.push((features, target));
    }
    if dataset.is_empty() {
        return Err(DgnError::EmptyDataset);
    }
    Ok(dataset)
}

/// Per-feature mean and standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

impl Standardizer {
    /// Fit on `data`. Features with zero variance get a standard deviation of 1.
    pub fn fit(data: &[(Vec<f64>, f64)]) -> Result<Self> {
        let (first, _) = data.first().ok_or(DgnError::EmptyDataset)?;
        let n = data.len() as f64;
        let mut mean = vec![0.0; first.len()];
        for (x, _) in data {
            for (m, &v) in mean.iter_mut().zip(x) {
                *m += v / n;
            }
        }
        let mut std = vec![0.0; first.len()];
        for (x, _) in data {
            for ((s, &m), &v) in std.iter_mut().zip(&mean).zip(x) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in &mut std {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }
        Ok(Self { mean, std })
    }

    pub fn apply(&self, data: &mut [(Vec<f64>, f64)]) {
        for (x, _) in data.iter_mut() {
            for ((v, &m), &s) in x.iter_mut().zip(&self.mean).zip(&self.std) {
                *v = (*v - m) / s;
            }
        }
    }
}

/// Standardize both splits with statistics fitted on `train` only.
pub fn standardize(train: &mut [(Vec<f64>, f64)], test: &mut [(Vec<f64>, f64)]) -> Result<Standardizer> {
    let scaler = Standardizer::fit(train)?;
    scaler.apply(train);
    scaler.apply(test);
    Ok(scaler)
}

/// Shuffle with `seed` and split off `test_fraction` of the examples.
///
/// The training split always keeps at least one example.
pub fn train_test_split(mut data: Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(DgnError::InvalidConfig(format!(
            "test_fraction must lie in [0, 1), got {test_fraction}"
        )));
    }
    if data.is_empty() {
        return Err(DgnError::EmptyDataset);
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    data.shuffle(&mut rng);
    let n_test = ((data.len() as f64 * test_fraction).round() as usize).min(data.len() - 1);
    let train = data.split_off(n_test);
    Ok((train, data))
}
