//! Statistics and grouping helpers shared by the tools

use std::collections::HashMap;
use std::str::FromStr;

use analyst_core::{Cell, Dataset, ToolError};
use analyst_core::dataset::CellKey;

/// Named reduction applied to the cells of a group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reducer {
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl FromStr for Reducer {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "mean" => Ok(Self::Mean),
            "count" => Ok(Self::Count),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            _ => Err(ToolError::UnsupportedFunction(s.to_string())),
        }
    }
}

impl Reducer {
    fn name(self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Count => "count",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Reduce the cells of one group. Missing cells are ignored; sum and
    /// mean refuse text.
    pub fn apply(self, column: &str, cells: &[&Cell]) -> Result<Cell, ToolError> {
        let present: Vec<&Cell> = cells.iter().copied().filter(|c| !c.is_missing()).collect();

        match self {
            Self::Count => Ok(Cell::number(present.len() as f64)),
            Self::Min => Ok(present
                .into_iter()
                .min_by(|a, b| a.total_cmp(b))
                .cloned()
                .unwrap_or(Cell::Missing)),
            Self::Max => Ok(present
                .into_iter()
                .max_by(|a, b| a.total_cmp(b))
                .cloned()
                .unwrap_or(Cell::Missing)),
            Self::Sum | Self::Mean => {
                let values = present
                    .iter()
                    .map(|c| c.as_number())
                    .collect::<Option<Vec<f64>>>()
                    .ok_or_else(|| {
                        ToolError::Failed(format!(
                            "cannot {} non-numeric values in column '{column}'",
                            self.name()
                        ))
                    })?;
                if self == Self::Sum {
                    Ok(Cell::number(values.iter().sum()))
                } else {
                    Ok(mean(&values).map_or(Cell::Missing, Cell::number))
                }
            }
        }
    }
}

/// Rows sharing the same key, keys in ascending order. Rows with a missing
/// key cell are dropped.
pub fn group_rows(dataset: &Dataset, key_columns: &[usize]) -> Vec<(Vec<Cell>, Vec<usize>)> {
    let mut slots: HashMap<Vec<CellKey>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Cell>, Vec<usize>)> = Vec::new();

    for (i, row) in dataset.rows().iter().enumerate() {
        let key: Vec<Cell> = key_columns.iter().map(|&c| row[c].clone()).collect();
        if key.iter().any(Cell::is_missing) {
            continue;
        }
        let hashed: Vec<CellKey> = key.iter().map(Cell::key).collect();
        let slot = *slots.entry(hashed).or_insert_with(|| {
            groups.push((key, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(i);
    }

    groups.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    groups
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation (n - 1 denominator)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Quantile of sorted values with linear interpolation between ranks
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Compact number rendering for reports: at most six decimals, no trailing zeros
pub fn format_stat(value: f64) -> String {
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".into() } else { text.to_string() }
}
