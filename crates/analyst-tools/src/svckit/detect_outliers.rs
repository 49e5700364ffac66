//! Detect Outliers Tool
//!
//! Interquartile-range fences over one column. Read-only.

use analyst_core::{Dataset, ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolResult, ToolSpec};

use super::resolve_column;
use crate::stats::{format_stat, quantile};

/// Values listed in the report; the count covers all of them
const MAX_SAMPLES: usize = 10;
const IQR_FACTOR: f64 = 1.5;

pub struct DetectOutliersTool;

/// Fences and the values outside them, in row order
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierReport {
    pub lower: f64,
    pub upper: f64,
    pub outliers: Vec<f64>,
}

impl Tool for DetectOutliersTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("detect_outliers", "Detect outliers in a numeric column using IQR method")
            .param(ParamSpec::string("column", "Column name to check for outliers").required())
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let name = args.str("column")?;
        let index = resolve_column(dataset, name)?;

        let values: Vec<f64> = dataset.column(index).filter_map(|c| c.coerce_number()).collect();
        let report = iqr_outliers(&values).ok_or_else(|| ToolError::NotNumeric(name.to_string()))?;

        let samples: Vec<String> = report
            .outliers
            .iter()
            .take(MAX_SAMPLES)
            .map(|v| format_stat(*v))
            .collect();

        Ok(ToolOutput::text(format!(
            "Found {} outliers in column '{name}'\nLower bound: {}\nUpper bound: {}\nOutlier values: [{}]",
            report.outliers.len(),
            format_stat(report.lower),
            format_stat(report.upper),
            samples.join(", "),
        )))
    }
}

/// `None` when there is nothing to measure
pub fn iqr_outliers(values: &[f64]) -> Option<OutlierReport> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower = q1 - IQR_FACTOR * iqr;
    let upper = q3 + IQR_FACTOR * iqr;

    Some(OutlierReport {
        lower,
        upper,
        outliers: values.iter().copied().filter(|v| *v < lower || *v > upper).collect(),
    })
}
