//! Inspect Data Tool
//!
//! Shape, column types, leading rows and summary statistics.

use serde_json::json;

use analyst_core::{ColumnType, Dataset, ParamSpec, Tool, ToolArgs, ToolOutput, ToolResult, ToolSpec};

use crate::stats::{format_stat, mean, quantile, std_dev};

const DEFAULT_ROWS: usize = 5;

/// Read-only overview of the current dataset
pub struct InspectDataTool;

impl Tool for InspectDataTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "inspect_data",
            "Inspect the dataframe to understand its structure, columns, data types, and sample values",
        )
        .param(
            ParamSpec::integer("num_rows", "Number of rows to display")
                .with_default(json!(DEFAULT_ROWS)),
        )
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let num_rows = args.opt_usize("num_rows")?.unwrap_or(DEFAULT_ROWS);
        let (rows, cols) = dataset.shape();

        let mut out = format!("Shape: ({rows}, {cols})\nColumns: {}\nData types:\n", dataset.column_list());
        for (i, name) in dataset.columns().iter().enumerate() {
            out.push_str(&format!("  {name}: {}\n", dataset.column_type(i)));
        }

        out.push_str(&format!("\nFirst {num_rows} rows:\n{}\n", dataset.render_table(num_rows)));

        out.push_str("\nBasic statistics:\n");
        out.push_str(&describe(dataset));

        Ok(ToolOutput::text(out))
    }
}

/// One line of statistics per numeric column
fn describe(dataset: &Dataset) -> String {
    let mut lines = Vec::new();

    for (i, name) in dataset.columns().iter().enumerate() {
        if dataset.column_type(i) != ColumnType::Number {
            continue;
        }
        let mut values: Vec<f64> = dataset.column(i).filter_map(|c| c.as_number()).collect();
        values.sort_by(f64::total_cmp);

        let stat = |v: Option<f64>| v.map_or_else(|| "NaN".to_string(), format_stat);
        lines.push(format!(
            "  {name}: count={}, mean={}, std={}, min={}, 25%={}, 50%={}, 75%={}, max={}",
            values.len(),
            stat(mean(&values)),
            stat(std_dev(&values)),
            stat(values.first().copied()),
            stat(quantile(&values, 0.25)),
            stat(quantile(&values, 0.5)),
            stat(quantile(&values, 0.75)),
            stat(values.last().copied()),
        ));
    }

    if lines.is_empty() {
        "  No numeric columns".into()
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::Cell;

    fn sales() -> Dataset {
        Dataset::new(
            vec!["region".into(), "sales".into()],
            vec![
                vec![Cell::text("A"), Cell::number(10.0)],
                vec![Cell::text("A"), Cell::number(20.0)],
                vec![Cell::text("B"), Cell::number(5.0)],
                vec![Cell::text("C"), Cell::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_inspect_reports_structure() {
        let args = ToolArgs::from_value(&json!({"num_rows": 2})).unwrap();
        let out = InspectDataTool.execute(&args, &sales()).unwrap();

        assert!(out.text.starts_with("Shape: (4, 2)\nColumns: ['region', 'sales']"));
        assert!(out.text.contains("  region: text\n  sales: number"));
        assert!(out.text.contains("  sales: number\n\nFirst 2 rows:\n"));
        assert!(out.text.contains("\n\nBasic statistics:\n  sales: count=3"));
        assert!(out.text.contains("sales: count=3, mean=11.666667, std=7.637626, min=5, 25%=7.5, 50%=10, 75%=15, max=20"));
        assert!(out.dataset.is_none());
    }

    #[test]
    fn test_inspect_without_numeric_columns() {
        let ds = Dataset::new(vec!["name".into()], vec![vec![Cell::text("x")]]).unwrap();
        let out = InspectDataTool.execute(&ToolArgs::default(), &ds).unwrap();
        assert!(out.text.contains("First 5 rows:"));
        assert!(out.text.ends_with("No numeric columns"));
    }
}
