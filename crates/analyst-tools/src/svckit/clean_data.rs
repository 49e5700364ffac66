//! Clean Data Tool
//!
//! Applies a list of named cleaning operations in order.

use analyst_core::{Cell, Dataset, ParamSpec, Tool, ToolArgs, ToolOutput, ToolResult, ToolSpec};

use super::dedupe::drop_duplicate_rows;

/// Sequential dataset cleaning
pub struct CleanDataTool;

impl Tool for CleanDataTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "clean_data",
            "Clean the dataframe by handling missing values, removing duplicates, or fixing data types",
        )
        .param(
            ParamSpec::string_array(
                "operations",
                "List of cleaning operations: 'drop_na', 'fill_na', 'drop_duplicates', 'strip_whitespace'",
            )
            .required(),
        )
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let mut current = dataset.clone();
        let mut summary = Vec::new();

        for op in args.str_list("operations")? {
            match op.as_str() {
                "drop_na" => {
                    let before = current.row_count();
                    current = current.retain_rows(|row| !row.iter().any(Cell::is_missing));
                    summary.push(format!(
                        "Dropped {} rows with missing values",
                        before - current.row_count()
                    ));
                }
                "fill_na" => {
                    current = current.map_cells(|_, cell| match cell {
                        Cell::Missing => Cell::number(0.0),
                        other => other.clone(),
                    });
                    summary.push("Filled missing values with 0".into());
                }
                "drop_duplicates" => {
                    let (deduped, removed) = drop_duplicate_rows(&current, &[]);
                    current = deduped;
                    summary.push(format!("Dropped {removed} duplicate rows"));
                }
                "strip_whitespace" => {
                    current = current.map_cells(|_, cell| match cell {
                        Cell::Text(s) => Cell::text(s.trim()),
                        other => other.clone(),
                    });
                    summary.push("Stripped whitespace from text columns".into());
                }
                other => tracing::debug!(operation = %other, "Skipping unknown cleaning operation"),
            }
        }

        let text = if summary.is_empty() {
            "No cleaning operations applied".to_string()
        } else {
            summary.join("\n")
        };
        Ok(ToolOutput::text(text).with_dataset(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn messy() -> Dataset {
        Dataset::new(
            vec!["name".into(), "score".into()],
            vec![
                vec![Cell::text(" Ann "), Cell::number(1.0)],
                vec![Cell::text("Bob"), Cell::Missing],
                vec![Cell::text(" Ann "), Cell::number(1.0)],
                vec![Cell::Missing, Cell::number(3.0)],
            ],
        )
        .unwrap()
    }

    fn run(ops: serde_json::Value) -> ToolOutput {
        let args = ToolArgs::from_value(&json!({ "operations": ops })).unwrap();
        CleanDataTool.execute(&args, &messy()).unwrap()
    }

    #[test]
    fn test_drop_na_then_duplicates() {
        let out = run(json!(["drop_na", "drop_duplicates"]));
        assert_eq!(out.text, "Dropped 2 rows with missing values\nDropped 1 duplicate rows");
        let ds = out.dataset.unwrap();
        assert_eq!(ds.row_count(), 1);
        assert!(!ds.has_missing());
    }

    #[test]
    fn test_fill_na_keeps_rows() {
        let out = run(json!(["fill_na"]));
        let ds = out.dataset.unwrap();
        assert_eq!(ds.row_count(), 4);
        assert!(!ds.has_missing());
        assert_eq!(ds.rows()[3][0], Cell::number(0.0));
    }

    #[test]
    fn test_strip_whitespace_exposes_duplicates() {
        let out = run(json!(["strip_whitespace", "drop_duplicates"]));
        assert_eq!(out.text, "Stripped whitespace from text columns\nDropped 1 duplicate rows");
        assert_eq!(out.dataset.unwrap().rows()[0][0], Cell::text("Ann"));
    }

    #[test]
    fn test_unknown_operations_are_skipped() {
        let out = run(json!(["normalize", "fill_na"]));
        assert_eq!(out.text, "Filled missing values with 0");

        let out = run(json!(["normalize"]));
        assert_eq!(out.text, "No cleaning operations applied");
        assert_eq!(out.dataset.unwrap(), messy());
    }
}
