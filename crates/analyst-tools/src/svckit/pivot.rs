//! Pivot Tool

use std::collections::HashMap;

use serde_json::json;

use analyst_core::{Cell, Dataset, ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolResult, ToolSpec};
use analyst_core::dataset::CellKey;

use super::{RESULT_TABLE_ROWS, resolve_column};
use crate::stats::{Reducer, group_rows};

/// Spread one column's distinct values into columns
pub struct PivotTool;

impl Tool for PivotTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("pivot", "Create a pivot table from the data")
            .param(ParamSpec::string("index", "Column to use as index").required())
            .param(ParamSpec::string("columns", "Column to use as columns").required())
            .param(ParamSpec::string("values", "Column to aggregate").required())
            .param(
                ParamSpec::string("aggfunc", "Aggregation function: 'sum', 'mean', 'count', 'min', 'max'")
                    .with_default(json!("sum")),
            )
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let index_name = args.str("index")?;
        let columns_name = args.str("columns")?;
        let values_name = args.str("values")?;
        let reducer: Reducer = args.opt_str("aggfunc")?.unwrap_or("sum").parse()?;

        let index = resolve_column(dataset, index_name)?;
        let spread = resolve_column(dataset, columns_name)?;
        let values = resolve_column(dataset, values_name)?;
        if index == spread || index == values || spread == values {
            return Err(ToolError::invalid("index", "index, columns and values must be three different columns"));
        }

        let headers = group_rows(dataset, &[spread]);
        let slot: HashMap<CellKey, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key[0].key(), i))
            .collect();

        // Reduce every (index, header) cell; a pair with no rows stays missing
        let mut body: Vec<(Cell, Vec<Cell>)> = Vec::new();
        for (key, members) in group_rows(dataset, &[index]) {
            let mut buckets: Vec<Vec<&Cell>> = vec![Vec::new(); headers.len()];
            for &r in &members {
                let row = &dataset.rows()[r];
                if let Some(&h) = slot.get(&row[spread].key()) {
                    buckets[h].push(&row[values]);
                }
            }
            let cells = buckets
                .iter()
                .map(|bucket| {
                    if bucket.is_empty() {
                        Ok(Cell::Missing)
                    } else {
                        reducer.apply(values_name, bucket)
                    }
                })
                .collect::<Result<Vec<_>, ToolError>>()?;
            body.push((key.into_iter().next().unwrap_or(Cell::Missing), cells));
        }

        // Columns with no value at all are left out
        let keep: Vec<usize> = (0..headers.len())
            .filter(|&h| body.iter().any(|(_, cells)| !cells[h].is_missing()))
            .collect();

        let mut columns = vec![index_name.to_string()];
        columns.extend(keep.iter().map(|&h| headers[h].0[0].to_string()));
        let rows = body
            .into_iter()
            .map(|(key, cells)| {
                let mut row = vec![key];
                row.extend(keep.iter().map(|&h| cells[h].clone()));
                row
            })
            .collect();

        let result = Dataset::new(columns, rows)?;
        let (r, c) = result.shape();
        let text = format!(
            "Created pivot table. Result shape: ({r}, {c})\n{}",
            result.render_table(RESULT_TABLE_ROWS)
        );
        Ok(ToolOutput::text(text).with_dataset(result))
    }
}
