//! Aggregate Tool
//!
//! Group-by with a single reduced column.

use analyst_core::{Dataset, ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolResult, ToolSpec};

use super::{RESULT_TABLE_ROWS, resolve_column, resolve_columns};
use crate::stats::{Reducer, group_rows};

pub struct AggregateTool;

impl Tool for AggregateTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("aggregate", "Aggregate data by grouping and applying functions")
            .param(ParamSpec::string_array("group_by", "Columns to group by").required())
            .param(ParamSpec::string("agg_column", "Column to aggregate").required())
            .param(
                ParamSpec::string("agg_func", "Aggregation function: 'sum', 'mean', 'count', 'min', 'max'")
                    .required(),
            )
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let group_names = args.str_list("group_by")?;
        if group_names.is_empty() {
            return Err(ToolError::invalid("group_by", "must name at least one column"));
        }
        let agg_name = args.str("agg_column")?;
        let reducer: Reducer = args.str("agg_func")?.parse()?;

        let keys = resolve_columns(dataset, &group_names)?;
        let value = resolve_column(dataset, agg_name)?;
        if keys.contains(&value) {
            return Err(ToolError::invalid("agg_column", "must not be one of the group_by columns"));
        }

        let mut rows = Vec::new();
        for (key, members) in group_rows(dataset, &keys) {
            let cells: Vec<_> = members.iter().map(|&r| &dataset.rows()[r][value]).collect();
            let mut row = key;
            row.push(reducer.apply(agg_name, &cells)?);
            rows.push(row);
        }

        let grouped_by: Vec<String> = group_names.iter().map(|g| format!("'{g}'")).collect();
        let mut columns = group_names;
        columns.push(agg_name.to_string());
        let result = Dataset::new(columns, rows)?;
        let (r, c) = result.shape();

        let text = format!(
            "Aggregated data by [{}]. Result shape: ({r}, {c})\n{}",
            grouped_by.join(", "),
            result.render_table(RESULT_TABLE_ROWS),
        );
        Ok(ToolOutput::text(text).with_dataset(result))
    }
}
