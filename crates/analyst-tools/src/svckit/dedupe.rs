//! Dedupe Tool

use std::collections::HashSet;

use analyst_core::{Dataset, ParamSpec, Tool, ToolArgs, ToolOutput, ToolResult, ToolSpec};
use analyst_core::dataset::CellKey;

use super::resolve_columns;

/// Remove duplicate rows, keeping the first occurrence
pub struct DedupeTool;

impl Tool for DedupeTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("dedupe", "Remove duplicate rows based on specified columns").param(
            ParamSpec::string_array(
                "subset",
                "Columns to consider for identifying duplicates (empty means all columns)",
            ),
        )
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let subset = resolve_columns(dataset, &args.str_list("subset")?)?;
        let (deduped, removed) = drop_duplicate_rows(dataset, &subset);
        let (rows, cols) = deduped.shape();

        Ok(ToolOutput::text(format!(
            "Removed {removed} duplicate rows. New shape: ({rows}, {cols})"
        ))
        .with_dataset(deduped))
    }
}

/// Keep the first row of every distinct key over `key_columns`; an empty
/// slice compares whole rows. Returns the new dataset and the removed count.
pub(crate) fn drop_duplicate_rows(dataset: &Dataset, key_columns: &[usize]) -> (Dataset, usize) {
    let mut seen: HashSet<Vec<CellKey>> = HashSet::new();
    let deduped = dataset.retain_rows(|row| {
        let key: Vec<CellKey> = if key_columns.is_empty() {
            row.iter().map(|c| c.key()).collect()
        } else {
            key_columns.iter().map(|&i| row[i].key()).collect()
        };
        seen.insert(key)
    });
    let removed = dataset.row_count() - deduped.row_count();
    (deduped, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_core::{Cell, ToolError};
    use proptest::prelude::*;
    use serde_json::json;

    fn people() -> Dataset {
        Dataset::new(
            vec!["name".into(), "city".into()],
            vec![
                vec![Cell::text("Ann"), Cell::text("Oslo")],
                vec![Cell::text("Bob"), Cell::text("Rome")],
                vec![Cell::text("Ann"), Cell::text("Oslo")],
                vec![Cell::text("Ann"), Cell::text("Lima")],
                vec![Cell::Missing, Cell::Missing],
                vec![Cell::Missing, Cell::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_dedupe_full_rows() {
        let out = DedupeTool.execute(&ToolArgs::default(), &people()).unwrap();
        assert_eq!(out.text, "Removed 2 duplicate rows. New shape: (4, 2)");
        let ds = out.dataset.unwrap();
        assert_eq!(ds.rows()[2], vec![Cell::text("Ann"), Cell::text("Lima")]);
    }

    #[test]
    fn test_dedupe_subset_keeps_first() {
        let args = ToolArgs::from_value(&json!({"subset": ["name"]})).unwrap();
        let out = DedupeTool.execute(&args, &people()).unwrap();
        let ds = out.dataset.unwrap();
        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.rows()[0][1], Cell::text("Oslo"));
    }

    #[test]
    fn test_dedupe_unknown_column() {
        let args = ToolArgs::from_value(&json!({"subset": ["age"]})).unwrap();
        let err = DedupeTool.execute(&args, &people()).unwrap_err();
        assert_eq!(err, ToolError::ColumnNotFound("age".into()));
    }

    proptest! {
        #[test]
        fn prop_dedupe_removes_exactly_repeats(values in proptest::collection::vec((0u8..4, 0u8..3), 0..40)) {
            let rows: Vec<Vec<Cell>> = values
                .iter()
                .map(|(a, b)| vec![Cell::number(f64::from(*a)), Cell::text(b.to_string())])
                .collect();
            let ds = Dataset::new(vec!["a".into(), "b".into()], rows).unwrap();
            let distinct: HashSet<(u8, u8)> = values.iter().copied().collect();

            let (deduped, removed) = drop_duplicate_rows(&ds, &[]);
            prop_assert_eq!(deduped.row_count(), distinct.len());
            prop_assert_eq!(deduped.row_count() + removed, ds.row_count());

            let keys: HashSet<Vec<CellKey>> = deduped
                .rows()
                .iter()
                .map(|r| r.iter().map(Cell::key).collect())
                .collect();
            prop_assert_eq!(keys.len(), deduped.row_count());
        }
    }
}
