//! Service Kit - Agent Tools
//!
//! Dataset tools that implement `analyst_core::Tool`. Each one reads the
//! snapshot it is handed and, when it reshapes the data, returns a new one.

mod aggregate;
mod clean_data;
mod dedupe;
mod detect_outliers;
mod export;
mod inspect_data;
mod pivot;
mod plot;

pub use aggregate::AggregateTool;
pub use clean_data::CleanDataTool;
pub use dedupe::DedupeTool;
pub use detect_outliers::DetectOutliersTool;
pub use export::{ExportCsvTool, ExportXlsxTool};
pub use inspect_data::InspectDataTool;
pub use pivot::PivotTool;
pub use plot::PlotTool;

use analyst_core::{Dataset, ToolError};

/// Rows rendered when a tool echoes a derived table back to the model
const RESULT_TABLE_ROWS: usize = 50;

fn resolve_column(dataset: &Dataset, name: &str) -> Result<usize, ToolError> {
    dataset
        .column_index(name)
        .ok_or_else(|| ToolError::ColumnNotFound(name.to_string()))
}

fn resolve_columns(dataset: &Dataset, names: &[String]) -> Result<Vec<usize>, ToolError> {
    names.iter().map(|n| resolve_column(dataset, n)).collect()
}
