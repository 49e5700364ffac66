//! # analyst-tools
//!
//! The dataset tools the analyst agent can call, plus the CSV/XLSX codecs
//! used for uploads and exports.
//!
//! ## Tool catalog
//!
//! ```text
//! ┌──────────────────┬─────────────────────────────────────┬─────────────┐
//! │ Tool             │ Effect                              │ Produces    │
//! ├──────────────────┼─────────────────────────────────────┼─────────────┤
//! │ inspect_data     │ shape, types, head, statistics      │ text        │
//! │ clean_data       │ drop_na / fill_na / dedupe / strip  │ new dataset │
//! │ dedupe           │ duplicate rows removed              │ new dataset │
//! │ detect_outliers  │ IQR fences on one column            │ text        │
//! │ aggregate        │ group-by + sum/mean/count/min/max   │ new dataset │
//! │ pivot            │ long to wide                        │ new dataset │
//! │ plot             │ bar / line / scatter / hist         │ PNG         │
//! │ export_csv       │ current data as CSV                 │ CSV         │
//! │ export_xlsx      │ current data as Excel               │ XLSX        │
//! └──────────────────┴─────────────────────────────────────┴─────────────┘
//! ```

pub mod codec;
pub mod stats;
pub mod svckit;

use analyst_core::ToolRegistry;

pub use codec::{CodecError, read_csv, write_csv, write_xlsx};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        AggregateTool,
        CleanDataTool,
        DedupeTool,
        DetectOutliersTool,
        ExportCsvTool,
        ExportXlsxTool,
        InspectDataTool,
        PivotTool,
        PlotTool,
    };
}

/// Registry holding the nine standard tools, in catalog order
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(tools::InspectDataTool);
    registry.register(tools::CleanDataTool);
    registry.register(tools::DedupeTool);
    registry.register(tools::DetectOutliersTool);
    registry.register(tools::AggregateTool);
    registry.register(tools::PivotTool);
    registry.register(tools::PlotTool);
    registry.register(tools::ExportCsvTool);
    registry.register(tools::ExportXlsxTool);
    registry
}
