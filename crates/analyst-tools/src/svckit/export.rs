//! Export Tools
//!
//! Serialize the current snapshot to CSV or XLSX as a downloadable artifact.

use analyst_core::artifact::{MIME_CSV, MIME_XLSX};
use analyst_core::{
    ArtifactDraft, ArtifactKind, Dataset, ParamSpec, Tool, ToolArgs, ToolError, ToolOutput, ToolResult, ToolSpec,
};

use crate::codec::{self, CodecError};

/// Export to CSV
pub struct ExportCsvTool;

/// Export to Excel
pub struct ExportXlsxTool;

impl Tool for ExportCsvTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("export_csv", "Export the current dataframe to CSV")
            .param(ParamSpec::string("filename", "Name for the exported file").required())
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let bytes = codec::write_csv(dataset).map_err(export_error)?;
        export(args.str("filename")?, "csv", MIME_CSV, bytes, dataset)
    }
}

impl Tool for ExportXlsxTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new("export_xlsx", "Export the current dataframe to Excel")
            .param(ParamSpec::string("filename", "Name for the exported file").required())
    }

    fn execute(&self, args: &ToolArgs, dataset: &Dataset) -> ToolResult {
        let bytes = codec::write_xlsx(dataset).map_err(export_error)?;
        export(args.str("filename")?, "xlsx", MIME_XLSX, bytes, dataset)
    }
}

fn export(
    requested: &str,
    extension: &'static str,
    mime_type: &'static str,
    bytes: Vec<u8>,
    dataset: &Dataset,
) -> ToolResult {
    let filename = with_extension(requested, extension);
    let (rows, cols) = dataset.shape();

    Ok(
        ToolOutput::text(format!("Exported data to {filename} ({rows} rows, {cols} columns)")).with_artifact(
            ArtifactDraft {
                kind: ArtifactKind::Export,
                extension,
                filename,
                mime_type,
                bytes,
            },
        ),
    )
}

/// Append `.{extension}` unless the name already ends with it
fn with_extension(name: &str, extension: &str) -> String {
    let suffix = format!(".{extension}");
    if name.ends_with(&suffix) {
        name.to_string()
    } else {
        format!("{name}{suffix}")
    }
}

fn export_error(err: CodecError) -> ToolError {
    ToolError::Failed(format!("export failed: {err}"))
}
