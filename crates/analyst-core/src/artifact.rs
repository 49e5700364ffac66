//! Generated Artifacts
//!
//! Files produced by plot and export tools. Tools hand back an
//! [`ArtifactDraft`]; the reasoning loop records it in the request's
//! [`ArtifactLedger`], which assigns the synthetic identifier.

use serde::Serialize;

pub const MIME_PNG: &str = "image/png";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Which family of tool produced an artifact; selects the id prefix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Plot,
    Export,
}

impl ArtifactKind {
    fn prefix(self) -> &'static str {
        match self {
            Self::Plot => "plot",
            Self::Export => "export",
        }
    }
}

/// Artifact as produced by a tool, before it is assigned an identifier
#[derive(Clone, Debug)]
pub struct ArtifactDraft {
    pub kind: ArtifactKind,
    /// Extension used for the identifier, without the dot
    pub extension: &'static str,
    /// User-facing filename
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// A recorded artifact, owned by the caller once the request ends
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifact {
    pub id: String,
    pub filename: String,
    pub mime_type: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

/// Request-scoped, append-only artifact list
#[derive(Debug, Default)]
pub struct ArtifactLedger {
    artifacts: Vec<GeneratedArtifact>,
}

impl ArtifactLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a draft; the id counts every artifact recorded before it.
    pub fn record(&mut self, draft: ArtifactDraft) -> &GeneratedArtifact {
        let id = format!(
            "{}_{}.{}",
            draft.kind.prefix(),
            self.artifacts.len(),
            draft.extension
        );
        tracing::info!(id = %id, filename = %draft.filename, bytes = draft.bytes.len(), "Artifact generated");
        let index = self.artifacts.len();
        self.artifacts.push(GeneratedArtifact {
            id,
            filename: draft.filename,
            mime_type: draft.mime_type.to_string(),
            bytes: draft.bytes,
        });
        &self.artifacts[index]
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn into_inner(self) -> Vec<GeneratedArtifact> {
        self.artifacts
    }
}
