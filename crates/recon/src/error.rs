use serde::Serialize;
use thiserror::Error;

/// A collaborator document whose text did not contain the identified brand keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMismatch {
    /// Document name as shown to the operator ("packing", "carrier remark").
    pub document: String,
    /// Bounded snippet of the text that was searched.
    pub detected: String,
}

#[derive(Debug, Error)]
pub enum DeclError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad stage order, malformed cell address, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A required source file or sheet is missing or unparsable.
    #[error("cannot read {source_name}: {detail}")]
    SourceRead { source_name: String, detail: String },
    /// No brand profile keyword occurs in the invoice text.
    #[error("no known brand found in invoice text '{invoice_excerpt}'")]
    BrandNotIdentified { invoice_excerpt: String },
    /// The invoice brand keyword is absent from one or more collaborator documents.
    #[error("brand '{keyword}' not found in {}", describe_mismatches(.mismatches))]
    BrandMismatch {
        keyword: String,
        mismatches: Vec<DocumentMismatch>,
    },
    /// Report serialization failed.
    #[error("render error: {0}")]
    Render(String),
    /// IO error (file write, etc.).
    #[error("IO error: {0}")]
    Io(String),
}

impl DeclError {
    pub fn source_read(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SourceRead {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

fn describe_mismatches(mismatches: &[DocumentMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| format!("{} (detected: '{}')", m.document, m.detected))
        .collect::<Vec<_>>()
        .join(", ")
}
