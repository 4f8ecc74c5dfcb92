// Tue Jan 20 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Zero-width field at offset {0:#x}")]
    ZeroWidth(usize),
    #[error("Invalid evidence at offset {offset:#x}: {reason}")]
    InvalidEvidence { offset: usize, reason: String },
    #[error("Unknown layout: #{0}")]
    UnknownLayout(usize),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
