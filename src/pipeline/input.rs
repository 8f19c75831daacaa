//! Input checks: reject empty bodies and non-PDF data before any engine runs.

use crate::error::SanitiseError;
use std::path::Path;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Validate that `bytes` is a non-empty buffer starting with `%PDF`.
pub fn check_pdf_bytes(bytes: &[u8]) -> Result<(), SanitiseError> {
    if bytes.is_empty() {
        return Err(SanitiseError::EmptyInput);
    }
    if !bytes.starts_with(PDF_MAGIC) {
        let mut magic = [0u8; 4];
        let n = bytes.len().min(4);
        magic[..n].copy_from_slice(&bytes[..n]);
        return Err(SanitiseError::NotAPdf { magic });
    }
    Ok(())
}

/// Read a PDF from disk, mapping I/O failures onto input errors.
pub fn read_pdf_file(path: &Path) -> Result<Vec<u8>, SanitiseError> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => SanitiseError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => SanitiseError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;
    check_pdf_bytes(&bytes)?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}
