//! Plain-text extraction from uploaded files.

use crate::error::{DocQaError, Result};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Text,
    Pdf,
    Image,
}

pub fn guess_kind(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "txt" | "md" | "log" | "csv" | "json" | "html" | "htm" => Some(DocumentKind::Text),
        "pdf" => Some(DocumentKind::Pdf),
        "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" => Some(DocumentKind::Image),
        _ => None,
    }
}

pub fn extract_text(path: &Path) -> Result<String> {
    match guess_kind(path) {
        Some(DocumentKind::Text) => {
            let bytes = fs::read(path)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(DocumentKind::Pdf) => pdf_text(path),
        Some(DocumentKind::Image) => ocr_text(path),
        None => Err(DocQaError::Unsupported(format!(
            "unrecognized file type: {}",
            path.display()
        ))),
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path).map_err(|e| DocQaError::Extraction(e.to_string()))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(path: &Path) -> Result<String> {
    Err(DocQaError::Unsupported(format!(
        "PDF support not compiled in (enable the `pdf` feature): {}",
        path.display()
    )))
}

#[cfg(feature = "ocr")]
fn ocr_text(path: &Path) -> Result<String> {
    let mut lt = leptess::LepTess::new(None, "eng")
        .map_err(|e| DocQaError::Extraction(e.to_string()))?;
    lt.set_image(path)
        .map_err(|e| DocQaError::Extraction(e.to_string()))?;
    lt.get_utf8_text()
        .map_err(|e| DocQaError::Extraction(e.to_string()))
}

#[cfg(not(feature = "ocr"))]
fn ocr_text(path: &Path) -> Result<String> {
    Err(DocQaError::Unsupported(format!(
        "OCR support not compiled in (enable the `ocr` feature): {}",
        path.display()
    )))
}
