//! Error types with rich diagnostics using miette
//!
//! Rendering and layout never fail: degenerate input degrades to empty boxes
//! or invalid images. The errors here are the few conditions that do reach
//! callers: data-binding mistakes, export I/O, and (opt-in) image loading.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

// ============================================================================
// Data Binding Errors
// ============================================================================

/// Errors raised while binding a dataset to a plot
#[derive(Error, Diagnostic, Debug, PartialEq)]
pub enum DataBindingError {
    #[error("column not found: '{name}'")]
    #[diagnostic(code(graphcanvas::data::column_not_found))]
    ColumnNotFound {
        name: String,
        #[help]
        available: Option<String>,
    },

    #[error("column '{name}' has {found} rows, expected {expected}")]
    #[diagnostic(
        code(graphcanvas::data::column_length_mismatch),
        help("every column of a dataset must have one value per row")
    )]
    ColumnLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("dataset has no rows")]
    #[diagnostic(code(graphcanvas::data::empty_dataset))]
    EmptyDataset,
}

impl DataBindingError {
    /// Build a `ColumnNotFound` listing the columns that do exist.
    pub fn column_not_found<'a>(
        name: &str,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let names: Vec<&str> = available.into_iter().collect();
        let available = if names.is_empty() {
            None
        } else {
            Some(format!("available columns: {}", names.join(", ")))
        };
        DataBindingError::ColumnNotFound {
            name: name.to_string(),
            available,
        }
    }
}

// ============================================================================
// Export Errors
// ============================================================================

/// Errors writing an exported document
#[derive(Error, Diagnostic, Debug)]
pub enum ExportError {
    #[error("failed to write {}", path.display())]
    #[diagnostic(code(graphcanvas::export::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ============================================================================
// Image Errors
// ============================================================================

/// Reasons an image file could not be loaded
#[derive(Error, Diagnostic, Debug)]
pub enum ImageLoadError {
    #[error("failed to read {}", path.display())]
    #[diagnostic(code(graphcanvas::image::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}", path.display())]
    #[diagnostic(
        code(graphcanvas::image::decode),
        help("supported formats are PNG and JPEG")
    )]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("{} decoded to an empty image", path.display())]
    #[diagnostic(code(graphcanvas::image::empty))]
    Empty { path: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_not_found_lists_available() {
        let err = DataBindingError::column_not_found("Clse", ["Date", "Open", "Close"]);
        assert_eq!(err.to_string(), "column not found: 'Clse'");
        match err {
            DataBindingError::ColumnNotFound { available, .. } => {
                assert_eq!(available.as_deref(), Some("available columns: Date, Open, Close"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn column_not_found_without_columns_has_no_help() {
        let err = DataBindingError::column_not_found("x", []);
        assert_eq!(
            err,
            DataBindingError::ColumnNotFound {
                name: "x".into(),
                available: None
            }
        );
    }

    #[test]
    fn diagnostic_codes_are_namespaced() {
        let err = DataBindingError::EmptyDataset;
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("graphcanvas::data::empty_dataset"));
    }
}
