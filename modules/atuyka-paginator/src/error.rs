use thiserror::Error;

/// Errors raised by the paginators themselves. Fetch failures are never wrapped
/// here; they pass through as the paginator's own `Error` type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaginatorError {
    #[error("No elements were found")]
    Empty,
}
