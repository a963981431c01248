//! Error types for Quarry

use thiserror::Error;

/// The main error type for Quarry operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or execution error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A query or column description the active grammar cannot render
    #[error("Compilation error: {message}")]
    Compilation { message: String },

    /// Invalid query configuration
    #[error("Invalid query: {message}")]
    InvalidQuery { message: String },

    /// A native column value that has no `Value` representation
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Column not found in a result row
    #[error("Column '{column}' not found in row")]
    ColumnNotFound { column: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Error raised by the stub database used in tests
    #[error("Stub database error: {message}")]
    Stub { message: String },
}

/// Convenience Result type for Quarry operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new compilation error
    pub fn compilation(message: impl Into<String>) -> Self {
        Self::Compilation {
            message: message.into(),
        }
    }

    /// Create a new invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create a new decode error for the given column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a new column not found error
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Create a new stub database error
    pub fn stub(message: impl Into<String>) -> Self {
        Self::Stub {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_error() {
        let err = Error::compilation("unsigned requires an integer column");
        assert!(matches!(err, Error::Compilation { .. }));
        assert_eq!(
            err.to_string(),
            "Compilation error: unsigned requires an integer column"
        );
    }

    #[test]
    fn test_invalid_query_error() {
        let err = Error::invalid_query("UPDATE requires at least one value");
        assert!(matches!(err, Error::InvalidQuery { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid query: UPDATE requires at least one value"
        );
    }

    #[test]
    fn test_decode_error() {
        let err = Error::decode("location", "unsupported column type POINT");
        assert_eq!(
            err.to_string(),
            "Decode error on column 'location': unsupported column type POINT"
        );
    }

    #[test]
    fn test_column_not_found_error() {
        let err = Error::column_not_found("invalid_column");
        assert!(matches!(err, Error::ColumnNotFound { .. }));
        assert_eq!(err.to_string(), "Column 'invalid_column' not found in row");
    }

    #[test]
    fn test_stub_error() {
        let err = Error::stub("database has been shut down");
        assert_eq!(
            err.to_string(),
            "Stub database error: database has been shut down"
        );
    }
}
