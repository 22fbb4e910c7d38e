//! Error types for schema resolution and row generation.

use crate::schema::SchemaError;

/// Errors that abort a generation run.
///
/// None of these are recoverable at the point they occur: skipping the
/// offending table would leave dangling references in the output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    /// Foreign keys between distinct tables form a cycle
    #[error("foreign key cycle between tables: {}", tables.join(", "))]
    SchemaCycle { tables: Vec<String> },

    /// A non-nullable foreign key has no referenced row to point at
    #[error("cannot fill `{table}.{column}`: referenced table has no rows and the column is not nullable")]
    UnsatisfiableReference { table: String, column: String },

    /// A generation parameter is internally inconsistent
    #[error("invalid generation config at {location}: {message}")]
    ValueGeneration { location: String, message: String },

    /// Unique primary keys ran out before the requested row count was reached
    #[error("could not generate a unique primary key for `{table}` after {attempts} attempts")]
    KeySpaceExhausted { table: String, attempts: usize },

    /// A table named by the caller is not in the schema
    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl GenerateError {
    pub(crate) fn config(location: impl Into<String>, message: impl Into<String>) -> Self {
        GenerateError::ValueGeneration {
            location: location.into(),
            message: message.into(),
        }
    }
}

pub type Result<T, E = GenerateError> = std::result::Result<T, E>;
