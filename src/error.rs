/// Error types for sqlx-upsert
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error compiling the placeholder pattern
    #[error("Failed to parse SQL template: {0}")]
    Parse(#[from] regex::Error),

    /// Error from SQLx database operations, including the store collaborators
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Placeholder was referenced by the template but no parameter was supplied
    #[error("Placeholder '{0}' has no supplied parameter")]
    UnboundPlaceholder(String),

    /// The insert statement did not produce an auto increment id
    #[error("Can't fetch generated ID")]
    MissingGeneratedKey,

    /// A required environment variable is not set
    #[error("Environment variable {name} is not set: {source}")]
    MissingEnv {
        name: &'static str,
        source: std::env::VarError,
    },

    /// The generated auto increment id does not fit an `i64`
    #[error("Generated ID {0} is out of range")]
    GeneratedKeyOutOfRange(u64),
}

/// Result type alias for sqlx-upsert operations
pub type Result<T> = std::result::Result<T, Error>;
