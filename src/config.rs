use sqlx::{Connection, MySqlConnection};
use tracing::debug;

/// Environment variable holding the connection URL.
pub const DATABASE_URL: &str = "DATABASE_URL";

/// Connection settings for a single database session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
}

impl DatabaseConfig {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self { url: url.into() }
    }

    /// Reads `DATABASE_URL`, loading a `.env` file first if one is present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingEnv`](crate::Error::MissingEnv) if the variable
    /// is not set.
    pub fn from_env() -> crate::Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "loaded .env");
        }
        Self::from_var(DATABASE_URL)
    }

    fn from_var(name: &'static str) -> crate::Result<Self> {
        std::env::var(name)
            .map(Self::new)
            .map_err(|source| crate::Error::MissingEnv { name, source })
    }

    /// Opens a new connection.
    pub async fn connect(&self) -> crate::Result<MySqlConnection> {
        Ok(MySqlConnection::connect(&self.url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let config = DatabaseConfig::new("mysql://user@db/gpx");
        assert_eq!(config.url, "mysql://user@db/gpx");
    }

    #[test]
    fn test_from_var_reads_url() {
        std::env::set_var("SQLX_UPSERT_TEST_URL", "mysql://user@db/gpx");
        let config = DatabaseConfig::from_var("SQLX_UPSERT_TEST_URL").unwrap();
        assert_eq!(config.url, "mysql://user@db/gpx");
    }

    #[test]
    fn test_from_var_unset_fails() {
        let err = DatabaseConfig::from_var("SQLX_UPSERT_UNSET_URL").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::MissingEnv { name: "SQLX_UPSERT_UNSET_URL", .. }
        ));
    }
}
