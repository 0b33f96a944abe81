use sqlx::{mysql::MySqlQueryResult, Executor, MySql};

use crate::param::{arguments, Value};

/// A parsed query with its parameter values bound in placeholder order.
///
/// Created by [`Query::on`](crate::Query::on). The SQLx query and its
/// arguments are constructed fresh on each execution, so the same prepared
/// query can be executed repeatedly and against any executor.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::{Connection, MySqlConnection};
/// use sqlx_upsert::{Param, Query};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = MySqlConnection::connect("mysql://localhost/test").await?;
///
/// let query = Query::of("INSERT INTO link (href, text) VALUES ({href}, {text})")?
///     .on(&[Param::value("href", "https://jenetics.io"), Param::value("text", "Jenetics")])?;
///
/// let result = query.execute(&mut conn).await?;
/// println!("Inserted link {}", result.last_insert_id());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    sql: String,
    values: Vec<Value>,
}

impl PreparedQuery {
    pub(crate) fn new(sql: String, values: Vec<Value>) -> Self {
        Self { sql, values }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bound values, one per `?` placeholder.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Executes the query using the provided executor.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be encoded or the database query fails.
    pub async fn execute<'e, E>(&self, executor: E) -> crate::Result<MySqlQueryResult>
    where
        E: Executor<'e, Database = MySql>,
    {
        let args = arguments(&self.values)?;
        let q = sqlx::query_with::<MySql, _>(&self.sql, args);
        Ok(q.execute(executor).await?)
    }
}
