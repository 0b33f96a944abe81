use std::marker::PhantomData;

use sqlx::{mysql::MySqlRow, Executor, MySql};

use crate::param::{arguments, Value};

/// A bound query returning strongly-typed rows via SQLx's `FromRow`.
///
/// Created by [`Query::on_as`](crate::Query::on_as).
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::{Connection, FromRow, MySqlConnection};
/// use sqlx_upsert::{Param, Query};
///
/// #[derive(FromRow)]
/// struct Link {
///     id: i64,
///     href: String,
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = MySqlConnection::connect("mysql://localhost/test").await?;
///
/// let query = Query::of("SELECT id, href FROM link WHERE text = {text}")?
///     .on_as::<Link>(&[Param::value("text", "Jenetics")])?;
///
/// for link in query.fetch_all(&mut conn).await? {
///     println!("{}: {}", link.id, link.href);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PreparedQueryAs<R> {
    sql: String,
    values: Vec<Value>,
    _pd: PhantomData<fn() -> R>,
}

impl<R> PreparedQueryAs<R> {
    pub(crate) fn new(sql: String, values: Vec<Value>) -> Self {
        Self {
            sql,
            values,
            _pd: PhantomData,
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl<R> PreparedQueryAs<R>
where
    for<'row> R: sqlx::FromRow<'row, MySqlRow> + Send + Unpin,
{
    /// Executes the query and returns all matching rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or if any row cannot be converted to type `R`.
    pub async fn fetch_all<'e, E>(&self, executor: E) -> crate::Result<Vec<R>>
    where
        E: Executor<'e, Database = MySql>,
    {
        let args = arguments(&self.values)?;
        let q = sqlx::query_as_with::<MySql, R, _>(&self.sql, args);
        Ok(q.fetch_all(executor).await?)
    }

    /// Executes the query and returns exactly one row.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No rows are found
    /// - The query fails
    /// - The row cannot be converted to type `R`
    pub async fn fetch_one<'e, E>(&self, executor: E) -> crate::Result<R>
    where
        E: Executor<'e, Database = MySql>,
    {
        let args = arguments(&self.values)?;
        let q = sqlx::query_as_with::<MySql, R, _>(&self.sql, args);
        Ok(q.fetch_one(executor).await?)
    }

    /// Executes the query and returns at most one row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row cannot be converted to type `R`.
    pub async fn fetch_optional<'e, E>(&self, executor: E) -> crate::Result<Option<R>>
    where
        E: Executor<'e, Database = MySql>,
    {
        let args = arguments(&self.values)?;
        let q = sqlx::query_as_with::<MySql, R, _>(&self.sql, args);
        Ok(q.fetch_optional(executor).await?)
    }
}
