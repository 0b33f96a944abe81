use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::param::{Param, Value};
use crate::query::PreparedQuery;
use crate::query_as::PreparedQueryAs;

const PARAM_PATTERN: &str = r"\{([a-zA-Z0-9_]+)\}";

static PARAM: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| Regex::new(PARAM_PATTERN));

fn param_regex() -> crate::Result<&'static Regex> {
    PARAM.as_ref().map_err(|e| e.clone().into())
}

/// A parsed SQL template.
///
/// Named placeholders (`{name}`) are replaced by positional placeholders (`?`)
/// and the names are kept in occurrence order, so `names()[i]` belongs to the
/// i-th `?` of `sql()`. Anything that does not match `{word-chars}` is copied
/// verbatim, including `{}` and braces around other characters.
///
/// # Examples
///
/// ```
/// use sqlx_upsert::Query;
///
/// let query = Query::of("SELECT id FROM link WHERE href = {href} AND text = {text}")?;
/// assert_eq!(query.sql(), "SELECT id FROM link WHERE href = ? AND text = ?");
/// assert_eq!(query.names(), ["href", "text"]);
/// # Ok::<(), sqlx_upsert::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    sql: String,
    names: Vec<String>,
}

impl Query {
    /// Parses the given template.
    ///
    /// # Errors
    ///
    /// Only fails if the placeholder pattern itself cannot be compiled; every
    /// template string is accepted.
    pub fn of<T>(template: T) -> crate::Result<Self>
    where
        T: AsRef<str>,
    {
        let template = template.as_ref();
        let regex = param_regex()?;

        let mut sql = String::with_capacity(template.len());
        let mut names = Vec::new();
        let mut tail = 0;
        for caps in regex.captures_iter(template) {
            let (Some(token), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            sql.push_str(&template[tail..token.start()]);
            sql.push('?');
            names.push(name.as_str().to_owned());
            tail = token.end();
        }
        sql.push_str(&template[tail..]);

        trace!(sql = %sql, params = names.len(), "parsed query template");
        Ok(Self { sql, names })
    }

    /// The SQL with positional `?` placeholders.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in occurrence order. Repeated placeholders appear repeatedly.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Binds the parameters by name.
    ///
    /// Parameters without a matching placeholder are ignored; if a name is
    /// supplied more than once the last parameter wins.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnboundPlaceholder`](crate::Error::UnboundPlaceholder)
    /// for the first placeholder without a supplied parameter.
    ///
    /// # Examples
    ///
    /// ```
    /// use sqlx_upsert::{Error, Param, Query};
    ///
    /// let query = Query::of("UPDATE link SET text = {text} WHERE id = {id}")?;
    /// assert!(query.on(&[Param::value("text", "home"), Param::value("id", 1)]).is_ok());
    /// assert!(matches!(
    ///     query.on(&[Param::value("text", "home")]),
    ///     Err(Error::UnboundPlaceholder(name)) if name == "id"
    /// ));
    /// # Ok::<(), sqlx_upsert::Error>(())
    /// ```
    pub fn on(&self, params: &[Param]) -> crate::Result<PreparedQuery> {
        let values = self.resolve(params)?;
        Ok(PreparedQuery::new(self.sql.clone(), values))
    }

    /// Binds the parameters by name, for a query returning rows of type `R`.
    ///
    /// Binding follows the same rules as [`Query::on`].
    pub fn on_as<R>(&self, params: &[Param]) -> crate::Result<PreparedQueryAs<R>> {
        let values = self.resolve(params)?;
        Ok(PreparedQueryAs::new(self.sql.clone(), values))
    }

    fn resolve(&self, params: &[Param]) -> crate::Result<Vec<Value>> {
        self.names
            .iter()
            .map(|name| {
                params
                    .iter()
                    .rev()
                    .find(|param| param.name() == name)
                    .map(|param| param.get().clone())
                    .ok_or_else(|| crate::Error::UnboundPlaceholder(name.clone()))
            })
            .collect()
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Converts named placeholders (`{name}`) to positional placeholders (`?`).
///
/// # Examples
///
/// ```
/// use sqlx_upsert::builder::build_query;
///
/// let sql = build_query("SELECT * FROM users WHERE id = {id} AND name = {name}")?;
/// assert_eq!(sql, "SELECT * FROM users WHERE id = ? AND name = ?");
/// # Ok::<(), sqlx_upsert::Error>(())
/// ```
pub fn build_query(template: &str) -> crate::Result<String> {
    Ok(Query::of(template)?.sql)
}
