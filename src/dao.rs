//! Batch reconciliation and single-session SQL plumbing.
//!
//! [`put`] is the entry point: it selects what is already persisted for the
//! given values, diffs it against the values and sends only the missing and
//! changed ones to the [`Store`]. Everything is awaited sequentially on the
//! caller's task; a failing store call aborts the whole operation and the
//! error is returned unchanged, leaving rollback to the caller's transaction.

use std::collections::HashMap;
use std::hash::Hash;

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::mysql::{MySqlConnection, MySqlQueryResult, MySqlRow};
use tracing::debug;

use crate::diff::Diff;
use crate::param::Param;
use crate::stored::{Stored, Update};
use crate::Query;

/// The persistence side of a reconciliation, for values of type `T`.
///
/// Implementations perform the actual batched I/O. They are only called with
/// non-empty batches.
#[async_trait]
pub trait Store<T>: Send
where
    T: Send + Sync,
{
    /// Returns the persisted rows corresponding to `values`, typically looked
    /// up by the same key the reconciliation uses.
    async fn select(&mut self, values: &[T]) -> crate::Result<Vec<Stored<T>>>;

    /// Persists new values and returns them with their generated ids.
    async fn insert(&mut self, values: &[T]) -> crate::Result<Vec<Stored<T>>>;

    /// Writes the desired values into the existing rows.
    async fn update(&mut self, values: &[Update<T>]) -> crate::Result<Vec<Stored<T>>>;
}

/// Inserts or updates `values`, identified by `key`.
///
/// Values are compared with their persisted counterparts by `==`. The result
/// holds the inserted rows, then the updated rows (both in the order the
/// store returns them), then the unchanged rows in the order of `values`.
/// Persisted rows whose key is not among `values` are left alone.
///
/// If `values` contains several values with the same key, the last one wins.
///
/// # Errors
///
/// Any error of the store is returned as is; nothing already written is undone.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx_upsert::dao::{put, Store};
/// use sqlx_upsert::Stored;
///
/// # async fn example(store: &mut impl Store<(String, String)>) -> sqlx_upsert::Result<()> {
/// let links = vec![("https://jenetics.io".to_string(), "Jenetics".to_string())];
/// let stored: Vec<Stored<(String, String)>> = put(store, &links, |link| link.0.clone()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn put<T, K, S, F>(store: &mut S, values: &[T], key: F) -> crate::Result<Vec<Stored<T>>>
where
    T: Clone + PartialEq + Send + Sync,
    K: Eq + Hash + Clone,
    S: Store<T> + ?Sized,
    F: Fn(&T) -> K,
{
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let existing: IndexMap<K, Stored<T>> = store
        .select(values)
        .await?
        .into_iter()
        .map(|stored| (key(stored.value()), stored))
        .collect();
    let desired: IndexMap<K, T> = values.iter().map(|value| (key(value), value.clone())).collect();

    let diff = Diff::of(existing, desired);
    let same = |e: &Stored<T>, a: &T| e.value() == a;

    let missing: Vec<T> = diff.missing().into_iter().cloned().collect();
    let updated: Vec<Update<T>> = diff
        .updated(same)
        .into_iter()
        .map(|(e, a)| Update::new(e.clone(), a.clone()))
        .collect();
    let unchanged: Vec<Stored<T>> = diff.unchanged(same).into_iter().cloned().collect();

    debug!(
        values = values.len(),
        missing = missing.len(),
        updated = updated.len(),
        unchanged = unchanged.len(),
        "reconciled batch"
    );

    let mut result = Vec::with_capacity(missing.len() + updated.len() + unchanged.len());
    if !missing.is_empty() {
        result.extend(store.insert(&missing).await?);
    }
    if !updated.is_empty() {
        result.extend(store.update(&updated).await?);
    }
    result.extend(unchanged);

    Ok(result)
}

/// Reconciles the values derived from `values` and maps each of them to its id.
///
/// `mapper` may yield any number of children per value (an `Option` or a
/// `Vec` both work). The children are stored with [`put`]; the returned map
/// resolves every child to the id it is persisted under, e.g. for filling in
/// foreign keys of the parent rows. Children sharing a key share the id of
/// the row stored for that key.
pub async fn set<A, B, K, S, M, I, F>(
    store: &mut S,
    values: &[A],
    mapper: M,
    key: F,
) -> crate::Result<HashMap<B, i64>>
where
    B: Clone + Eq + Hash + Send + Sync,
    K: Eq + Hash + Clone,
    S: Store<B> + ?Sized,
    M: Fn(&A) -> I,
    I: IntoIterator<Item = B>,
    F: Fn(&B) -> K,
{
    let mapped: Vec<B> = values.iter().flat_map(mapper).collect();

    let ids: HashMap<K, i64> = put(store, &mapped, &key)
        .await?
        .into_iter()
        .map(|stored| (key(stored.value()), stored.id()))
        .collect();

    Ok(mapped
        .into_iter()
        .filter_map(|child| {
            let id = *ids.get(&key(&child))?;
            Some((child, id))
        })
        .collect())
}

/// Reads the auto increment id of the row inserted by `result`.
///
/// # Errors
///
/// Returns [`Error::MissingGeneratedKey`](crate::Error::MissingGeneratedKey)
/// if the statement did not generate an id, and
/// [`Error::GeneratedKeyOutOfRange`](crate::Error::GeneratedKeyOutOfRange)
/// if the id does not fit an `i64`.
pub fn id(result: &MySqlQueryResult) -> crate::Result<i64> {
    generated_id(result.last_insert_id())
}

fn generated_id(last_insert_id: u64) -> crate::Result<i64> {
    match last_insert_id {
        0 => Err(crate::Error::MissingGeneratedKey),
        id => i64::try_from(id).map_err(|_| crate::Error::GeneratedKeyOutOfRange(id)),
    }
}

/// Database access bound to one connection.
///
/// A `Dao` is one logical session: all statements run on the connection it
/// was created with, one after another. Pass `&mut *tx` to run inside a
/// transaction.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::{Connection, MySqlConnection};
/// use sqlx_upsert::{Dao, Param, Query};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = MySqlConnection::connect("mysql://localhost/test").await?;
/// let mut tx = conn.begin().await?;
///
/// let mut dao = Dao::new(&mut *tx);
/// let insert = Query::of("INSERT INTO link (href) VALUES ({href})")?;
/// let id = dao.insert(&insert, &[Param::value("href", "https://jenetics.io")]).await?;
///
/// tx.commit().await?;
/// println!("Inserted link {id}");
/// # Ok(())
/// # }
/// ```
pub struct Dao<'c> {
    conn: &'c mut MySqlConnection,
}

impl<'c> Dao<'c> {
    pub fn new(conn: &'c mut MySqlConnection) -> Self {
        Self { conn }
    }

    /// Binds `params` and executes the statement.
    pub async fn execute(&mut self, query: &Query, params: &[Param]) -> crate::Result<MySqlQueryResult> {
        query.on(params)?.execute(&mut *self.conn).await
    }

    /// Executes an insert statement and returns the generated id.
    pub async fn insert(&mut self, query: &Query, params: &[Param]) -> crate::Result<i64> {
        let result = self.execute(query, params).await?;
        id(&result)
    }

    /// Executes an insert statement once per parameter row and returns the
    /// generated ids in row order.
    ///
    /// Every row is bound before the first statement is sent, so a missing
    /// parameter fails the whole batch without touching the database.
    pub async fn batch_insert(&mut self, query: &Query, rows: &[Vec<Param>]) -> crate::Result<Vec<i64>> {
        let prepared = rows
            .iter()
            .map(|params| query.on(params))
            .collect::<crate::Result<Vec<_>>>()?;

        debug!(rows = prepared.len(), sql = query.sql(), "batch insert");
        let mut ids = Vec::with_capacity(prepared.len());
        for statement in &prepared {
            let result = statement.execute(&mut *self.conn).await?;
            ids.push(id(&result)?);
        }
        Ok(ids)
    }

    /// Executes a statement once per parameter row and returns the total
    /// number of affected rows.
    pub async fn batch_execute(&mut self, query: &Query, rows: &[Vec<Param>]) -> crate::Result<u64> {
        let prepared = rows
            .iter()
            .map(|params| query.on(params))
            .collect::<crate::Result<Vec<_>>>()?;

        debug!(rows = prepared.len(), sql = query.sql(), "batch execute");
        let mut affected = 0;
        for statement in &prepared {
            affected += statement.execute(&mut *self.conn).await?.rows_affected();
        }
        Ok(affected)
    }

    /// Binds `params` and returns all rows.
    pub async fn fetch_all<R>(&mut self, query: &Query, params: &[Param]) -> crate::Result<Vec<R>>
    where
        for<'row> R: sqlx::FromRow<'row, MySqlRow> + Send + Unpin,
    {
        query.on_as::<R>(params)?.fetch_all(&mut *self.conn).await
    }

    /// Binds `params` and returns at most one row.
    pub async fn fetch_optional<R>(&mut self, query: &Query, params: &[Param]) -> crate::Result<Option<R>>
    where
        for<'row> R: sqlx::FromRow<'row, MySqlRow> + Send + Unpin,
    {
        query.on_as::<R>(params)?.fetch_optional(&mut *self.conn).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    struct Link {
        href: String,
        text: Option<String>,
    }

    fn link(href: &str, text: &str) -> Link {
        Link {
            href: href.to_owned(),
            text: Some(text.to_owned()),
        }
    }

    fn href(link: &Link) -> String {
        link.href.clone()
    }

    /// Keeps rows in memory and records every call.
    #[derive(Default)]
    struct MemoryStore {
        rows: Vec<Stored<Link>>,
        next_id: i64,
        selects: Vec<Vec<Link>>,
        inserts: Vec<Vec<Link>>,
        updates: Vec<Vec<Update<Link>>>,
        fail_insert: bool,
    }

    impl MemoryStore {
        fn with_rows(rows: Vec<Stored<Link>>) -> Self {
            let next_id = rows.iter().map(Stored::id).max().unwrap_or(0);
            Self {
                rows,
                next_id,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Store<Link> for MemoryStore {
        async fn select(&mut self, values: &[Link]) -> crate::Result<Vec<Stored<Link>>> {
            self.selects.push(values.to_vec());
            Ok(self
                .rows
                .iter()
                .filter(|row| values.iter().any(|v| v.href == row.value().href))
                .cloned()
                .collect())
        }

        async fn insert(&mut self, values: &[Link]) -> crate::Result<Vec<Stored<Link>>> {
            self.inserts.push(values.to_vec());
            if self.fail_insert {
                return Err(crate::Error::MissingGeneratedKey);
            }
            let stored: Vec<_> = values
                .iter()
                .map(|value| {
                    self.next_id += 1;
                    Stored::new(self.next_id, value.clone())
                })
                .collect();
            self.rows.extend(stored.iter().cloned());
            Ok(stored)
        }

        async fn update(&mut self, values: &[Update<Link>]) -> crate::Result<Vec<Stored<Link>>> {
            self.updates.push(values.to_vec());
            let stored: Vec<_> = values.iter().map(Update::stored).collect();
            for row in &stored {
                if let Some(existing) = self.rows.iter_mut().find(|r| r.id() == row.id()) {
                    *existing = row.clone();
                }
            }
            Ok(stored)
        }
    }

    #[tokio::test]
    async fn test_put_empty_does_no_io() {
        let mut store = MemoryStore::default();
        let result = put(&mut store, &[], href).await.unwrap();

        assert!(result.is_empty());
        assert!(store.selects.is_empty());
        assert!(store.inserts.is_empty());
        assert!(store.updates.is_empty());
    }

    #[tokio::test]
    async fn test_put_unchanged() {
        let mut store = MemoryStore::with_rows(vec![Stored::new(1, link("a", "x"))]);
        let result = put(&mut store, &[link("a", "x")], href).await.unwrap();

        assert_eq!(result, vec![Stored::new(1, link("a", "x"))]);
        assert_eq!(store.selects.len(), 1);
        assert!(store.inserts.is_empty());
        assert!(store.updates.is_empty());
    }

    #[tokio::test]
    async fn test_put_missing_is_inserted() {
        let mut store = MemoryStore::default();
        let result = put(&mut store, &[link("a", "y")], href).await.unwrap();

        assert_eq!(store.inserts, vec![vec![link("a", "y")]]);
        assert!(store.updates.is_empty());
        assert_eq!(result, vec![Stored::new(1, link("a", "y"))]);
    }

    #[tokio::test]
    async fn test_put_changed_is_updated_in_place() {
        let mut store = MemoryStore::with_rows(vec![Stored::new(1, link("a", "x"))]);
        let result = put(&mut store, &[link("a", "z")], href).await.unwrap();

        assert!(store.inserts.is_empty());
        assert_eq!(
            store.updates,
            vec![vec![Update::new(Stored::new(1, link("a", "x")), link("a", "z"))]]
        );
        assert_eq!(result, vec![Stored::new(1, link("a", "z"))]);
    }

    #[tokio::test]
    async fn test_put_orders_inserted_updated_unchanged() {
        let mut store = MemoryStore::with_rows(vec![
            Stored::new(1, link("same", "s")),
            Stored::new(2, link("changed", "old")),
            Stored::new(3, link("untouched", "u")),
        ]);
        let values = vec![
            link("same", "s"),
            link("new", "n"),
            link("changed", "new"),
        ];
        let result = put(&mut store, &values, href).await.unwrap();

        assert_eq!(
            result,
            vec![
                Stored::new(4, link("new", "n")),
                Stored::new(2, link("changed", "new")),
                Stored::new(1, link("same", "s")),
            ]
        );
        assert_eq!(store.rows.len(), 4);
    }

    #[tokio::test]
    async fn test_put_duplicate_keys_last_wins() {
        let mut store = MemoryStore::default();
        let values = vec![link("a", "first"), link("a", "second")];
        let result = put(&mut store, &values, href).await.unwrap();

        assert_eq!(store.inserts, vec![vec![link("a", "second")]]);
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let mut store = MemoryStore::with_rows(vec![Stored::new(1, link("a", "x"))]);
        let values = vec![link("a", "changed"), link("b", "new")];

        let mut first = put(&mut store, &values, href).await.unwrap();
        let mut second = put(&mut store, &values, href).await.unwrap();

        first.sort_by_key(Stored::id);
        second.sort_by_key(Stored::id);
        assert_eq!(first, second);
        assert_eq!(store.inserts.len(), 1);
        assert_eq!(store.updates.len(), 1);
    }

    #[tokio::test]
    async fn test_put_propagates_store_error() {
        let mut store = MemoryStore {
            fail_insert: true,
            ..MemoryStore::default()
        };
        let result = put(&mut store, &[link("a", "x")], href).await;

        assert!(matches!(result, Err(crate::Error::MissingGeneratedKey)));
        assert!(store.updates.is_empty());
    }

    #[tokio::test]
    async fn test_set_maps_children_to_ids() {
        struct Route {
            links: Vec<Link>,
        }

        let mut store = MemoryStore::with_rows(vec![Stored::new(7, link("a", "x"))]);
        let routes = vec![
            Route {
                links: vec![link("a", "x"), link("b", "y")],
            },
            Route { links: vec![] },
            Route {
                links: vec![link("c", "z")],
            },
        ];

        let ids = set(&mut store, &routes, |route| route.links.clone(), href)
            .await
            .unwrap();

        assert_eq!(ids.len(), 3);
        assert_eq!(ids[&link("a", "x")], 7);
        assert_eq!(ids[&link("b", "y")], 8);
        assert_eq!(ids[&link("c", "z")], 9);
    }

    #[tokio::test]
    async fn test_set_resolves_every_child_sharing_a_key() {
        let mut store = MemoryStore::default();
        let parents = vec![vec![link("a", "x")], vec![link("a", "y")], vec![link("b", "z")]];

        let ids = set(&mut store, &parents, |links| links.clone(), href)
            .await
            .unwrap();

        assert_eq!(store.inserts, vec![vec![link("a", "y"), link("b", "z")]]);
        assert_eq!(ids.len(), 3);
        assert_eq!(ids[&link("a", "x")], 1);
        assert_eq!(ids[&link("a", "y")], 1);
        assert_eq!(ids[&link("b", "z")], 2);
    }

    #[test]
    fn test_id_without_generated_key_fails() {
        let result = MySqlQueryResult::default();
        assert!(matches!(id(&result), Err(crate::Error::MissingGeneratedKey)));
    }

    #[test]
    fn test_generated_id_range() {
        assert_eq!(generated_id(42).unwrap(), 42);
        assert!(matches!(
            generated_id(u64::MAX),
            Err(crate::Error::GeneratedKeyOutOfRange(u64::MAX))
        ));
    }

    #[tokio::test]
    async fn test_set_with_optional_child() {
        let mut store = MemoryStore::default();
        let parents = vec![Some(link("a", "x")), None];

        let ids = set(&mut store, &parents, |parent| parent.clone(), href)
            .await
            .unwrap();

        assert_eq!(ids.len(), 1);
        assert_eq!(ids[&link("a", "x")], 1);
    }
}
