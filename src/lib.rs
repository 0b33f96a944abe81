//! # sqlx-upsert
//!
//! Named parameter templates and batch insert/update reconciliation for SQLx.
//!
//! ## Features
//!
//! - **Named Placeholders**: Write `{param_name}` instead of `?` and bind values by name
//! - **Early Binding Errors**: A placeholder without a supplied value fails before any SQL is sent
//! - **Batch Upserts**: [`put`](dao::put) compares values with what is already stored and only
//!   inserts the missing and updates the changed ones
//! - **Stable Identities**: Updated rows keep their id, unchanged rows are passed through untouched
//! - **Generic Executor Support**: Works with a `MySqlConnection`, a `Transaction`, or any SQLx `Executor`
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["mysql", "runtime-tokio"] }
//! sqlx-upsert = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Named Parameters
//!
//! ```rust,no_run
//! use sqlx::{Connection, MySqlConnection};
//! use sqlx_upsert::{Param, Query};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = MySqlConnection::connect("mysql://localhost/test").await?;
//!
//! let query = Query::of("INSERT INTO link (href, text) VALUES ({href}, {text})")?;
//! assert_eq!(query.sql(), "INSERT INTO link (href, text) VALUES (?, ?)");
//!
//! let result = query
//!     .on(&[Param::value("href", "https://jenetics.io"), Param::value("text", "Jenetics")])?
//!     .execute(&mut conn)
//!     .await?;
//! println!("Inserted link {}", result.last_insert_id());
//! # Ok(())
//! # }
//! ```
//!
//! ### Batch Upserts
//!
//! Implement [`Store`](dao::Store) for the table and let [`put`](dao::put) decide what to write:
//!
//! ```rust,no_run
//! use sqlx_upsert::dao::{put, Store};
//! use sqlx_upsert::Stored;
//!
//! #[derive(Clone, PartialEq)]
//! struct Link {
//!     href: String,
//!     text: Option<String>,
//! }
//!
//! # async fn example(links: &mut impl Store<Link>) -> sqlx_upsert::Result<()> {
//! let values = vec![Link { href: "https://jenetics.io".into(), text: None }];
//!
//! // Inserted, then updated, then unchanged rows.
//! let stored: Vec<Stored<Link>> = put(links, &values, |link| link.href.clone()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! 1. **Parse**: [`Query::of`] replaces each `{name}` by `?` and records the names in order
//! 2. **Bind**: [`Query::on`] looks up a value for every name, failing on the first missing one
//! 3. **Reconcile**: [`put`](dao::put) selects the stored rows, diffs them by key against the
//!    desired values and sends the missing ones to `insert` and the changed ones to `update`
//!
//! Rows that are stored but not among the desired values are never deleted.
//!
//! ## Limitations
//!
//! - Currently only supports MySQL
//! - Placeholder names must match `[a-zA-Z0-9_]+`
//! - Transactions and pooling are left to the caller
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod builder;
pub mod config;
pub mod dao;
pub mod diff;
pub mod error;
pub mod param;
pub mod query;
pub mod query_as;
pub mod stored;

pub use builder::Query;
pub use config::DatabaseConfig;
pub use dao::{Dao, Store};
pub use error::{Error, Result};
pub use param::{Param, Value};
pub use query::PreparedQuery;
pub use query_as::PreparedQueryAs;
pub use stored::{Stored, Update};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::dao::{put, set, Dao, Store};
    pub use crate::error::{Error, Result};
    pub use crate::{Param, Query, Stored, Update};
}
