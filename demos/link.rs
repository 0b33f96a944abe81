//! A `Store` for the `link` table shared by the demos.

use async_trait::async_trait;
use sqlx_upsert::{Dao, Param, Query, Store, Stored, Update};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub href: String,
    pub text: Option<String>,
}

impl Link {
    pub fn new(href: &str, text: Option<&str>) -> Self {
        Self {
            href: href.to_owned(),
            text: text.map(str::to_owned),
        }
    }

    pub fn href(&self) -> String {
        self.href.clone()
    }
}

pub const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS link (
    id BIGINT PRIMARY KEY AUTO_INCREMENT,
    href VARCHAR(255) NOT NULL UNIQUE,
    text VARCHAR(255)
)";

pub struct LinkStore<'c> {
    dao: Dao<'c>,
}

impl<'c> LinkStore<'c> {
    pub fn new(dao: Dao<'c>) -> Self {
        Self { dao }
    }
}

#[async_trait]
impl<'c> Store<Link> for LinkStore<'c> {
    async fn select(&mut self, values: &[Link]) -> sqlx_upsert::Result<Vec<Stored<Link>>> {
        let names: Vec<String> = (0..values.len()).map(|i| format!("{{href_{i}}}")).collect();
        let query = Query::of(format!(
            "SELECT id, href, text FROM link WHERE href IN ({})",
            names.join(", ")
        ))?;
        let params: Vec<Param> = values
            .iter()
            .enumerate()
            .map(|(i, link)| Param::value(format!("href_{i}"), link.href.as_str()))
            .collect();

        let rows: Vec<(i64, String, Option<String>)> = self.dao.fetch_all(&query, &params).await?;
        Ok(rows
            .into_iter()
            .map(|(id, href, text)| Stored::new(id, Link { href, text }))
            .collect())
    }

    async fn insert(&mut self, values: &[Link]) -> sqlx_upsert::Result<Vec<Stored<Link>>> {
        let query = Query::of("INSERT INTO link (href, text) VALUES ({href}, {text})")?;
        let rows: Vec<Vec<Param>> = values
            .iter()
            .map(|link| {
                vec![
                    Param::value("href", link.href.as_str()),
                    Param::value("text", link.text.clone()),
                ]
            })
            .collect();

        let ids = self.dao.batch_insert(&query, &rows).await?;
        Ok(ids
            .into_iter()
            .zip(values.iter().cloned())
            .map(|(id, link)| Stored::new(id, link))
            .collect())
    }

    async fn update(&mut self, values: &[Update<Link>]) -> sqlx_upsert::Result<Vec<Stored<Link>>> {
        let query = Query::of("UPDATE link SET text = {text} WHERE id = {id}")?;
        let rows: Vec<Vec<Param>> = values
            .iter()
            .map(|update| {
                vec![
                    Param::value("id", update.id()),
                    Param::value("text", update.value().text.clone()),
                ]
            })
            .collect();

        self.dao.batch_execute(&query, &rows).await?;
        Ok(values.iter().map(Update::stored).collect())
    }
}
