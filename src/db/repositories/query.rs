//! Filtered query helpers shared by the repositories
//!
//! Every collection read goes through an access [`Where`] expression. These
//! helpers append the compiled predicate to a `SELECT`, bind its values and
//! run it against whichever driver backs the pool.

use anyhow::{Context, Result};
use sqlx::{mysql::MySqlRow, sqlite::SqliteRow, FromRow, MySql, Sqlite};

use crate::access::Where;
use crate::db::{Backend, DynDatabasePool};
use crate::models::{ListParams, SitemapRecord};

/// Largest number of entries a single sitemap lists
pub const SITEMAP_LIMIT: i64 = 1000;

/// Row type decodable from either driver
pub trait Record:
    for<'r> FromRow<'r, SqliteRow> + for<'r> FromRow<'r, MySqlRow> + Send + Unpin
{
}

impl<T> Record for T where
    T: for<'r> FromRow<'r, SqliteRow> + for<'r> FromRow<'r, MySqlRow> + Send + Unpin
{
}

/// Static description of a table a repository reads from
#[derive(Debug, Clone, Copy)]
pub struct Table {
    pub name: &'static str,
    pub columns: &'static str,
    pub order_by: &'static str,
}

/// Fetch one page of matching rows plus the total match count
pub async fn find_page<T: Record>(
    pool: &DynDatabasePool,
    table: Table,
    filter: &Where,
    params: &ListParams,
) -> Result<(Vec<T>, i64)> {
    let compiled = filter.to_sql();
    let select = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
        table.columns, table.name, compiled.clause, table.order_by
    );
    let count = format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        table.name, compiled.clause
    );

    let result = match pool.backend() {
        Backend::Sqlite(pool) => {
            let rows = crate::bind_values!(sqlx::query_as::<Sqlite, T>(&select), &compiled.binds)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await;
            let total =
                crate::bind_values!(sqlx::query_scalar::<Sqlite, i64>(&count), &compiled.binds)
                    .fetch_one(pool)
                    .await;
            (rows, total)
        }
        Backend::Mysql(pool) => {
            let rows = crate::bind_values!(sqlx::query_as::<MySql, T>(&select), &compiled.binds)
                .bind(params.limit())
                .bind(params.offset())
                .fetch_all(pool)
                .await;
            let total =
                crate::bind_values!(sqlx::query_scalar::<MySql, i64>(&count), &compiled.binds)
                    .fetch_one(pool)
                    .await;
            (rows, total)
        }
    };

    let rows = result
        .0
        .with_context(|| format!("Failed to list {}", table.name))?;
    let total = result
        .1
        .with_context(|| format!("Failed to count {}", table.name))?;

    Ok((rows, total))
}

/// Fetch the first row matching `filter`
pub async fn find_one<T: Record>(
    pool: &DynDatabasePool,
    table: Table,
    filter: &Where,
) -> Result<Option<T>> {
    let compiled = filter.to_sql();
    let sql = format!(
        "SELECT {} FROM {} WHERE {} LIMIT 1",
        table.columns, table.name, compiled.clause
    );

    let row = match pool.backend() {
        Backend::Sqlite(pool) => {
            crate::bind_values!(sqlx::query_as::<Sqlite, T>(&sql), &compiled.binds)
                .fetch_optional(pool)
                .await
        }
        Backend::Mysql(pool) => {
            crate::bind_values!(sqlx::query_as::<MySql, T>(&sql), &compiled.binds)
                .fetch_optional(pool)
                .await
        }
    };

    row.with_context(|| format!("Failed to get row from {}", table.name))
}

/// Fetch a row by id, restricted to rows matching `filter`
pub async fn find_by_id<T: Record>(
    pool: &DynDatabasePool,
    table: Table,
    id: i64,
    filter: &Where,
) -> Result<Option<T>> {
    let filter = Where::equals("id", id).and(filter.clone());
    find_one(pool, table, &filter).await
}

/// Delete every row matching `filter`, returning the number removed
pub async fn delete_where(pool: &DynDatabasePool, table: &str, filter: &Where) -> Result<u64> {
    let compiled = filter.to_sql();
    let sql = format!("DELETE FROM {} WHERE {}", table, compiled.clause);

    let affected = match pool.backend() {
        Backend::Sqlite(pool) => crate::bind_values!(sqlx::query::<Sqlite>(&sql), &compiled.binds)
            .execute(pool)
            .await
            .map(|r| r.rows_affected()),
        Backend::Mysql(pool) => crate::bind_values!(sqlx::query::<MySql>(&sql), &compiled.binds)
            .execute(pool)
            .await
            .map(|r| r.rows_affected()),
    };

    affected.with_context(|| format!("Failed to delete from {}", table))
}

/// Count rows matching `filter`
pub async fn count_where(pool: &DynDatabasePool, table: &str, filter: &Where) -> Result<i64> {
    let compiled = filter.to_sql();
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", table, compiled.clause);

    let count = match pool.backend() {
        Backend::Sqlite(pool) => {
            crate::bind_values!(sqlx::query_scalar::<Sqlite, i64>(&sql), &compiled.binds)
                .fetch_one(pool)
                .await
        }
        Backend::Mysql(pool) => {
            crate::bind_values!(sqlx::query_scalar::<MySql, i64>(&sql), &compiled.binds)
                .fetch_one(pool)
                .await
        }
    };

    count.with_context(|| format!("Failed to count {}", table))
}

/// Slug and last-modified time of up to [`SITEMAP_LIMIT`] rows matching `filter`
pub async fn sitemap_records(
    pool: &DynDatabasePool,
    table: &str,
    filter: &Where,
) -> Result<Vec<SitemapRecord>> {
    let compiled = filter.to_sql();
    let sql = format!(
        "SELECT slug, updated_at FROM {} WHERE {} ORDER BY id LIMIT ?",
        table, compiled.clause
    );

    let rows = match pool.backend() {
        Backend::Sqlite(pool) => {
            crate::bind_values!(sqlx::query_as::<Sqlite, SitemapRecord>(&sql), &compiled.binds)
                .bind(SITEMAP_LIMIT)
                .fetch_all(pool)
                .await
        }
        Backend::Mysql(pool) => {
            crate::bind_values!(sqlx::query_as::<MySql, SitemapRecord>(&sql), &compiled.binds)
                .bind(SITEMAP_LIMIT)
                .fetch_all(pool)
                .await
        }
    };

    rows.with_context(|| format!("Failed to load sitemap records from {}", table))
}
