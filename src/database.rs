use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteConnection},
    Connection, QueryBuilder, Sqlite,
};

use crate::{
    config::DatabaseLocation,
    tables::{GtfsJpTable, LOAD_ORDER},
};

/// SQLite's default limit on bound parameters per statement.
const MAX_BIND_PARAMETERS: usize = 32766;
const MAX_ROWS_PER_INSERT: usize = 500;

/// Lookup paths used by the query layer, and the fare rule key with blank references
/// compared as equal.
const INDEXES: [&str; 4] = [
    "CREATE UNIQUE INDEX fare_rules_key ON fare_rules \
     (fare_id, COALESCE(route_id, ''), COALESCE(origin_id, ''), COALESCE(destination_id, ''))",
    "CREATE INDEX stop_times_stop_id ON stop_times (stop_id)",
    "CREATE INDEX trips_route_id ON trips (route_id)",
    "CREATE INDEX fare_rules_route_id ON fare_rules (route_id)",
];

pub async fn connect(location: &DatabaseLocation) -> Result<SqliteConnection> {
    let options = match location {
        DatabaseLocation::File(path) => SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true),
        DatabaseLocation::InMemory => SqliteConnectOptions::from_str("sqlite::memory:")?,
    }
    .foreign_keys(true);

    let conn = SqliteConnection::connect_with(&options)
        .await
        .with_context(|| format!("Failed to open database {:?}", location))?;
    Ok(conn)
}

/// Drops every known table. Tables that don't exist are ignored.
pub async fn drop_all(conn: &mut SqliteConnection) -> Result<()> {
    for table in LOAD_ORDER.iter().rev() {
        sqlx::query(&table.drop_sql())
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to drop table `{}`", table.name))?;
    }
    Ok(())
}

pub async fn create_all(conn: &mut SqliteConnection) -> Result<()> {
    for table in LOAD_ORDER {
        sqlx::query(&table.create_sql())
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to create table `{}`", table.name))?;
    }
    for index in INDEXES {
        sqlx::query(index).execute(&mut *conn).await?;
    }
    Ok(())
}

/// Number of records that fit into one `INSERT` for a table with `column_count` columns.
fn rows_per_insert(column_count: usize) -> usize {
    (MAX_BIND_PARAMETERS / column_count.max(1)).clamp(1, MAX_ROWS_PER_INSERT)
}

/// Inserts all records with multi-row `INSERT` statements. Returns the number of inserted rows.
pub async fn bulk_insert<T: GtfsJpTable>(conn: &mut SqliteConnection, records: &[T]) -> Result<u64> {
    let table = T::TABLE;
    let mut inserted = 0;
    for chunk in records.chunks(rows_per_insert(table.columns.len())) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "INSERT INTO {} ({}) ",
            table.name,
            table.column_names().join(", ")
        ));
        builder.push_values(chunk, |mut row, record| record.push_binds(&mut row));
        let result = builder
            .build()
            .persistent(false)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to insert into `{}`", table.name))?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

pub async fn count_rows(conn: &mut SqliteConnection, table_name: &str) -> Result<i64> {
    let table = LOAD_ORDER
        .iter()
        .find(|table| table.name == table_name)
        .with_context(|| format!("Unknown table `{}`", table_name))?;
    let count = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.name))
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}
