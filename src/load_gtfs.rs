use std::{path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use sqlx::{sqlite::SqliteConnection, Connection};

use crate::{
    config::LoadOptions,
    csv_source::load_csv_file,
    database::bulk_insert,
    gtfs_jp::*,
    tables::GtfsJpTable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLoad {
    pub table: &'static str,
    pub file_name: &'static str,
    /// `None` when the file is not part of the feed.
    pub rows: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub tables: Vec<TableLoad>,
}

impl LoadSummary {
    pub fn total_rows(&self) -> u64 {
        self.tables.iter().filter_map(|t| t.rows).sum()
    }

    pub fn rows_for(&self, table: &str) -> Option<u64> {
        self.tables
            .iter()
            .find(|t| t.table == table)
            .and_then(|t| t.rows)
    }

    pub fn skipped_files(&self) -> Vec<&'static str> {
        self.tables
            .iter()
            .filter(|t| t.rows.is_none())
            .map(|t| t.file_name)
            .collect()
    }
}

/// Loads every known file of a GTFS-JP feed directory into an already created, empty schema.
///
/// Tables are filled in a fixed order so that referenced rows always exist before the rows
/// that point at them. Everything happens in one transaction: when any file fails to read,
/// decode, convert or insert, nothing is kept.
pub async fn load_gtfs_dir(
    conn: &mut SqliteConnection,
    gtfs_dir: &Path,
    options: &LoadOptions,
) -> Result<LoadSummary> {
    if !gtfs_dir.is_dir() {
        bail!("GTFS directory {:?} does not exist", gtfs_dir);
    }
    log::info!("Loading GTFS-JP feed from {:?}", gtfs_dir);

    let mut tx = conn.begin().await?;
    let tables = vec![
        load_table::<GtfsAgency>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsAgencyJp>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsOfficeJp>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsCalendar>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsCalendarDate>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsRoute>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsRouteJp>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsStop>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsTrip>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsStopTime>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsShape>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsFareAttribute>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsFareRule>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsFeedInfo>(&mut tx, gtfs_dir, options).await?,
        load_table::<GtfsTranslation>(&mut tx, gtfs_dir, options).await?,
    ];
    tx.commit().await?;

    let summary = LoadSummary { tables };
    log::info!(
        "Loaded {} rows into {} tables ({} files not present)",
        summary.total_rows(),
        summary.tables.len() - summary.skipped_files().len(),
        summary.skipped_files().len()
    );
    Ok(summary)
}

/// Reads one feed file into typed records.
pub fn read_records<T: GtfsJpTable>(path: &Path, options: &LoadOptions) -> Result<Vec<T>> {
    let rows = load_csv_file(path, None, options.encoding, options.drop_duplicates)?;
    let mut records = vec![];
    for row in rows {
        let row = row.with_context(|| format!("Failed to parse {:?}", path))?;
        records.push(T::from_csv_row(&row).with_context(|| format!("Invalid record in {:?}", path))?);
    }
    Ok(records)
}

async fn load_table<T: GtfsJpTable>(
    conn: &mut SqliteConnection,
    gtfs_dir: &Path,
    options: &LoadOptions,
) -> Result<TableLoad> {
    let table = T::TABLE;
    let path = gtfs_dir.join(table.file_name);
    if !path.exists() {
        log::debug!("Skipping {}, file not present", table.file_name);
        return Ok(TableLoad {
            table: table.name,
            file_name: table.file_name,
            rows: None,
        });
    }

    let progress = spinner(options.show_progress)?;
    progress.set_message(format!("{} -- Loading", table.file_name));
    let records = read_records::<T>(&path, options)?;

    if records.is_empty() {
        progress.finish_with_message(format!(
            "⚠ {} -- Skip to insert because there are no records.",
            table.file_name
        ));
        return Ok(TableLoad {
            table: table.name,
            file_name: table.file_name,
            rows: Some(0),
        });
    }

    let message = format!(
        "{} -- Insert {} records to `{}`",
        table.file_name,
        records.len(),
        table.name
    );
    progress.set_message(message.clone());
    let inserted = bulk_insert(conn, &records).await?;
    progress.finish_with_message(format!("✔ {}", message));

    Ok(TableLoad {
        table: table.name,
        file_name: table.file_name,
        rows: Some(inserted),
    })
}

fn spinner(visible: bool) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let progress = ProgressBar::new_spinner()
        .with_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    progress.enable_steady_tick(Duration::from_millis(100));
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DatabaseLocation, database};

    fn quiet() -> LoadOptions {
        LoadOptions {
            show_progress: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_directory_fails() {
        let mut conn = database::connect(&DatabaseLocation::InMemory).await.unwrap();
        database::create_all(&mut conn).await.unwrap();
        let err = load_gtfs_dir(&mut conn, Path::new("/does/not/exist"), &quiet())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn header_only_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("agency.txt"), "agency_id,agency_name\n").unwrap();

        let mut conn = database::connect(&DatabaseLocation::InMemory).await.unwrap();
        database::create_all(&mut conn).await.unwrap();
        let summary = load_gtfs_dir(&mut conn, dir.path(), &quiet()).await.unwrap();

        assert_eq!(summary.rows_for("agency"), Some(0));
        assert_eq!(summary.total_rows(), 0);
        assert_eq!(summary.skipped_files().len(), 14);
    }

    #[test]
    fn records_name_the_file_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stops.txt");
        std::fs::write(&path, "stop_id,stop_name,stop_lat,stop_lon\nS1,,35.0,139.0\n").unwrap();

        let err = read_records::<GtfsStop>(&path, &quiet()).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("stops.txt"));
        assert!(chain.contains("line 2: missing required field `stop_name`"));
    }
}
