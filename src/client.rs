use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use sqlx::{sqlite::SqliteConnection, Connection};

use crate::{
    config::{DatabaseLocation, LoadOptions},
    database,
    gtfs_jp::{GtfsAgency, GtfsAgencyJp, GtfsStop},
    load_gtfs::{load_gtfs_dir, LoadSummary},
    queries::{self, RouteFare},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Agency {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub president_name: Option<String>,
}

impl Agency {
    fn project(agency: GtfsAgency, extra: Option<GtfsAgencyJp>) -> Self {
        let (zip_number, president_name) = match extra {
            Some(extra) => (extra.agency_zip_number, extra.agency_president_name),
            None => (None, None),
        };
        Agency {
            id: agency.agency_id,
            name: agency.agency_name,
            zip_number,
            president_name,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: String,
    pub name: String,
    /// Trips calling at the stop, without duplicates.
    pub trip_ids: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AgencyDocument {
    pub count: usize,
    pub agencies: Vec<Agency>,
}

impl From<Vec<Agency>> for AgencyDocument {
    fn from(agencies: Vec<Agency>) -> Self {
        AgencyDocument {
            count: agencies.len(),
            agencies,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StopDocument {
    pub count: usize,
    pub stops: Vec<Stop>,
}

impl From<Vec<Stop>> for StopDocument {
    fn from(stops: Vec<Stop>) -> Self {
        StopDocument {
            count: stops.len(),
            stops,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RouteFares {
    pub route_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub fares: Vec<RouteFare>,
}

/// Owns the connection to one GTFS-JP database and answers questions about it.
pub struct GtfsJpClient {
    conn: SqliteConnection,
}

impl GtfsJpClient {
    pub async fn open(location: &DatabaseLocation) -> Result<Self> {
        let conn = database::connect(location).await?;
        Ok(GtfsJpClient { conn })
    }

    /// Replaces the whole content of the database with the feed in `gtfs_dir`.
    ///
    /// Dropping, recreating and loading happen in one transaction, so the previous content
    /// survives a failed load.
    pub async fn reload(&mut self, gtfs_dir: &Path, options: &LoadOptions) -> Result<LoadSummary> {
        let mut tx = self.conn.begin().await?;
        database::drop_all(&mut tx).await?;
        database::create_all(&mut tx).await?;
        let summary = load_gtfs_dir(&mut tx, gtfs_dir, options).await?;
        tx.commit().await?;
        Ok(summary)
    }

    pub async fn find_stop(&mut self, stop_id: &str) -> Result<Option<Stop>> {
        match queries::find_stop_by_id(&mut self.conn, stop_id).await? {
            Some(stop) => Ok(Some(self.project_stop(stop).await?)),
            None => Ok(None),
        }
    }

    pub async fn search_stops(&mut self, word: &str) -> Result<Vec<Stop>> {
        let mut stops = vec![];
        for stop in queries::search_stops_by_name(&mut self.conn, word).await? {
            stops.push(self.project_stop(stop).await?);
        }
        Ok(stops)
    }

    pub async fn list_agencies(&mut self) -> Result<Vec<Agency>> {
        let mut agencies = vec![];
        for agency in queries::all_agencies(&mut self.conn).await? {
            let extra = queries::agency_extra(&mut self.conn, &agency.agency_id).await?;
            agencies.push(Agency::project(agency, extra));
        }
        Ok(agencies)
    }

    pub async fn route_fares(&mut self, route_id: &str) -> Result<Option<RouteFares>> {
        let Some(route) = queries::find_route_by_id(&mut self.conn, route_id).await? else {
            return Ok(None);
        };
        let fares = queries::fare_rules_for_route(&mut self.conn, route_id).await?;
        Ok(Some(RouteFares {
            route_id: route.route_id,
            route_short_name: route.route_short_name,
            route_long_name: route.route_long_name,
            fares,
        }))
    }

    /// Direct access for queries the client doesn't wrap.
    pub fn connection(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    async fn project_stop(&mut self, stop: GtfsStop) -> Result<Stop> {
        let trip_ids = queries::trip_ids_for_stop(&mut self.conn, &stop.stop_id).await?;
        Ok(Stop {
            id: stop.stop_id,
            name: stop.stop_name,
            trip_ids,
        })
    }
}
