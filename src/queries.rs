//! Read accessors over a loaded database. Every call queries the store again, nothing is cached.

use anyhow::Result;
use sqlx::sqlite::SqliteConnection;

use crate::gtfs_jp::*;

pub use crate::database::count_rows;

/// A fare rule of a route, with its price and readable stop names.
#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct RouteFare {
    pub fare_id: String,
    pub origin_id: Option<String>,
    pub origin_name: Option<String>,
    pub destination_id: Option<String>,
    pub destination_name: Option<String>,
    pub price: Option<i64>,
    pub currency_type: Option<String>,
}

pub async fn all_agencies(conn: &mut SqliteConnection) -> Result<Vec<GtfsAgency>> {
    let agencies = sqlx::query_as("SELECT * FROM agency ORDER BY agency_id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(agencies)
}

pub async fn agency_extra(
    conn: &mut SqliteConnection,
    agency_id: &str,
) -> Result<Option<GtfsAgencyJp>> {
    let extra = sqlx::query_as("SELECT * FROM agency_jp WHERE agency_id = ?")
        .bind(agency_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(extra)
}

pub async fn find_stop_by_id(conn: &mut SqliteConnection, stop_id: &str) -> Result<Option<GtfsStop>> {
    let stop = sqlx::query_as("SELECT * FROM stops WHERE stop_id = ?")
        .bind(stop_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(stop)
}

/// Stops whose name contains `word`. The match is literal and case-sensitive.
pub async fn search_stops_by_name(conn: &mut SqliteConnection, word: &str) -> Result<Vec<GtfsStop>> {
    let stops = sqlx::query_as("SELECT * FROM stops WHERE instr(stop_name, ?) > 0 ORDER BY stop_id")
        .bind(word)
        .fetch_all(&mut *conn)
        .await?;
    Ok(stops)
}

pub async fn stop_times_for_stop(
    conn: &mut SqliteConnection,
    stop_id: &str,
) -> Result<Vec<GtfsStopTime>> {
    let stop_times = sqlx::query_as(
        "SELECT * FROM stop_times WHERE stop_id = ? ORDER BY trip_id, stop_sequence",
    )
    .bind(stop_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(stop_times)
}

/// Distinct ids of the trips that call at a stop, sorted.
pub async fn trip_ids_for_stop(conn: &mut SqliteConnection, stop_id: &str) -> Result<Vec<String>> {
    let trip_ids = sqlx::query_scalar(
        "SELECT DISTINCT trip_id FROM stop_times WHERE stop_id = ? ORDER BY trip_id",
    )
    .bind(stop_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(trip_ids)
}

pub async fn find_route_by_id(
    conn: &mut SqliteConnection,
    route_id: &str,
) -> Result<Option<GtfsRoute>> {
    let route = sqlx::query_as("SELECT * FROM routes WHERE route_id = ?")
        .bind(route_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(route)
}

pub async fn routes_for_agency(
    conn: &mut SqliteConnection,
    agency_id: &str,
) -> Result<Vec<GtfsRoute>> {
    let routes = sqlx::query_as("SELECT * FROM routes WHERE agency_id = ? ORDER BY route_id")
        .bind(agency_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(routes)
}

pub async fn all_trips(conn: &mut SqliteConnection) -> Result<Vec<GtfsTrip>> {
    let trips = sqlx::query_as("SELECT * FROM trips ORDER BY trip_id")
        .fetch_all(&mut *conn)
        .await?;
    Ok(trips)
}

/// Trips ordered by id, skipping `offset` and returning at most `limit`.
pub async fn trips_page(
    conn: &mut SqliteConnection,
    offset: u32,
    limit: u32,
) -> Result<Vec<GtfsTrip>> {
    let trips = sqlx::query_as("SELECT * FROM trips ORDER BY trip_id LIMIT ? OFFSET ?")
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *conn)
        .await?;
    Ok(trips)
}

/// Fare rules of a route. The price comes from the fare attributes with the same fare id;
/// rules without matching attributes still show up, with an empty price.
pub async fn fare_rules_for_route(
    conn: &mut SqliteConnection,
    route_id: &str,
) -> Result<Vec<RouteFare>> {
    let fares = sqlx::query_as(
        "SELECT r.fare_id, r.origin_id, o.stop_name AS origin_name,
                r.destination_id, d.stop_name AS destination_name,
                a.price, a.currency_type
         FROM fare_rules r
         LEFT JOIN fare_attributes a ON a.fare_id = r.fare_id
         LEFT JOIN stops o ON o.stop_id = r.origin_id
         LEFT JOIN stops d ON d.stop_id = r.destination_id
         WHERE r.route_id = ?
         ORDER BY r.origin_id, r.destination_id, r.fare_id",
    )
    .bind(route_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(fares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DatabaseLocation, database};

    async fn seeded() -> SqliteConnection {
        let mut conn = database::connect(&DatabaseLocation::InMemory).await.unwrap();
        database::create_all(&mut conn).await.unwrap();
        for sql in [
            "INSERT INTO agency (agency_id, agency_name, agency_url, agency_timezone)
             VALUES ('A1', 'Toei Bus', 'http://example.com', 'Asia/Tokyo')",
            "INSERT INTO calendar VALUES ('weekday', 1, 1, 1, 1, 1, 0, 0, '20240101', '20241231')",
            "INSERT INTO routes (route_id, agency_id, route_short_name, route_type)
             VALUES ('R1', 'A1', 'Tou 01', 3)",
            "INSERT INTO stops (stop_id, stop_name, stop_lat, stop_lon) VALUES
             ('S1', '東京駅', '35.68', '139.76'),
             ('S2', '銀座四丁目', '35.67', '139.76'),
             ('S3', '新橋駅前', '35.66', '139.75'),
             ('S4', '100%_park', '35.65', '139.74')",
            "INSERT INTO trips (route_id, service_id, trip_id) VALUES
             ('R1', 'weekday', 'T2'), ('R1', 'weekday', 'T1'), ('R1', 'weekday', 'T3')",
            "INSERT INTO stop_times (trip_id, arrival_time, departure_time, stop_id, stop_sequence)
             VALUES ('T1', '07:00:00', '07:00:00', 'S1', 1),
                    ('T1', '07:10:00', '07:10:00', 'S2', 2),
                    ('T2', '08:00:00', '08:00:00', 'S1', 1),
                    ('T2', '25:10:00', '25:10:00', 'S1', 2)",
            "INSERT INTO fare_attributes (fare_id, price, currency_type, payment_method, transfers)
             VALUES ('F210', 210, 'JPY', 0, '')",
            "INSERT INTO fare_rules (fare_id, route_id, origin_id, destination_id)
             VALUES ('F210', 'R1', 'S1', 'S2'), ('F999', 'R1', 'S2', 'S3')",
        ] {
            sqlx::query(sql).execute(&mut conn).await.unwrap();
        }
        conn
    }

    #[tokio::test]
    async fn lookups_by_id() {
        let mut conn = seeded().await;
        let stop = find_stop_by_id(&mut conn, "S1").await.unwrap().unwrap();
        assert_eq!(stop.stop_name, "東京駅");
        assert!(find_stop_by_id(&mut conn, "S9").await.unwrap().is_none());

        let route = find_route_by_id(&mut conn, "R1").await.unwrap().unwrap();
        assert_eq!(route.route_short_name.as_deref(), Some("Tou 01"));
        assert!(find_route_by_id(&mut conn, "R9").await.unwrap().is_none());
        assert_eq!(routes_for_agency(&mut conn, "A1").await.unwrap().len(), 1);
        assert!(agency_extra(&mut conn, "A1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_anywhere_in_the_name() {
        let mut conn = seeded().await;
        let ids: Vec<String> = search_stops_by_name(&mut conn, "駅")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.stop_id)
            .collect();
        assert_eq!(ids, vec!["S1", "S3"]);
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let mut conn = seeded().await;
        assert_eq!(search_stops_by_name(&mut conn, "_").await.unwrap().len(), 1);
        assert_eq!(search_stops_by_name(&mut conn, "%_").await.unwrap().len(), 1);
        assert!(search_stops_by_name(&mut conn, "%駅").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn trips_through_a_stop() {
        let mut conn = seeded().await;
        assert_eq!(trip_ids_for_stop(&mut conn, "S1").await.unwrap(), vec!["T1", "T2"]);
        assert!(trip_ids_for_stop(&mut conn, "S3").await.unwrap().is_empty());

        let stop_times = stop_times_for_stop(&mut conn, "S1").await.unwrap();
        assert_eq!(stop_times.len(), 3);
        assert_eq!(stop_times[2].arrival_time, "25:10:00");
    }

    #[tokio::test]
    async fn trips_are_paginated_by_id() {
        let mut conn = seeded().await;
        let ids = |trips: Vec<GtfsTrip>| trips.into_iter().map(|t| t.trip_id).collect::<Vec<_>>();
        assert_eq!(ids(all_trips(&mut conn).await.unwrap()), vec!["T1", "T2", "T3"]);
        assert_eq!(ids(trips_page(&mut conn, 1, 1).await.unwrap()), vec!["T2"]);
        assert_eq!(ids(trips_page(&mut conn, 2, 10).await.unwrap()), vec!["T3"]);
        assert!(trips_page(&mut conn, 5, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn fares_of_a_route() {
        let mut conn = seeded().await;
        let fares = fare_rules_for_route(&mut conn, "R1").await.unwrap();
        assert_eq!(fares.len(), 2);
        assert_eq!(fares[0].origin_name.as_deref(), Some("東京駅"));
        assert_eq!(fares[0].destination_name.as_deref(), Some("銀座四丁目"));
        assert_eq!(fares[0].price, Some(210));
        assert_eq!(fares[1].fare_id, "F999");
        assert_eq!(fares[1].price, None);
        assert!(fare_rules_for_route(&mut conn, "R9").await.unwrap().is_empty());
    }
}
