//! Row types for the GTFS-JP tables.
//!
//! Field names follow the GTFS-JP format reference one to one, so every struct can be
//! read back with `SELECT *` and serialized without renaming.

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsAgency {
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: Option<String>,
    pub agency_phone: Option<String>,
    pub agency_fare_url: Option<String>,
    pub agency_email: Option<String>,
}

/// Japan specific agency information (`agency_jp.txt`).
#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsAgencyJp {
    pub agency_id: String,
    pub agency_official_name: Option<String>,
    pub agency_zip_number: Option<String>,
    pub agency_address: Option<String>,
    pub agency_president_pos: Option<String>,
    pub agency_president_name: Option<String>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsStop {
    pub stop_id: String,
    pub stop_code: Option<String>,
    pub stop_name: String,
    pub stop_desc: Option<String>,
    // Kept as text so the stored value is exactly what the feed contains.
    pub stop_lat: String,
    pub stop_lon: String,
    pub zone_id: Option<String>,
    pub stop_url: Option<String>,
    /// 0: pole, 1: stop
    pub location_type: Option<i64>,
    pub parent_station: Option<String>,
    pub stop_timezone: Option<String>,
    pub wheelchair_boarding: Option<i64>,
    pub platform_code: Option<String>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsRoute {
    pub route_id: String,
    pub agency_id: String,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_desc: Option<String>,
    pub route_type: i64,
    pub route_url: Option<String>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub jp_parent_route_id: Option<String>,
}

/// Japan specific route information (`routes_jp.txt`). The table has no natural key, so
/// every column is part of the primary key and blank cells are stored as empty strings.
#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsRouteJp {
    pub route_id: String,
    pub route_update_date: String,
    pub origin_stop: String,
    pub via_stop: String,
    pub destination_stop: String,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsTrip {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub trip_headsign: Option<String>,
    pub trip_short_name: Option<String>,
    pub direction_id: Option<i64>,
    pub block_id: Option<String>,
    pub shape_id: Option<String>,
    pub wheelchair_accessible: Option<i64>,
    pub bikes_allowed: Option<i64>,
    pub jp_trip_desc: Option<String>,
    pub jp_trip_desc_symbol: Option<String>,
    pub jp_office_id: Option<String>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsOfficeJp {
    pub office_id: String,
    pub office_name: String,
    pub office_url: Option<String>,
    pub office_phone: Option<String>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsStopTime {
    pub trip_id: String,
    // HH:MM:SS, hours may exceed 24.
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: i64,
    pub stop_headsign: Option<String>,
    pub pickup_type: Option<i64>,
    pub drop_off_type: Option<i64>,
    pub shape_dist_traveled: Option<f64>,
    pub timepoint: Option<i64>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsCalendar {
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: String,
    pub end_date: String,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsCalendarDate {
    pub service_id: String,
    pub date: String,
    /// 1: service added, 2: service removed
    pub exception_type: i64,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsFareAttribute {
    pub fare_id: String,
    pub price: i64,
    pub currency_type: String,
    pub payment_method: i64,
    /// Blank means an unlimited number of transfers.
    pub transfers: String,
    pub transfer_duration: Option<i64>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsFareRule {
    pub fare_id: String,
    pub route_id: Option<String>,
    pub origin_id: Option<String>,
    pub destination_id: Option<String>,
    pub contains_id: Option<String>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsShape {
    pub shape_id: String,
    pub shape_pt_lat: String,
    pub shape_pt_lon: String,
    pub shape_pt_sequence: i64,
    pub shape_dist_traveled: Option<f64>,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsFeedInfo {
    pub feed_publisher_name: String,
    pub feed_publisher_url: String,
    pub feed_lang: String,
    pub feed_start_date: String,
    pub feed_end_date: String,
    pub feed_version: String,
}

#[derive(sqlx::FromRow, serde::Serialize, Debug, Clone, PartialEq)]
pub struct GtfsTranslation {
    pub trans_id: String,
    pub lang: String,
    pub translation: String,
}
