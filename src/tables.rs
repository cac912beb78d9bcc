//! Table descriptors for the GTFS-JP schema and the conversion of feed rows into records.

use anyhow::Result;
use sqlx::{query_builder::Separated, sqlite::SqliteRow, Sqlite};

use crate::{csv_source::CsvRow, gtfs_jp::*};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    fn sql(&self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub primary_key: bool,
    pub references: Option<ForeignKey>,
}

impl Column {
    const fn new(name: &'static str, column_type: ColumnType) -> Self {
        Column {
            name,
            column_type,
            not_null: false,
            primary_key: false,
            references: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Column::new(name, ColumnType::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Column::new(name, ColumnType::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Column::new(name, ColumnType::Real)
    }

    pub const fn not_null(self) -> Self {
        Column {
            not_null: true,
            ..self
        }
    }

    pub const fn primary_key(self) -> Self {
        Column {
            primary_key: true,
            ..self
        }
    }

    pub const fn references(self, table: &'static str, column: &'static str) -> Self {
        Column {
            references: Some(ForeignKey { table, column }),
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    /// Feed file the table is loaded from.
    pub file_name: &'static str,
    pub columns: &'static [Column],
}

impl TableDef {
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                let mut definition = format!("{} {}", column.name, column.column_type.sql());
                if column.not_null {
                    definition.push_str(" NOT NULL");
                }
                definition
            })
            .collect();

        let primary_key: Vec<&str> = self
            .columns
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name)
            .collect();
        if !primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", primary_key.join(", ")));
        }

        for column in self.columns {
            if let Some(foreign_key) = column.references {
                parts.push(format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    column.name, foreign_key.table, foreign_key.column
                ));
            }
        }

        format!("CREATE TABLE {} (\n    {}\n)", self.name, parts.join(",\n    "))
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|column| column.name).collect()
    }
}

/// A record type that maps to one GTFS-JP table.
pub trait GtfsJpTable: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin + Sized {
    const TABLE: &'static TableDef;

    fn from_csv_row(row: &CsvRow) -> Result<Self>;

    /// Binds the values in the order of `TABLE.columns`.
    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>);
}

pub const AGENCY: TableDef = TableDef {
    name: "agency",
    file_name: "agency.txt",
    columns: &[
        Column::text("agency_id").primary_key(),
        Column::text("agency_name").not_null(),
        Column::text("agency_url").not_null(),
        Column::text("agency_timezone").not_null(),
        Column::text("agency_lang"),
        Column::text("agency_phone"),
        Column::text("agency_fare_url"),
        Column::text("agency_email"),
    ],
};

pub const AGENCY_JP: TableDef = TableDef {
    name: "agency_jp",
    file_name: "agency_jp.txt",
    columns: &[
        Column::text("agency_id")
            .primary_key()
            .references("agency", "agency_id"),
        Column::text("agency_official_name"),
        Column::text("agency_zip_number"),
        Column::text("agency_address"),
        Column::text("agency_president_pos"),
        Column::text("agency_president_name"),
    ],
};

pub const OFFICE_JP: TableDef = TableDef {
    name: "office_jp",
    file_name: "office_jp.txt",
    columns: &[
        Column::text("office_id").primary_key(),
        Column::text("office_name").not_null(),
        Column::text("office_url"),
        Column::text("office_phone"),
    ],
};

pub const CALENDAR: TableDef = TableDef {
    name: "calendar",
    file_name: "calendar.txt",
    columns: &[
        Column::text("service_id").primary_key(),
        Column::integer("monday").not_null(),
        Column::integer("tuesday").not_null(),
        Column::integer("wednesday").not_null(),
        Column::integer("thursday").not_null(),
        Column::integer("friday").not_null(),
        Column::integer("saturday").not_null(),
        Column::integer("sunday").not_null(),
        Column::text("start_date").not_null(),
        Column::text("end_date").not_null(),
    ],
};

pub const CALENDAR_DATES: TableDef = TableDef {
    name: "calendar_dates",
    file_name: "calendar_dates.txt",
    columns: &[
        Column::text("service_id")
            .primary_key()
            .references("calendar", "service_id"),
        Column::text("date").primary_key(),
        Column::integer("exception_type").not_null(),
    ],
};

pub const ROUTES: TableDef = TableDef {
    name: "routes",
    file_name: "routes.txt",
    columns: &[
        Column::text("route_id").primary_key(),
        Column::text("agency_id")
            .not_null()
            .references("agency", "agency_id"),
        Column::text("route_short_name"),
        Column::text("route_long_name"),
        Column::text("route_desc"),
        Column::integer("route_type").not_null(),
        Column::text("route_url"),
        Column::text("route_color"),
        Column::text("route_text_color"),
        Column::text("jp_parent_route_id"),
    ],
};

pub const ROUTES_JP: TableDef = TableDef {
    name: "routes_jp",
    file_name: "routes_jp.txt",
    columns: &[
        Column::text("route_id")
            .primary_key()
            .references("routes", "route_id"),
        Column::text("route_update_date").not_null().primary_key(),
        Column::text("origin_stop").not_null().primary_key(),
        Column::text("via_stop").not_null().primary_key(),
        Column::text("destination_stop").not_null().primary_key(),
    ],
};

pub const STOPS: TableDef = TableDef {
    name: "stops",
    file_name: "stops.txt",
    columns: &[
        Column::text("stop_id").primary_key(),
        Column::text("stop_code"),
        Column::text("stop_name").not_null(),
        Column::text("stop_desc"),
        Column::text("stop_lat").not_null(),
        Column::text("stop_lon").not_null(),
        Column::text("zone_id"),
        Column::text("stop_url"),
        Column::integer("location_type"),
        // Points at another stop, but stations may come after their poles in the file.
        Column::text("parent_station"),
        Column::text("stop_timezone"),
        Column::integer("wheelchair_boarding"),
        Column::text("platform_code"),
    ],
};

pub const TRIPS: TableDef = TableDef {
    name: "trips",
    file_name: "trips.txt",
    columns: &[
        Column::text("route_id")
            .not_null()
            .references("routes", "route_id"),
        Column::text("service_id")
            .not_null()
            .references("calendar", "service_id"),
        Column::text("trip_id").primary_key(),
        Column::text("trip_headsign"),
        Column::text("trip_short_name"),
        Column::integer("direction_id"),
        Column::text("block_id"),
        Column::text("shape_id"),
        Column::integer("wheelchair_accessible"),
        Column::integer("bikes_allowed"),
        Column::text("jp_trip_desc"),
        Column::text("jp_trip_desc_symbol"),
        Column::text("jp_office_id").references("office_jp", "office_id"),
    ],
};

pub const STOP_TIMES: TableDef = TableDef {
    name: "stop_times",
    file_name: "stop_times.txt",
    columns: &[
        Column::text("trip_id")
            .primary_key()
            .references("trips", "trip_id"),
        Column::text("arrival_time").not_null(),
        Column::text("departure_time").not_null(),
        Column::text("stop_id")
            .not_null()
            .references("stops", "stop_id"),
        Column::integer("stop_sequence").primary_key(),
        Column::text("stop_headsign"),
        Column::integer("pickup_type"),
        Column::integer("drop_off_type"),
        Column::real("shape_dist_traveled"),
        Column::integer("timepoint"),
    ],
};

/// `shape_id` relates to `trips.shape_id`, which is not unique, so SQLite can't enforce it.
pub const SHAPES: TableDef = TableDef {
    name: "shapes",
    file_name: "shapes.txt",
    columns: &[
        Column::text("shape_id").primary_key(),
        Column::text("shape_pt_lat").not_null(),
        Column::text("shape_pt_lon").not_null(),
        Column::integer("shape_pt_sequence").primary_key(),
        Column::real("shape_dist_traveled"),
    ],
};

pub const FARE_ATTRIBUTES: TableDef = TableDef {
    name: "fare_attributes",
    file_name: "fare_attributes.txt",
    columns: &[
        Column::text("fare_id").primary_key(),
        Column::integer("price").not_null(),
        Column::text("currency_type").primary_key(),
        Column::integer("payment_method").not_null(),
        Column::text("transfers").not_null(),
        Column::integer("transfer_duration"),
    ],
};

/// `fare_id` relates to `fare_attributes.fare_id`, which is only unique together with the
/// currency, so it is not declared as a constraint either.
///
/// Blank references stay `NULL` so that they skip the foreign key checks. SQLite treats `NULL`
/// key parts as distinct, so uniqueness is enforced by an index over the blank-as-empty key
/// created next to the tables.
pub const FARE_RULES: TableDef = TableDef {
    name: "fare_rules",
    file_name: "fare_rules.txt",
    columns: &[
        Column::text("fare_id").primary_key(),
        Column::text("route_id")
            .primary_key()
            .references("routes", "route_id"),
        Column::text("origin_id")
            .primary_key()
            .references("stops", "stop_id"),
        Column::text("destination_id")
            .primary_key()
            .references("stops", "stop_id"),
        Column::text("contains_id"),
    ],
};

pub const FEED_INFO: TableDef = TableDef {
    name: "feed_info",
    file_name: "feed_info.txt",
    columns: &[
        Column::text("feed_publisher_name").not_null().primary_key(),
        Column::text("feed_publisher_url").not_null().primary_key(),
        Column::text("feed_lang").not_null().primary_key(),
        Column::text("feed_start_date").not_null().primary_key(),
        Column::text("feed_end_date").not_null().primary_key(),
        Column::text("feed_version").not_null().primary_key(),
    ],
};

pub const TRANSLATIONS: TableDef = TableDef {
    name: "translations",
    file_name: "translations.txt",
    columns: &[
        Column::text("trans_id").primary_key(),
        Column::text("lang").primary_key(),
        Column::text("translation").not_null(),
    ],
};

/// Parents come before the tables that reference them. Dropping goes in reverse.
pub const LOAD_ORDER: [&TableDef; 15] = [
    &AGENCY,
    &AGENCY_JP,
    &OFFICE_JP,
    &CALENDAR,
    &CALENDAR_DATES,
    &ROUTES,
    &ROUTES_JP,
    &STOPS,
    &TRIPS,
    &STOP_TIMES,
    &SHAPES,
    &FARE_ATTRIBUTES,
    &FARE_RULES,
    &FEED_INFO,
    &TRANSLATIONS,
];

impl GtfsJpTable for GtfsAgency {
    const TABLE: &'static TableDef = &AGENCY;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsAgency {
            agency_id: row.required("agency_id")?,
            agency_name: row.required("agency_name")?,
            agency_url: row.required("agency_url")?,
            agency_timezone: row.required("agency_timezone")?,
            agency_lang: row.optional("agency_lang"),
            agency_phone: row.optional("agency_phone"),
            agency_fare_url: row.optional("agency_fare_url"),
            agency_email: row.optional("agency_email"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.agency_id.clone())
            .push_bind(self.agency_name.clone())
            .push_bind(self.agency_url.clone())
            .push_bind(self.agency_timezone.clone())
            .push_bind(self.agency_lang.clone())
            .push_bind(self.agency_phone.clone())
            .push_bind(self.agency_fare_url.clone())
            .push_bind(self.agency_email.clone());
    }
}

impl GtfsJpTable for GtfsAgencyJp {
    const TABLE: &'static TableDef = &AGENCY_JP;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsAgencyJp {
            agency_id: row.required("agency_id")?,
            agency_official_name: row.optional("agency_official_name"),
            agency_zip_number: row.optional("agency_zip_number"),
            agency_address: row.optional("agency_address"),
            agency_president_pos: row.optional("agency_president_pos"),
            agency_president_name: row.optional("agency_president_name"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.agency_id.clone())
            .push_bind(self.agency_official_name.clone())
            .push_bind(self.agency_zip_number.clone())
            .push_bind(self.agency_address.clone())
            .push_bind(self.agency_president_pos.clone())
            .push_bind(self.agency_president_name.clone());
    }
}

impl GtfsJpTable for GtfsOfficeJp {
    const TABLE: &'static TableDef = &OFFICE_JP;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsOfficeJp {
            office_id: row.required("office_id")?,
            office_name: row.required("office_name")?,
            office_url: row.optional("office_url"),
            office_phone: row.optional("office_phone"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.office_id.clone())
            .push_bind(self.office_name.clone())
            .push_bind(self.office_url.clone())
            .push_bind(self.office_phone.clone());
    }
}

impl GtfsJpTable for GtfsCalendar {
    const TABLE: &'static TableDef = &CALENDAR;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsCalendar {
            service_id: row.required("service_id")?,
            monday: row.flag("monday")?,
            tuesday: row.flag("tuesday")?,
            wednesday: row.flag("wednesday")?,
            thursday: row.flag("thursday")?,
            friday: row.flag("friday")?,
            saturday: row.flag("saturday")?,
            sunday: row.flag("sunday")?,
            start_date: row.required("start_date")?,
            end_date: row.required("end_date")?,
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.service_id.clone())
            .push_bind(self.monday)
            .push_bind(self.tuesday)
            .push_bind(self.wednesday)
            .push_bind(self.thursday)
            .push_bind(self.friday)
            .push_bind(self.saturday)
            .push_bind(self.sunday)
            .push_bind(self.start_date.clone())
            .push_bind(self.end_date.clone());
    }
}

impl GtfsJpTable for GtfsCalendarDate {
    const TABLE: &'static TableDef = &CALENDAR_DATES;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsCalendarDate {
            service_id: row.required("service_id")?,
            date: row.required("date")?,
            exception_type: row.integer("exception_type")?,
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.service_id.clone())
            .push_bind(self.date.clone())
            .push_bind(self.exception_type);
    }
}

impl GtfsJpTable for GtfsRoute {
    const TABLE: &'static TableDef = &ROUTES;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsRoute {
            route_id: row.required("route_id")?,
            agency_id: row.required("agency_id")?,
            route_short_name: row.optional("route_short_name"),
            route_long_name: row.optional("route_long_name"),
            route_desc: row.optional("route_desc"),
            route_type: row.integer("route_type")?,
            route_url: row.optional("route_url"),
            route_color: row.optional("route_color"),
            route_text_color: row.optional("route_text_color"),
            jp_parent_route_id: row.optional("jp_parent_route_id"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.route_id.clone())
            .push_bind(self.agency_id.clone())
            .push_bind(self.route_short_name.clone())
            .push_bind(self.route_long_name.clone())
            .push_bind(self.route_desc.clone())
            .push_bind(self.route_type)
            .push_bind(self.route_url.clone())
            .push_bind(self.route_color.clone())
            .push_bind(self.route_text_color.clone())
            .push_bind(self.jp_parent_route_id.clone());
    }
}

impl GtfsJpTable for GtfsRouteJp {
    const TABLE: &'static TableDef = &ROUTES_JP;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsRouteJp {
            route_id: row.required("route_id")?,
            route_update_date: row.key("route_update_date"),
            origin_stop: row.key("origin_stop"),
            via_stop: row.key("via_stop"),
            destination_stop: row.key("destination_stop"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.route_id.clone())
            .push_bind(self.route_update_date.clone())
            .push_bind(self.origin_stop.clone())
            .push_bind(self.via_stop.clone())
            .push_bind(self.destination_stop.clone());
    }
}

impl GtfsJpTable for GtfsStop {
    const TABLE: &'static TableDef = &STOPS;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsStop {
            stop_id: row.required("stop_id")?,
            stop_code: row.optional("stop_code"),
            stop_name: row.required("stop_name")?,
            stop_desc: row.optional("stop_desc"),
            stop_lat: row.required("stop_lat")?,
            stop_lon: row.required("stop_lon")?,
            zone_id: row.optional("zone_id"),
            stop_url: row.optional("stop_url"),
            location_type: row.optional_integer("location_type")?,
            parent_station: row.optional("parent_station"),
            stop_timezone: row.optional("stop_timezone"),
            wheelchair_boarding: row.optional_integer("wheelchair_boarding")?,
            platform_code: row.optional("platform_code"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.stop_id.clone())
            .push_bind(self.stop_code.clone())
            .push_bind(self.stop_name.clone())
            .push_bind(self.stop_desc.clone())
            .push_bind(self.stop_lat.clone())
            .push_bind(self.stop_lon.clone())
            .push_bind(self.zone_id.clone())
            .push_bind(self.stop_url.clone())
            .push_bind(self.location_type)
            .push_bind(self.parent_station.clone())
            .push_bind(self.stop_timezone.clone())
            .push_bind(self.wheelchair_boarding)
            .push_bind(self.platform_code.clone());
    }
}

impl GtfsJpTable for GtfsTrip {
    const TABLE: &'static TableDef = &TRIPS;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsTrip {
            route_id: row.required("route_id")?,
            service_id: row.required("service_id")?,
            trip_id: row.required("trip_id")?,
            trip_headsign: row.optional("trip_headsign"),
            trip_short_name: row.optional("trip_short_name"),
            direction_id: row.optional_integer("direction_id")?,
            block_id: row.optional("block_id"),
            shape_id: row.optional("shape_id"),
            wheelchair_accessible: row.optional_integer("wheelchair_accessible")?,
            bikes_allowed: row.optional_integer("bikes_allowed")?,
            jp_trip_desc: row.optional("jp_trip_desc"),
            jp_trip_desc_symbol: row.optional("jp_trip_desc_symbol"),
            jp_office_id: row.optional("jp_office_id"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.route_id.clone())
            .push_bind(self.service_id.clone())
            .push_bind(self.trip_id.clone())
            .push_bind(self.trip_headsign.clone())
            .push_bind(self.trip_short_name.clone())
            .push_bind(self.direction_id)
            .push_bind(self.block_id.clone())
            .push_bind(self.shape_id.clone())
            .push_bind(self.wheelchair_accessible)
            .push_bind(self.bikes_allowed)
            .push_bind(self.jp_trip_desc.clone())
            .push_bind(self.jp_trip_desc_symbol.clone())
            .push_bind(self.jp_office_id.clone());
    }
}

impl GtfsJpTable for GtfsStopTime {
    const TABLE: &'static TableDef = &STOP_TIMES;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsStopTime {
            trip_id: row.required("trip_id")?,
            arrival_time: row.required("arrival_time")?,
            departure_time: row.required("departure_time")?,
            stop_id: row.required("stop_id")?,
            stop_sequence: row.integer("stop_sequence")?,
            stop_headsign: row.optional("stop_headsign"),
            pickup_type: row.optional_integer("pickup_type")?,
            drop_off_type: row.optional_integer("drop_off_type")?,
            shape_dist_traveled: row.optional_real("shape_dist_traveled")?,
            timepoint: row.optional_integer("timepoint")?,
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.trip_id.clone())
            .push_bind(self.arrival_time.clone())
            .push_bind(self.departure_time.clone())
            .push_bind(self.stop_id.clone())
            .push_bind(self.stop_sequence)
            .push_bind(self.stop_headsign.clone())
            .push_bind(self.pickup_type)
            .push_bind(self.drop_off_type)
            .push_bind(self.shape_dist_traveled)
            .push_bind(self.timepoint);
    }
}

impl GtfsJpTable for GtfsShape {
    const TABLE: &'static TableDef = &SHAPES;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsShape {
            shape_id: row.required("shape_id")?,
            shape_pt_lat: row.required("shape_pt_lat")?,
            shape_pt_lon: row.required("shape_pt_lon")?,
            shape_pt_sequence: row.integer("shape_pt_sequence")?,
            shape_dist_traveled: row.optional_real("shape_dist_traveled")?,
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.shape_id.clone())
            .push_bind(self.shape_pt_lat.clone())
            .push_bind(self.shape_pt_lon.clone())
            .push_bind(self.shape_pt_sequence)
            .push_bind(self.shape_dist_traveled);
    }
}

impl GtfsJpTable for GtfsFareAttribute {
    const TABLE: &'static TableDef = &FARE_ATTRIBUTES;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsFareAttribute {
            fare_id: row.required("fare_id")?,
            price: row.integer("price")?,
            currency_type: row.required("currency_type")?,
            payment_method: row.integer("payment_method")?,
            transfers: row.required_column("transfers")?,
            transfer_duration: row.optional_integer("transfer_duration")?,
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.fare_id.clone())
            .push_bind(self.price)
            .push_bind(self.currency_type.clone())
            .push_bind(self.payment_method)
            .push_bind(self.transfers.clone())
            .push_bind(self.transfer_duration);
    }
}

impl GtfsJpTable for GtfsFareRule {
    const TABLE: &'static TableDef = &FARE_RULES;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsFareRule {
            fare_id: row.required("fare_id")?,
            route_id: row.optional("route_id"),
            origin_id: row.optional("origin_id"),
            destination_id: row.optional("destination_id"),
            contains_id: row.optional("contains_id"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.fare_id.clone())
            .push_bind(self.route_id.clone())
            .push_bind(self.origin_id.clone())
            .push_bind(self.destination_id.clone())
            .push_bind(self.contains_id.clone());
    }
}

impl GtfsJpTable for GtfsFeedInfo {
    const TABLE: &'static TableDef = &FEED_INFO;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsFeedInfo {
            feed_publisher_name: row.required("feed_publisher_name")?,
            feed_publisher_url: row.required("feed_publisher_url")?,
            feed_lang: row.required("feed_lang")?,
            feed_start_date: row.key("feed_start_date"),
            feed_end_date: row.key("feed_end_date"),
            feed_version: row.key("feed_version"),
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.feed_publisher_name.clone())
            .push_bind(self.feed_publisher_url.clone())
            .push_bind(self.feed_lang.clone())
            .push_bind(self.feed_start_date.clone())
            .push_bind(self.feed_end_date.clone())
            .push_bind(self.feed_version.clone());
    }
}

impl GtfsJpTable for GtfsTranslation {
    const TABLE: &'static TableDef = &TRANSLATIONS;

    fn from_csv_row(row: &CsvRow) -> Result<Self> {
        Ok(GtfsTranslation {
            trans_id: row.required("trans_id")?,
            lang: row.required("lang")?,
            translation: row.required("translation")?,
        })
    }

    fn push_binds<'args>(&self, row: &mut Separated<'_, 'args, Sqlite, &'static str>) {
        row.push_bind(self.trans_id.clone())
            .push_bind(self.lang.clone())
            .push_bind(self.translation.clone());
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        CsvRow {
            line: 2,
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn every_table_has_a_unique_file_and_name() {
        let names: HashSet<&str> = LOAD_ORDER.iter().map(|t| t.name).collect();
        let files: HashSet<&str> = LOAD_ORDER.iter().map(|t| t.file_name).collect();
        assert_eq!(names.len(), 15);
        assert_eq!(files.len(), 15);
    }

    #[test]
    fn parents_are_loaded_before_children() {
        let position = |name: &str| LOAD_ORDER.iter().position(|t| t.name == name).unwrap();
        for (i, table) in LOAD_ORDER.iter().enumerate() {
            for column in table.columns {
                if let Some(foreign_key) = column.references {
                    assert!(
                        position(foreign_key.table) < i,
                        "{} is loaded before its parent {}",
                        table.name,
                        foreign_key.table
                    );
                }
            }
        }
        assert!(position("trips") < position("shapes"));
        assert!(position("fare_attributes") < position("fare_rules"));
    }

    #[test]
    fn create_sql_lists_keys_and_references() {
        let sql = STOP_TIMES.create_sql();
        assert!(sql.starts_with("CREATE TABLE stop_times ("));
        assert!(sql.contains("arrival_time TEXT NOT NULL"));
        assert!(sql.contains("shape_dist_traveled REAL"));
        assert!(sql.contains("PRIMARY KEY (trip_id, stop_sequence)"));
        assert!(sql.contains("FOREIGN KEY (trip_id) REFERENCES trips (trip_id)"));
        assert!(sql.contains("FOREIGN KEY (stop_id) REFERENCES stops (stop_id)"));

        assert_eq!(AGENCY.drop_sql(), "DROP TABLE IF EXISTS agency");
    }

    #[test]
    fn stop_from_minimal_row() {
        let stop = GtfsStop::from_csv_row(&row(&[
            ("stop_id", "S1"),
            ("stop_name", "Tokyo Station"),
            ("stop_lat", "35.0"),
            ("stop_lon", "139.0"),
        ]))
        .unwrap();
        assert_eq!(stop.stop_id, "S1");
        assert_eq!(stop.stop_lat, "35.0");
        assert_eq!(stop.location_type, None);
        assert_eq!(stop.stop_code, None);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = GtfsStop::from_csv_row(&row(&[("stop_id", "S1"), ("stop_name", "")]))
            .unwrap_err()
            .to_string();
        assert_eq!(err, "line 2: missing required field `stop_name`");
    }

    #[test]
    fn composite_key_columns_never_stay_null() {
        let route_jp = GtfsRouteJp::from_csv_row(&row(&[
            ("route_id", "R1"),
            ("origin_stop", "Tokyo"),
        ]))
        .unwrap();
        assert_eq!(route_jp.route_update_date, "");
        assert_eq!(route_jp.via_stop, "");
        assert_eq!(route_jp.origin_stop, "Tokyo");

        let rule = GtfsFareRule::from_csv_row(&row(&[("fare_id", "F1"), ("origin_id", "")]))
            .unwrap();
        assert_eq!(rule.origin_id, None);
    }

    #[test]
    fn blank_transfers_mean_unlimited() {
        let fare = GtfsFareAttribute::from_csv_row(&row(&[
            ("fare_id", "F_210"),
            ("price", "210"),
            ("currency_type", "JPY"),
            ("payment_method", "0"),
            ("transfers", ""),
        ]))
        .unwrap();
        assert_eq!(fare.transfers, "");
        assert_eq!(fare.price, 210);

        assert!(GtfsFareAttribute::from_csv_row(&row(&[
            ("fare_id", "F_210"),
            ("price", "210"),
            ("currency_type", "JPY"),
            ("payment_method", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn calendar_flags() {
        let calendar = GtfsCalendar::from_csv_row(&row(&[
            ("service_id", "平日"),
            ("monday", "1"),
            ("tuesday", "1"),
            ("wednesday", "1"),
            ("thursday", "1"),
            ("friday", "1"),
            ("saturday", "0"),
            ("sunday", "0"),
            ("start_date", "20170101"),
            ("end_date", "20171231"),
        ]))
        .unwrap();
        assert!(calendar.friday);
        assert!(!calendar.sunday);
    }
}
