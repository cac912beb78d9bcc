//! Loads GTFS-JP feeds into SQLite and answers simple questions about them.

pub mod client;
pub mod config;
pub mod csv_source;
pub mod database;
pub mod gtfs_jp;
pub mod load_gtfs;
pub mod queries;
pub mod sniff;
pub mod tables;

pub use client::{Agency, AgencyDocument, GtfsJpClient, RouteFares, Stop, StopDocument};
pub use config::{DatabaseLocation, LoadOptions, DEFAULT_DATABASE_PATH};
pub use csv_source::TextEncoding;
pub use load_gtfs::LoadSummary;
