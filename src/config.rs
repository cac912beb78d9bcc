use std::path::PathBuf;

use crate::csv_source::TextEncoding;

/// Database file used by the command line tool when no path is given.
pub const DEFAULT_DATABASE_PATH: &str = "gtfs-jp.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    File(PathBuf),
    InMemory,
}

impl DatabaseLocation {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        DatabaseLocation::File(path.into())
    }
}

impl Default for DatabaseLocation {
    fn default() -> Self {
        DatabaseLocation::File(PathBuf::from(DEFAULT_DATABASE_PATH))
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub encoding: TextEncoding,
    /// Drops exact duplicate rows within each file. Rows are then inserted in sorted order.
    pub drop_duplicates: bool,
    pub show_progress: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            encoding: TextEncoding::Utf8Sig,
            drop_duplicates: false,
            show_progress: true,
        }
    }
}
