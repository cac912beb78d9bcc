use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use gtfs_jp_db::{
    AgencyDocument, DatabaseLocation, GtfsJpClient, LoadOptions, StopDocument, TextEncoding,
    DEFAULT_DATABASE_PATH,
};

#[derive(Parser, Debug)]
#[command(name = "gtfsjp", version, about = "Load GTFS-JP feeds into SQLite and query them")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or replace a database from a GTFS-JP directory
    InitDb {
        gtfs_dir: PathBuf,
        #[arg(default_value = DEFAULT_DATABASE_PATH)]
        dst: PathBuf,
        /// Drop exact duplicate rows in every file
        #[arg(short = 'd', long)]
        drop_duplicates: bool,
        /// Text encoding of the feed files, e.g. utf_8_sig, shift_jis, cp932
        #[arg(long, default_value = "utf_8_sig")]
        encoding: TextEncoding,
    },
    /// Print data from a database created with `init-db`
    Get {
        #[command(subcommand)]
        target: GetTarget,
    },
}

#[derive(Subcommand, Debug)]
enum GetTarget {
    /// All agencies
    Agency {
        #[arg(default_value = DEFAULT_DATABASE_PATH)]
        source: PathBuf,
        #[arg(long)]
        pretty: bool,
    },
    /// A stop by id, or all stops whose name contains a word
    Stop {
        #[arg(default_value = DEFAULT_DATABASE_PATH)]
        source: PathBuf,
        #[arg(long, conflicts_with = "word", required_unless_present = "word")]
        id: Option<String>,
        #[arg(long)]
        word: Option<String>,
        #[arg(long)]
        pretty: bool,
    },
    /// Fares between the stops of a route
    RouteFares {
        #[arg(default_value = DEFAULT_DATABASE_PATH)]
        source: PathBuf,
        #[arg(long)]
        id: String,
        #[arg(long)]
        pretty: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()?;

    let cli = Cli::parse();
    match cli.command {
        Command::InitDb {
            gtfs_dir,
            dst,
            drop_duplicates,
            encoding,
        } => {
            let options = LoadOptions {
                encoding,
                drop_duplicates,
                ..Default::default()
            };
            let mut client = GtfsJpClient::open(&DatabaseLocation::File(dst.clone())).await?;
            client.reload(&gtfs_dir, &options).await?;
            client.close().await?;
            log::info!("Database written to {:?}", dst);
        }
        Command::Get { target } => match target {
            GetTarget::Agency { source, pretty } => {
                let mut client = open_existing(&source).await?;
                let agencies = client.list_agencies().await?;
                print_json(&AgencyDocument::from(agencies), pretty)?;
                client.close().await?;
            }
            GetTarget::Stop {
                source,
                id,
                word,
                pretty,
            } => {
                let mut client = open_existing(&source).await?;
                match (id, word) {
                    (Some(id), _) => match client.find_stop(&id).await? {
                        Some(stop) => print_json(&StopDocument::from(vec![stop]), pretty)?,
                        None => println!("Not found id = {}", id),
                    },
                    (None, Some(word)) => {
                        let stops = client.search_stops(&word).await?;
                        print_json(&StopDocument::from(stops), pretty)?;
                    }
                    (None, None) => bail!("Either --id or --word is required"),
                }
                client.close().await?;
            }
            GetTarget::RouteFares { source, id, pretty } => {
                let mut client = open_existing(&source).await?;
                match client.route_fares(&id).await? {
                    Some(fares) => print_json(&fares, pretty)?,
                    None => println!("Not found id = {}", id),
                }
                client.close().await?;
            }
        },
    }

    Ok(())
}

async fn open_existing(source: &Path) -> Result<GtfsJpClient> {
    if !source.exists() {
        bail!(
            "Database {:?} does not exist, create it with `gtfsjp init-db` first",
            source
        );
    }
    GtfsJpClient::open(&DatabaseLocation::file(source)).await
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
