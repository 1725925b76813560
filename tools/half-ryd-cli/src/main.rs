use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, FixedOffset, Local};
use clap::builder::RangedU64ValueParser;
use clap::{Parser, Subcommand, ValueEnum};
use half_ryd_core::config::{DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};
use half_ryd_core::{
    AddOutcome, ArrivalIngestor, ArrivalLog, CatalogRecord, DataMallClient, DataMallConfig,
    FavoriteKey, FavoritesStore, Layout, PagedFetcher, ReferenceSync, SqliteCatalog, store,
};
use half_ryd_transit::{BusRoute, BusService, BusStop, BusStopCode, Catalog, ServiceNo, parse_date};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod render;
mod shell;

#[derive(Parser, Debug)]
#[command(
    name = "half-ryd",
    author,
    version,
    about = "Track bus arrivals and favorite stops from the LTA DataMall API",
    long_about = "Downloads the bus stop, service and route catalog into a local SQLite \
                  database, records live arrival observations, and keeps a list of \
                  favorite stops.\n\n\
                  The `shell` subcommand keeps savepoints for favorites and arrival \
                  history for the length of the session so changes can be rolled back."
)]
struct Args {
    /// SQLite database file
    #[arg(long, env = "HALF_RYD_DATABASE", default_value = "half-ryd.sqlite3", global = true)]
    database: PathBuf,

    /// DataMall account key
    #[arg(long, env = "LTA_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// DataMall API root
    #[arg(long, env = "DATAMALL_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Records per page when downloading the catalog (DataMall serves at most 500)
    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=DEFAULT_PAGE_SIZE as u64),
        global = true
    )]
    page_size: usize,

    /// Verbose output (show debug messages)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download stops, services and routes into the database
    Sync {
        /// Only download one dataset
        #[arg(long, value_enum)]
        only: Option<DatasetArg>,
    },

    /// Fetch live arrivals at a stop and add them to the history
    Arrivals {
        stop: String,
        /// Only this service
        #[arg(long)]
        service: Option<String>,
    },

    /// Show recorded arrivals
    History {
        /// Only observations taken on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Only observations at this stop
        #[arg(long)]
        stop: Option<String>,
    },

    /// Look up a bus stop in the catalog
    Stop { code: String },

    /// Look up a bus service in the catalog
    Service { service_no: String },

    /// List the stops a service calls at
    Routes { service_no: String },

    /// List a catalog table, optionally filtered on one column
    List {
        #[arg(value_enum)]
        dataset: DatasetArg,

        /// Only rows where COLUMN equals VALUE, e.g. `RoadName=Victoria St`
        #[arg(long = "where", value_name = "COLUMN=VALUE")]
        filter: Option<String>,
    },

    /// Manage favorite stops (or services with --services)
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,

        /// Manage favorite services instead of stops
        #[arg(long)]
        services: bool,

        /// Storage layout: `record` (one JSON list) or `table` (one row per
        /// favorite, checked against the catalog)
        #[arg(long, default_value = "record")]
        layout: Layout,
    },

    /// Interactive session with savepoints and rollback
    Shell,
}

#[derive(Subcommand, Debug, Clone)]
enum FavoritesAction {
    Add { code: String },
    Remove { code: String },
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum DatasetArg {
    Stops,
    Services,
    Routes,
}

/// Everything a command needs besides its own arguments
pub struct Session {
    database: PathBuf,
    config: Option<DataMallConfig>,
}

impl Session {
    fn from_args(args: &Args) -> Self {
        let config = args.api_key.as_ref().map(|key| {
            DataMallConfig::new(key.clone())
                .with_base_url(args.base_url.clone())
                .with_page_size(args.page_size)
        });

        Self {
            database: args.database.clone(),
            config,
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    pub fn open(&self) -> Result<store::Connection> {
        store::open(&self.database)
            .with_context(|| format!("Failed to open database {}", self.database.display()))
    }

    pub fn client(&self) -> Result<DataMallClient> {
        let Some(config) = &self.config else {
            bail!("No DataMall account key: pass --api-key or set LTA_API_KEY");
        };
        Ok(DataMallClient::new(config.clone())?)
    }
}

pub fn now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let session = Session::from_args(&args);
    info!(database = %session.database().display(), "Using database");

    match args.command {
        Command::Sync { only } => sync(&session, only).await,
        Command::Arrivals { stop, service } => arrivals(&session, &stop, service.as_deref()).await,
        Command::History { date, stop } => history(&session, date.as_deref(), stop.as_deref()),
        Command::Stop { code } => lookup_stop(&session, &code),
        Command::Service { service_no } => lookup_service(&session, &service_no),
        Command::Routes { service_no } => routes(&session, &service_no),
        Command::List { dataset, filter } => list(&session, dataset, filter.as_deref()),
        Command::Favorites {
            action,
            services,
            layout,
        } => {
            if services {
                favorites::<ServiceNo>(&session, action, layout)
            } else {
                favorites::<BusStopCode>(&session, action, layout)
            }
        }
        Command::Shell => shell::run(&session).await,
    }
}

async fn sync(session: &Session, only: Option<DatasetArg>) -> Result<()> {
    let client = session.client()?;
    let page_size = client.config().page_size;
    let sync = ReferenceSync::new(PagedFetcher::new(client, page_size));
    let mut conn = session.open()?;

    let reports = match only {
        None => sync.sync_all(&mut conn).await?,
        Some(DatasetArg::Stops) => vec![sync.sync::<BusStop>(&mut conn).await?],
        Some(DatasetArg::Services) => vec![sync.sync::<BusService>(&mut conn).await?],
        Some(DatasetArg::Routes) => vec![sync.sync::<BusRoute>(&mut conn).await?],
    };

    render::sync_reports(&reports);
    Ok(())
}

async fn arrivals(session: &Session, stop: &str, service: Option<&str>) -> Result<()> {
    let stop = BusStopCode::parse(stop)?;
    let service = service.map(ServiceNo::parse).transpose()?;

    let ingestor = ArrivalIngestor::new(session.client()?);
    let log = ArrivalLog::new(session.open()?);

    let stored = ingestor
        .ingest(&log, &stop, service.as_ref(), now())
        .await
        .with_context(|| format!("Failed to get arrivals for bus stop {stop}"))?;

    if stored.is_empty() {
        println!("No services reported at bus stop {stop}.");
    }
    for entry in &stored {
        render::arrival(&entry.document);
        println!();
    }
    Ok(())
}

fn history(session: &Session, date: Option<&str>, stop: Option<&str>) -> Result<()> {
    let date = date.map(parse_date).transpose()?;
    let stop = stop.map(BusStopCode::parse).transpose()?;
    let log = ArrivalLog::new(session.open()?);

    let mut entries = match (&date, &stop) {
        (Some(date), _) => log.read_by_date(*date)?,
        (None, Some(stop)) => log.read_by_stop(stop)?,
        (None, None) => log.read_all()?,
    };
    if let (Some(_), Some(stop)) = (&date, &stop) {
        entries.retain(|entry| entry.document.bus_stop_code == *stop);
    }

    render::history(&entries);
    Ok(())
}

fn lookup_stop(session: &Session, code: &str) -> Result<()> {
    let code = BusStopCode::parse(code)?;
    let conn = session.open()?;

    match SqliteCatalog::new(&conn).stop(&code)? {
        Some(stop) => render::stop(&stop),
        None => bail!("Bus stop {code} is not in the catalog (run `half-ryd sync` first?)"),
    }
    Ok(())
}

fn lookup_service(session: &Session, service_no: &str) -> Result<()> {
    let service_no = ServiceNo::parse(service_no)?;
    let conn = session.open()?;

    match SqliteCatalog::new(&conn).service(&service_no)? {
        Some(service) => render::service(&service),
        None => bail!("Bus service {service_no} is not in the catalog (run `half-ryd sync` first?)"),
    }
    Ok(())
}

fn routes(session: &Session, service_no: &str) -> Result<()> {
    let service_no = ServiceNo::parse(service_no)?;
    let conn = session.open()?;

    let routes = SqliteCatalog::new(&conn).routes_for_service(&service_no)?;
    if routes.is_empty() {
        bail!("No routes recorded for service {service_no}");
    }
    render::routes(&routes);
    Ok(())
}

/// Split `COLUMN=VALUE`. Column names are checked by the catalog.
fn parse_filter(raw: &str) -> Result<(&str, &str)> {
    let (column, value) = raw
        .split_once('=')
        .with_context(|| format!("Expected COLUMN=VALUE, got {raw:?}"))?;
    Ok((column.trim(), value.trim()))
}

fn select<R: CatalogRecord>(catalog: &SqliteCatalog<'_>, filter: Option<(&str, &str)>) -> Result<Vec<R>> {
    let rows = match filter {
        Some((column, value)) => catalog.filter(column, value)?,
        None => catalog.all()?,
    };
    Ok(rows)
}

fn list(session: &Session, dataset: DatasetArg, filter: Option<&str>) -> Result<()> {
    let filter = filter.map(parse_filter).transpose()?;
    let conn = session.open()?;
    let catalog = SqliteCatalog::new(&conn);

    let count = match dataset {
        DatasetArg::Stops => {
            let stops: Vec<BusStop> = select(&catalog, filter)?;
            stops.iter().for_each(render::stop);
            stops.len()
        }
        DatasetArg::Services => {
            let services: Vec<BusService> = select(&catalog, filter)?;
            services.iter().for_each(render::service);
            services.len()
        }
        DatasetArg::Routes => {
            let routes: Vec<BusRoute> = select(&catalog, filter)?;
            if !routes.is_empty() {
                render::routes(&routes);
            }
            routes.len()
        }
    };

    println!("{count} row(s)");
    Ok(())
}

fn favorites<K: FavoriteKey>(session: &Session, action: FavoritesAction, layout: Layout) -> Result<()> {
    let mut store: FavoritesStore<K> = FavoritesStore::new(session.open()?, layout);

    match action {
        FavoritesAction::Add { code } => {
            let outcome = match layout {
                Layout::Record => store.add(&code)?,
                Layout::Table => {
                    let catalog_conn = session.open()?;
                    store.add_known(&code, &SqliteCatalog::new(&catalog_conn))?
                }
            };
            match outcome {
                AddOutcome::Added => println!("{} {code} added to favorites.", K::LABEL),
                AddOutcome::AlreadyPresent => println!("{} {code} is already in favorites.", K::LABEL),
            }
        }
        FavoritesAction::Remove { code } => {
            store.remove(&code)?;
            println!("{} {code} removed from favorites.", K::LABEL);
        }
        FavoritesAction::List => render::codes("Favorites", &store.list()?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_capped() {
        let args = Args::try_parse_from(["half-ryd", "--page-size", "200", "shell"]).unwrap();
        assert_eq!(args.page_size, 200);

        let args = Args::try_parse_from(["half-ryd", "shell"]).unwrap();
        assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);

        assert!(Args::try_parse_from(["half-ryd", "--page-size", "1000", "shell"]).is_err());
        assert!(Args::try_parse_from(["half-ryd", "--page-size", "0", "shell"]).is_err());
    }

    #[test]
    fn test_list_arguments() {
        let args =
            Args::try_parse_from(["half-ryd", "list", "stops", "--where", "RoadName=Victoria St"])
                .unwrap();
        match args.command {
            Command::List { dataset, filter } => {
                assert!(matches!(dataset, DatasetArg::Stops));
                assert_eq!(filter.as_deref(), Some("RoadName=Victoria St"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_filter() {
        assert_eq!(parse_filter("Direction = 2").unwrap(), ("Direction", "2"));
        assert_eq!(parse_filter("Description=Blk 1=A").unwrap(), ("Description", "Blk 1=A"));
        assert!(parse_filter("RoadName").is_err());
    }
}
