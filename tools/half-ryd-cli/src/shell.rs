//! Interactive session. Savepoints live only as long as the session.

use anyhow::{Context, Result};
use half_ryd_core::{
    AddOutcome, ArrivalIngestor, ArrivalLog, DataMallClient, FavoritesStore, Layout,
    VersionedCollection,
};
use half_ryd_transit::{BusStopCode, ServiceNo, parse_date};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::{Session, now, render};

const HELP: &str = "\
Commands:
  arrivals <stop> [service]     fetch live arrivals and record them
  history [YYYY-MM-DD]          show recorded arrivals
  history snapshot              create a savepoint of the arrival history
  history rollback <n>          restore arrival history savepoint n
  fav add <stop>                add a favorite bus stop
  fav remove <stop>             remove a favorite bus stop
  fav list                      show favorite bus stops
  fav snapshot                  create a savepoint of the favorites
  fav rollback <n>              restore favorites savepoint n
  help                          show this message
  quit                          leave the session";

#[derive(Debug, PartialEq, Eq)]
enum Target {
    Favorites,
    History,
}

#[derive(Debug, PartialEq, Eq)]
enum ShellCommand {
    Arrivals { stop: String, service: Option<String> },
    History { date: Option<String> },
    AddFavorite(String),
    RemoveFavorite(String),
    ListFavorites,
    Snapshot(Target),
    Rollback(Target, i64),
    Help,
    Quit,
}

impl ShellCommand {
    /// `Ok(None)` for a blank line
    fn parse(line: &str) -> Result<Option<Self>, String> {
        let words: Vec<&str> = line.split_whitespace().collect();

        let command = match words.as_slice() {
            [] => return Ok(None),
            ["help" | "?"] => Self::Help,
            ["quit" | "exit" | "0"] => Self::Quit,
            ["arrivals", stop] => Self::Arrivals {
                stop: stop.to_string(),
                service: None,
            },
            ["arrivals", stop, service] => Self::Arrivals {
                stop: stop.to_string(),
                service: Some(service.to_string()),
            },
            ["history"] => Self::History { date: None },
            ["history", "snapshot"] => Self::Snapshot(Target::History),
            ["history", "rollback", n] => Self::Rollback(Target::History, rollback_number(n)?),
            ["history", date] => Self::History {
                date: Some(date.to_string()),
            },
            ["fav", "add", code] => Self::AddFavorite(code.to_string()),
            ["fav", "remove", code] => Self::RemoveFavorite(code.to_string()),
            ["fav", "list"] | ["fav"] => Self::ListFavorites,
            ["fav", "snapshot"] => Self::Snapshot(Target::Favorites),
            ["fav", "rollback", n] => Self::Rollback(Target::Favorites, rollback_number(n)?),
            _ => return Err(format!("Unknown command {line:?}, type `help` for a list")),
        };
        Ok(Some(command))
    }
}

fn rollback_number(raw: &str) -> Result<i64, String> {
    raw.parse()
        .map_err(|_| format!("Invalid input {raw:?}. Please enter a valid rollback number."))
}

struct Shell {
    favorites: VersionedCollection<FavoritesStore<BusStopCode>>,
    history: VersionedCollection<ArrivalLog>,
    ingestor: Option<ArrivalIngestor<DataMallClient>>,
}

impl Shell {
    fn open(session: &Session) -> Result<Self> {
        let favorites = FavoritesStore::new(session.open()?, Layout::Record);
        let history = ArrivalLog::new(session.open()?);

        // Without a key the session still works offline.
        let ingestor = match session.client() {
            Ok(client) => Some(ArrivalIngestor::new(client)),
            Err(e) => {
                debug!(error = %e, "Live arrivals unavailable");
                None
            }
        };

        Ok(Self {
            favorites: VersionedCollection::new(favorites),
            history: VersionedCollection::new(history),
            ingestor,
        })
    }

    /// Returns `false` once the user asks to leave.
    async fn execute(&mut self, command: ShellCommand) -> Result<bool> {
        match command {
            ShellCommand::Help => println!("{HELP}"),
            ShellCommand::Quit => return Ok(false),
            ShellCommand::Arrivals { stop, service } => {
                let stop = BusStopCode::parse(&stop)?;
                let service = service.as_deref().map(ServiceNo::parse).transpose()?;
                let ingestor = self
                    .ingestor
                    .as_ref()
                    .context("No DataMall account key: restart with --api-key or LTA_API_KEY")?;

                let stored = ingestor
                    .ingest(&self.history, &stop, service.as_ref(), now())
                    .await?;
                for entry in &stored {
                    render::arrival(&entry.document);
                    println!();
                }
            }
            ShellCommand::History { date: None } => render::history(&self.history.read_all()?),
            ShellCommand::History { date: Some(date) } => {
                let date = parse_date(&date)?;
                let entries = self.history.read_by_date(date)?;
                if entries.is_empty() {
                    println!("No bus arrival history found for {date}");
                } else {
                    println!("Bus Arrival History for {date}:");
                    render::history(&entries);
                }
            }
            ShellCommand::AddFavorite(code) => match self.favorites.add(&code)? {
                AddOutcome::Added => println!("Bus stop {code} added to favorites."),
                AddOutcome::AlreadyPresent => println!("Bus stop {code} is already in favorites."),
            },
            ShellCommand::RemoveFavorite(code) => {
                self.favorites.remove(&code)?;
                println!("Bus stop {code} removed from favorites.");
            }
            ShellCommand::ListFavorites => {
                render::codes("Favorite bus stops", &self.favorites.list()?)
            }
            ShellCommand::Snapshot(Target::Favorites) => {
                let index = self.favorites.snapshot()?;
                println!("Savepoint {index} created for favorite bus stops.");
            }
            ShellCommand::Snapshot(Target::History) => {
                let index = self.history.snapshot()?;
                println!("Savepoint {index} created for bus arrival documents.");
            }
            ShellCommand::Rollback(Target::Favorites, index) => {
                self.favorites.rollback(index)?;
                println!("Favorite bus stops rolled back to savepoint {index}.");
            }
            ShellCommand::Rollback(Target::History, index) => {
                self.history.rollback(index)?;
                println!("Bus arrival documents rolled back to savepoint {index}.");
            }
        }
        Ok(true)
    }
}

pub async fn run(session: &Session) -> Result<()> {
    let mut shell = Shell::open(session)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("======= Welcome to Half Ryd =======");
    println!("{HELP}");

    loop {
        stdout.write_all(b"half-ryd> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match shell.execute(command).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => println!("Error: {e:#}"),
        }
    }
    Ok(())
}
