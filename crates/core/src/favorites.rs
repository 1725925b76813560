//! Favorite bus stops and services.
//!
//! A favorites set is small and always rewritten whole: every mutation
//! loads the set, edits it in memory and persists the result.

use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

use half_ryd_transit::{BusStopCode, Catalog, ServiceNo, TransitError};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::store::catalog::ident;
use crate::versioning::Versioned;

/// Something that can be kept as a favorite.
pub trait FavoriteKey:
    Clone + Eq + Display + FromStr<Err = TransitError> + Serialize + DeserializeOwned
{
    /// Relational table with one row per favorite
    const TABLE: &'static str;
    const COLUMN: &'static str;
    /// Fixed id of the JSON record holding the whole list
    const RECORD_ID: &'static str;
    /// Human name used in messages
    const LABEL: &'static str;

    fn known_in<C: Catalog>(&self, catalog: &C) -> std::result::Result<bool, C::Error>;
}

impl FavoriteKey for BusStopCode {
    const TABLE: &'static str = "FavoriteStop";
    const COLUMN: &'static str = "BusStopCode";
    const RECORD_ID: &'static str = "favorites";
    const LABEL: &'static str = "Bus stop";

    fn known_in<C: Catalog>(&self, catalog: &C) -> std::result::Result<bool, C::Error> {
        catalog.has_stop(self)
    }
}

impl FavoriteKey for ServiceNo {
    const TABLE: &'static str = "FavoriteService";
    const COLUMN: &'static str = "ServiceNo";
    const RECORD_ID: &'static str = "favorite_services";
    const LABEL: &'static str = "Bus service";

    fn known_in<C: Catalog>(&self, catalog: &C) -> std::result::Result<bool, C::Error> {
        catalog.has_service(self)
    }
}

/// How a favorites set is laid out on disk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Layout {
    /// One JSON list in `FavoriteRecords`
    #[default]
    Record,
    /// One row per favorite in `FavoriteStop` / `FavoriteService`
    Table,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
}

pub struct FavoritesStore<K> {
    conn: Connection,
    layout: Layout,
    _key: PhantomData<K>,
}

impl<K: FavoriteKey> FavoritesStore<K> {
    pub fn new(conn: Connection, layout: Layout) -> Self {
        Self {
            conn,
            layout,
            _key: PhantomData,
        }
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Favorites in insertion order
    pub fn list(&self) -> Result<Vec<K>> {
        match self.layout {
            Layout::Record => {
                let codes: Option<String> = self
                    .conn
                    .query_row(
                        "SELECT Codes FROM FavoriteRecords WHERE ID = ?1",
                        [K::RECORD_ID],
                        |row| row.get(0),
                    )
                    .optional()?;

                match codes {
                    Some(json) => Ok(serde_json::from_str(&json)?),
                    None => Ok(Vec::new()),
                }
            }
            Layout::Table => {
                let sql = format!("SELECT {} FROM {} ORDER BY ID", K::COLUMN, K::TABLE);
                let mut stmt = self.conn.prepare_cached(&sql)?;
                let keys = stmt
                    .query_map([], |row| ident(row, 0))?
                    .collect::<rusqlite::Result<Vec<K>>>()?;
                Ok(keys)
            }
        }
    }

    pub fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.list()?.contains(key))
    }

    /// Add an already validated key.
    pub fn insert(&mut self, key: K) -> Result<AddOutcome> {
        let mut keys = self.list()?;
        if keys.contains(&key) {
            info!("{} {key} is already in favorites", K::LABEL);
            return Ok(AddOutcome::AlreadyPresent);
        }

        keys.push(key);
        self.persist(&keys)?;
        Ok(AddOutcome::Added)
    }

    /// Validate `code` and add it.
    pub fn add(&mut self, code: &str) -> Result<AddOutcome> {
        let key: K = code.parse()?;
        self.insert(key)
    }

    /// Like [`add`](Self::add), but only for keys present in `catalog`.
    pub fn add_known<C>(&mut self, code: &str, catalog: &C) -> Result<AddOutcome>
    where
        C: Catalog<Error = Error>,
    {
        let key: K = code.parse()?;
        if !key.known_in(catalog)? {
            return Err(Error::not_found(K::LABEL, key));
        }
        self.insert(key)
    }

    pub fn remove(&mut self, code: &str) -> Result<()> {
        let key: K = code.parse()?;

        let mut keys = self.list()?;
        let Some(position) = keys.iter().position(|k| *k == key) else {
            return Err(Error::not_found(K::LABEL, key));
        };

        keys.remove(position);
        self.persist(&keys)
    }

    /// Overwrite the whole set. Later duplicates are dropped.
    pub fn replace(&mut self, keys: &[K]) -> Result<()> {
        let mut unique: Vec<K> = Vec::with_capacity(keys.len());
        for key in keys {
            if !unique.contains(key) {
                unique.push(key.clone());
            }
        }
        self.persist(&unique)
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    fn persist(&mut self, keys: &[K]) -> Result<()> {
        match self.layout {
            Layout::Record => {
                let json = serde_json::to_string(keys)?;
                self.conn.execute(
                    "INSERT INTO FavoriteRecords (ID, Codes) VALUES (?1, ?2) \
                     ON CONFLICT(ID) DO UPDATE SET Codes = excluded.Codes",
                    params![K::RECORD_ID, json],
                )?;
            }
            Layout::Table => {
                let tx = self.conn.transaction()?;
                tx.execute(&format!("DELETE FROM {}", K::TABLE), [])?;
                {
                    let sql = format!("INSERT INTO {} ({}) VALUES (?1)", K::TABLE, K::COLUMN);
                    let mut insert = tx.prepare_cached(&sql)?;
                    for key in keys {
                        insert.execute([key.to_string()])?;
                    }
                }
                tx.commit()?;
            }
        }

        debug!(record = K::RECORD_ID, layout = %self.layout, count = keys.len(), "Favorites saved");
        Ok(())
    }
}

impl<K: FavoriteKey> Versioned for FavoritesStore<K> {
    type State = Vec<K>;

    fn capture(&self) -> Result<Vec<K>> {
        self.list()
    }

    fn restore(&mut self, state: &Vec<K>) -> Result<()> {
        self.replace(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::{SqliteCatalog, open_in_memory};
    use crate::sync::upsert;
    use crate::versioning::VersionedCollection;
    use half_ryd_transit::BusStop;

    fn stops(layout: Layout) -> FavoritesStore<BusStopCode> {
        FavoritesStore::new(open_in_memory().unwrap(), layout)
    }

    fn codes(store: &FavoritesStore<BusStopCode>) -> Vec<String> {
        store.list().unwrap().iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_add_remove_round_trip() {
        for layout in [Layout::Record, Layout::Table] {
            let mut store = stops(layout);
            store.add("01012").unwrap();
            store.add("02025").unwrap();
            let before = codes(&store);

            store.add("03033").unwrap();
            store.remove("03033").unwrap();
            assert_eq!(codes(&store), before, "{layout}");
        }
    }

    #[test]
    fn test_add_is_idempotent() {
        for layout in [Layout::Record, Layout::Table] {
            let mut store = stops(layout);
            assert_eq!(store.add("01012").unwrap(), AddOutcome::Added);
            assert_eq!(store.add("01012").unwrap(), AddOutcome::AlreadyPresent);
            assert_eq!(codes(&store), vec!["01012"], "{layout}");
        }
    }

    #[test]
    fn test_malformed_codes_are_rejected() {
        let mut store = stops(Layout::Record);

        for bad in ["1012", "010123", "0101a", ""] {
            let err = store.add(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
        assert_eq!(store.remove("abc").unwrap_err().kind(), ErrorKind::Validation);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_absent_code() {
        let mut store = stops(Layout::Table);
        store.add("01012").unwrap();

        let err = store.remove("02025").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Bus stop 02025 is not present");
        assert_eq!(codes(&store), vec!["01012"]);
    }

    #[test]
    fn test_favorites_survive_reopen() {
        let mut store = stops(Layout::Record);
        store.add("01012").unwrap();
        store.add("02025").unwrap();

        let reopened: FavoritesStore<BusStopCode> =
            FavoritesStore::new(store.into_inner(), Layout::Record);
        assert_eq!(codes(&reopened), vec!["01012", "02025"]);
    }

    #[test]
    fn test_stop_and_service_favorites_are_separate() {
        let conn = open_in_memory().unwrap();
        let mut stop_favorites: FavoritesStore<BusStopCode> =
            FavoritesStore::new(conn, Layout::Record);
        stop_favorites.add("01012").unwrap();

        let mut service_favorites: FavoritesStore<ServiceNo> =
            FavoritesStore::new(stop_favorites.into_inner(), Layout::Record);
        assert!(service_favorites.list().unwrap().is_empty());
        service_favorites.add("160A").unwrap();

        let services: Vec<String> = service_favorites
            .list()
            .unwrap()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(services, vec!["160A"]);
    }

    #[test]
    fn test_rollback_scenario() {
        for layout in [Layout::Record, Layout::Table] {
            let mut favorites = VersionedCollection::new(stops(layout));
            favorites.add("01012").unwrap();
            favorites.add("02025").unwrap();

            assert_eq!(favorites.snapshot().unwrap(), 1);
            favorites.add("03033").unwrap();
            assert_eq!(favorites.snapshot().unwrap(), 2);
            favorites.remove("01012").unwrap();

            favorites.rollback(1).unwrap();
            assert_eq!(codes(&favorites), vec!["01012", "02025"], "{layout}");
            assert_eq!(favorites.savepoint_count(), 1);
        }
    }

    #[test]
    fn test_add_known_checks_catalog() {
        let mut catalog_conn = open_in_memory().unwrap();
        let stop = BusStop {
            bus_stop_code: BusStopCode::parse("01012").unwrap(),
            road_name: "Victoria St".into(),
            description: "Hotel Grand Pacific".into(),
            latitude: 1.2968,
            longitude: 103.8525,
        };
        upsert(&mut catalog_conn, &stop);
        let catalog = SqliteCatalog::new(&catalog_conn);

        let mut store = stops(Layout::Table);
        assert_eq!(store.add_known("01012", &catalog).unwrap(), AddOutcome::Added);

        let err = store.add_known("99999", &catalog).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(codes(&store), vec!["01012"]);
    }

    #[test]
    fn test_replace_drops_duplicates() {
        let mut store = stops(Layout::Table);
        let a = BusStopCode::parse("01012").unwrap();
        let b = BusStopCode::parse("02025").unwrap();

        store.replace(&[a.clone(), b.clone(), a.clone()]).unwrap();
        assert_eq!(store.list().unwrap(), vec![a, b]);
    }

    #[test]
    fn test_layout_names() {
        assert_eq!("table".parse::<Layout>().unwrap(), Layout::Table);
        assert_eq!(Layout::Record.to_string(), "record");
    }
}
