//! Networking and storage for the Half Ryd bus tracker.
//!
//! - [`datamall`]: the DataMall HTTP client and `$skip` pagination
//! - [`sync`]: idempotent copying of reference datasets into SQLite
//! - [`store`]: schema and the read side of the catalog
//! - [`favorites`], [`arrivals`]: the two user-facing collections
//! - [`versioning`]: savepoints and rollback over either collection

pub mod arrivals;
pub mod config;
pub mod datamall;
pub mod error;
pub mod favorites;
pub mod store;
pub mod sync;
pub mod versioning;

#[cfg(test)]
mod testing;

pub use arrivals::{ArrivalIngestor, ArrivalLog, StoredArrival};
pub use config::DataMallConfig;
pub use datamall::{DataMallClient, PagedFetcher};
pub use error::{Error, ErrorKind, Result};
pub use favorites::{AddOutcome, FavoriteKey, FavoritesStore, Layout};
pub use store::{CatalogRecord, SqliteCatalog};
pub use sync::{ReferenceSync, SyncReport, UpsertOutcome, upsert};
pub use versioning::{Versioned, VersionedCollection};

// Re-export transit from the transit crate
pub use half_ryd_transit as transit;
