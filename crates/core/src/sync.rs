//! Reference data synchronization: fetch a whole DataMall dataset and
//! insert the records the database does not have yet.

use std::fmt;

use half_ryd_transit::{BusRoute, BusService, BusStop, DataFetcher};
use rusqlite::{Connection, params_from_iter};
use tracing::{info, warn};

use crate::datamall::PagedFetcher;
use crate::error::Result;
use crate::store::CatalogRecord;
use crate::store::catalog::{exists_sql, insert_sql};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpsertOutcome {
    Inserted,
    AlreadyPresent,
    /// The transaction was rolled back; the cause has been logged.
    Failed,
}

/// Insert `record` unless a row with the same natural key exists.
///
/// Each call is its own transaction. Failures are logged and reported as
/// [`UpsertOutcome::Failed`] so one bad record never stops a sync.
pub fn upsert<R: CatalogRecord>(conn: &mut Connection, record: &R) -> UpsertOutcome {
    match try_upsert(conn, record) {
        Ok(true) => UpsertOutcome::Inserted,
        Ok(false) => UpsertOutcome::AlreadyPresent,
        Err(e) => {
            warn!(table = R::TABLE, error = %e, "Upsert failed, record skipped");
            UpsertOutcome::Failed
        }
    }
}

fn try_upsert<R: CatalogRecord>(conn: &mut Connection, record: &R) -> rusqlite::Result<bool> {
    let tx = conn.transaction()?;

    let exists = tx
        .prepare_cached(&exists_sql::<R>())?
        .exists(params_from_iter(record.key()))?;
    if !exists {
        tx.prepare_cached(&insert_sql::<R>())?
            .execute(params_from_iter(record.values()))?;
    }

    tx.commit()?;
    Ok(!exists)
}

/// Tally of one dataset sync
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub dataset: &'static str,
    pub fetched: usize,
    pub inserted: usize,
    pub existing: usize,
    pub failed: usize,
}

impl SyncReport {
    fn new(dataset: &'static str) -> Self {
        Self {
            dataset,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: UpsertOutcome) {
        match outcome {
            UpsertOutcome::Inserted => self.inserted += 1,
            UpsertOutcome::AlreadyPresent => self.existing += 1,
            UpsertOutcome::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} fetched, {} inserted, {} already present, {} failed",
            self.dataset, self.fetched, self.inserted, self.existing, self.failed
        )
    }
}

/// Copies the DataMall reference datasets into the catalog tables.
pub struct ReferenceSync<F> {
    fetcher: PagedFetcher<F>,
}

impl<F: DataFetcher> ReferenceSync<F> {
    pub fn new(fetcher: PagedFetcher<F>) -> Self {
        Self { fetcher }
    }

    /// Fetch every record of `R`'s dataset and upsert it.
    ///
    /// A fetch failure is returned before anything is written.
    pub async fn sync<R: CatalogRecord>(&self, conn: &mut Connection) -> Result<SyncReport> {
        let records: Vec<R> = self.fetcher.fetch_all().await?;

        let mut report = SyncReport::new(R::TABLE);
        report.fetched = records.len();
        for record in &records {
            report.record(upsert(conn, record));
        }

        info!(
            table = R::TABLE,
            fetched = report.fetched,
            inserted = report.inserted,
            existing = report.existing,
            failed = report.failed,
            "Synchronized dataset"
        );
        Ok(report)
    }

    /// Stops, then services, then routes. Stops at the first dataset that
    /// cannot be fetched.
    pub async fn sync_all(&self, conn: &mut Connection) -> Result<Vec<SyncReport>> {
        Ok(vec![
            self.sync::<BusStop>(conn).await?,
            self.sync::<BusService>(conn).await?,
            self.sync::<BusRoute>(conn).await?,
        ])
    }
}
