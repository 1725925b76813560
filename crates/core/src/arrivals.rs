//! Arrival history: ingestion from `BusArrivalv2` and the document log.

use chrono::{DateTime, FixedOffset, NaiveDate};
use half_ryd_transit::{
    ARRIVAL_ENDPOINT, ArrivalDocument, ArrivalResponse, BusStopCode, DataFetcher, ServiceNo,
    TransitError,
};
use rusqlite::{Connection, OptionalExtension, Params, params};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// An arrival document together with the id the store gave it.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredArrival {
    pub id: i64,
    pub document: ArrivalDocument,
}

/// Append-mostly log of arrival documents, one JSON document per row.
pub struct ArrivalLog {
    conn: Connection,
}

impl ArrivalLog {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, document: &ArrivalDocument) -> Result<StoredArrival> {
        insert_document(&self.conn, document)?;
        Ok(StoredArrival {
            id: self.conn.last_insert_rowid(),
            document: document.clone(),
        })
    }

    pub fn read_all(&self) -> Result<Vec<StoredArrival>> {
        self.select("", [])
    }

    pub fn read_by_date(&self, date: NaiveDate) -> Result<Vec<StoredArrival>> {
        self.select("WHERE Date = ?1", [date])
    }

    pub fn read_by_stop(&self, code: &BusStopCode) -> Result<Vec<StoredArrival>> {
        self.select("WHERE BusStopCode = ?1", [code.as_str()])
    }

    pub fn get(&self, id: i64) -> Result<Option<StoredArrival>> {
        let document: Option<String> = self
            .conn
            .query_row(
                "SELECT Document FROM BusArrivalData WHERE ID = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        document
            .map(|json| {
                Ok(StoredArrival {
                    id,
                    document: serde_json::from_str(&json)?,
                })
            })
            .transpose()
    }

    /// Edit one document in place.
    pub fn update<E>(&self, id: i64, edit: E) -> Result<StoredArrival>
    where
        E: FnOnce(&mut ArrivalDocument),
    {
        let mut stored = self
            .get(id)?
            .ok_or_else(|| Error::not_found("Arrival record", id))?;
        edit(&mut stored.document);

        self.conn.execute(
            "UPDATE BusArrivalData SET BusStopCode = ?1, Date = ?2, Document = ?3 WHERE ID = ?4",
            params![
                stored.document.bus_stop_code.as_str(),
                stored.document.date,
                serde_json::to_string(&stored.document)?,
                id
            ],
        )?;
        Ok(stored)
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let deleted = self
            .conn
            .execute("DELETE FROM BusArrivalData WHERE ID = ?1", [id])?;
        if deleted == 0 {
            return Err(Error::not_found("Arrival record", id));
        }
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM BusArrivalData", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Swap the whole log for `documents` in a single transaction.
    ///
    /// Ids are issued afresh.
    pub fn replace_all(&mut self, documents: &[ArrivalDocument]) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM BusArrivalData", [])?;
        for document in documents {
            insert_document(&tx, document)?;
        }
        tx.commit()?;

        debug!(documents = documents.len(), "Arrival log replaced");
        Ok(())
    }

    pub fn into_inner(self) -> Connection {
        self.conn
    }

    fn select(&self, condition: &str, params: impl Params) -> Result<Vec<StoredArrival>> {
        let sql = format!("SELECT ID, Document FROM BusArrivalData {condition} ORDER BY ID");
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params, |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(id, json)| {
                Ok(StoredArrival {
                    id,
                    document: serde_json::from_str(&json)?,
                })
            })
            .collect()
    }
}

fn insert_document(conn: &Connection, document: &ArrivalDocument) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO BusArrivalData (BusStopCode, Date, Document) VALUES (?1, ?2, ?3)",
    )?
    .execute(params![
        document.bus_stop_code.as_str(),
        document.date,
        serde_json::to_string(document)?
    ])?;
    Ok(())
}

impl crate::versioning::Versioned for ArrivalLog {
    type State = Vec<ArrivalDocument>;

    fn capture(&self) -> Result<Vec<ArrivalDocument>> {
        Ok(self.read_all()?.into_iter().map(|s| s.document).collect())
    }

    fn restore(&mut self, state: &Vec<ArrivalDocument>) -> Result<()> {
        self.replace_all(state)
    }
}

/// Turns live `BusArrivalv2` responses into history entries.
pub struct ArrivalIngestor<F> {
    fetcher: F,
}

impl<F: DataFetcher> ArrivalIngestor<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    /// One request for the services at `stop`, optionally narrowed to one service.
    pub async fn fetch(
        &self,
        stop: &BusStopCode,
        service: Option<&ServiceNo>,
    ) -> Result<ArrivalResponse> {
        let mut query = vec![("BusStopCode", stop.to_string())];
        if let Some(service) = service {
            query.push(("ServiceNo", service.to_string()));
        }

        let body = self.fetcher.fetch(ARRIVAL_ENDPOINT, &query).await?;
        serde_json::from_slice(&body).map_err(|e| {
            Error::Fetch(TransitError::SerializationError(format!(
                "{ARRIVAL_ENDPOINT} for stop {stop}: {e}"
            )))
        })
    }

    /// Fetch, normalize against `now` and append every service to `log`.
    ///
    /// Nothing is deduplicated; calling twice records two observations.
    pub async fn ingest(
        &self,
        log: &ArrivalLog,
        stop: &BusStopCode,
        service: Option<&ServiceNo>,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<StoredArrival>> {
        let response = self.fetch(stop, service).await?;

        let mut stored = Vec::with_capacity(response.services.len());
        for entry in &response.services {
            let document = ArrivalDocument::from_service(stop, entry, now);
            stored.push(log.insert(&document)?);
        }

        info!(stop = %stop, services = stored.len(), "Arrival data recorded");
        Ok(stored)
    }
}
