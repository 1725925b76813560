//! Reference catalog tables (`BusStops`, `BusServices`, `BusRoutes`).

use std::str::FromStr;

use half_ryd_transit::{
    BusRoute, BusService, BusStop, BusStopCode, Catalog, Dataset, ServiceNo, TransitError,
};
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Params, Row};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// A DataMall record that lives in one relational table.
///
/// `COLUMNS` fixes the column order shared by [`values`](Self::values),
/// [`from_row`](Self::from_row) and every generated statement. The natural
/// key decides whether a fetched record is already present.
pub trait CatalogRecord: Dataset + DeserializeOwned + Sized {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const KEY_COLUMNS: &'static [&'static str];
    const ORDER_BY: &'static str;

    /// Natural key values, in `KEY_COLUMNS` order
    fn key(&self) -> Vec<Value>;

    /// Column values, in `COLUMNS` order
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

pub(crate) fn select_sql<R: CatalogRecord>() -> String {
    format!("SELECT {} FROM {}", R::COLUMNS.join(", "), R::TABLE)
}

pub(crate) fn exists_sql<R: CatalogRecord>() -> String {
    let condition: Vec<String> = R::KEY_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{column} = ?{}", i + 1))
        .collect();
    format!("SELECT 1 FROM {} WHERE {} LIMIT 1", R::TABLE, condition.join(" AND "))
}

pub(crate) fn insert_sql<R: CatalogRecord>() -> String {
    let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        R::TABLE,
        R::COLUMNS.join(", "),
        placeholders.join(", ")
    )
}

// ============================================================================
// Row helpers
// ============================================================================

fn conversion_error(idx: usize, err: TransitError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn ident<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = TransitError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn optional_ident<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = TransitError>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn text(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
}

fn text_value(s: &str) -> Value {
    Value::Text(s.to_owned())
}

fn optional_text_value(s: Option<&str>) -> Value {
    s.map_or(Value::Null, text_value)
}

// ============================================================================
// Records
// ============================================================================

impl CatalogRecord for BusStop {
    const TABLE: &'static str = "BusStops";
    const COLUMNS: &'static [&'static str] =
        &["BusStopCode", "RoadName", "Description", "Latitude", "Longitude"];
    const KEY_COLUMNS: &'static [&'static str] = &["BusStopCode"];
    const ORDER_BY: &'static str = "BusStopCode";

    fn key(&self) -> Vec<Value> {
        vec![text_value(self.bus_stop_code.as_str())]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(self.bus_stop_code.as_str()),
            text_value(&self.road_name),
            text_value(&self.description),
            Value::Real(self.latitude),
            Value::Real(self.longitude),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            bus_stop_code: ident(row, 0)?,
            road_name: text(row, 1)?,
            description: text(row, 2)?,
            latitude: row.get(3)?,
            longitude: row.get(4)?,
        })
    }
}

impl CatalogRecord for BusService {
    const TABLE: &'static str = "BusServices";
    const COLUMNS: &'static [&'static str] = &[
        "ServiceNo",
        "Operator",
        "Direction",
        "Category",
        "OriginCode",
        "DestinationCode",
        "AM_Peak_Freq",
        "AM_Offpeak_Freq",
        "PM_Peak_Freq",
        "PM_Offpeak_Freq",
        "LoopDesc",
    ];
    const KEY_COLUMNS: &'static [&'static str] = &["ServiceNo"];
    const ORDER_BY: &'static str = "ServiceNo";

    fn key(&self) -> Vec<Value> {
        vec![text_value(self.service_no.as_str())]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(self.service_no.as_str()),
            text_value(&self.operator),
            Value::Integer(self.direction),
            text_value(&self.category),
            optional_text_value(self.origin_code.as_ref().map(BusStopCode::as_str)),
            optional_text_value(self.destination_code.as_ref().map(BusStopCode::as_str)),
            text_value(&self.am_peak_freq),
            text_value(&self.am_offpeak_freq),
            text_value(&self.pm_peak_freq),
            text_value(&self.pm_offpeak_freq),
            text_value(&self.loop_desc),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            service_no: ident(row, 0)?,
            operator: text(row, 1)?,
            direction: row.get(2)?,
            category: text(row, 3)?,
            origin_code: optional_ident(row, 4)?,
            destination_code: optional_ident(row, 5)?,
            am_peak_freq: text(row, 6)?,
            am_offpeak_freq: text(row, 7)?,
            pm_peak_freq: text(row, 8)?,
            pm_offpeak_freq: text(row, 9)?,
            loop_desc: text(row, 10)?,
        })
    }
}

impl CatalogRecord for BusRoute {
    const TABLE: &'static str = "BusRoutes";
    const COLUMNS: &'static [&'static str] = &[
        "ServiceNo",
        "Operator",
        "Direction",
        "StopSequence",
        "BusStopCode",
        "Distance",
        "WD_FirstBus",
        "WD_LastBus",
        "SAT_FirstBus",
        "SAT_LastBus",
        "SUN_FirstBus",
        "SUN_LastBus",
    ];
    // Direction and sequence are part of the key: loop services visit the
    // same stop more than once.
    const KEY_COLUMNS: &'static [&'static str] =
        &["ServiceNo", "Direction", "StopSequence", "BusStopCode"];
    const ORDER_BY: &'static str = "ServiceNo, Direction, StopSequence";

    fn key(&self) -> Vec<Value> {
        vec![
            text_value(self.service_no.as_str()),
            Value::Integer(self.direction),
            Value::Integer(self.stop_sequence),
            text_value(self.bus_stop_code.as_str()),
        ]
    }

    fn values(&self) -> Vec<Value> {
        vec![
            text_value(self.service_no.as_str()),
            text_value(&self.operator),
            Value::Integer(self.direction),
            Value::Integer(self.stop_sequence),
            text_value(self.bus_stop_code.as_str()),
            self.distance.map_or(Value::Null, Value::Real),
            text_value(&self.wd_first_bus),
            text_value(&self.wd_last_bus),
            text_value(&self.sat_first_bus),
            text_value(&self.sat_last_bus),
            text_value(&self.sun_first_bus),
            text_value(&self.sun_last_bus),
        ]
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            service_no: ident(row, 0)?,
            operator: text(row, 1)?,
            direction: row.get(2)?,
            stop_sequence: row.get(3)?,
            bus_stop_code: ident(row, 4)?,
            distance: row.get(5)?,
            wd_first_bus: text(row, 6)?,
            wd_last_bus: text(row, 7)?,
            sat_first_bus: text(row, 8)?,
            sat_last_bus: text(row, 9)?,
            sun_first_bus: text(row, 10)?,
            sun_last_bus: text(row, 11)?,
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Read side of the reference tables.
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn select<R: CatalogRecord>(&self, condition: &str, params: impl Params) -> Result<Vec<R>> {
        let sql = format!("{} {condition} ORDER BY {}", select_sql::<R>(), R::ORDER_BY);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let records = stmt
            .query_map(params, |row| R::from_row(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn all<R: CatalogRecord>(&self) -> Result<Vec<R>> {
        self.select("", [])
    }

    /// Rows whose `column` equals `value`.
    ///
    /// The column name is matched case-insensitively against the table's
    /// known columns; anything else is a validation error.
    pub fn filter<R: CatalogRecord>(&self, column: &str, value: &str) -> Result<Vec<R>> {
        let column = R::COLUMNS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                Error::Validation(TransitError::InvalidData(format!(
                    "{} has no column {column:?}",
                    R::TABLE
                )))
            })?;

        self.select(&format!("WHERE {column} = ?1"), [value])
    }
}

impl Catalog for SqliteCatalog<'_> {
    type Error = Error;

    fn stop(&self, code: &BusStopCode) -> Result<Option<BusStop>> {
        let mut stops = self.select::<BusStop>("WHERE BusStopCode = ?1", [code.as_str()])?;
        Ok(stops.pop())
    }

    fn service(&self, service_no: &ServiceNo) -> Result<Option<BusService>> {
        let mut services =
            self.select::<BusService>("WHERE ServiceNo = ?1", [service_no.as_str()])?;
        Ok(services.pop())
    }

    fn routes_for_service(&self, service_no: &ServiceNo) -> Result<Vec<BusRoute>> {
        self.select("WHERE ServiceNo = ?1", [service_no.as_str()])
    }

    fn all_stops(&self) -> Result<Vec<BusStop>> {
        self.all()
    }

    fn all_services(&self) -> Result<Vec<BusService>> {
        self.all()
    }

    fn all_routes(&self) -> Result<Vec<BusRoute>> {
        self.all()
    }
}
