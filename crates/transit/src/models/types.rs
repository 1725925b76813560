//! Core data types and enums for bus data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Enums
// ============================================================================

/// Passenger load reported by DataMall for an approaching bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumString)]
pub enum LoadLevel {
    #[strum(serialize = "SEA")]
    #[serde(rename = "[Green] Seats Available")]
    SeatsAvailable,
    #[strum(serialize = "SDA")]
    #[serde(rename = "[Amber] Standing Available")]
    StandingAvailable,
    #[strum(serialize = "LSD")]
    #[serde(rename = "[Red] Limited Standing")]
    LimitedStanding,
    #[strum(disabled)]
    #[serde(rename = "Unknown")]
    Unknown,
}

impl LoadLevel {
    /// Map a raw load code. Missing or unrecognised codes become `Unknown`.
    pub fn from_code(code: Option<&str>) -> Self {
        code.and_then(|c| c.parse().ok()).unwrap_or(Self::Unknown)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::SeatsAvailable => "[Green] Seats Available",
            Self::StandingAvailable => "[Amber] Standing Available",
            Self::LimitedStanding => "[Red] Limited Standing",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Vehicle body type (`SD` single deck, `DD` double deck, `BD` bendy)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumString, strum::Display,
)]
pub enum VehicleType {
    #[strum(serialize = "SD", to_string = "Single Deck")]
    #[serde(rename = "SD")]
    SingleDeck,
    #[strum(serialize = "DD", to_string = "Double Deck")]
    #[serde(rename = "DD")]
    DoubleDeck,
    #[strum(serialize = "BD", to_string = "Bendy")]
    #[serde(rename = "BD")]
    Bendy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum OperationStatus {
    #[strum(to_string = "Bus is in operation")]
    #[serde(rename = "Bus is in operation")]
    InOperation,
    #[strum(to_string = "Bus is NOT in operation")]
    #[serde(rename = "Bus is NOT in operation")]
    NotInOperation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum ArrivalStatus {
    #[strum(to_string = "Arrival data is available")]
    #[serde(rename = "Arrival data is available")]
    Available,
    #[strum(to_string = "Arrival data is NOT available (No Est. Available)")]
    #[serde(rename = "Arrival data is NOT available (No Est. Available)")]
    NotAvailable,
}

// ============================================================================
// Wire helpers
// ============================================================================

/// DataMall sends `""` instead of omitting a field; treat blank strings as absent.
pub(crate) fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransitError {
    #[error("Invalid bus stop code {0:?}: expected a 5-digit number")]
    InvalidStopCode(String),

    #[error("Invalid service number {0:?}")]
    InvalidServiceNo(String),

    #[error("Invalid date {0:?}: expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Request to {endpoint} failed with status code {status}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for TransitError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

impl TransitError {
    /// True for errors caused by malformed user input rather than I/O.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidStopCode(_) | Self::InvalidServiceNo(_) | Self::InvalidDate(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransitError>;

/// Parse a `YYYY-MM-DD` date as typed by a user.
pub fn parse_date(s: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| TransitError::InvalidDate(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_level_from_code() {
        assert_eq!(LoadLevel::from_code(Some("SEA")), LoadLevel::SeatsAvailable);
        assert_eq!(LoadLevel::from_code(Some("SDA")), LoadLevel::StandingAvailable);
        assert_eq!(LoadLevel::from_code(Some("LSD")), LoadLevel::LimitedStanding);
        assert_eq!(LoadLevel::from_code(Some("XYZ")), LoadLevel::Unknown);
        assert_eq!(LoadLevel::from_code(None), LoadLevel::Unknown);

        assert_eq!(LoadLevel::SeatsAvailable.label(), "[Green] Seats Available");
        assert_eq!(LoadLevel::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn test_load_level_serializes_as_label() {
        let json = serde_json::to_string(&LoadLevel::LimitedStanding).unwrap();
        assert_eq!(json, "\"[Red] Limited Standing\"");
        let back: LoadLevel = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LoadLevel::LimitedStanding);
    }

    #[test]
    fn test_vehicle_type_codes() {
        assert_eq!("DD".parse::<VehicleType>().unwrap(), VehicleType::DoubleDeck);
        assert_eq!(VehicleType::Bendy.to_string(), "Bendy");
        assert!("XX".parse::<VehicleType>().is_err());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(OperationStatus::InOperation.to_string(), "Bus is in operation");
        assert_eq!(
            ArrivalStatus::NotAvailable.to_string(),
            "Arrival data is NOT available (No Est. Available)"
        );
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2023-08-01").unwrap();
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2023, 8, 1).unwrap());
        assert!(matches!(parse_date("01/08/2023"), Err(TransitError::InvalidDate(_))));
        assert!(parse_date("2023-02-30").is_err());
    }
}
