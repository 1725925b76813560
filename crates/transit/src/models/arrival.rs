//! Real-time arrival data: the `BusArrivalv2` wire format and the
//! normalized documents kept in the arrival history.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::types::*;

/// Endpoint path of the real-time arrival API.
pub const ARRIVAL_ENDPOINT: &str = "BusArrivalv2";

// ============================================================================
// Wire format
// ============================================================================

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrivalResponse {
    #[serde(default)]
    pub services: Vec<ServiceArrival>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceArrival {
    pub service_no: ServiceNo,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub next_bus: Option<NextBus>,
    #[serde(default)]
    pub next_bus2: Option<NextBus>,
    #[serde(default)]
    pub next_bus3: Option<NextBus>,
}

/// One approaching bus. Every field may be blank when no bus is scheduled.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NextBus {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub estimated_arrival: Option<DateTime<FixedOffset>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub load: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub feature: Option<String>,
    #[serde(rename = "Type", default, deserialize_with = "empty_as_none")]
    pub vehicle_type: Option<String>,
}

impl NextBus {
    pub fn load_level(&self) -> LoadLevel {
        LoadLevel::from_code(self.load.as_deref())
    }

    pub fn wheelchair_accessible(&self) -> bool {
        self.feature.as_deref() == Some("WAB")
    }

    /// Unrecognised vehicle codes are dropped rather than rejected.
    pub fn vehicle_type(&self) -> Option<VehicleType> {
        self.vehicle_type.as_deref().and_then(|t| t.parse().ok())
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Nested snapshot of the second or third approaching bus.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NextBusSnapshot {
    pub estimated_arrival: Option<DateTime<FixedOffset>>,
    pub load: LoadLevel,
    pub wheelchair_accessible: bool,
}

impl From<&NextBus> for NextBusSnapshot {
    fn from(bus: &NextBus) -> Self {
        Self {
            estimated_arrival: bus.estimated_arrival,
            load: bus.load_level(),
            wheelchair_accessible: bus.wheelchair_accessible(),
        }
    }
}

/// One observation of one service at one stop, stamped with the date it was taken.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ArrivalDocument {
    pub bus_stop_code: BusStopCode,
    pub service_no: ServiceNo,
    pub operation_status: OperationStatus,
    pub arrival_status: ArrivalStatus,
    /// Countdown label such as `"3 mins"`
    pub estimated_arrival: Option<String>,
    pub load: LoadLevel,
    pub wheelchair_accessible: bool,
    pub vehicle_type: Option<VehicleType>,
    pub next_bus2: Option<NextBusSnapshot>,
    pub next_bus3: Option<NextBusSnapshot>,
    pub date: NaiveDate,
}

impl ArrivalDocument {
    /// Normalize one service entry of an arrival response.
    ///
    /// `now` provides both the countdown reference and the date stamp.
    pub fn from_service(
        bus_stop_code: &BusStopCode,
        service: &ServiceArrival,
        now: DateTime<FixedOffset>,
    ) -> Self {
        let next_bus = service.next_bus.clone().unwrap_or_default();
        let eta = next_bus.estimated_arrival;

        let (operation_status, arrival_status) = if eta.is_some() {
            (OperationStatus::InOperation, ArrivalStatus::Available)
        } else {
            (OperationStatus::NotInOperation, ArrivalStatus::NotAvailable)
        };

        Self {
            bus_stop_code: bus_stop_code.clone(),
            service_no: service.service_no.clone(),
            operation_status,
            arrival_status,
            estimated_arrival: eta.map(|eta| countdown_label(minutes_until(eta, now))),
            load: next_bus.load_level(),
            wheelchair_accessible: next_bus.wheelchair_accessible(),
            vehicle_type: next_bus.vehicle_type(),
            next_bus2: service.next_bus2.as_ref().map(NextBusSnapshot::from),
            next_bus3: service.next_bus3.as_ref().map(NextBusSnapshot::from),
            date: now.date_naive(),
        }
    }
}

/// Whole minutes from `now` until `eta`, truncated.
///
/// A bus already in the past (clock skew between us and DataMall) counts as 0.
pub fn minutes_until(eta: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> i64 {
    (eta - now).num_minutes().max(0)
}

pub fn countdown_label(minutes: i64) -> String {
    format!("{minutes} mins")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2023-08-01T09:00:00+08:00").unwrap()
    }

    const RESPONSE: &str = r#"{
        "odata.metadata": "http://datamall2.mytransport.sg/ltaodataservice/$metadata#BusArrivalv2/@Element",
        "BusStopCode": "83139",
        "Services": [
            {
                "ServiceNo": "15",
                "Operator": "GAS",
                "NextBus": {
                    "OriginCode": "77009",
                    "DestinationCode": "77009",
                    "EstimatedArrival": "2023-08-01T09:03:00+08:00",
                    "Latitude": "1.3154918333333334",
                    "Longitude": "103.9059125",
                    "VisitNumber": "1",
                    "Load": "SEA",
                    "Feature": "WAB",
                    "Type": "SD"
                },
                "NextBus2": {
                    "EstimatedArrival": "2023-08-01T09:15:30+08:00",
                    "Load": "SDA",
                    "Feature": "",
                    "Type": "DD"
                },
                "NextBus3": {
                    "EstimatedArrival": "",
                    "Load": "",
                    "Feature": "",
                    "Type": ""
                }
            },
            {
                "ServiceNo": "155",
                "Operator": "SBST",
                "NextBus": {"EstimatedArrival": "", "Load": "", "Feature": "", "Type": ""}
            }
        ]
    }"#;

    #[test]
    fn test_response_parsing() {
        let response: ArrivalResponse = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(response.services.len(), 2);

        let first = &response.services[0];
        let next_bus = first.next_bus.as_ref().unwrap();
        assert_eq!(next_bus.load_level(), LoadLevel::SeatsAvailable);
        assert!(next_bus.wheelchair_accessible());
        assert_eq!(next_bus.vehicle_type(), Some(VehicleType::SingleDeck));

        let third = first.next_bus3.as_ref().unwrap();
        assert!(third.estimated_arrival.is_none());
        assert!(third.load.is_none());
    }

    #[test]
    fn test_document_for_running_service() {
        let response: ArrivalResponse = serde_json::from_str(RESPONSE).unwrap();
        let stop = BusStopCode::parse("83139").unwrap();
        let doc = ArrivalDocument::from_service(&stop, &response.services[0], now());

        assert_eq!(doc.service_no.as_str(), "15");
        assert_eq!(doc.operation_status, OperationStatus::InOperation);
        assert_eq!(doc.arrival_status, ArrivalStatus::Available);
        assert_eq!(doc.estimated_arrival.as_deref(), Some("3 mins"));
        assert_eq!(doc.load, LoadLevel::SeatsAvailable);
        assert!(doc.wheelchair_accessible);
        assert_eq!(doc.date, NaiveDate::from_ymd_opt(2023, 8, 1).unwrap());

        let second = doc.next_bus2.as_ref().unwrap();
        assert_eq!(second.load, LoadLevel::StandingAvailable);
        assert!(!second.wheelchair_accessible);
        assert_eq!(
            second.estimated_arrival,
            Some(DateTime::parse_from_rfc3339("2023-08-01T09:15:30+08:00").unwrap())
        );

        let third = doc.next_bus3.as_ref().unwrap();
        assert_eq!(third.estimated_arrival, None);
        assert_eq!(third.load, LoadLevel::Unknown);
    }

    #[test]
    fn test_document_for_idle_service() {
        let response: ArrivalResponse = serde_json::from_str(RESPONSE).unwrap();
        let stop = BusStopCode::parse("83139").unwrap();
        let doc = ArrivalDocument::from_service(&stop, &response.services[1], now());

        assert_eq!(doc.operation_status, OperationStatus::NotInOperation);
        assert_eq!(doc.arrival_status, ArrivalStatus::NotAvailable);
        assert_eq!(doc.estimated_arrival, None);
        assert_eq!(doc.load, LoadLevel::Unknown);
        assert_eq!(doc.vehicle_type, None);
        assert!(doc.next_bus2.is_none());
    }

    #[test]
    fn test_minutes_until_truncates() {
        let now = now();
        assert_eq!(minutes_until(now + Duration::minutes(3), now), 3);
        assert_eq!(minutes_until(now + Duration::seconds(179), now), 2);
        assert_eq!(minutes_until(now, now), 0);
        // Clock skew: already departed
        assert_eq!(minutes_until(now - Duration::seconds(90), now), 0);
        assert_eq!(countdown_label(3), "3 mins");
    }

    #[test]
    fn test_document_json_shape() {
        let response: ArrivalResponse = serde_json::from_str(RESPONSE).unwrap();
        let stop = BusStopCode::parse("83139").unwrap();
        let doc = ArrivalDocument::from_service(&stop, &response.services[0], now());

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["ServiceNo"], "15");
        assert_eq!(value["Load"], "[Green] Seats Available");
        assert_eq!(value["Date"], "2023-08-01");
        assert_eq!(value["NextBus2"]["Load"], "[Amber] Standing Available");

        let back: ArrivalDocument = serde_json::from_value(value).unwrap();
        assert_eq!(back, doc);
    }
}
