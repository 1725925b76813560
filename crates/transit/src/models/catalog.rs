//! Reference catalog records as published by DataMall.
//!
//! Field names follow the DataMall JSON (PascalCase with a few
//! underscore-separated frequency and timing columns).

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::types::empty_as_none;

/// A record type served by one paginated DataMall endpoint.
pub trait Dataset {
    /// Endpoint path relative to the API base URL, e.g. `BusStops`
    const ENDPOINT: &'static str;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BusStop {
    pub bus_stop_code: BusStopCode,
    #[serde(default)]
    pub road_name: String,
    #[serde(default)]
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl BusStop {
    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

impl Dataset for BusStop {
    const ENDPOINT: &'static str = "BusStops";
}

/// Service frequencies are ranges in minutes (`"08-12"`), kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BusService {
    pub service_no: ServiceNo,
    #[serde(default)]
    pub operator: String,
    pub direction: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub origin_code: Option<BusStopCode>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub destination_code: Option<BusStopCode>,
    #[serde(rename = "AM_Peak_Freq", default)]
    pub am_peak_freq: String,
    #[serde(rename = "AM_Offpeak_Freq", default)]
    pub am_offpeak_freq: String,
    #[serde(rename = "PM_Peak_Freq", default)]
    pub pm_peak_freq: String,
    #[serde(rename = "PM_Offpeak_Freq", default)]
    pub pm_offpeak_freq: String,
    #[serde(default)]
    pub loop_desc: String,
}

impl Dataset for BusService {
    const ENDPOINT: &'static str = "BusServices";
}

/// One stop along one direction of a service.
///
/// First/last bus times are `HHMM` strings; DataMall uses `"-"` when the
/// service does not run on that day type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BusRoute {
    pub service_no: ServiceNo,
    #[serde(default)]
    pub operator: String,
    pub direction: i64,
    pub stop_sequence: i64,
    pub bus_stop_code: BusStopCode,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(rename = "WD_FirstBus", default)]
    pub wd_first_bus: String,
    #[serde(rename = "WD_LastBus", default)]
    pub wd_last_bus: String,
    #[serde(rename = "SAT_FirstBus", default)]
    pub sat_first_bus: String,
    #[serde(rename = "SAT_LastBus", default)]
    pub sat_last_bus: String,
    #[serde(rename = "SUN_FirstBus", default)]
    pub sun_first_bus: String,
    #[serde(rename = "SUN_LastBus", default)]
    pub sun_last_bus: String,
}

impl Dataset for BusRoute {
    const ENDPOINT: &'static str = "BusRoutes";
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bus_stop_from_datamall() {
        let json = r#"{
            "BusStopCode": "01012",
            "RoadName": "Victoria St",
            "Description": "Hotel Grand Pacific",
            "Latitude": 1.29684825487647,
            "Longitude": 103.85253591654006
        }"#;
        let stop: BusStop = serde_json::from_str(json).unwrap();

        assert_eq!(stop.bus_stop_code.as_str(), "01012");
        assert_eq!(stop.road_name, "Victoria St");
        assert_relative_eq!(stop.location().x(), 103.85253591654006);
        assert_relative_eq!(stop.location().y(), 1.29684825487647);
    }

    #[test]
    fn test_bus_service_blank_codes() {
        let json = r#"{
            "ServiceNo": "118",
            "Operator": "GAS",
            "Direction": 1,
            "Category": "TRUNK",
            "OriginCode": "65009",
            "DestinationCode": "",
            "AM_Peak_Freq": "05-08",
            "AM_Offpeak_Freq": "10-16",
            "PM_Peak_Freq": "08-11",
            "PM_Offpeak_Freq": "12-15",
            "LoopDesc": ""
        }"#;
        let service: BusService = serde_json::from_str(json).unwrap();

        assert_eq!(service.service_no.as_str(), "118");
        assert_eq!(service.origin_code.as_ref().map(|c| c.as_str()), Some("65009"));
        assert_eq!(service.destination_code, None);
        assert_eq!(service.am_peak_freq, "05-08");
    }

    #[test]
    fn test_bus_route_from_datamall() {
        let json = r#"{
            "ServiceNo": "10",
            "Operator": "SBST",
            "Direction": 1,
            "StopSequence": 2,
            "BusStopCode": "75019",
            "Distance": 0.6,
            "WD_FirstBus": "0500",
            "WD_LastBus": "2300",
            "SAT_FirstBus": "0500",
            "SAT_LastBus": "2300",
            "SUN_FirstBus": "-",
            "SUN_LastBus": "-"
        }"#;
        let route: BusRoute = serde_json::from_str(json).unwrap();

        assert_eq!(route.stop_sequence, 2);
        assert_relative_eq!(route.distance.unwrap(), 0.6);
        assert_eq!(route.sun_first_bus, "-");
    }

    #[test]
    fn test_malformed_stop_code_rejected() {
        let json = r#"{"BusStopCode": "1012", "Latitude": 0.0, "Longitude": 0.0}"#;
        assert!(serde_json::from_str::<BusStop>(json).is_err());
    }
}
