//! In-process fakes shared by the unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use half_ryd_transit::{DataFetcher, Query, TransitError};

/// Answers requests from a table keyed by `endpoint?k=v&k=v`.
///
/// Unknown requests fail with HTTP 404. Every request is recorded.
#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    responses: HashMap<String, Result<Vec<u8>, u16>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn respond(mut self, request: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(request.to_owned(), Ok(body.into()));
        self
    }

    pub fn fail(mut self, request: &str, status: u16) -> Self {
        self.responses.insert(request.to_owned(), Err(status));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn request_key(endpoint: &str, query: &Query<'_>) -> String {
    if query.is_empty() {
        return endpoint.to_owned();
    }
    let params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{endpoint}?{}", params.join("&"))
}

impl DataFetcher for ScriptedFetcher {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        query: &'a Query<'a>,
    ) -> Pin<Box<dyn Future<Output = half_ryd_transit::Result<Vec<u8>>> + Send + 'a>> {
        let key = request_key(endpoint, query);
        self.requests.lock().unwrap().push(key.clone());

        let result = match self.responses.get(&key) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(TransitError::HttpStatus {
                endpoint: endpoint.to_owned(),
                status: *status,
            }),
            None => Err(TransitError::HttpStatus {
                endpoint: endpoint.to_owned(),
                status: 404,
            }),
        };
        Box::pin(async move { result })
    }
}

/// A `BusStops` page with `count` stops numbered from `start`.
pub(crate) fn stops_page(start: usize, count: usize) -> String {
    let stops: Vec<serde_json::Value> = (start..start + count)
        .map(|i| {
            serde_json::json!({
                "BusStopCode": format!("{i:05}"),
                "RoadName": "Victoria St",
                "Description": format!("Stop {i}"),
                "Latitude": 1.3,
                "Longitude": 103.8,
            })
        })
        .collect();
    serde_json::json!({ "value": stops }).to_string()
}
