//! Core traits for the reference catalog.
//!
//! These traits define the read interface for stops, services and routes.
//! Implementations can be in-memory, database-backed, or remote.

use crate::identifiers::*;
use crate::models::catalog::*;

/// Read access to the reference catalog.
pub trait Catalog {
    type Error;

    // ---- Lookups ----
    fn stop(&self, code: &BusStopCode) -> Result<Option<BusStop>, Self::Error>;
    fn service(&self, service_no: &ServiceNo) -> Result<Option<BusService>, Self::Error>;

    /// Stops served by a service, ordered by direction then stop sequence
    fn routes_for_service(&self, service_no: &ServiceNo) -> Result<Vec<BusRoute>, Self::Error>;

    // ---- Collections ----
    fn all_stops(&self) -> Result<Vec<BusStop>, Self::Error>;
    fn all_services(&self) -> Result<Vec<BusService>, Self::Error>;
    fn all_routes(&self) -> Result<Vec<BusRoute>, Self::Error>;

    // ---- Existence ----
    fn has_stop(&self, code: &BusStopCode) -> Result<bool, Self::Error> {
        Ok(self.stop(code)?.is_some())
    }

    fn has_service(&self, service_no: &ServiceNo) -> Result<bool, Self::Error> {
        Ok(self.service(service_no)?.is_some())
    }
}
