//! Bus data models, types, and traits.

pub mod arrival;
pub mod catalog;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use arrival::{ArrivalDocument, ArrivalResponse, NextBus, NextBusSnapshot, ServiceArrival};
pub use catalog::{BusRoute, BusService, BusStop, Dataset};
pub use traits::Catalog;
pub use types::{ArrivalStatus, LoadLevel, OperationStatus, Result, TransitError, VehicleType};
