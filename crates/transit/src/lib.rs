//! # half-ryd-transit
//!
//! Domain vocabulary for the Half Ryd bus tracker.
//!
//! ## Features
//!
//! - **Validated identifiers**: bus stop codes and service numbers are checked once, at the edge
//! - **Reference catalog records**: stops, services and routes in the DataMall wire format
//! - **Arrival documents**: normalized real-time arrival observations
//! - **Pluggable networking**: implement [`DataFetcher`] to supply API responses
//!
//! ## Example
//!
//! ```
//! use half_ryd_transit::prelude::*;
//!
//! let stop = BusStopCode::parse("01012").unwrap();
//! assert_eq!(stop.as_str(), "01012");
//! assert!(BusStopCode::parse("1012").is_err());
//!
//! let load = LoadLevel::from_code(Some("SEA"));
//! assert_eq!(load.label(), "[Green] Seats Available");
//! assert_eq!(LoadLevel::from_code(Some("XYZ")).label(), "Unknown");
//! ```

pub mod identifiers;
pub mod models;
pub mod network;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{arrival::*, catalog::*, traits::*, types::*};
    pub use crate::network::traits::*;
}

pub use prelude::*;
