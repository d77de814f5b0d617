//! searoute SDK
//!
//! Typed client for route generation and versioned segment saves.

pub mod client;
pub mod error;

pub use client::{PendingSave, SeaRouteClient};
pub use error::ClientError;
pub use searoute_core::models::{DistanceUnits, RouteResponse};
pub use searoute_core::segment::{SaveSegmentResponse, SegmentRecord, SegmentSaveRequest};
