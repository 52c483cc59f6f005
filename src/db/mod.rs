//! Database layer (Firestore).

pub mod firestore;

pub use firestore::TrackingDb;

/// Collection names as constants.
pub mod collections {
    /// Trip tracking aggregates (keyed by trip_id)
    pub const TRIP_TRACKING: &str = "trip_tracking";
}
