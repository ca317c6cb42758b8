//! Time-ordered identifiers.
//!
//! Rooms, messages and log entries get UUIDv7 ids generated app-side so that
//! id order roughly follows creation order. Users keep PostgreSQL's
//! `gen_random_uuid()` (v4).

use uuid::Uuid;

/// Generate a new UUIDv7 (timestamp-sortable).
pub fn uuidv7() -> Uuid {
    Uuid::now_v7()
}
