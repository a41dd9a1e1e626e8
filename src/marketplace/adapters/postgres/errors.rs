//! Classification of Diesel failures into storage errors.

use crate::marketplace::ports::StoreError;
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};

/// Unique indexes whose violation means a concurrent writer won a race.
const RACE_GUARD_INDEXES: [&str; 2] = ["idx_bids_one_accepted_per_task", "idx_bids_idempotency_key"];

/// Maps a Diesel error onto the storage taxonomy.
///
/// Serialization failures and race-guard index violations are aborts;
/// dropped connections are unavailability. Everything else is persistent.
pub fn classify(err: DieselError) -> StoreError {
    match &err {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            StoreError::aborted(err)
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if is_race_guard(info.as_ref()) =>
        {
            StoreError::aborted(err)
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            StoreError::unavailable(err)
        }
        _ => StoreError::persistence(err),
    }
}

/// Returns `true` when `err` is a primary-key collision.
pub fn is_primary_key_violation(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name().is_some_and(|name| name.ends_with("_pkey"))
    )
}

fn is_race_guard(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| RACE_GUARD_INDEXES.contains(&name))
}

/// Converts an affected-row count to the port's counter type.
pub fn affected(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}
