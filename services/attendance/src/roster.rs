//! Roster provider
//!
//! The active student list is owned elsewhere; the attendance core only
//! reads it through this seam.

use async_trait::async_trait;

use common::error::StoreResult;

use crate::models::Student;

/// Supplies the active student list, ordered by grade then last name.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn list_active_students(&self) -> StoreResult<Vec<Student>>;
}
