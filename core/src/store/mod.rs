//! Snapshot persistence.
//!
//! A store holds exactly one portfolio. `save` replaces the whole stored
//! snapshot atomically; there is no incremental diff at this boundary.
//! Both directions return data whose derived fields are rolled up.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::portfolio::Portfolio;

pub trait SnapshotStore {
    /// Current snapshot, rolled up and validated, carrying the stored revision.
    fn load(&self) -> Result<Portfolio>;

    /// Replace the stored snapshot with `portfolio`.
    ///
    /// Fails with [`crate::TrackerError::StaleSnapshot`] when the store has
    /// moved past `portfolio.revision()`. Returns the new revision. On any
    /// error nothing is written.
    fn save(&mut self, portfolio: &Portfolio) -> Result<u64>;
}
