use async_trait::async_trait;

use crate::instruments::instruments_errors::Result;
use crate::instruments::{Instrument, InstrumentUpdate};

/// The authoritative, network-accessible document store for instrument
/// records, keyed by symbol.
#[async_trait]
pub trait RemoteInstrumentStore: Send + Sync {
    /// Looks up at most one record. Absence is `Ok(None)`, never an error.
    async fn find_by_symbol(&self, symbol: &str) -> Result<Option<Instrument>>;

    /// Conditional update-or-insert: layers the update's `$set` (and
    /// explicit unsets) over `$setOnInsert` against the keyed record,
    /// inserting it if absent. Returns the complete stored record.
    async fn upsert(&self, symbol: &str, update: &InstrumentUpdate) -> Result<Instrument>;
}
