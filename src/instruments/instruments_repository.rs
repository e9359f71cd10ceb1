use diesel::prelude::*;
use std::sync::Arc;

use crate::db::{self, DbPool};
use crate::schema::instruments;

use super::instruments_errors::{InstrumentError, Result};
use super::instruments_model::{Instrument, InstrumentDB};
use super::instruments_traits::InstrumentRepositoryTrait;

/// Repository for the local cache mirror of instrument records.
pub struct InstrumentRepository {
    pool: Arc<DbPool>,
}

impl InstrumentRepository {
    /// Creates a new InstrumentRepository instance
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }
}

impl InstrumentRepositoryTrait for InstrumentRepository {
    fn ensure_schema(&self) -> Result<()> {
        db::ensure_schema(&self.pool).map_err(InstrumentError::from)
    }

    fn mirror(&self, instrument: &Instrument) -> Result<()> {
        let row = InstrumentDB::from(instrument);
        let mut conn = db::get_connection(&self.pool)?;

        conn.immediate_transaction::<_, InstrumentError, _>(|conn| {
            diesel::replace_into(instruments::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
    }

    fn get_by_symbol(&self, symbol: &str) -> Result<Instrument> {
        let mut conn = db::get_connection(&self.pool)?;

        let row = instruments::table
            .find(symbol)
            .first::<InstrumentDB>(&mut conn)?;

        Instrument::try_from(row)
    }
}
