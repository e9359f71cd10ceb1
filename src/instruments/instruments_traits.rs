use log::error;

use super::instruments_errors::{InstrumentError, Result};
use super::instruments_model::{Instrument, InstrumentForm, InstrumentType};
use super::instruments_service::CommitOutcome;

/// Trait defining the contract for instrument service operations.
#[async_trait::async_trait]
pub trait InstrumentServiceTrait: Send + Sync {
    fn validate_for_submission(&self, form: &InstrumentForm) -> Result<()>;
    async fn commit(
        &self,
        form: &InstrumentForm,
        previous_type: Option<InstrumentType>,
    ) -> Result<CommitOutcome>;
}

/// Trait defining the contract for the local cache repository.
pub trait InstrumentRepositoryTrait: Send + Sync {
    /// Idempotent schema creation; safe to call before every mirror write.
    fn ensure_schema(&self) -> Result<()>;
    /// Overwrite-or-insert of the complete record inside one transaction.
    fn mirror(&self, instrument: &Instrument) -> Result<()>;
    fn get_by_symbol(&self, symbol: &str) -> Result<Instrument>;
}

/// External single-field validation primitive. Implementations reject a
/// field by returning a `Validation` error.
pub trait FieldValidator: Send + Sync {
    fn validate(&self, field: &str, value: &str) -> Result<()>;
}

/// Single sink for every failure that is not "record not found".
pub trait FailureReporter: Send + Sync {
    fn report(&self, error: &InstrumentError);
}

/// Default reporter: logs through the `log` facade.
pub struct LogFailureReporter;

impl FailureReporter for LogFailureReporter {
    fn report(&self, error: &InstrumentError) {
        error!("Instrument operation failed: {}", error);
    }
}
