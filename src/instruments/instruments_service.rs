use log::{debug, warn};
use std::sync::Arc;

use crate::remote::RemoteInstrumentStore;

use super::instruments_errors::{InstrumentError, Result};
use super::instruments_model::{Instrument, InstrumentForm, InstrumentType};
use super::instruments_traits::{
    FailureReporter, FieldValidator, InstrumentRepositoryTrait, InstrumentServiceTrait,
};
use super::instruments_update::build_update;
use super::instruments_validation;

/// Result of a commit. A populated `mirror_error` means the remote write
/// stands but the local cache could not be refreshed.
#[derive(Debug)]
pub struct CommitOutcome {
    pub instrument: Instrument,
    pub mirror_error: Option<InstrumentError>,
}

impl CommitOutcome {
    pub fn is_degraded(&self) -> bool {
        self.mirror_error.is_some()
    }
}

/// Sequences the two-phase persistence: remote conditional upsert first,
/// local cache mirror second.
pub struct InstrumentService {
    remote: Arc<dyn RemoteInstrumentStore>,
    repository: Arc<dyn InstrumentRepositoryTrait>,
    validator: Arc<dyn FieldValidator>,
    reporter: Arc<dyn FailureReporter>,
}

impl InstrumentService {
    pub fn new(
        remote: Arc<dyn RemoteInstrumentStore>,
        repository: Arc<dyn InstrumentRepositoryTrait>,
        validator: Arc<dyn FieldValidator>,
        reporter: Arc<dyn FailureReporter>,
    ) -> Self {
        Self {
            remote,
            repository,
            validator,
            reporter,
        }
    }

    /// Cached copy of a record, if this device has mirrored it before.
    pub fn get_cached(&self, symbol: &str) -> Result<Instrument> {
        self.repository.get_by_symbol(symbol)
    }
}

#[async_trait::async_trait]
impl InstrumentServiceTrait for InstrumentService {
    fn validate_for_submission(&self, form: &InstrumentForm) -> Result<()> {
        instruments_validation::validate_for_submission(form, self.validator.as_ref())
    }

    async fn commit(
        &self,
        form: &InstrumentForm,
        previous_type: Option<InstrumentType>,
    ) -> Result<CommitOutcome> {
        self.validate_for_submission(form)?;

        let symbol = form.normalized_symbol();
        let update = build_update(form, previous_type)?;

        // Phase 1: the authoritative write. Any failure aborts the commit
        // and propagates verbatim.
        let instrument = self.remote.upsert(&symbol, &update).await?;
        debug!("Remote upsert for {} succeeded", symbol);

        // Phase 2: mirror the complete record. The remote state already
        // changed, so a failure here is reported but never rolls back.
        let mirror_error = self
            .repository
            .ensure_schema()
            .and_then(|_| self.repository.mirror(&instrument))
            .err()
            .map(|e| InstrumentError::CacheMirror(e.to_string()));

        if let Some(error) = &mirror_error {
            warn!("Cache mirror for {} failed: {}", symbol, error);
            self.reporter.report(error);
        }

        Ok(CommitOutcome {
            instrument,
            mirror_error,
        })
    }
}
