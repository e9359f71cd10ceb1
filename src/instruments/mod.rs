pub(crate) mod instruments_constants;
pub(crate) mod instruments_errors;
pub(crate) mod instruments_model;
pub(crate) mod instruments_repository;
pub(crate) mod instruments_search;
pub(crate) mod instruments_service;
pub(crate) mod instruments_traits;
pub(crate) mod instruments_update;
pub(crate) mod instruments_validation;

// Re-export the public interface
pub use instruments_constants::*;
pub use instruments_model::{
    BondFields, CryptoFields, FutureFields, Instrument, InstrumentDetails, InstrumentForm,
    InstrumentType, ListedFields,
};
pub use instruments_repository::InstrumentRepository;
pub use instruments_search::{SearchController, SearchPhase, SearchState};
pub use instruments_service::{CommitOutcome, InstrumentService};
pub use instruments_traits::{
    FailureReporter, FieldValidator, InstrumentRepositoryTrait, InstrumentServiceTrait,
    LogFailureReporter,
};
pub use instruments_update::{build_update, FieldOp, InstrumentUpdate};
pub use instruments_validation::{validate_for_submission, RequiredFieldValidator};

// Re-export error types for convenience
pub use instruments_errors::{InstrumentError, Result};
