pub mod record;
pub mod target;
pub mod outcome;
pub mod summary;

pub use record::{CanonicalRecord, TaggedRecord};
pub use target::{Capability, InstrumentType, ProviderId, Target};
pub use outcome::{FailureKind, FetchFailure, FetchOutcome};
pub use summary::{GroupResult, RunSummary, SeriesSummary, Signal, StatusLogEntry, TechnicalSignalSet};
