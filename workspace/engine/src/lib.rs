//! The reconciliation engine: importing bank statement files, scoring
//! match suggestions against open installments, confirming or ignoring
//! matches, and closing accounting periods.
//!
//! Every public operation runs inside a single database transaction and
//! takes an explicit [`OperationContext`] (identity + clock) — the engine
//! never reads ambient time or user state.

pub mod close;
pub mod context;
pub mod error;
pub mod events;
pub mod import;
pub mod payments;
pub mod resolve;
pub mod storage;
pub mod suggest;

#[cfg(test)]
pub(crate) mod testing;

pub use close::{CloseRequest, PeriodCloser};
pub use context::OperationContext;
pub use error::{EngineError, Result};
pub use events::{EventSink, LogEventSink};
pub use import::{ImportOverrides, StatementImporter, UploadedFile};
pub use payments::{DbPayments, InstallmentPayments};
pub use resolve::MatchResolver;
pub use storage::{BlobStorage, FsStorage, MemoryStorage};
pub use suggest::SuggestionEngine;
