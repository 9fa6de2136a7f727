use chrono::{NaiveDate, NaiveDateTime};

/// Identity and clock for one engine operation, supplied explicitly by the
/// caller. Keeping these out of ambient state makes every operation
/// deterministic and unit-testable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    /// The acting user; recorded as imported_by / matched_by / created_by.
    pub user_id: i32,
    /// The operation timestamp; recorded wherever a "when" is persisted.
    pub now: NaiveDateTime,
}

impl OperationContext {
    pub fn new(user_id: i32, now: NaiveDateTime) -> Self {
        Self { user_id, now }
    }

    /// The operation date, for date-typed fields like payment dates.
    pub fn today(&self) -> NaiveDate {
        self.now.date()
    }
}
