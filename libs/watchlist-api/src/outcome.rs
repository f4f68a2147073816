use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::mutation::InvalidInput;
use crate::record::Version;

/// Details of a lost race: the write targeted `expected`, but the record
/// had already moved on to `actual`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub expected: Version,
    pub actual: Version,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "record was modified by another writer (expected version {}, found {})",
            self.expected, self.actual
        )
    }
}

/// Result of every watchlist operation.
///
/// Each path produces exactly one variant; nothing is reported through
/// panics or hidden retries. Only `Conflict` is worth retrying, and only
/// after re-reading the record and re-deriving the change.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Applied(T),
    /// Target does not exist (never did, or was deleted).
    NotFound,
    /// Caller is not the record's owner.
    Forbidden,
    InvalidInput(InvalidInput),
    Conflict(Conflict),
    /// The store failed; says nothing about the record's state.
    StoreUnavailable(StoreError),
}

/// Data-free discriminant of `Outcome`, handy for tallies and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    Applied,
    NotFound,
    Forbidden,
    InvalidInput,
    Conflict,
    StoreUnavailable,
}

impl OutcomeClass {
    pub const ALL: [OutcomeClass; 6] = [
        OutcomeClass::Applied,
        OutcomeClass::NotFound,
        OutcomeClass::Forbidden,
        OutcomeClass::InvalidInput,
        OutcomeClass::Conflict,
        OutcomeClass::StoreUnavailable,
    ];

    /// Advisory transport status for this class. The engine itself never
    /// speaks HTTP; this is the mapping an HTTP layer is expected to use.
    pub fn status_code(self) -> u16 {
        match self {
            OutcomeClass::Applied => 200,
            OutcomeClass::NotFound => 404,
            OutcomeClass::Forbidden => 403,
            OutcomeClass::InvalidInput => 422,
            OutcomeClass::Conflict => 409,
            OutcomeClass::StoreUnavailable => 503,
        }
    }
}

impl std::fmt::Display for OutcomeClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeClass::Applied => f.write_str("applied"),
            OutcomeClass::NotFound => f.write_str("not_found"),
            OutcomeClass::Forbidden => f.write_str("forbidden"),
            OutcomeClass::InvalidInput => f.write_str("invalid_input"),
            OutcomeClass::Conflict => f.write_str("conflict"),
            OutcomeClass::StoreUnavailable => f.write_str("store_unavailable"),
        }
    }
}

impl<T> Outcome<T> {
    pub fn class(&self) -> OutcomeClass {
        match self {
            Outcome::Applied(_) => OutcomeClass::Applied,
            Outcome::NotFound => OutcomeClass::NotFound,
            Outcome::Forbidden => OutcomeClass::Forbidden,
            Outcome::InvalidInput(_) => OutcomeClass::InvalidInput,
            Outcome::Conflict(_) => OutcomeClass::Conflict,
            Outcome::StoreUnavailable(_) => OutcomeClass::StoreUnavailable,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.class().status_code()
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    /// `Conflict` is the only outcome a re-read-then-reapply can fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Outcome::Conflict(_))
    }

    pub fn applied(&self) -> Option<&T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::NotFound => Outcome::NotFound,
            Outcome::Forbidden => Outcome::Forbidden,
            Outcome::InvalidInput(invalid) => Outcome::InvalidInput(invalid),
            Outcome::Conflict(conflict) => Outcome::Conflict(conflict),
            Outcome::StoreUnavailable(err) => Outcome::StoreUnavailable(err),
        }
    }
}

impl<T> From<StoreError> for Outcome<T> {
    fn from(err: StoreError) -> Self {
        Outcome::StoreUnavailable(err)
    }
}

impl<T> From<InvalidInput> for Outcome<T> {
    fn from(invalid: InvalidInput) -> Self {
        Outcome::InvalidInput(invalid)
    }
}
