pub mod error;
pub mod movie;
pub mod mutation;
pub mod outcome;
pub mod record;
pub mod store;

pub use error::{StoreError, StoreErrorKind};
pub use movie::{MovieEntry, MoviePatch, MovieRules};
pub use mutation::{FieldViolation, InvalidInput, Mutation, Validator};
pub use outcome::{Conflict, Outcome, OutcomeClass};
pub use record::{OwnerId, Payload, RecordId, Version, VersionedRecord};
pub use store::{DeleteOutcome, RecordStore, StoreFuture, WriteOutcome};
