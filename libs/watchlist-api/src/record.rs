use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic per-record write counter. Records start at `0` and gain
/// exactly one per successful write.
pub type Version = u64;

/// Opaque record identity, assigned by the store at insert and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random identity (UUID v4, hyphenated).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the principal allowed to mutate a record. Supplied by the
/// auth layer and trusted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Business fields carried by a record. The engine never looks inside.
pub trait Payload: Clone + Send + Sync + 'static {}

impl<T> Payload for T where T: Clone + Send + Sync + 'static {}

/// A stored entity with its embedded version counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord<P> {
    pub id: RecordId,
    pub owner: OwnerId,
    pub version: Version,
    pub payload: P,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful write, and only then.
    pub updated_at: DateTime<Utc>,
}

impl<P> VersionedRecord<P> {
    /// A record as it looks right after creation: version 0, both
    /// timestamps equal.
    pub fn created(id: RecordId, owner: OwnerId, payload: P, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            version: 0,
            payload,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, caller: &OwnerId) -> bool {
        &self.owner == caller
    }
}
