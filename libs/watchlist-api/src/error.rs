/// Category of a store failure. Lets callers tell infrastructure trouble
/// apart from a legitimate version conflict (which is never an error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Backend unreachable or refused the operation; transient.
    Unavailable,
    /// Operation did not complete in time; transient.
    Timeout,
    /// Store is full; permanent until records are removed.
    Capacity,
    /// I/O failure in the backend.
    Io,
    /// Stored data could not be decoded or violates an invariant.
    Corrupt,
}

impl std::fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreErrorKind::Unavailable => f.write_str("unavailable"),
            StoreErrorKind::Timeout => f.write_str("timeout"),
            StoreErrorKind::Capacity => f.write_str("capacity"),
            StoreErrorKind::Io => f.write_str("io"),
            StoreErrorKind::Corrupt => f.write_str("corrupt"),
        }
    }
}

/// Error returned by every `RecordStore` method when the store itself
/// failed. Version mismatches and missing records are reported through
/// `WriteOutcome` / `DeleteOutcome`, not through this type.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreError {
    kind: StoreErrorKind,
    message: String,
}

impl StoreError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Unavailable, message: msg.into() }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Timeout, message: msg.into() }
    }

    pub fn capacity(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Capacity, message: msg.into() }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Io, message: msg.into() }
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self { kind: StoreErrorKind::Corrupt, message: msg.into() }
    }

    pub fn kind(&self) -> StoreErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with context, keeping the kind.
    ///
    /// Produces: `"context: original message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::io(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::corrupt(e.to_string())
    }
}
