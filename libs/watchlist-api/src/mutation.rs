use serde::{Deserialize, Serialize};

/// A requested change, expressed as a pure function of the current payload.
///
/// Applied to a copy of whatever the coordinator just read. Must not block
/// or perform I/O: it runs inside the read → write window.
pub trait Mutation<P>: Send + Sync {
    fn apply(&self, current: &P) -> P;

    /// Reject a request that is malformed on its own, before any record is
    /// touched. Runs after the ownership check and before `apply`.
    fn check(&self) -> Result<(), InvalidInput> {
        Ok(())
    }
}

impl<P, F> Mutation<P> for F
where
    F: Fn(&P) -> P + Send + Sync,
{
    fn apply(&self, current: &P) -> P {
        self(current)
    }
}

/// Field-level validation of a candidate payload before it is written.
///
/// Returns the payload to write, which may be normalized (e.g. trimmed).
pub trait Validator<P>: Send + Sync {
    fn validate(&self, candidate: P) -> Result<P, InvalidInput>;
}

/// One failed field check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Every violation found in a candidate payload, in check order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidInput {
    pub violations: Vec<FieldViolation>,
}

impl InvalidInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.violations.push(FieldViolation::new(field, message));
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> Result<T, InvalidInput> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

impl std::fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", v.field, v.message)?;
        }
        Ok(())
    }
}
