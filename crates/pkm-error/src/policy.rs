use crate::{Error, Severity};

/// A policy for classifying and emitting errors. Library crates never log or
/// print directly; only an `ErrorPolicy` supplied at the application boundary
/// (`pkm-cli`) decides how a surfaced error is reported and what exit code it
/// maps to.
pub trait ErrorPolicy: Send + Sync {
    fn classify(&self, error: &Error) -> Severity;
    fn emit(&self, error: &Error);
}

/// Does nothing; useful in tests and library examples that don't want to
/// install a global subscriber.
#[derive(Debug, Clone, Default)]
pub struct NoopPolicy;

impl ErrorPolicy for NoopPolicy {
    fn classify(&self, error: &Error) -> Severity {
        error.severity()
    }

    fn emit(&self, _error: &Error) {}
}

/// Emits via `tracing`, at `WARN` for warnings and `ERROR` for everything else.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Default)]
pub struct TracingPolicy;

#[cfg(feature = "tracing")]
impl ErrorPolicy for TracingPolicy {
    fn classify(&self, error: &Error) -> Severity {
        error.severity()
    }

    fn emit(&self, error: &Error) {
        use tracing::{event, Level};

        match error.severity() {
            Severity::Warning => event!(Level::WARN, error = %error),
            Severity::Error | Severity::Fatal => event!(Level::ERROR, error = %error),
        }
    }
}
