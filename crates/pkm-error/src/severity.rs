/// Coarse-grained classification for programmatic handling of errors.
///
/// Typical mappings:
/// - `Warning`: non-fatal, the per-document pipeline boundary catches and continues
/// - `Error`: failures that should be handled or bubbled up
/// - `Fatal`: irrecoverable for the current batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
    Fatal,
}
