use thiserror::Error;

/// Failure modes of a bake. Unsupported flag combinations are downgraded
/// with a warning instead of failing, so cancellation is the only way a
/// bake aborts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BakeError {
    #[error("lightmap generation has been canceled")]
    Cancelled,
}
