use thiserror::Error;

/// Why a decode pass stopped. None of these are retryable within the pass;
/// the caller decides whether to retry the whole operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed or unsupported image data.
    #[error("bmp: {0}")]
    Format(&'static str),
    /// The storage collaborator failed to supply a full read.
    #[error("io: {0}")]
    Io(&'static str),
    /// A scratch buffer could not be allocated.
    #[error("oom: {0}")]
    Resource(&'static str),
}
