//! Error types for the fallible parts of the API.
//!
//! The recording hot path never returns errors: misuse there panics with a
//! descriptive message. The `try_*` entry points and the shape checks used by
//! functions built on [`PartialsCollector`](crate::partials::PartialsCollector)
//! report through [`Error`] instead.

use thiserror::Error;

/// Result type alias using numbat's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the checked tape and bundling APIs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No tape is active on the current thread.
    #[error("no active tape on this thread; install one with TapeGuard or use numbat::grad()")]
    NoActiveTape,

    /// A nested scope was closed without a matching open.
    #[error("no nested scope is open")]
    NoNestedScope,

    /// A checkpoint refers to tape storage that no longer exists.
    #[error("checkpoint ({checkpoint} nodes) is ahead of the tape ({len} nodes)")]
    StaleCheckpoint {
        /// Node count recorded in the checkpoint.
        checkpoint: usize,
        /// Current node count of the tape.
        len: usize,
    },

    /// Array-like arguments of a bundled function disagree in length.
    #[error("size mismatch in argument {arg}: expected {expected}, got {got}")]
    SizeMismatch {
        /// Zero-based position of the offending argument.
        arg: usize,
        /// Length shared by the other array-like arguments.
        expected: usize,
        /// Length of the offending argument.
        got: usize,
    },
}
