//! Error types for the ctxdiff crate.
//!
//! One unified error enumeration used across comparison, change-set encoding
//! and change-set application. It integrates with `thiserror` to provide
//! `Display` implementations and error source chaining where applicable.
//!
//! All errors propagate to the top of a run; there is no local recovery.

use thiserror::Error;

#[derive(Error, Debug)]
/// Unified error enumeration for the ctxdiff library and CLI.
pub enum DiffError {
    /// Invalid argument passed across a component boundary.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// I/O error from the underlying reader or writer.
    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),

    /// A named file could not be opened.
    #[error("Cannot open `{path}`: {source}")]
    CantOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed change-set input: unknown command token, missing section,
    /// or a content line without the `> ` prefix.
    #[error("Bad change set: {0}")]
    BadChangeSet(String),

    /// An edit's context pattern matches nowhere in the working copy.
    /// The payload is the first line of the pattern.
    #[error("Context not found: `{0}`")]
    ContextNotFound(String),

    /// An edit's context pattern matches more than once in the working copy,
    /// indicating a corrupted change-set or a mismatched reference file.
    #[error("Ambiguous context: `{0}`")]
    AmbiguousContext(String),

    /// Diff mode found no differences between the inputs.
    #[error("Files are identical")]
    FilesIdentical,

    /// Diff mode's reference file has no lines.
    #[error("Source file is empty")]
    EmptySource,

    /// Invariant violation; indicates a bug.
    #[error("Internal error: {0}")]
    Internal(String),
}
