//! ctxdiff is a library and CLI for line-oriented differencing and patching
//! where every edit is anchored by a minimal unique window of surrounding
//! lines instead of line numbers, making change-sets robust to unrelated
//! insertions and deletions elsewhere in the file.
pub mod changeset;
pub mod compare;
pub mod errors;
pub mod line;

pub use changeset::{apply_changeset, build_changeset};
