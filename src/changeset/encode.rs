//! Change-set encoder: coalesces the LCS edit trace into insert/delete/replace
//! edits, anchors each one with a minimal unique context window, and writes
//! the textual change-set while keeping an evolving copy of the reference.

use std::io::Write;

use crate::compare::{Compare, CompareOutcome, TraceEntry};
use crate::errors::DiffError;
use crate::line::{HashedLine, LineStore};

use super::{CONTENT_PREFIX, Range, Token};

/// Builds a change-set from an edit trace, writing edits as they flush.
///
/// `data` is the evolving reference: it starts as the source lines and every
/// emitted edit is applied to it, so each context window is chosen against
/// exactly what the applier's working copy will contain at that point. Its
/// entries share identity with the two input stores; the builder never copies
/// line bytes.
pub struct ChangeSetBuilder<'a, W: Write> {
    out: W,
    source: &'a LineStore,
    dest: &'a LineStore,
    data: Vec<&'a HashedLine>,
    pos: usize,
    to_insert: Range,
    to_delete: Range,
}

impl<'a, W: Write> ChangeSetBuilder<'a, W> {
    pub fn new(out: W, source: &'a LineStore, dest: &'a LineStore) -> Self {
        ChangeSetBuilder {
            out,
            source,
            dest,
            data: Vec::new(),
            pos: 0,
            to_insert: Range::default(),
            to_delete: Range::default(),
        }
    }

    /// Begin construction: seed the evolving reference and emit `[BEGIN]`.
    pub fn start(&mut self) -> Result<(), DiffError> {
        self.pos = 0;
        self.data = self.source.lines().iter().collect();
        self.output_token(Token::Begin)
    }

    /// Record a destination line to insert. Nothing is emitted until the next
    /// flush; `dst_index` indexes the destination store.
    pub fn insert_line(&mut self, dst_index: usize) -> Result<(), DiffError> {
        self.to_insert.extend(dst_index)
    }

    /// Record a source line to delete. `src_index` indexes the source store.
    pub fn delete_line(&mut self, src_index: usize) -> Result<(), DiffError> {
        self.to_delete.extend(src_index)
    }

    /// A kept line: flush any pending edit, then advance the cursor past it.
    pub fn skip_line(&mut self) -> Result<(), DiffError> {
        self.flush_pending()?;
        self.pos += 1;
        Ok(())
    }

    /// End of trace: force a final flush and emit `[END]`.
    pub fn finish(&mut self) -> Result<(), DiffError> {
        self.flush_pending()?;
        self.output_token(Token::End)?;
        self.out.flush()?;
        Ok(())
    }

    fn output_token(&mut self, token: Token) -> Result<(), DiffError> {
        self.out.write_all(token.as_str().as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn output_content(&mut self, line: &HashedLine) -> Result<(), DiffError> {
        self.out.write_all(CONTENT_PREFIX)?;
        self.out.write_all(line.as_bytes())?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    /// True when the range's content occurs exactly once as a contiguous run
    /// of the evolving reference. Line equality is hash-first.
    fn is_unique(&self, range: &Range) -> bool {
        let data_size = self.data.len();
        let range_size = range.len();

        for i in 0..=(data_size - range_size) {
            if i == range.l {
                continue;
            }
            if (0..range_size).all(|j| self.data[range.l + j] == self.data[i + j]) {
                return false; // matched elsewhere
            }
        }
        true
    }

    /// Grow `range` into the smallest window enclosing it that is unique
    /// within the evolving reference.
    ///
    /// Expansion alternates right, left, right, ... starting with right and
    /// falling back to whichever side has room. Once unique, the window is
    /// shrunk back one line at a time on the side recorded by the flip-flop,
    /// as long as it still encloses the initial range and stays unique.
    fn detect_pattern(&self, range: &mut Range) -> Result<(), DiffError> {
        let data_size = self.data.len();
        let init = *range;
        let mut ext_right = true;

        while !self.is_unique(range) {
            if (ext_right || range.l == 0) && range.r < data_size {
                range.r += 1;
                ext_right = false;
            } else if range.l > 0 {
                range.l -= 1;
                ext_right = true;
            } else {
                // The whole reference is a repetition of the range.
                return Err(DiffError::Internal(
                    "context expansion exhausted the reference".into(),
                ));
            }
        }

        if range.len() <= 2 {
            return Ok(());
        }

        let mut tmp = *range;
        loop {
            *range = tmp;
            if ext_right {
                tmp.r -= 1;
            } else {
                tmp.l += 1;
            }
            if !(tmp.encloses(&init) && self.is_unique(&tmp)) {
                break;
            }
        }
        Ok(())
    }

    /// Emit the pending edit, if any, applying it to the evolving reference.
    fn flush_pending(&mut self) -> Result<(), DiffError> {
        if self.to_insert.is_valid() {
            if self.to_delete.is_valid() {
                self.flush_replace()?;
            } else {
                self.flush_insert()?;
            }
        } else if self.to_delete.is_valid() {
            self.flush_delete()?;
        }
        self.to_insert.clear();
        self.to_delete.clear();
        Ok(())
    }

    fn flush_replace(&mut self) -> Result<(), DiffError> {
        let del_len = self.to_delete.len();
        let ins_len = self.to_insert.len();

        let mut target = Range::new(self.pos, self.pos + del_len);
        self.detect_pattern(&mut target)?;

        self.output_token(Token::Replace)?;
        for i in target.l..target.r {
            let line = self.data[i];
            self.output_content(line)?;
        }

        self.data.drain(self.pos..self.pos + del_len);
        let dest = self.dest;
        for i in self.to_insert.l..self.to_insert.r {
            let line = dest
                .get(i)
                .ok_or_else(|| DiffError::Internal(format!("destination index {i} out of range")))?;
            self.data.insert(self.pos, line);
            self.pos += 1;
        }

        self.output_token(Token::With)?;
        // The old window's bounds, adjusted by the net line delta.
        let new_r = target.r + ins_len - del_len;
        for i in target.l..new_r {
            let line = self.data[i];
            self.output_content(line)?;
        }
        Ok(())
    }

    fn flush_insert(&mut self) -> Result<(), DiffError> {
        let ins_len = self.to_insert.len();

        let mut target = Range::new(
            if self.pos > 0 { self.pos - 1 } else { self.pos },
            if self.pos < self.data.len() {
                self.pos + 1
            } else {
                self.pos
            },
        );
        self.detect_pattern(&mut target)?;

        self.output_token(Token::Insert)?;

        // "before" and "after" are the two halves of one unique window,
        // split at the insertion point.
        let before = Range::new(target.l, self.pos);
        let mut after = Range::new(self.pos, target.r);

        let dest = self.dest;
        for i in self.to_insert.l..self.to_insert.r {
            let line = dest
                .get(i)
                .ok_or_else(|| DiffError::Internal(format!("destination index {i} out of range")))?;
            self.output_content(line)?;
            self.data.insert(self.pos, line);
            self.pos += 1;
        }
        after.shift(ins_len);

        self.output_token(Token::Between)?;
        for i in before.l..before.r {
            let line = self.data[i];
            self.output_content(line)?;
        }
        self.output_token(Token::And)?;
        for i in after.l..after.r {
            let line = self.data[i];
            self.output_content(line)?;
        }
        Ok(())
    }

    fn flush_delete(&mut self) -> Result<(), DiffError> {
        let del_len = self.to_delete.len();

        let mut target = Range::new(
            if self.pos > 0 { self.pos - 1 } else { self.pos },
            self.pos + del_len,
        );
        // A delete running to end-of-file gets no right-side context.
        if target.r < self.data.len() {
            target.r += 1;
        }
        self.detect_pattern(&mut target)?;

        self.output_token(Token::Delete)?;

        // "before"-deleted-"after" is a single unique window; the deleted
        // lines are a legal part of it.
        let before = Range::new(target.l, self.pos);
        let after = Range::new(self.pos, target.r - del_len);

        let source = self.source;
        for i in self.to_delete.l..self.to_delete.r {
            let line = source
                .get(i)
                .ok_or_else(|| DiffError::Internal(format!("source index {i} out of range")))?;
            self.output_content(line)?;
        }
        self.data.drain(self.pos..self.pos + del_len);

        self.output_token(Token::Between)?;
        for i in before.l..before.r {
            let line = self.data[i];
            self.output_content(line)?;
        }
        self.output_token(Token::And)?;
        for i in after.l..after.r {
            let line = self.data[i];
            self.output_content(line)?;
        }
        Ok(())
    }
}

/// Compare `source` and `dest` and write the change-set that turns the former
/// into the latter.
///
/// Fails with [`DiffError::EmptySource`] when the source has no lines and
/// with [`DiffError::FilesIdentical`] when there is nothing to record; in
/// both cases the sink is left untouched.
pub fn build_changeset<W: Write>(
    source: &LineStore,
    dest: &LineStore,
    out: W,
) -> Result<(), DiffError> {
    if source.is_empty() {
        return Err(DiffError::EmptySource);
    }

    let outcome = Compare::new(source.lines(), dest.lines()).process()?;
    let trace = match outcome {
        CompareOutcome::Diff { lcs_len, trace } => {
            tracing::debug!(lcs_len, entries = trace.len(), "comparison finished");
            trace
        }
        _ => return Err(DiffError::FilesIdentical),
    };

    let mut builder = ChangeSetBuilder::new(out, source, dest);
    builder.start()?;
    for entry in &trace {
        match *entry {
            TraceEntry::Remove { src } => builder.delete_line(src)?,
            TraceEntry::Insert { dst } => builder.insert_line(dst)?,
            TraceEntry::Keep { .. } => builder.skip_line()?,
        }
    }
    builder.finish()
}
