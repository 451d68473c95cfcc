//! Change-set decoder: tokenizes the textual format into tagged sections and
//! applies each edit to a working copy of the reference by locating its
//! context window, which must match at exactly one position.

use std::io::{BufRead, Write};

use bstr::ByteSlice;

use crate::errors::DiffError;
use crate::line::{HashedLine, LineStore};

use super::{CONTENT_PREFIX, Token};

/// Parses a change-set stream and replays it over a working copy of the
/// reference lines.
pub struct ChangeSetProcessor<R: BufRead> {
    set_file: R,
    /// Working copy, mutated in lock-step as edits apply.
    data: Vec<HashedLine>,
    what: Vec<HashedLine>,
    before: Vec<HashedLine>,
    after: Vec<HashedLine>,
    replacement: Vec<HashedLine>,
}

impl<R: BufRead> ChangeSetProcessor<R> {
    pub fn new(reference: &LineStore, set_file: R) -> Self {
        ChangeSetProcessor {
            set_file,
            data: reference.lines().to_vec(),
            what: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
            replacement: Vec::new(),
        }
    }

    /// Read one raw line with trailing `\n`/`\r` stripped; `None` at EOF.
    fn read_line(input: &mut R) -> Result<Option<Vec<u8>>, DiffError> {
        let mut buf = Vec::new();
        if input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        while matches!(buf.last(), Some(b'\n' | b'\r')) {
            buf.pop();
        }
        Ok(Some(buf))
    }

    /// Collect content lines into `buffer` until the next command token,
    /// which is returned. With no buffer, a content line is an error.
    fn read_section(
        input: &mut R,
        mut buffer: Option<&mut Vec<HashedLine>>,
    ) -> Result<Token, DiffError> {
        if let Some(buf) = buffer.as_deref_mut() {
            buf.clear();
        }

        loop {
            let line = Self::read_line(input)?
                .ok_or_else(|| DiffError::BadChangeSet("expecting command part".into()))?;

            if line.first() == Some(&b'[') {
                return Token::from_line(&line).ok_or_else(|| {
                    DiffError::BadChangeSet(format!("unrecognized command: {}", line.as_bstr()))
                });
            }

            let buf = buffer
                .as_deref_mut()
                .ok_or_else(|| DiffError::BadChangeSet("command word expected".into()))?;
            if !line.starts_with(CONTENT_PREFIX) {
                return Err(DiffError::BadChangeSet(
                    "non-command line without '> ' prefix".into(),
                ));
            }
            buf.push(HashedLine::new(&line[CONTENT_PREFIX.len()..]));
        }
    }

    /// Locate the concatenation of `parts` in the working copy, requiring
    /// exactly one match. Returns the match's start index.
    fn locate(&self, parts: &[&[HashedLine]]) -> Result<usize, DiffError> {
        let pattern_len: usize = parts.iter().map(|p| p.len()).sum();
        let data_size = self.data.len();

        if pattern_len > data_size {
            return Err(DiffError::ContextNotFound(pattern_head(parts)));
        }

        let mut found = None;
        'starts: for i in 0..=(data_size - pattern_len) {
            let mut offset = i;
            for part in parts {
                for line in *part {
                    if *line != self.data[offset] {
                        continue 'starts;
                    }
                    offset += 1;
                }
            }
            if found.is_some() {
                return Err(DiffError::AmbiguousContext(pattern_head(parts)));
            }
            found = Some(i);
        }

        found.ok_or_else(|| DiffError::ContextNotFound(pattern_head(parts)))
    }

    fn apply_insert(&mut self) -> Result<Token, DiffError> {
        if Self::read_section(&mut self.set_file, Some(&mut self.what))? != Token::Between {
            return Err(DiffError::BadChangeSet("[BETWEEN] expected".into()));
        }
        if Self::read_section(&mut self.set_file, Some(&mut self.before))? != Token::And {
            return Err(DiffError::BadChangeSet("[AND] expected".into()));
        }
        // The token closing the [AND] section opens the next edit.
        let next = Self::read_section(&mut self.set_file, Some(&mut self.after))?;

        let pos = self.locate(&[&self.before, &self.after])?;
        let at = pos + self.before.len();
        let what = std::mem::take(&mut self.what);
        self.data.splice(at..at, what);
        Ok(next)
    }

    fn apply_delete(&mut self) -> Result<Token, DiffError> {
        if Self::read_section(&mut self.set_file, Some(&mut self.what))? != Token::Between {
            return Err(DiffError::BadChangeSet("[BETWEEN] expected".into()));
        }
        if Self::read_section(&mut self.set_file, Some(&mut self.before))? != Token::And {
            return Err(DiffError::BadChangeSet("[AND] expected".into()));
        }
        let next = Self::read_section(&mut self.set_file, Some(&mut self.after))?;

        // The deleted lines are part of the unique context.
        let pos = self.locate(&[&self.before, &self.what, &self.after])?;
        let at = pos + self.before.len();
        self.data.drain(at..at + self.what.len());
        Ok(next)
    }

    fn apply_replace(&mut self) -> Result<Token, DiffError> {
        if Self::read_section(&mut self.set_file, Some(&mut self.what))? != Token::With {
            return Err(DiffError::BadChangeSet("[WITH] expected".into()));
        }
        let next = Self::read_section(&mut self.set_file, Some(&mut self.replacement))?;

        let pos = self.locate(&[&self.what])?;
        self.data.drain(pos..pos + self.what.len());
        let replacement = std::mem::take(&mut self.replacement);
        self.data.splice(pos..pos, replacement);
        Ok(next)
    }

    /// Run the change-set to completion and return the reconstructed lines.
    /// Anything in the stream after `[END]` is ignored.
    pub fn process(mut self) -> Result<LineStore, DiffError> {
        if Self::read_section(&mut self.set_file, None)? != Token::Begin {
            return Err(DiffError::BadChangeSet("no [BEGIN] at stream start".into()));
        }

        let mut cmd = Self::read_section(&mut self.set_file, None)?;
        loop {
            match cmd {
                Token::End => return Ok(LineStore::from_lines(self.data)),
                Token::Insert => cmd = self.apply_insert()?,
                Token::Delete => cmd = self.apply_delete()?,
                Token::Replace => cmd = self.apply_replace()?,
                other => {
                    return Err(DiffError::BadChangeSet(format!(
                        "unexpected {} between edits",
                        other.as_str()
                    )));
                }
            }
        }
    }
}

/// First line of a pattern, for error payloads.
fn pattern_head(parts: &[&[HashedLine]]) -> String {
    parts
        .iter()
        .flat_map(|part| part.iter())
        .next()
        .map(|line| line.to_string())
        .unwrap_or_default()
}

/// Apply a change-set stream to `reference` and write the reconstructed file.
pub fn apply_changeset<R: BufRead, W: Write>(
    reference: &LineStore,
    changeset: R,
    mut out: W,
) -> Result<(), DiffError> {
    let result = ChangeSetProcessor::new(reference, changeset).process()?;
    result.write_to(&mut out)
}
