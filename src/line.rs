//! Line storage for diffing: owned byte lines with precomputed hashes and the
//! ordered store both sides of a run read from and write back out.

use std::fmt::{self, Display};
use std::io::{BufRead, Write};

use bstr::{BStr, BString, ByteSlice};

use crate::errors::DiffError;

/// Hash a line's bytes with fixed seeds so the value is a pure function of
/// the bytes for the lifetime of the process.
fn hash_line(bytes: &[u8]) -> u64 {
    ahash::RandomState::with_seeds(
        0x9e37_79b9_7f4a_7c15,
        0x6c62_272e_07bb_0142,
        0x517c_c1b7_2722_0a95,
        0x2545_f491_4f6c_dd1d,
    )
    .hash_one(bytes)
}

/// One source line, stripped of its terminator, with its 64-bit hash
/// computed at construction.
///
/// Equality is hash-first: differing hashes prove the lines differ, equal
/// hashes fall back to a full byte comparison. The hash is an accelerator,
/// never a contract.
#[derive(Debug, Clone, Eq)]
pub struct HashedLine {
    bytes: BString,
    hash: u64,
}

impl HashedLine {
    pub fn new(bytes: impl Into<BString>) -> Self {
        let bytes = bytes.into();
        let hash = hash_line(&bytes);
        HashedLine { bytes, hash }
    }

    pub fn as_bytes(&self) -> &BStr {
        self.bytes.as_bstr()
    }

    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

impl PartialEq for HashedLine {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.bytes == other.bytes
    }
}

impl Display for HashedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes)
    }
}

impl From<&str> for HashedLine {
    fn from(s: &str) -> Self {
        HashedLine::new(s)
    }
}

/// An ordered sequence of lines indexed from 0.
///
/// Immutable while a diff runs against it; the builder and applier keep their
/// own evolving copies. Indices into the store are stable only between
/// mutations of those copies.
#[derive(Debug, Clone, Default)]
pub struct LineStore {
    lines: Vec<HashedLine>,
}

impl LineStore {
    pub fn from_lines(lines: Vec<HashedLine>) -> Self {
        LineStore { lines }
    }

    /// Read a stream to EOF, one line per entry, stripping every trailing
    /// `\n` and `\r` from each line.
    pub fn from_reader(mut reader: impl BufRead) -> Result<Self, DiffError> {
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            while matches!(buf.last(), Some(b'\n' | b'\r')) {
                buf.pop();
            }
            lines.push(HashedLine::new(buf.as_slice()));
        }
        Ok(LineStore { lines })
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HashedLine> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[HashedLine] {
        &self.lines
    }

    /// Emit the lines separated by single `\n`, without a newline after the
    /// final line, and flush the sink.
    pub fn write_to(&self, out: &mut impl Write) -> Result<(), DiffError> {
        if let Some(first) = self.lines.first() {
            out.write_all(first.as_bytes())?;
        }
        for line in self.lines.iter().skip(1) {
            out.write_all(b"\n")?;
            out.write_all(line.as_bytes())?;
        }
        out.flush()?;
        Ok(())
    }
}
