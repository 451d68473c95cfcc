//! Longest-common-subsequence engine, generic over the element type, that
//! labels every line of both inputs as kept, removed, or inserted. The edit
//! trace drives the change-set builder.

use crate::errors::DiffError;

/// Upper bound on either input's element count; the table cells are `u16`.
const MAX_ELEMENTS: usize = u16::MAX as usize;

/// One step of the edit trace.
///
/// Indices are stable positions in the slices handed to [`Compare::new`];
/// they are never indices into the builder's evolving reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEntry {
    /// Element present in both inputs.
    Keep { src: usize, dst: usize },
    /// Element present only in the source input.
    Remove { src: usize },
    /// Element present only in the destination input.
    Insert { dst: usize },
}

/// Comparison result, replacing the original tool's signed `-1` sentinel with
/// explicit variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompareOutcome {
    /// Both inputs have no elements.
    Empty,
    /// The inputs are element-for-element identical; no trace was produced.
    Identical,
    /// The inputs differ; `trace` has `|A| + |B| - lcs_len` entries.
    Diff {
        lcs_len: usize,
        trace: Vec<TraceEntry>,
    },
}

/// LCS differ over two borrowed slices.
///
/// Classic dynamic programming: table `D[0..=|A|][0..=|B|]` filled bottom-up
/// and right-to-left, then walked from `(0, 0)` to produce the trace.
pub struct Compare<'a, T> {
    source: &'a [T],
    dest: &'a [T],
    table: Vec<u16>,
}

impl<'a, T: PartialEq> Compare<'a, T> {
    pub fn new(source: &'a [T], dest: &'a [T]) -> Self {
        Compare {
            source,
            dest,
            table: Vec::new(),
        }
    }

    fn cell(&self, i: usize, j: usize) -> u16 {
        self.table[i * (self.dest.len() + 1) + j]
    }

    fn set_cell(&mut self, i: usize, j: usize, value: u16) {
        let stride = self.dest.len() + 1;
        self.table[i * stride + j] = value;
    }

    /// Run the comparison to completion.
    pub fn process(mut self) -> Result<CompareOutcome, DiffError> {
        let n = self.source.len();
        let m = self.dest.len();

        if n == 0 && m == 0 {
            return Ok(CompareOutcome::Empty);
        }

        // Equal-size inputs get a direct element comparison first, skipping
        // the table entirely when nothing changed.
        if n == m && self.source == self.dest {
            tracing::debug!(lines = n, "identical inputs, skipping LCS");
            return Ok(CompareOutcome::Identical);
        }

        if n > MAX_ELEMENTS || m > MAX_ELEMENTS {
            return Err(DiffError::InvalidArgument(format!(
                "input of {} lines exceeds the {MAX_ELEMENTS} line limit",
                n.max(m)
            )));
        }

        let stride = m + 1;
        tracing::debug!(cells = (n + 1) * stride, "allocating LCS table");
        self.table = vec![0u16; (n + 1) * stride];

        // The boundary row and column stay zero.
        for i in (0..n).rev() {
            for j in (0..m).rev() {
                let value = if self.source[i] == self.dest[j] {
                    1 + self.cell(i + 1, j + 1)
                } else {
                    self.cell(i + 1, j).max(self.cell(i, j + 1))
                };
                self.set_cell(i, j, value);
            }
        }

        let lcs_len = self.cell(0, 0) as usize;
        let trace = self.walk();
        Ok(CompareOutcome::Diff { lcs_len, trace })
    }

    /// Walk the table from `(0, 0)` emitting one entry per line of either
    /// input. The strict `>` favors removes over inserts when both paths are
    /// optimal; the change-set builder relies on that ordering.
    fn walk(&self) -> Vec<TraceEntry> {
        let n = self.source.len();
        let m = self.dest.len();
        let mut trace = Vec::with_capacity(n + m);
        let mut i = 0;
        let mut j = 0;

        while i < n || j < m {
            if i < n && j < m && self.source[i] == self.dest[j] {
                trace.push(TraceEntry::Keep { src: i, dst: j });
                i += 1;
                j += 1;
            } else if i < n && (j == m || self.cell(i + 1, j) > self.cell(i, j + 1)) {
                trace.push(TraceEntry::Remove { src: i });
                i += 1;
            } else {
                trace.push(TraceEntry::Insert { dst: j });
                j += 1;
            }
        }

        trace
    }
}
