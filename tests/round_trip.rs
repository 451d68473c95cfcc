//! End-to-end tests over the library surface: build a change-set from two
//! line sets, apply it back, and check the reconstruction.

use std::io::Cursor;

use quickcheck::{QuickCheck, TestResult};

use ctxdiff::compare::{Compare, CompareOutcome, TraceEntry};
use ctxdiff::errors::DiffError;
use ctxdiff::line::{HashedLine, LineStore};
use ctxdiff::{apply_changeset, build_changeset};

fn store(lines: &[&str]) -> LineStore {
    LineStore::from_lines(lines.iter().map(|s| HashedLine::new(*s)).collect())
}

fn diff(source: &LineStore, dest: &LineStore) -> Result<Vec<u8>, DiffError> {
    let mut out = Vec::new();
    build_changeset(source, dest, &mut out)?;
    Ok(out)
}

fn apply(reference: &LineStore, changeset: &[u8]) -> Result<Vec<u8>, DiffError> {
    let mut out = Vec::new();
    apply_changeset(reference, Cursor::new(changeset), &mut out)?;
    Ok(out)
}

fn rendered(store: &LineStore) -> Vec<u8> {
    let mut out = Vec::new();
    store.write_to(&mut out).expect("render lines");
    out
}

/// Identical inputs produce no change-set at all.
#[test]
fn identical_files_are_rejected() {
    let lines = store(&["a", "b", "c"]);
    let err = diff(&lines, &lines).unwrap_err();
    assert!(matches!(err, DiffError::FilesIdentical));
}

/// A one-line replacement round-trips and the change-set carries the
/// expected replace section.
#[test]
fn single_replacement_round_trips() {
    let source = store(&["a", "b", "c"]);
    let dest = store(&["a", "x", "c"]);

    let changeset = diff(&source, &dest).expect("diff");
    let text = String::from_utf8(changeset.clone()).expect("utf-8");
    assert!(text.contains("[REPLACE]\n> b\n[WITH]\n> x\n"));

    let out = apply(&source, &changeset).expect("apply");
    assert_eq!(out, rendered(&dest));
}

/// An insertion lands between its context lines.
#[test]
fn insertion_round_trips() {
    let source = store(&["alpha", "beta", "gamma"]);
    let dest = store(&["alpha", "beta", "delta", "gamma"]);

    let changeset = diff(&source, &dest).expect("diff");
    let text = String::from_utf8(changeset.clone()).expect("utf-8");
    assert!(text.contains("[INSERT]\n> delta\n[BETWEEN]\n> beta\n[AND]\n> gamma\n"));

    let out = apply(&source, &changeset).expect("apply");
    assert_eq!(out, rendered(&dest));
}

/// Appending past a duplicated prefix still anchors uniquely.
#[test]
fn append_past_duplicated_prefix_round_trips() {
    let source = store(&["a", "b", "a", "b", "c"]);
    let dest = store(&["a", "b", "a", "b", "c", "d"]);

    let changeset = diff(&source, &dest).expect("diff");
    let out = apply(&source, &changeset).expect("apply");
    assert_eq!(out, rendered(&dest));
}

/// Emptying the file round-trips to empty output.
#[test]
fn empty_destination_round_trips() {
    let source = store(&["x", "y", "z"]);
    let dest = store(&[]);

    let changeset = diff(&source, &dest).expect("diff");
    let out = apply(&source, &changeset).expect("apply");
    assert!(out.is_empty());
}

/// A change-set naming context that does not exist fails cleanly.
#[test]
fn unmatched_context_fails() {
    let reference = store(&["a", "b", "c"]);
    let changeset = b"[BEGIN]\n[REPLACE]\n> nonexistent\n[WITH]\n> whatever\n[END]\n";
    let err = apply(&reference, changeset).unwrap_err();
    assert!(matches!(err, DiffError::ContextNotFound(_)));
}

/// The point of context anchoring: a change-set still applies to a file that
/// drifted in places the edit does not touch.
#[test]
fn changeset_survives_unrelated_drift() {
    let source = store(&["header", "a", "b", "c", "trailer"]);
    let dest = store(&["header", "a", "X", "c", "trailer"]);
    let changeset = diff(&source, &dest).expect("diff");

    // Same file with a rewritten header and trailer: the window around the
    // edit is untouched, so the change-set still locates it.
    let drifted = store(&["HEADER v2", "a", "b", "c", "TRAILER v2"]);
    let out = apply(&drifted, &changeset).expect("apply");
    assert_eq!(
        out,
        rendered(&store(&["HEADER v2", "a", "X", "c", "TRAILER v2"]))
    );
}

/// Heavy edits across a file with many repeated lines.
#[test]
fn repetitive_file_round_trips() {
    let source = store(&[
        "fn", "{", "}", "fn", "{", "body", "}", "fn", "{", "}",
    ]);
    let dest = store(&[
        "fn", "{", "new", "}", "fn", "{", "body", "changed", "}", "fn", "{", "}",
    ]);

    let changeset = diff(&source, &dest).expect("diff");
    let out = apply(&source, &changeset).expect("apply");
    assert_eq!(out, rendered(&dest));
}

const WORDS: [&str; 5] = ["alpha", "beta", "gamma", "delta", ""];

/// Map arbitrary bytes onto a tiny line alphabet. The small alphabet packs
/// the inputs with repeats, which is exactly what stresses the context
/// selector.
fn words(seed: &[u8]) -> Vec<&'static str> {
    seed.iter().map(|b| WORDS[(*b as usize) % WORDS.len()]).collect()
}

/// P3: for any A != B with non-empty A, apply(A, diff(A, B)) == B.
#[test]
fn round_trip_property() {
    fn prop(a: Vec<u8>, b: Vec<u8>) -> TestResult {
        let source_lines = words(&a);
        let dest_lines = words(&b);
        if source_lines.is_empty() || source_lines == dest_lines {
            return TestResult::discard();
        }

        let source = store(&source_lines);
        let dest = store(&dest_lines);

        let changeset = diff(&source, &dest).expect("build change-set");
        let out = apply(&source, &changeset).expect("apply change-set");
        TestResult::from_bool(out == rendered(&dest))
    }

    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(Vec<u8>, Vec<u8>) -> TestResult);
}

/// Forward-filled DP table, deliberately the opposite fill order of the
/// engine under test, as an independent LCS length oracle.
fn forward_lcs(a: &[&str], b: &[&str]) -> usize {
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i][j] = if a[i - 1] == b[j - 1] {
                1 + table[i - 1][j - 1]
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }
    table[a.len()][b.len()]
}

/// P1 + P2: the reported LCS length equals both the Keep count and an
/// independent oracle, and the trace projections reproduce each input.
#[test]
fn lcs_and_projections_hold_for_arbitrary_inputs() {
    fn prop(a: Vec<u8>, b: Vec<u8>) -> TestResult {
        let source = words(&a);
        let dest = words(&b);

        let (lcs_len, trace) = match Compare::new(&source, &dest).process().expect("compare") {
            CompareOutcome::Diff { lcs_len, trace } => (lcs_len, trace),
            CompareOutcome::Identical => {
                return TestResult::from_bool(source == dest);
            }
            CompareOutcome::Empty => {
                return TestResult::from_bool(source.is_empty() && dest.is_empty());
            }
        };

        if lcs_len != forward_lcs(&source, &dest) {
            return TestResult::failed();
        }
        if trace.len() != source.len() + dest.len() - lcs_len {
            return TestResult::failed();
        }

        let mut keeps = 0;
        let mut src_side = Vec::new();
        let mut dst_side = Vec::new();
        for entry in &trace {
            match *entry {
                TraceEntry::Keep { src, dst } => {
                    keeps += 1;
                    src_side.push(source[src]);
                    dst_side.push(dest[dst]);
                    if source[src] != dest[dst] {
                        return TestResult::failed();
                    }
                }
                TraceEntry::Remove { src } => src_side.push(source[src]),
                TraceEntry::Insert { dst } => dst_side.push(dest[dst]),
            }
        }

        TestResult::from_bool(keeps == lcs_len && src_side == source && dst_side == dest)
    }

    QuickCheck::new()
        .tests(500)
        .quickcheck(prop as fn(Vec<u8>, Vec<u8>) -> TestResult);
}

/// Every change-set we emit parses back; feeding it to a reference that is
/// missing the context fails with a context error rather than corrupting.
#[test]
fn changeset_against_wrong_reference_fails_cleanly() {
    let source = store(&["a", "b", "c", "d"]);
    let dest = store(&["a", "B", "c", "d"]);
    let changeset = diff(&source, &dest).expect("diff");

    let unrelated = store(&["completely", "different", "file"]);
    let err = apply(&unrelated, &changeset).unwrap_err();
    assert!(matches!(
        err,
        DiffError::ContextNotFound(_) | DiffError::AmbiguousContext(_)
    ));
}
