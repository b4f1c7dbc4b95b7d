//! Spliced-read classification, junction containment, and clip rewriting.
//!
//! A reference skip in an alignment's operation sequence implies an intron.
//! This module walks operation sequences to derive each implied junction's
//! exact coordinates, classifies reads by how many junctions they imply,
//! and rewrites multiply-spliced reads so that segments spanning untrusted
//! junctions are marked as clipped while segments spanning trusted
//! junctions are preserved.

use std::fmt;

use crate::cigar::{Cigar, CigarOp, OpKind};
use crate::junction::{Junction, JunctionIndex};

/// How segments spanning untrusted junctions are rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipMode {
    /// Rewrite to hard clips (bases removed from the reported sequence length)
    Hard,
    /// Rewrite to soft clips (bases retained but marked unaligned)
    Soft,
    /// Do not rewrite at all: a spliced read is kept if any of its
    /// junctions is trusted and discarded otherwise
    Complete,
}

impl ClipMode {
    /// The operation kind substituted for clipped spans.
    ///
    /// Complete mode maps to Deletion for parity with the rewrite table,
    /// but Complete-mode reads are routed to the containment check and
    /// never reach the clipping engine.
    #[must_use]
    pub fn clip_kind(self) -> OpKind {
        match self {
            ClipMode::Hard => OpKind::HardClip,
            ClipMode::Soft => OpKind::SoftClip,
            ClipMode::Complete => OpKind::Deletion,
        }
    }
}

impl fmt::Display for ClipMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipMode::Hard => f.write_str("hard"),
            ClipMode::Soft => f.write_str("soft"),
            ClipMode::Complete => f.write_str("complete"),
        }
    }
}

/// Whether the operation sequence contains at least one reference skip.
#[must_use]
pub fn is_spliced(cigar: &Cigar) -> bool {
    cigar.ops().iter().any(|op| op.kind() == OpKind::ReferenceSkip)
}

/// Number of reference skips in the operation sequence.
#[must_use]
pub fn junction_count(cigar: &Cigar) -> usize {
    cigar.ops().iter().filter(|op| op.kind() == OpKind::ReferenceSkip).count()
}

/// Whether the operation sequence contains more than one reference skip.
#[must_use]
pub fn is_multiply_spliced(cigar: &Cigar) -> bool {
    junction_count(cigar) > 1
}

/// Left-to-right iterator over the junctions a read implies.
///
/// Yields `(operation index, junction)` for each reference skip. The
/// running cursor starts at the alignment start and accumulates the
/// lengths of the non-skip reference-consuming operations; a skip is
/// reported at the current cursor with end `cursor + len - 1` and does not
/// itself advance the cursor.
struct JunctionWalk<'a> {
    ops: &'a [CigarOp],
    ref_id: usize,
    cursor: u64,
    next: usize,
}

impl Iterator for JunctionWalk<'_> {
    type Item = (usize, Junction);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.ops.len() {
            let i = self.next;
            let op = self.ops[i];
            self.next += 1;

            if op.kind() == OpKind::ReferenceSkip {
                let start = self.cursor;
                let end = (start + op.len() as u64).saturating_sub(1);
                return Some((i, Junction::new(self.ref_id, start, end)));
            } else if op.kind().consumes_reference() {
                self.cursor += op.len() as u64;
            }
        }
        None
    }
}

/// Junctions implied by `cigar` for a read aligned at `alignment_start`
/// (0-based) on `ref_id`, paired with the index of the skip operation.
pub fn implied_junctions(
    cigar: &Cigar,
    ref_id: usize,
    alignment_start: u64,
) -> impl Iterator<Item = (usize, Junction)> + '_ {
    JunctionWalk { ops: cigar.ops(), ref_id, cursor: alignment_start, next: 0 }
}

/// Whether any junction the read implies is in the trusted set.
///
/// Short-circuits on the first trusted match; read-only.
#[must_use]
pub fn any_junction_trusted(
    cigar: &Cigar,
    ref_id: usize,
    alignment_start: u64,
    index: &JunctionIndex,
) -> bool {
    implied_junctions(cigar, ref_id, alignment_start).any(|(_, j)| index.contains(&j))
}

/// Whether every junction the read implies is in the trusted set.
///
/// Short-circuits on the first untrusted junction. Vacuously true for an
/// unspliced read. The filtering pipeline keeps the observed any-match
/// policy; this stricter form is exposed for callers that want it.
#[must_use]
pub fn all_junctions_trusted(
    cigar: &Cigar,
    ref_id: usize,
    alignment_start: u64,
    index: &JunctionIndex,
) -> bool {
    implied_junctions(cigar, ref_id, alignment_start).all(|(_, j)| index.contains(&j))
}

/// Result of rewriting a multiply-spliced read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsrClip {
    /// The rewritten operation sequence
    pub cigar: Cigar,
    /// True when no junction in the read was trusted; the caller must
    /// discard the alignment entirely rather than emit an all-clipped
    /// record
    pub all_bad: bool,
}

/// Rewrites a multiply-spliced read's operation sequence.
///
/// Single pass, left to right. Each junction is tested against the trusted
/// set: a trusted junction preserves the span accumulated since the last
/// junction; an untrusted junction rewrites that span, the skip included,
/// to `clip_kind`. A trailing span is rewritten when the last junction was
/// untrusted. Only operation kinds change: the operation count and every
/// operation's length are preserved, so query-length and reference-span
/// bookkeeping of the input remain valid.
#[must_use]
pub fn clip_multiply_spliced(
    cigar: &Cigar,
    ref_id: usize,
    alignment_start: u64,
    index: &JunctionIndex,
    clip_kind: OpKind,
) -> MsrClip {
    let mut ops = cigar.ops().to_vec();
    let mut region_start = 0usize;
    let mut last_trusted = false;
    let mut any_trusted = false;

    for (i, junction) in implied_junctions(cigar, ref_id, alignment_start) {
        if index.contains(&junction) {
            any_trusted = true;
            last_trusted = true;
        } else {
            for op in &mut ops[region_start..=i] {
                *op = op.with_kind(clip_kind);
            }
            last_trusted = false;
        }
        region_start = i + 1;
    }

    // The read ends inside an untrusted region.
    if !last_trusted {
        for op in &mut ops[region_start..] {
            *op = op.with_kind(clip_kind);
        }
    }

    MsrClip { cigar: Cigar::new(ops), all_bad: !any_trusted }
}

/// Per-record decision of the filtering pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Emit the record unchanged
    Keep,
    /// Emit nothing for this record
    Discard,
    /// Emit a copy of the record carrying the rewritten operation sequence
    Rewrite(Cigar),
}

/// Routes one alignment through the junction filter.
///
/// Unspliced reads pass through. A spliced read that is not multiply
/// spliced, or any spliced read in Complete mode, is kept exactly when one
/// of its junctions is trusted. A multiply-spliced read otherwise goes
/// through [`clip_multiply_spliced`]; it is discarded when every junction
/// is untrusted and rewritten otherwise.
#[must_use]
pub fn evaluate(
    cigar: &Cigar,
    ref_id: usize,
    alignment_start: u64,
    index: &JunctionIndex,
    mode: ClipMode,
) -> Verdict {
    if !is_spliced(cigar) {
        return Verdict::Keep;
    }

    if mode == ClipMode::Complete || !is_multiply_spliced(cigar) {
        if any_junction_trusted(cigar, ref_id, alignment_start, index) {
            Verdict::Keep
        } else {
            Verdict::Discard
        }
    } else {
        let clipped = clip_multiply_spliced(cigar, ref_id, alignment_start, index, mode.clip_kind());
        if clipped.all_bad {
            Verdict::Discard
        } else {
            Verdict::Rewrite(clipped.cigar)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cigar(text: &str) -> Cigar {
        text.parse().unwrap()
    }

    fn index(junctions: &[(usize, u64, u64)]) -> JunctionIndex {
        JunctionIndex::from_junctions(
            junctions.iter().map(|&(r, s, e)| Junction::new(r, s, e)),
        )
    }

    #[rstest]
    #[case("101M", 0, false)]
    #[case("50M200N51M", 1, false)]
    #[case("50M200N30M500N20M", 2, true)]
    #[case("5S20M100N20M2I100N20M3H", 2, true)]
    #[case("*", 0, false)]
    fn test_classifier(#[case] text: &str, #[case] count: usize, #[case] multi: bool) {
        let c = cigar(text);
        assert_eq!(junction_count(&c), count);
        assert_eq!(is_spliced(&c), count > 0);
        assert_eq!(is_multiply_spliced(&c), multi);
    }

    #[test]
    fn test_implied_junction_coordinates() {
        // Start 1000: 50M puts the first skip at [1050, 1249]. The skip
        // itself does not advance the cursor, so the second sits at
        // [1080, 1579].
        let c = cigar("50M200N30M500N20M");
        let junctions: Vec<_> = implied_junctions(&c, 3, 1000).collect();
        assert_eq!(
            junctions,
            vec![(1, Junction::new(3, 1050, 1249)), (3, Junction::new(3, 1080, 1579))]
        );
    }

    #[test]
    fn test_implied_junctions_count_deletions_not_insertions_or_clips() {
        // 5S + 10M + 2I + 3D + 5M before the skip: cursor = 10 + 3 + 5 = 18.
        let c = cigar("5S10M2I3D5M100N10M");
        let junctions: Vec<_> = implied_junctions(&c, 0, 0).collect();
        assert_eq!(junctions, vec![(5, Junction::new(0, 18, 117))]);
    }

    #[test]
    fn test_any_match_short_circuits_and_all_match_differs() {
        let c = cigar("50M200N30M500N20M");
        // Only the first junction [1050, 1249] is trusted.
        let idx = index(&[(0, 1050, 1249)]);

        assert!(any_junction_trusted(&c, 0, 1000, &idx));
        assert!(!all_junctions_trusted(&c, 0, 1000, &idx));

        let both = index(&[(0, 1050, 1249), (0, 1080, 1579)]);
        assert!(all_junctions_trusted(&c, 0, 1000, &both));

        let none = index(&[(0, 9, 9)]);
        assert!(!any_junction_trusted(&c, 0, 1000, &none));
        // Vacuously true without junctions.
        assert!(all_junctions_trusted(&cigar("100M"), 0, 1000, &none));
    }

    #[test]
    fn test_clip_trusted_then_untrusted() {
        // First junction trusted, second not: everything from the end of
        // the trusted skip onward is rewritten.
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[(0, 1050, 1249)]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::HardClip);
        assert!(!out.all_bad);
        assert_eq!(out.cigar.to_string(), "50M200N30H500H20H");
    }

    #[test]
    fn test_clip_untrusted_then_trusted() {
        let c = cigar("50M200N30M500N20M");
        // Only the second junction [1080, 1579] is trusted.
        let idx = index(&[(0, 1080, 1579)]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::HardClip);
        assert!(!out.all_bad);
        assert_eq!(out.cigar.to_string(), "50H200H30M500N20M");
    }

    #[test]
    fn test_clip_all_untrusted_reports_all_bad() {
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::HardClip);
        assert!(out.all_bad);
        assert_eq!(out.cigar.to_string(), "50H200H30H500H20H");
    }

    #[test]
    fn test_clip_all_trusted_leaves_read_untouched() {
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[(0, 1050, 1249), (0, 1080, 1579)]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::HardClip);
        assert!(!out.all_bad);
        assert_eq!(out.cigar, c);
    }

    #[test]
    fn test_clip_soft_mode_substitutes_soft_clips() {
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[(0, 1050, 1249)]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::SoftClip);
        assert_eq!(out.cigar.to_string(), "50M200N30S500S20S");
    }

    #[test]
    fn test_clip_preserves_lengths_and_span() {
        let c = cigar("3H20M100N2I30M250N40M5S");
        let idx = index(&[(0, 1020, 1119)]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::HardClip);
        assert_eq!(out.cigar.len(), c.len());
        let lengths: Vec<_> = out.cigar.ops().iter().map(|op| op.len()).collect();
        let expected: Vec<_> = c.ops().iter().map(|op| op.len()).collect();
        assert_eq!(lengths, expected);
    }

    #[test]
    fn test_clip_three_junctions_middle_trusted() {
        // Junctions at [1010, 1109], [1030, 1229], [1060, 1459]; only the
        // middle one is trusted. Leading and trailing regions are clipped,
        // the span between the trusted junction and the next untrusted one
        // included.
        let c = cigar("10M100N20M200N30M400N40M");
        let idx = index(&[(0, 1030, 1229)]);

        let out = clip_multiply_spliced(&c, 0, 1000, &idx, OpKind::HardClip);
        assert!(!out.all_bad);
        assert_eq!(out.cigar.to_string(), "10H100H20M200N30H400H40H");
    }

    #[test]
    fn test_evaluate_unspliced_passes_through() {
        let idx = index(&[]);
        assert_eq!(evaluate(&cigar("101M"), 0, 1000, &idx, ClipMode::Hard), Verdict::Keep);
    }

    #[rstest]
    #[case(ClipMode::Hard)]
    #[case(ClipMode::Soft)]
    #[case(ClipMode::Complete)]
    fn test_evaluate_single_junction_trusted_is_kept_unchanged(#[case] mode: ClipMode) {
        let c = cigar("50M200N51M");
        let idx = index(&[(0, 1050, 1249)]);
        assert_eq!(evaluate(&c, 0, 1000, &idx, mode), Verdict::Keep);
    }

    #[rstest]
    #[case(ClipMode::Hard)]
    #[case(ClipMode::Soft)]
    #[case(ClipMode::Complete)]
    fn test_evaluate_single_junction_untrusted_is_discarded(#[case] mode: ClipMode) {
        let c = cigar("50M200N51M");
        let idx = index(&[(0, 9, 9)]);
        assert_eq!(evaluate(&c, 0, 1000, &idx, mode), Verdict::Discard);
    }

    #[test]
    fn test_evaluate_msr_mixed_is_rewritten() {
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[(0, 1050, 1249)]);

        match evaluate(&c, 0, 1000, &idx, ClipMode::Hard) {
            Verdict::Rewrite(rewritten) => {
                assert_eq!(rewritten.to_string(), "50M200N30H500H20H");
            }
            other => panic!("expected rewrite, got {other:?}"),
        }
    }

    #[test]
    fn test_evaluate_msr_all_bad_is_discarded() {
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[]);
        assert_eq!(evaluate(&c, 0, 1000, &idx, ClipMode::Hard), Verdict::Discard);
    }

    #[test]
    fn test_evaluate_complete_mode_keeps_msr_with_any_trusted_junction() {
        // In Complete mode a partially-trusted MSR is kept whole rather
        // than clipped.
        let c = cigar("50M200N30M500N20M");
        let idx = index(&[(0, 1050, 1249)]);
        assert_eq!(evaluate(&c, 0, 1000, &idx, ClipMode::Complete), Verdict::Keep);

        let none = index(&[]);
        assert_eq!(evaluate(&c, 0, 1000, &none, ClipMode::Complete), Verdict::Discard);
    }

    #[test]
    fn test_evaluate_is_idempotent_for_kept_records() {
        let c = cigar("50M200N51M");
        let idx = index(&[(0, 1050, 1249)]);

        // A pass-through record re-run through the pipeline is kept again.
        assert_eq!(evaluate(&c, 0, 1000, &idx, ClipMode::Hard), Verdict::Keep);
        assert_eq!(evaluate(&c, 0, 1000, &idx, ClipMode::Hard), Verdict::Keep);
    }

    #[test]
    fn test_clip_mode_display_and_kind() {
        assert_eq!(ClipMode::Hard.to_string(), "hard");
        assert_eq!(ClipMode::Soft.to_string(), "soft");
        assert_eq!(ClipMode::Complete.to_string(), "complete");
        assert_eq!(ClipMode::Hard.clip_kind(), OpKind::HardClip);
        assert_eq!(ClipMode::Soft.clip_kind(), OpKind::SoftClip);
        assert_eq!(ClipMode::Complete.clip_kind(), OpKind::Deletion);
    }
}
