//! CIGAR geometry model.
//!
//! An owned, run-length encoded view of an alignment's operation sequence.
//! The model carries the operation alphabet (including the legacy `B`
//! operator, which text CIGARs may contain but BAM records cannot), the
//! consumes-query/consumes-reference semantics fixed by the SAM format, and
//! the geometry derived from them: aligned reference span and read length.
//!
//! Conversions to and from noodles' `record_buf::Cigar` sit at the record
//! I/O boundary; everything else in the crate works on this model.

use std::fmt;
use std::str::FromStr;

use noodles::sam::alignment::record::cigar::op::Kind;
use noodles::sam::alignment::record::cigar::Op;
use noodles::sam::alignment::record_buf::Cigar as CigarBuf;

use crate::errors::{JuncfiltError, Result};

/// A CIGAR operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// `M`: alignment match (may be a sequence match or mismatch)
    Match,
    /// `I`: insertion relative to the reference
    Insertion,
    /// `D`: deletion relative to the reference
    Deletion,
    /// `N`: skipped region on the reference (an intron for spliced reads)
    ReferenceSkip,
    /// `S`: soft clip (bases present in the record but not aligned)
    SoftClip,
    /// `H`: hard clip (bases absent from the record)
    HardClip,
    /// `P`: padding (silent deletion from a padded reference)
    Pad,
    /// `=`: sequence match
    SequenceMatch,
    /// `X`: sequence mismatch
    SequenceMismatch,
    /// `B`: legacy back operator; parsable but not representable in BAM
    Back,
}

impl OpKind {
    /// Whether the operation consumes bases of the read.
    #[must_use]
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            OpKind::Match
                | OpKind::Insertion
                | OpKind::SoftClip
                | OpKind::SequenceMatch
                | OpKind::SequenceMismatch
        )
    }

    /// Whether the operation consumes bases of the reference.
    #[must_use]
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            OpKind::Match
                | OpKind::Deletion
                | OpKind::ReferenceSkip
                | OpKind::SequenceMatch
                | OpKind::SequenceMismatch
        )
    }

    /// The character used for this operation in a text CIGAR.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            OpKind::Match => 'M',
            OpKind::Insertion => 'I',
            OpKind::Deletion => 'D',
            OpKind::ReferenceSkip => 'N',
            OpKind::SoftClip => 'S',
            OpKind::HardClip => 'H',
            OpKind::Pad => 'P',
            OpKind::SequenceMatch => '=',
            OpKind::SequenceMismatch => 'X',
            OpKind::Back => 'B',
        }
    }

    /// Parses an operation character.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'M' => Some(OpKind::Match),
            'I' => Some(OpKind::Insertion),
            'D' => Some(OpKind::Deletion),
            'N' => Some(OpKind::ReferenceSkip),
            'S' => Some(OpKind::SoftClip),
            'H' => Some(OpKind::HardClip),
            'P' => Some(OpKind::Pad),
            '=' => Some(OpKind::SequenceMatch),
            'X' => Some(OpKind::SequenceMismatch),
            'B' => Some(OpKind::Back),
            _ => None,
        }
    }
}

/// A single run-length encoded CIGAR operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    kind: OpKind,
    len: usize,
}

impl CigarOp {
    /// Creates an operation of the given kind and length.
    #[must_use]
    pub fn new(kind: OpKind, len: usize) -> Self {
        Self { kind, len }
    }

    /// The operation kind.
    #[must_use]
    pub fn kind(self) -> OpKind {
        self.kind
    }

    /// The operation length.
    #[must_use]
    pub fn len(self) -> usize {
        self.len
    }

    /// Returns the same-length operation with a different kind.
    #[must_use]
    pub fn with_kind(self, kind: OpKind) -> Self {
        Self { kind, len: self.len }
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.len, self.kind.as_char())
    }
}

/// An ordered sequence of CIGAR operations.
///
/// An empty sequence is a valid degenerate state (zero aligned length), not
/// an error; it renders as `*` following SAM conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    ops: Vec<CigarOp>,
}

impl Cigar {
    /// Creates a CIGAR from a sequence of operations.
    #[must_use]
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self { ops }
    }

    /// The operations, in alignment order.
    #[must_use]
    pub fn ops(&self) -> &[CigarOp] {
        &self.ops
    }

    /// Number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the operation sequence is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Sum of reference-consuming operation lengths.
    #[must_use]
    pub fn alignment_span(&self) -> u64 {
        self.ops
            .iter()
            .filter(|op| op.kind().consumes_reference())
            .map(|op| op.len() as u64)
            .sum()
    }

    /// Sum of query-consuming operation lengths, i.e. the read length.
    #[must_use]
    pub fn read_length(&self) -> usize {
        self.ops.iter().filter(|op| op.kind().consumes_query()).map(|op| op.len()).sum()
    }

    /// 0-based inclusive end of an alignment starting at `start`, or `None`
    /// for a zero-span alignment.
    #[must_use]
    pub fn alignment_end(&self, start: u64) -> Option<u64> {
        match self.alignment_span() {
            0 => None,
            span => Some(start + span - 1),
        }
    }
}

impl FromStr for Cigar {
    type Err = JuncfiltError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() || s == "*" {
            return Ok(Self::default());
        }

        let invalid = |reason: &str| JuncfiltError::InvalidCigar {
            cigar: s.to_string(),
            reason: reason.to_string(),
        };

        let mut ops = Vec::new();
        let mut len: Option<usize> = None;

        for c in s.chars() {
            if let Some(digit) = c.to_digit(10) {
                let next = len
                    .unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|n| n.checked_add(digit as usize))
                    .ok_or_else(|| invalid("operation length overflows"))?;
                len = Some(next);
            } else {
                let kind = OpKind::from_char(c)
                    .ok_or_else(|| invalid(&format!("unknown operation '{c}'")))?;
                let len = len.take().ok_or_else(|| invalid("operation without a length"))?;
                ops.push(CigarOp::new(kind, len));
            }
        }

        if len.is_some() {
            return Err(invalid("trailing length without an operation"));
        }

        Ok(Self::new(ops))
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ops.is_empty() {
            return f.write_str("*");
        }
        for op in &self.ops {
            write!(f, "{op}")?;
        }
        Ok(())
    }
}

impl From<&CigarBuf> for Cigar {
    fn from(cigar: &CigarBuf) -> Self {
        let ops = cigar
            .as_ref()
            .iter()
            .map(|op| {
                let kind = match op.kind() {
                    Kind::Match => OpKind::Match,
                    Kind::Insertion => OpKind::Insertion,
                    Kind::Deletion => OpKind::Deletion,
                    Kind::Skip => OpKind::ReferenceSkip,
                    Kind::SoftClip => OpKind::SoftClip,
                    Kind::HardClip => OpKind::HardClip,
                    Kind::Pad => OpKind::Pad,
                    Kind::SequenceMatch => OpKind::SequenceMatch,
                    Kind::SequenceMismatch => OpKind::SequenceMismatch,
                };
                CigarOp::new(kind, op.len())
            })
            .collect();
        Self::new(ops)
    }
}

impl TryFrom<&Cigar> for CigarBuf {
    type Error = JuncfiltError;

    fn try_from(cigar: &Cigar) -> Result<Self> {
        let mut ops = Vec::with_capacity(cigar.len());
        for op in cigar.ops() {
            let kind = match op.kind() {
                OpKind::Match => Kind::Match,
                OpKind::Insertion => Kind::Insertion,
                OpKind::Deletion => Kind::Deletion,
                OpKind::ReferenceSkip => Kind::Skip,
                OpKind::SoftClip => Kind::SoftClip,
                OpKind::HardClip => Kind::HardClip,
                OpKind::Pad => Kind::Pad,
                OpKind::SequenceMatch => Kind::SequenceMatch,
                OpKind::SequenceMismatch => Kind::SequenceMismatch,
                OpKind::Back => {
                    return Err(JuncfiltError::InvalidCigar {
                        cigar: cigar.to_string(),
                        reason: "'B' operations cannot be stored in a BAM record".to_string(),
                    });
                }
            };
            ops.push(Op::new(kind, op.len()));
        }
        Ok(CigarBuf::from(ops))
    }
}
