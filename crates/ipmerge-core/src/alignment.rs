// Alignment Codec
//
// Run-length encoding of per-residue alignment states, as stored by the
// pattern-scan member databases.
//
// Alignment strings use three symbols:
//   uppercase residue -> MATCH  (M)
//   lowercase residue -> INSERT (I)
//   gap symbol '-'    -> DELETE (D)
//
// Example: "MMMiiD--mM" -> states "MMMIIMDDIM" -> runs "3M2I1M2D1I1M"

use std::fmt;
use thiserror::Error;

/// Gap symbol used in alignment strings
pub const GAP: char = '-';

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignmentError {
    #[error("Invalid alignment character {character:?} at position {position}")]
    InvalidAlignmentCharacter { character: char, position: usize },

    #[error("Unknown alignment operation {operation:?} at offset {offset}")]
    UnknownOperation { operation: char, offset: usize },

    #[error("Malformed run at offset {offset}: {message}")]
    MalformedRun { offset: usize, message: String },

    #[error("Alignment needs {needed} more residues than the {available} provided")]
    ResiduesExhausted { needed: usize, available: usize },
}

pub type Result<T> = std::result::Result<T, AlignmentError>;

// ============================================================================
// States and runs
// ============================================================================

/// Per-residue alignment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignmentState {
    Match,
    Insert,
    Delete,
}

impl AlignmentState {
    /// Classify a single alignment character
    pub fn from_residue(c: char) -> Option<Self> {
        match c {
            GAP => Some(AlignmentState::Delete),
            c if c.is_ascii_uppercase() => Some(AlignmentState::Match),
            c if c.is_ascii_lowercase() => Some(AlignmentState::Insert),
            _ => None,
        }
    }

    /// Parse a state/operation code
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'M' => Some(AlignmentState::Match),
            'I' => Some(AlignmentState::Insert),
            'D' => Some(AlignmentState::Delete),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            AlignmentState::Match => 'M',
            AlignmentState::Insert => 'I',
            AlignmentState::Delete => 'D',
        }
    }

    /// Whether this state consumes a residue from the original sequence
    pub fn consumes_residue(self) -> bool {
        !matches!(self, AlignmentState::Delete)
    }
}

/// One `<count><state>` token of a run-length string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignmentOp {
    pub state: AlignmentState,
    pub count: usize,
}

impl fmt::Display for AlignmentOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.state.as_char())
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Map every character of an alignment string to its state code
pub fn classify(alignment: &str) -> Result<String> {
    alignment
        .chars()
        .enumerate()
        .map(|(position, character)| {
            AlignmentState::from_residue(character)
                .map(AlignmentState::as_char)
                .ok_or(AlignmentError::InvalidAlignmentCharacter { character, position })
        })
        .collect()
}

/// Compress a state string into `<count><state>` tokens
///
/// The state string must only contain `M`, `I` and `D`.
pub fn encode(states: &str) -> Result<String> {
    let mut encoded = String::new();
    for op in runs_of(states)? {
        encoded.push_str(&op.to_string());
    }
    Ok(encoded)
}

/// Classify and compress an alignment string in one step
pub fn encode_alignment(alignment: &str) -> Result<String> {
    encode(&classify(alignment)?)
}

fn runs_of(states: &str) -> Result<Vec<AlignmentOp>> {
    let mut runs: Vec<AlignmentOp> = Vec::new();

    for (offset, code) in states.chars().enumerate() {
        let state = AlignmentState::from_code(code)
            .ok_or(AlignmentError::UnknownOperation { operation: code, offset })?;

        match runs.last_mut() {
            Some(run) if run.state == state => run.count += 1,
            _ => runs.push(AlignmentOp { state, count: 1 }),
        }
    }

    Ok(runs)
}

/// Tokenize a run-length string into operations
pub fn parse_runs(encoded: &str) -> Result<Vec<AlignmentOp>> {
    let mut ops = Vec::new();
    let mut count: Option<usize> = None;

    for (offset, c) in encoded.char_indices() {
        if let Some(digit) = c.to_digit(10) {
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit as usize))
                .ok_or_else(|| AlignmentError::MalformedRun {
                    offset,
                    message: "run length overflows".to_string(),
                })?;
            count = Some(next);
            continue;
        }

        let state = AlignmentState::from_code(c)
            .ok_or(AlignmentError::UnknownOperation { operation: c, offset })?;

        match count.take() {
            Some(0) => {
                return Err(AlignmentError::MalformedRun {
                    offset,
                    message: format!("zero-length {} run", c),
                })
            },
            Some(count) => ops.push(AlignmentOp { state, count }),
            None => {
                return Err(AlignmentError::MalformedRun {
                    offset,
                    message: format!("operation {} has no run length", c),
                })
            },
        }
    }

    if count.is_some() {
        return Err(AlignmentError::MalformedRun {
            offset: encoded.len(),
            message: "trailing run length without operation".to_string(),
        });
    }

    Ok(ops)
}

/// Upper bound on a decoded alignment
pub const MAX_ALIGNMENT_LENGTH: usize = 1 << 24;

/// Rebuild an alignment string from the original residues and a run-length string
pub fn decode(residues: &str, encoded: &str) -> Result<String> {
    let ops = parse_runs(encoded)?;
    let mut remaining = residues.chars();
    let mut available = residues.chars().count();
    let length = ops
        .iter()
        .try_fold(0usize, |total, op| total.checked_add(op.count))
        .filter(|&total| total <= MAX_ALIGNMENT_LENGTH)
        .ok_or_else(|| AlignmentError::MalformedRun {
            offset: encoded.len(),
            message: format!("alignment longer than {} positions", MAX_ALIGNMENT_LENGTH),
        })?;
    let mut alignment = String::with_capacity(length);

    for op in ops {
        if !op.state.consumes_residue() {
            alignment.extend(std::iter::repeat(GAP).take(op.count));
            continue;
        }

        if op.count > available {
            return Err(AlignmentError::ResiduesExhausted {
                needed: op.count - available,
                available: residues.chars().count(),
            });
        }
        available -= op.count;

        let taken = remaining.by_ref().take(op.count);
        match op.state {
            AlignmentState::Insert => alignment.extend(taken.map(|c| c.to_ascii_lowercase())),
            _ => alignment.extend(taken),
        }
    }

    Ok(alignment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("MMMiiD--mM").unwrap(), "MMMIIMDDIM");
        assert_eq!(classify("").unwrap(), "");
    }

    #[test]
    fn test_classify_rejects_other_characters() {
        let err = classify("AC.GT").unwrap_err();
        assert_eq!(err, AlignmentError::InvalidAlignmentCharacter { character: '.', position: 2 });
        assert!(classify("AC*").is_err());
        assert!(classify("A C").is_err());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("MMMID").unwrap(), "3M1I1D");
        assert_eq!(encode("MMMIIMDDIM").unwrap(), "3M2I1M2D1I1M");
        assert_eq!(encode("D").unwrap(), "1D");
        assert_eq!(encode("").unwrap(), "");
    }

    #[test]
    fn test_encode_long_run() {
        let states = "M".repeat(120);
        assert_eq!(encode(&states).unwrap(), "120M");
    }

    #[test]
    fn test_encode_rejects_unknown_state() {
        assert!(matches!(
            encode("MMX"),
            Err(AlignmentError::UnknownOperation { operation: 'X', offset: 2 })
        ));
    }

    #[test]
    fn test_decode() {
        assert_eq!(decode("MMMIIDMM", "3M2I1M2D1I1M").unwrap(), "MMMiiD--mM");
        assert_eq!(decode("", "").unwrap(), "");
        assert_eq!(decode("", "3D").unwrap(), "---");
    }

    #[test]
    fn test_decode_unknown_operation() {
        assert!(matches!(
            decode("ACGT", "2M2X"),
            Err(AlignmentError::UnknownOperation { operation: 'X', .. })
        ));
    }

    #[test]
    fn test_decode_malformed_runs() {
        assert!(matches!(decode("ACGT", "M"), Err(AlignmentError::MalformedRun { .. })));
        assert!(matches!(decode("ACGT", "0M4M"), Err(AlignmentError::MalformedRun { .. })));
        assert!(matches!(decode("ACGT", "4"), Err(AlignmentError::MalformedRun { .. })));
    }

    #[test]
    fn test_decode_length_overflow() {
        let runs = format!("{}D1D", usize::MAX);
        assert!(matches!(decode("", &runs), Err(AlignmentError::MalformedRun { .. })));

        let runs = format!("{}D", MAX_ALIGNMENT_LENGTH + 1);
        assert!(matches!(decode("", &runs), Err(AlignmentError::MalformedRun { .. })));
    }

    #[test]
    fn test_decode_residues_exhausted() {
        assert_eq!(
            decode("AC", "1M3I").unwrap_err(),
            AlignmentError::ResiduesExhausted { needed: 2, available: 2 }
        );
    }

    #[test]
    fn test_alignment_op_display() {
        let op = AlignmentOp { state: AlignmentState::Insert, count: 12 };
        assert_eq!(op.to_string(), "12I");
    }

    #[test]
    fn test_end_to_end_example() {
        let alignment = "MMMiiD--mM";
        let encoded = encode_alignment(alignment).unwrap();
        assert_eq!(encoded, "3M2I1M2D1I1M");

        let residues: String = alignment
            .chars()
            .filter(|&c| c != GAP)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        assert_eq!(decode(&residues, &encoded).unwrap(), alignment);
    }

    proptest! {
        #[test]
        fn prop_round_trip(alignment in "[A-Za-z-]{0,80}") {
            let residues: String = alignment
                .chars()
                .filter(|&c| c != GAP)
                .map(|c| c.to_ascii_uppercase())
                .collect();
            let encoded = encode_alignment(&alignment).unwrap();
            prop_assert_eq!(decode(&residues, &encoded).unwrap(), alignment);
        }

        #[test]
        fn prop_runs_sum_to_length(alignment in "[A-Za-z-]{0,80}") {
            let encoded = encode_alignment(&alignment).unwrap();
            let total: usize = parse_runs(&encoded).unwrap().iter().map(|op| op.count).sum();
            prop_assert_eq!(total, alignment.chars().count());
        }
    }
}
