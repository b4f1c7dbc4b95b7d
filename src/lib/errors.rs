//! Custom error types for juncfilt operations.

use thiserror::Error;

/// Result type alias for juncfilt operations
pub type Result<T> = std::result::Result<T, JuncfiltError>;

/// Error type for juncfilt operations
#[derive(Error, Debug)]
pub enum JuncfiltError {
    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// File missing or otherwise unusable
    #[error("Invalid {file_type} file '{path}': {reason}")]
    InvalidFileFormat {
        /// Type of file (e.g., "Input BAM", "Junction")
        file_type: String,
        /// Path to the file
        path: String,
        /// Explanation of the problem
        reason: String,
    },

    /// A malformed record in the trusted junction file
    #[error("Invalid junction record at {path}:{line}: {reason}")]
    JunctionRecord {
        /// Path to the junction file
        path: String,
        /// 1-based line number of the offending record
        line: u64,
        /// Explanation of the problem
        reason: String,
    },

    /// A record references a reference id absent from the header dictionary
    #[error(
        "Record references unknown reference id {ref_id} (header has {known} reference sequences)"
    )]
    UnknownReferenceId {
        /// The unresolvable reference id
        ref_id: usize,
        /// Number of reference sequences in the dictionary
        known: usize,
    },

    /// A spliced record without a reference id or alignment position
    #[error("Spliced record '{name}' has no reference id or alignment position")]
    UnplacedSplicedRecord {
        /// The record name, or `<unnamed>`
        name: String,
    },

    /// A malformed or unrepresentable CIGAR
    #[error("Invalid CIGAR '{cigar}': {reason}")]
    InvalidCigar {
        /// The offending CIGAR text
        cigar: String,
        /// Explanation of the problem
        reason: String,
    },
}
