//! The error type shared by every layer of the kernel.

use thiserror::Error;

/// Things that can go wrong inside the kernel.
///
/// Numerically degenerate input (zero-length edges, zero-area quads, edge-on
/// faces) is *not* an error: it is skipped where it is found. What ends up
/// here are the structural failures that the caller has to hear about.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A coordinate was NaN or infinite.
    #[error("coordinate is not finite")]
    NonFinite,

    /// A coordinate is too large to be represented exactly.
    #[error("coordinate {value} is outside the supported range")]
    OutOfRange {
        /// The offending coordinate, as given.
        value: String,
    },

    /// An exact operation left the 128-bit integer domain.
    #[error("exact arithmetic overflowed in {op}")]
    Overflow {
        /// The operation that overflowed.
        op: &'static str,
    },

    /// Division by an exact zero.
    #[error("rational with a zero denominator")]
    ZeroDenominator,

    /// The input mesh or loop structure is inconsistent.
    #[error("malformed topology: {0}")]
    MalformedTopology(String),

    /// The requested combination of inputs has no implementation.
    #[error("not implemented: {0}")]
    Unsupported(&'static str),

    /// A union that was expected to produce a single region produced several.
    #[error("expected a single connected result, got {pieces} pieces")]
    DisconnectedResult {
        /// How many positive pieces came out.
        pieces: usize,
    },

    /// The input is too small or too flat for the requested operation.
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),
}

/// Shorthand for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn overflow(op: &'static str) -> Error {
    Error::Overflow { op }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = Error::Overflow { op: "cross" };
        assert_eq!(err.to_string(), "exact arithmetic overflowed in cross");

        let err = Error::DisconnectedResult { pieces: 3 };
        assert!(err.to_string().contains("3 pieces"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
