//! Error type for BER decoding, encoding and node mutation

use crate::ber::BerTag;
use nom::error::{ErrorKind, ParseError};
use nom::IResult;
use thiserror::Error;

/// Errors raised by the codec
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BerError {
    /// Malformed tag or length bytes, missing end-of-contents, or a declared length that does
    /// not match the value
    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),
    /// Input ended before a complete element could be read
    #[error("truncated input")]
    TruncatedInput,

    /// A specialized decode was invoked on a node with another tag
    #[error("tag mismatch: expected {expected:?}, found {found:?}")]
    TagMismatch { expected: BerTag, found: BerTag },

    /// Child mutation on a node that is neither a sequence, a set nor constructed
    #[error("node does not hold children")]
    UnsupportedStructure,
    #[error("node is immutable")]
    ImmutableViolation,
    #[error("mutation is disabled on node")]
    MutationDisabled,

    /// Invalid path descriptor construction
    #[error("invalid path descriptor: {0}")]
    InvalidDescriptor(&'static str),

    /// Nesting exceeds `MAX_RECURSION`
    #[error("maximum nesting depth exceeded")]
    BerMaxDepth,

    /// Stream failure other than end of input
    #[error("I/O error: {0:?}")]
    Io(std::io::ErrorKind),

    #[error("nom error: {0:?}")]
    NomError(ErrorKind),
}

impl BerError {
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        BerError::InvalidEncoding(msg.into())
    }
}

impl<I> ParseError<I> for BerError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        BerError::NomError(kind)
    }
    // the innermost error wins
    fn append(_input: I, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl From<std::io::Error> for BerError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => BerError::TruncatedInput,
            kind => BerError::Io(kind),
        }
    }
}

/// Holds the result of BER parsing functions
///
/// `I` is the input type, `O` the output type. The error is always a `BerError`.
pub type BerResult<'a, O> = IResult<&'a [u8], O, BerError>;

/// Result of node operations
pub type Result<T, E = BerError> = std::result::Result<T, E>;

/// Convert a nom error into the public error taxonomy
pub(crate) fn from_nom(e: nom::Err<BerError>) -> BerError {
    match e {
        nom::Err::Incomplete(_) => BerError::TruncatedInput,
        nom::Err::Error(e) | nom::Err::Failure(e) => match e {
            BerError::NomError(kind) => BerError::InvalidEncoding(format!("{:?}", kind)),
            e => e,
        },
    }
}
