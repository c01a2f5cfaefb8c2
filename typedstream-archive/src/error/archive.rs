/*!
 Errors that can happen when rebuilding an object graph from `typedstream` tokens.
*/

use std::fmt::{Display, Formatter, Result};

use crate::{
    error::{encoding::EncodingError, typedstream::TypedStreamError},
    typedstream::models::{ReferenceType, Token},
};

/// Errors that can happen when unarchiving `typedstream` data
#[derive(Debug, Clone)]
pub enum UnarchiveError {
    /// The underlying token stream failed
    Stream(TypedStreamError),
    /// A type encoding string violates the encoding grammar
    MalformedEncoding(EncodingError),
    /// A back-reference points past the end of the shared object table
    ReferenceOutOfRange(usize, usize),
    /// A back-reference points to an entry of a different category
    ReferenceCategoryMismatch {
        number: usize,
        expected: ReferenceType,
        found: ReferenceType,
    },
    /// A back-reference points to an object that is still being constructed
    UnresolvedPlaceholder(usize),
    /// A shared object table slot was filled twice
    SlotAlreadyFilled(usize),
    /// A token other than the one required by the protocol; `None` is the end of the stream
    UnexpectedToken {
        expected: &'static str,
        found: Option<Token>,
    },
    /// A known type does not implement the archived class version
    UnsupportedClassVersion { class: String, version: i64 },
    /// A decoded count for a known aggregate is negative
    NegativeCount(&'static str, i64),
    /// A typed value group has different encodings than the caller asked for
    EncodingMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// A value has a different shape than a known type requires
    InvalidValue(&'static str, String),
}

impl Display for UnarchiveError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            UnarchiveError::Stream(why) => write!(fmt, "{why}"),
            UnarchiveError::MalformedEncoding(why) => write!(fmt, "Malformed encoding: {why}"),
            UnarchiveError::ReferenceOutOfRange(number, len) => {
                write!(fmt, "Reference {number} is outside of shared object table of size {len}!")
            }
            UnarchiveError::ReferenceCategoryMismatch {
                number,
                expected,
                found,
            } => write!(
                fmt,
                "Reference {number} should point to {expected}, but points to {found}"
            ),
            UnarchiveError::UnresolvedPlaceholder(number) => {
                write!(fmt, "Reference {number} points to an object that is not decoded yet")
            }
            UnarchiveError::SlotAlreadyFilled(number) => {
                write!(fmt, "Shared object {number} was already filled")
            }
            UnarchiveError::UnexpectedToken { expected, found } => match found {
                Some(token) => write!(fmt, "Expected {expected}, not {token:?}"),
                None => write!(fmt, "Expected {expected}, not end of stream"),
            },
            UnarchiveError::UnsupportedClassVersion { class, version } => {
                write!(fmt, "Unsupported version of {class}: {version}")
            }
            UnarchiveError::NegativeCount(name, count) => {
                write!(fmt, "{name} element count cannot be negative: {count}")
            }
            UnarchiveError::EncodingMismatch { expected, found } => {
                write!(fmt, "Expected type encodings {expected:?}, got {found:?}")
            }
            UnarchiveError::InvalidValue(name, why) => {
                write!(fmt, "Invalid {name} value: {why}")
            }
        }
    }
}

impl std::error::Error for UnarchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UnarchiveError::Stream(why) => Some(why),
            UnarchiveError::MalformedEncoding(why) => Some(why),
            _ => None,
        }
    }
}

impl From<TypedStreamError> for UnarchiveError {
    fn from(why: TypedStreamError) -> Self {
        UnarchiveError::Stream(why)
    }
}

impl From<EncodingError> for UnarchiveError {
    fn from(why: EncodingError) -> Self {
        UnarchiveError::MalformedEncoding(why)
    }
}
