/*!
 Errors that can happen when parsing or building Objective-C type encoding strings.
*/

use std::fmt::{Display, Formatter, Result};

/// Errors that can happen when handling type encoding strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The start index does not point inside the encoding string
    StartOutOfRange(usize, usize),
    /// The encoding ended while brackets were still open
    Incomplete(String),
    /// A required opening or closing delimiter is missing
    MissingDelimiter(char, String),
    /// An array encoding does not contain a length
    MissingLength(String),
    /// An array encoding contains a length that does not fit in memory
    InvalidLength(String),
    /// An array encoding was built with a negative length
    NegativeLength(i64),
}

impl Display for EncodingError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            EncodingError::StartOutOfRange(start, len) => {
                write!(fmt, "Start index {start} not in range({len})!")
            }
            EncodingError::Incomplete(encoding) => {
                write!(fmt, "Incomplete type encoding: {encoding:?}")
            }
            EncodingError::MissingDelimiter(delimiter, encoding) => {
                write!(fmt, "Missing {delimiter:?} in type encoding {encoding:?}")
            }
            EncodingError::MissingLength(encoding) => {
                write!(fmt, "Missing length in array type encoding {encoding:?}")
            }
            EncodingError::InvalidLength(encoding) => {
                write!(fmt, "Invalid length in array type encoding {encoding:?}")
            }
            EncodingError::NegativeLength(length) => {
                write!(fmt, "Array length cannot be negative: {length}")
            }
        }
    }
}

impl std::error::Error for EncodingError {}
