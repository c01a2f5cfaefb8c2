/*!
 Errors that can happen when tokenizing raw `typedstream` bytes.
*/

use std::{
    array::TryFromSliceError,
    fmt::{Display, Formatter, Result},
    str::Utf8Error,
};

use crate::error::encoding::EncodingError;

/// Errors that can happen when tokenizing `typedstream` data
#[derive(Debug, Clone)]
pub enum TypedStreamError {
    /// Tried to read past the end of the stream
    OutOfBounds(usize, usize),
    /// The stream does not start with a supported header
    InvalidHeader,
    SliceError(TryFromSliceError),
    StringParseError(Utf8Error),
    /// A head byte in the reserved tag range that is not valid at this position
    InvalidTag(u8, usize),
    /// A shared string reference that points outside of the shared string table
    InvalidReference(usize, usize),
    /// An encoded reference number that does not map to a table index
    InvalidReferenceNumber(i64),
    /// A type encoding this reader cannot read values for
    UnknownEncoding(String),
    /// A string that must be present, i.e. a class name, is nil
    NilString(&'static str, usize),
    /// A non-empty array whose elements take up no bytes in the stream, i.e. `[4{}]`
    EmptyArrayElement(String, usize),
    /// A type encoding string that could not be parsed
    Encoding(EncodingError),
}

impl Display for TypedStreamError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            TypedStreamError::OutOfBounds(idx, len) => {
                write!(fmt, "Index {idx:x} is outside of range {len:x}!")
            }
            TypedStreamError::InvalidHeader => write!(fmt, "Invalid typedstream header!"),
            TypedStreamError::SliceError(why) => {
                write!(fmt, "Unable to slice source stream: {why}")
            }
            TypedStreamError::StringParseError(why) => write!(fmt, "Failed to parse string: {why}"),
            TypedStreamError::InvalidTag(tag, idx) => {
                write!(fmt, "Unexpected tag {tag:x} at index {idx:x}")
            }
            TypedStreamError::InvalidReference(number, len) => {
                write!(fmt, "Shared string reference {number} is outside of range {len}!")
            }
            TypedStreamError::InvalidReferenceNumber(encoded) => {
                write!(fmt, "Encoded reference number {encoded} is not valid")
            }
            TypedStreamError::UnknownEncoding(encoding) => {
                write!(fmt, "Unsupported type encoding {encoding:?}")
            }
            TypedStreamError::NilString(what, idx) => {
                write!(fmt, "Expected {what} at index {idx:x}, found nil")
            }
            TypedStreamError::EmptyArrayElement(encoding, idx) => {
                write!(fmt, "Array element {encoding:?} at index {idx:x} has no data")
            }
            TypedStreamError::Encoding(why) => write!(fmt, "{why}"),
        }
    }
}

impl std::error::Error for TypedStreamError {}

impl From<EncodingError> for TypedStreamError {
    fn from(why: EncodingError) -> Self {
        TypedStreamError::Encoding(why)
    }
}
