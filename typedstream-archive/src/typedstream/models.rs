/*!
 Tokens emitted by the [`TypedStreamReader`](crate::typedstream::parser::TypedStreamReader).

 The tokens describe the structure of the stream without interpreting it: begin and end markers for
 nested data, literal values, and references to data that was already seen.
*/

use std::fmt::{Display, Formatter, Result};

/// The kind of entry a back-reference points to in the shared object table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    /// A C string stored with the `*` encoding
    CString,
    /// A class in an inheritance chain
    Class,
    /// An instance of a class
    Object,
}

impl Display for ReferenceType {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            ReferenceType::CString => write!(fmt, "a C string"),
            ReferenceType::Class => write!(fmt, "a class"),
            ReferenceType::Object => write!(fmt, "an object"),
        }
    }
}

/// A reference to an entry that was already read from the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectReference {
    /// The kind of entry the reference expects to find
    pub reference_type: ReferenceType,
    /// The index into the shared object table
    pub number: usize,
}

impl ObjectReference {
    pub fn new(reference_type: ReferenceType, number: usize) -> Self {
        Self {
            reference_type,
            number,
        }
    }
}

/// A single structural token read from a `typedstream`
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A missing object, class, or string
    Nil,
    /// Signed integer types are coerced into this container
    SignedInteger(i64),
    /// Unsigned integer types are coerced into this container
    UnsignedInteger(u64),
    /// Single precision float
    Float(f32),
    /// Double precision float
    Double(f64),
    /// Text stored literally with the `+` encoding
    String(String),
    /// A back-reference to an already-seen C string, class, or object
    Reference(ObjectReference),
    /// A C string seen for the first time; it gets a number in the shared object table
    CString(String),
    /// An atom, a string that is never referenced by number
    Atom(String),
    /// A selector name
    Selector(String),
    /// A single class in an inheritance chain, followed by its superclass
    SingleClass { name: String, version: i64 },
    /// The start of a new object, followed by its class chain and its typed value groups
    BeginObject,
    /// The end of an object
    EndObject,
    /// A C array of `char` or `unsigned char` stored as raw bytes
    ByteArray {
        element_encoding: String,
        data: Vec<u8>,
    },
    /// The start of a C array with a known length
    BeginArray {
        element_encoding: String,
        length: usize,
    },
    /// The end of a C array
    EndArray,
    /// The start of a struct
    BeginStruct {
        name: Option<String>,
        field_encodings: Vec<String>,
    },
    /// The end of a struct
    EndStruct,
    /// The start of a group of values, one per encoding
    BeginTypedValues(Vec<String>),
    /// The end of a group of values
    EndTypedValues,
}
