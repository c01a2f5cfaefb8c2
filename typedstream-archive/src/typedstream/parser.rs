/*!
 Contains logic to tokenize a raw `typedstream` into the structural [`Token`]s consumed by the
 [`Unarchiver`](crate::archiver::unarchiver::Unarchiver).

 Logic referenced from `typedstream` source located at:
   - [`typedstream.h`](https://opensource.apple.com/source/gcc/gcc-1493/libobjc/objc/typedstream.h.auto.html)
   - [`archive.c`](https://opensource.apple.com/source/gcc/gcc-5484/libobjc/archive.c.auto.html)
   - [`objc/typedstream.m`](https://archive.org/details/darwin_0.1)
*/

use std::collections::VecDeque;

use crate::{
    encodings::{parse_array_encoding, parse_struct_encoding, split_encodings},
    error::typedstream::TypedStreamError,
    typedstream::models::{ObjectReference, ReferenceType, Token},
};

/// Indicates an [`i16`] in the byte stream
const I_16: u8 = 0x81;
/// Indicates an [`i32`] in the byte stream
const I_32: u8 = 0x82;
/// Indicates an [`f32`] or [`f64`] in the byte stream; the encoding determines the size
const DECIMAL: u8 = 0x83;
/// Indicates the start of a new object, class, or string
const START: u8 = 0x84;
/// Indicates that there is no data, for example the end of a class inheritance chain
const EMPTY: u8 = 0x85;
/// Indicates the last byte of an object
const END: u8 = 0x86;
/// Head bytes from `0x80` through `0x91` are reserved as tags and are never literal integers
const FIRST_TAG: u8 = 0x80;
const LAST_TAG: u8 = 0x91;
/// Reference numbers are stored offset by the signed value of the first non-tag byte, `0x92`
const REFERENCE_TAG: i64 = -110;

/// Signature of streams that store integers in big endian order
const SIGNATURE_BIG_ENDIAN: &[u8] = b"typedstream";
/// Signature of streams that store integers in little endian order
const SIGNATURE_LITTLE_ENDIAN: &[u8] = b"streamtyped";

/// Reads [`Token`]s from a `typedstream`
///
/// The reader tokenizes one top-level group of typed values at a time and yields its tokens in order.
/// Once an error is found, the tokens read before it are yielded, followed by the error, and then the
/// iterator ends.
///
/// # Example
///
/// ```
/// use typedstream_archive::typedstream::{models::Token, parser::TypedStreamReader};
///
/// let mut bytes = vec![0x04, 0x0b];
/// bytes.extend_from_slice(b"streamtyped");
/// bytes.extend_from_slice(&[0x81, 0xe8, 0x03]);
/// // A single `int` with the value 42
/// bytes.extend_from_slice(&[0x84, 0x01, b'i', 0x2a]);
///
/// let tokens: Result<Vec<Token>, _> = TypedStreamReader::from(&bytes[..]).collect();
/// assert_eq!(
///     tokens.unwrap(),
///     vec![
///         Token::BeginTypedValues(vec!["i".to_string()]),
///         Token::SignedInteger(42),
///         Token::EndTypedValues,
///     ]
/// );
/// ```
#[derive(Debug)]
pub struct TypedStreamReader<'a> {
    /// The `typedstream` we want to parse
    stream: &'a [u8],
    /// The current index we are at in the stream
    idx: usize,
    /// Whether the stream stores multi-byte integers in big endian order
    big_endian: bool,
    /// The streamer version from the header, once it has been read
    streamer_version: Option<u8>,
    /// The system version from the header, once it has been read
    system_version: Option<i64>,
    /// As we parse the `typedstream`, build a table of seen strings to reference in the future
    ///
    /// The first time a string (i.e. a class name or a type encoding) is seen, it is present in the stream literally,
    /// but afterwards it is only referenced by index in order of appearance.
    shared_strings: Vec<String>,
    /// Tokens read from the stream that have not been emitted yet
    pending: VecDeque<Token>,
    /// An error to emit once the pending tokens are drained
    error: Option<TypedStreamError>,
    /// Set once the stream is exhausted or an error was found
    done: bool,
}

impl<'a> From<&'a [u8]> for TypedStreamReader<'a> {
    fn from(stream: &'a [u8]) -> Self {
        Self {
            stream,
            idx: 0,
            big_endian: false,
            streamer_version: None,
            system_version: None,
            shared_strings: vec![],
            pending: VecDeque::new(),
            error: None,
            done: false,
        }
    }
}

impl<'a> TypedStreamReader<'a> {
    /// The streamer version from the header, available after the first token is read
    pub fn streamer_version(&self) -> Option<u8> {
        self.streamer_version
    }

    /// The system version from the header, available after the first token is read
    pub fn system_version(&self) -> Option<i64> {
        self.system_version
    }

    /// Whether the stream stores integers in big endian order
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Read exactly `n` bytes from the stream
    fn read_exact_bytes(&mut self, n: usize) -> Result<&'a [u8], TypedStreamError> {
        let stream: &'a [u8] = self.stream;
        let end = self.idx.saturating_add(n);
        let range = stream
            .get(self.idx..end)
            .ok_or(TypedStreamError::OutOfBounds(end, self.stream.len()))?;
        self.idx = end;
        Ok(range)
    }

    /// Read exactly `N` bytes from the stream into an array
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], TypedStreamError> {
        self.read_exact_bytes(N)?
            .try_into()
            .map_err(TypedStreamError::SliceError)
    }

    /// Read the byte that determines how the following data is stored
    fn read_head(&mut self) -> Result<u8, TypedStreamError> {
        Ok(self.read_exact_bytes(1)?[0])
    }

    /// Build the error for a tag that is not valid where it was found
    fn invalid_tag(&self, tag: u8) -> TypedStreamError {
        TypedStreamError::InvalidTag(tag, self.idx.saturating_sub(1))
    }

    fn read_u16(&mut self) -> Result<[u8; 2], TypedStreamError> {
        self.read_array::<2>()
    }

    fn read_u32(&mut self) -> Result<[u8; 4], TypedStreamError> {
        self.read_array::<4>()
    }

    /// Read a signed integer from the stream. Because we don't know the size of the integer ahead of time,
    /// we store it in the largest possible value.
    fn read_signed_int(&mut self, head: u8) -> Result<i64, TypedStreamError> {
        match head {
            I_16 => {
                let bytes = self.read_u16()?;
                let value = if self.big_endian {
                    i16::from_be_bytes(bytes)
                } else {
                    i16::from_le_bytes(bytes)
                };
                Ok(value as i64)
            }
            I_32 => {
                let bytes = self.read_u32()?;
                let value = if self.big_endian {
                    i32::from_be_bytes(bytes)
                } else {
                    i32::from_le_bytes(bytes)
                };
                Ok(value as i64)
            }
            FIRST_TAG..=LAST_TAG => Err(self.invalid_tag(head)),
            literal => Ok(literal as i8 as i64),
        }
    }

    /// Read an unsigned integer from the stream. Because we don't know the size of the integer ahead of time,
    /// we store it in the largest possible value.
    fn read_unsigned_int(&mut self, head: u8) -> Result<u64, TypedStreamError> {
        match head {
            I_16 => {
                let bytes = self.read_u16()?;
                let value = if self.big_endian {
                    u16::from_be_bytes(bytes)
                } else {
                    u16::from_le_bytes(bytes)
                };
                Ok(value as u64)
            }
            I_32 => {
                let bytes = self.read_u32()?;
                let value = if self.big_endian {
                    u32::from_be_bytes(bytes)
                } else {
                    u32::from_le_bytes(bytes)
                };
                Ok(value as u64)
            }
            FIRST_TAG..=LAST_TAG => Err(self.invalid_tag(head)),
            literal => Ok(literal as u64),
        }
    }

    /// Read a length prefix, which must fit in memory
    fn read_length(&mut self, head: u8) -> Result<usize, TypedStreamError> {
        let length = self.read_unsigned_int(head)?;
        usize::try_from(length).map_err(|_| TypedStreamError::OutOfBounds(usize::MAX, self.stream.len()))
    }

    /// Read a single-precision float from the byte stream
    fn read_float(&mut self, head: u8) -> Result<f32, TypedStreamError> {
        match head {
            DECIMAL => {
                let bytes = self.read_u32()?;
                Ok(if self.big_endian {
                    f32::from_be_bytes(bytes)
                } else {
                    f32::from_le_bytes(bytes)
                })
            }
            _ => Ok(self.read_signed_int(head)? as f32),
        }
    }

    /// Read a double-precision float from the byte stream
    fn read_double(&mut self, head: u8) -> Result<f64, TypedStreamError> {
        match head {
            DECIMAL => {
                let bytes = self.read_array::<8>()?;
                Ok(if self.big_endian {
                    f64::from_be_bytes(bytes)
                } else {
                    f64::from_le_bytes(bytes)
                })
            }
            _ => Ok(self.read_signed_int(head)? as f64),
        }
    }

    /// Convert a stored reference number into an index
    fn read_reference(&mut self, head: u8) -> Result<usize, TypedStreamError> {
        let encoded = self.read_signed_int(head)?;
        usize::try_from(encoded - REFERENCE_TAG)
            .map_err(|_| TypedStreamError::InvalidReferenceNumber(encoded))
    }

    /// Read a length-prefixed run of bytes
    fn read_unshared_bytes(&mut self, head: u8) -> Result<&'a [u8], TypedStreamError> {
        let length = self.read_length(head)?;
        self.read_exact_bytes(length)
    }

    /// Read a length-prefixed run of bytes as a String
    fn read_unshared_string(&mut self, head: u8) -> Result<String, TypedStreamError> {
        let bytes = self.read_unshared_bytes(head)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(TypedStreamError::StringParseError)
    }

    /// Read a string that is either literal, nil, or a reference to an already-seen string
    fn read_shared_string(&mut self, head: u8) -> Result<Option<String>, TypedStreamError> {
        match head {
            EMPTY => Ok(None),
            START => {
                let length_head = self.read_head()?;
                let string = self.read_unshared_string(length_head)?;
                tracing::trace!(index = self.shared_strings.len(), %string, "shared string");
                self.shared_strings.push(string.clone());
                Ok(Some(string))
            }
            _ => {
                let number = self.read_reference(head)?;
                self.shared_strings
                    .get(number)
                    .cloned()
                    .map(Some)
                    .ok_or(TypedStreamError::InvalidReference(
                        number,
                        self.shared_strings.len(),
                    ))
            }
        }
    }

    /// Read a shared string that may not be nil
    fn read_required_string(&mut self, what: &'static str) -> Result<String, TypedStreamError> {
        let position = self.idx;
        let head = self.read_head()?;
        self.read_shared_string(head)?
            .ok_or(TypedStreamError::NilString(what, position))
    }

    /// In the original source there are two byte orders; the signature tells us which one is used
    pub fn validate_header(&mut self) -> Result<(), TypedStreamError> {
        let streamer_version = self.read_head()?;

        let head = self.read_head()?;
        let signature = self.read_unshared_bytes(head)?;
        self.big_endian = match signature {
            SIGNATURE_BIG_ENDIAN => true,
            SIGNATURE_LITTLE_ENDIAN => false,
            _ => return Err(TypedStreamError::InvalidHeader),
        };

        if !matches!(streamer_version, 3 | 4) {
            return Err(TypedStreamError::InvalidHeader);
        }

        let head = self.read_head()?;
        let system_version = self.read_signed_int(head)?;

        tracing::debug!(
            streamer_version,
            system_version,
            big_endian = self.big_endian,
            "read typedstream header"
        );
        self.streamer_version = Some(streamer_version);
        self.system_version = Some(system_version);
        Ok(())
    }

    /// Queue a token to be emitted
    fn emit(&mut self, token: Token) {
        self.pending.push_back(token);
    }

    /// Read a class chain: each new class is followed by its superclass, until nil or a reference
    fn read_class(&mut self, head: u8) -> Result<(), TypedStreamError> {
        let mut head = head;
        loop {
            match head {
                START => {
                    let name = self.read_required_string("class name")?;
                    let version_head = self.read_head()?;
                    let version = self.read_signed_int(version_head)?;
                    self.emit(Token::SingleClass { name, version });
                    head = self.read_head()?;
                }
                EMPTY => {
                    self.emit(Token::Nil);
                    return Ok(());
                }
                _ => {
                    let number = self.read_reference(head)?;
                    self.emit(Token::Reference(ObjectReference::new(
                        ReferenceType::Class,
                        number,
                    )));
                    return Ok(());
                }
            }
        }
    }

    /// Read an object: nil, a reference, or a class chain followed by groups of typed values
    fn read_object(&mut self) -> Result<(), TypedStreamError> {
        let head = self.read_head()?;
        match head {
            EMPTY => self.emit(Token::Nil),
            START => {
                self.emit(Token::BeginObject);
                let class_head = self.read_head()?;
                self.read_class(class_head)?;
                loop {
                    let head = self.read_head()?;
                    if head == END {
                        break;
                    }
                    self.read_typed_values(head)?;
                }
                self.emit(Token::EndObject);
            }
            _ => {
                let number = self.read_reference(head)?;
                self.emit(Token::Reference(ObjectReference::new(
                    ReferenceType::Object,
                    number,
                )));
            }
        }
        Ok(())
    }

    /// Read a C string, which gets a number in the shared object table the first time it is seen
    fn read_c_string(&mut self) -> Result<(), TypedStreamError> {
        let head = self.read_head()?;
        match head {
            EMPTY => self.emit(Token::Nil),
            START => {
                let string_head = self.read_head()?;
                match self.read_shared_string(string_head)? {
                    Some(string) => self.emit(Token::CString(string)),
                    None => self.emit(Token::Nil),
                }
            }
            _ => {
                let number = self.read_reference(head)?;
                self.emit(Token::Reference(ObjectReference::new(
                    ReferenceType::CString,
                    number,
                )));
            }
        }
        Ok(())
    }

    /// Given a single type encoding, read the value it describes from the stream
    fn read_value(&mut self, encoding: &str) -> Result<(), TypedStreamError> {
        match encoding {
            "c" | "C" => {
                let byte = self.read_head()?;
                self.emit(if encoding == "c" {
                    Token::SignedInteger(byte as i8 as i64)
                } else {
                    Token::UnsignedInteger(byte as u64)
                });
            }
            "s" | "i" | "l" | "q" => {
                let head = self.read_head()?;
                let value = self.read_signed_int(head)?;
                self.emit(Token::SignedInteger(value));
            }
            "S" | "I" | "L" | "Q" => {
                let head = self.read_head()?;
                let value = self.read_unsigned_int(head)?;
                self.emit(Token::UnsignedInteger(value));
            }
            "f" => {
                let head = self.read_head()?;
                let value = self.read_float(head)?;
                self.emit(Token::Float(value));
            }
            "d" => {
                let head = self.read_head()?;
                let value = self.read_double(head)?;
                self.emit(Token::Double(value));
            }
            "+" => {
                let head = self.read_head()?;
                let string = self.read_unshared_string(head)?;
                self.emit(Token::String(string));
            }
            "*" => self.read_c_string()?,
            "%" | ":" => {
                let head = self.read_head()?;
                let token = match self.read_shared_string(head)? {
                    Some(string) if encoding == "%" => Token::Atom(string),
                    Some(string) => Token::Selector(string),
                    None => Token::Nil,
                };
                self.emit(token);
            }
            "#" => {
                let head = self.read_head()?;
                self.read_class(head)?;
            }
            "@" => self.read_object()?,
            _ if encoding.starts_with('[') => {
                let array = parse_array_encoding(encoding)?;
                if matches!(array.element_encoding, "c" | "C") {
                    let data = self.read_exact_bytes(array.length)?.to_vec();
                    self.emit(Token::ByteArray {
                        element_encoding: array.element_encoding.to_string(),
                        data,
                    });
                } else {
                    self.emit(Token::BeginArray {
                        element_encoding: array.element_encoding.to_string(),
                        length: array.length,
                    });
                    for _ in 0..array.length {
                        let start = self.idx;
                        self.read_value(array.element_encoding)?;
                        // Elements like `{}` read nothing, so the length alone would drive the loop
                        if self.idx == start {
                            return Err(TypedStreamError::EmptyArrayElement(
                                array.element_encoding.to_string(),
                                start,
                            ));
                        }
                    }
                    self.emit(Token::EndArray);
                }
            }
            _ if encoding.starts_with('{') => {
                let parsed = parse_struct_encoding(encoding)?;
                self.emit(Token::BeginStruct {
                    name: parsed.name.map(str::to_string),
                    field_encodings: parsed
                        .field_encodings
                        .iter()
                        .map(|field| field.to_string())
                        .collect(),
                });
                for field in &parsed.field_encodings {
                    self.read_value(field)?;
                }
                self.emit(Token::EndStruct);
            }
            other => return Err(TypedStreamError::UnknownEncoding(other.to_string())),
        }
        Ok(())
    }

    /// Read a group of values: a shared encoding string followed by one value per encoding
    fn read_typed_values(&mut self, head: u8) -> Result<(), TypedStreamError> {
        let position = self.idx.saturating_sub(1);
        let encoding_string = self
            .read_shared_string(head)?
            .ok_or(TypedStreamError::NilString("type encoding", position))?;
        let encodings = split_encodings(&encoding_string)
            .map(|encoding| encoding.map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;

        self.emit(Token::BeginTypedValues(encodings.clone()));
        for encoding in &encodings {
            self.read_value(encoding)?;
        }
        self.emit(Token::EndTypedValues);
        Ok(())
    }

    /// Tokenize the next top-level group of typed values, reading the header first if needed
    fn read_next_group(&mut self) -> Result<(), TypedStreamError> {
        if self.streamer_version.is_none() {
            self.validate_header()?;
        }
        if self.idx >= self.stream.len() {
            self.done = true;
            return Ok(());
        }
        let head = self.read_head()?;
        self.read_typed_values(head)
    }
}

impl<'a> Iterator for TypedStreamReader<'a> {
    type Item = Result<Token, TypedStreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if let Some(why) = self.error.take() {
                return Some(Err(why));
            }
            if self.done {
                return None;
            }
            if let Err(why) = self.read_next_group() {
                tracing::debug!(index = self.idx, %why, "stopped reading typedstream");
                self.error = Some(why);
                self.done = true;
            }
        }
    }
}
