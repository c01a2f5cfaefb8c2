/*!
 Parsers and builders for Objective-C type encoding strings.

 A `typedstream` does not tag every value with its type. Instead, each group of values is preceded by a
 string of [type encodings](https://developer.apple.com/library/archive/documentation/Cocoa/Conceptual/ObjCRuntimeGuide/Articles/ocrtTypeEncodings.html),
 and the reader has to interpret that string to know how many values follow and what shape they have.

 The grammar is small:
   - Single characters are primitive types, i.e. `i` for an `int` or `@` for an object
   - `[<length><element>]` is a fixed-length C array, i.e. `[16c]`
   - `{<name>=<fields>}` is a struct, where the name is optional, i.e. `{_NSPoint=ff}`

 Arrays and structs can be nested arbitrarily, and several encodings can be concatenated in one string.
*/

use std::iter::FusedIterator;

use crate::error::encoding::EncodingError;

/// Characters that open a nested encoding
const OPENERS: [char; 3] = ['(', '[', '{'];
/// Characters that close a nested encoding
const CLOSERS: [char; 3] = [')', ']', '}'];

/// Find the exclusive end index of the single encoding that begins at `start`.
///
/// Only the nesting depth is tracked, so `[i}` is accepted as a complete encoding;
/// callers that need a specific shape validate it with [`parse_array_encoding`] or [`parse_struct_encoding`].
///
/// # Example
///
/// ```
/// use typedstream_archive::encodings::end_of_encoding;
///
/// assert_eq!(end_of_encoding("i[3i]", 0), Ok(1));
/// assert_eq!(end_of_encoding("i[3i]", 1), Ok(5));
/// ```
pub fn end_of_encoding(encoding: &str, start: usize) -> Result<usize, EncodingError> {
    if start >= encoding.len() || !encoding.is_char_boundary(start) {
        return Err(EncodingError::StartOutOfRange(start, encoding.len()));
    }

    let mut depth: usize = 0;
    for (offset, ch) in encoding[start..].char_indices() {
        let end = start + offset + ch.len_utf8();
        if OPENERS.contains(&ch) {
            depth += 1;
        } else if depth > 0 {
            if CLOSERS.contains(&ch) {
                depth -= 1;
                if depth == 0 {
                    return Ok(end);
                }
            }
        } else {
            return Ok(end);
        }
    }

    Err(EncodingError::Incomplete(encoding[start..].to_string()))
}

/// Iterator over the individual encodings in a concatenated encoding string
///
/// Created by [`split_encodings`]. Stops after yielding the first error.
#[derive(Debug, Clone)]
pub struct SplitEncodings<'a> {
    encodings: &'a str,
    start: usize,
    failed: bool,
}

impl<'a> Iterator for SplitEncodings<'a> {
    type Item = Result<&'a str, EncodingError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.start >= self.encodings.len() {
            return None;
        }
        match end_of_encoding(self.encodings, self.start) {
            Ok(end) => {
                let encoding = &self.encodings[self.start..end];
                self.start = end;
                Some(Ok(encoding))
            }
            Err(why) => {
                self.failed = true;
                Some(Err(why))
            }
        }
    }
}

impl FusedIterator for SplitEncodings<'_> {}

/// Split apart the encodings contained in a single encoding string
///
/// # Example
///
/// ```
/// use typedstream_archive::encodings::split_encodings;
///
/// let parts: Result<Vec<&str>, _> = split_encodings("ii[3i]").collect();
/// assert_eq!(parts.unwrap(), vec!["i", "i", "[3i]"]);
/// ```
pub fn split_encodings(encodings: &str) -> SplitEncodings<'_> {
    SplitEncodings {
        encodings,
        start: 0,
        failed: false,
    }
}

/// Concatenate several encodings into a single encoding string
pub fn join_encodings<S: AsRef<str>>(encodings: &[S]) -> String {
    encodings.iter().map(AsRef::as_ref).collect()
}

/// The parts of an array type encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayEncoding<'a> {
    /// The number of elements in the array
    pub length: usize,
    /// The encoding of every element, not split any further
    pub element_encoding: &'a str,
}

/// Parse an array type encoding like `[16c]` into its length and element encoding
pub fn parse_array_encoding(encoding: &str) -> Result<ArrayEncoding<'_>, EncodingError> {
    let inner = encoding
        .strip_prefix('[')
        .ok_or_else(|| EncodingError::MissingDelimiter('[', encoding.to_string()))?;
    let inner = inner
        .strip_suffix(']')
        .ok_or_else(|| EncodingError::MissingDelimiter(']', encoding.to_string()))?;

    let digits = inner
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(inner.len());
    if digits == 0 {
        return Err(EncodingError::MissingLength(encoding.to_string()));
    }

    let length = inner[..digits]
        .parse()
        .map_err(|_| EncodingError::InvalidLength(encoding.to_string()))?;

    Ok(ArrayEncoding {
        length,
        element_encoding: &inner[digits..],
    })
}

/// Build an array type encoding from a length and an element encoding
pub fn build_array_encoding(length: i64, element_encoding: &str) -> Result<String, EncodingError> {
    if length < 0 {
        return Err(EncodingError::NegativeLength(length));
    }
    Ok(format!("[{length}{element_encoding}]"))
}

/// The parts of a struct type encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructEncoding<'a> {
    /// The struct name, if the encoding has one
    pub name: Option<&'a str>,
    /// The encodings of the struct fields, in order
    pub field_encodings: Vec<&'a str>,
}

/// Parse a struct type encoding like `{_NSPoint=ff}` into its name and field encodings
pub fn parse_struct_encoding(encoding: &str) -> Result<StructEncoding<'_>, EncodingError> {
    let inner = encoding
        .strip_prefix('{')
        .ok_or_else(|| EncodingError::MissingDelimiter('{', encoding.to_string()))?;
    let inner = inner
        .strip_suffix('}')
        .ok_or_else(|| EncodingError::MissingDelimiter('}', encoding.to_string()))?;

    // A `=` inside a nested struct belongs to that struct's name
    let head = inner.find('{').unwrap_or(inner.len());
    let (name, fields) = match inner[..head].find('=') {
        Some(equals) => (Some(&inner[..equals]), &inner[equals + 1..]),
        None => (None, inner),
    };

    Ok(StructEncoding {
        name,
        field_encodings: split_encodings(fields).collect::<Result<_, _>>()?,
    })
}

/// Build a struct type encoding from field encodings and an optional name
pub fn build_struct_encoding<S: AsRef<str>>(field_encodings: &[S], name: Option<&str>) -> String {
    let fields = join_encodings(field_encodings);
    match name {
        Some(name) => format!("{{{name}={fields}}}"),
        None => format!("{{{fields}}}"),
    }
}
