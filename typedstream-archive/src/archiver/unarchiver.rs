/*!
 Contains logic to rebuild objects, classes, and values from the [`Token`]s of a `typedstream`.

 Logic referenced from `typedstream` source located at:
   - [`typedstream.h`](https://opensource.apple.com/source/gcc/gcc-1493/libobjc/objc/typedstream.h.auto.html)
   - [`archive.c`](https://opensource.apple.com/source/gcc/gcc-5484/libobjc/archive.c.auto.html)
*/

use std::{rc::Rc, sync::Arc};

use crate::{
    archiver::{
        models::{
            CArray, Class, GenericObject, GenericStruct, KnownObject, Object, TypedGroup,
            TypedValue, Value,
        },
        registry::{self, KnownTypeRegistry},
        table::SharedObjectTable,
    },
    encodings::{build_array_encoding, parse_array_encoding, parse_struct_encoding},
    error::{archive::UnarchiveError, typedstream::TypedStreamError},
    typedstream::{
        models::{ObjectReference, ReferenceType, Token},
        parser::TypedStreamReader,
    },
};

/// Rebuilds data from a stream of [`Token`]s
///
/// Each instance handles a single decoding pass: it owns the shared object table that back-references
/// resolve against. Iterating over an `Unarchiver` yields the top-level groups of typed values one at a
/// time, stopping after the first error.
///
/// # Example
///
/// ```
/// use typedstream_archive::{
///     archiver::{models::Value, unarchiver::Unarchiver},
///     typedstream::models::Token,
/// };
///
/// let tokens = vec![
///     Token::BeginTypedValues(vec!["i".to_string()]),
///     Token::SignedInteger(42),
///     Token::EndTypedValues,
/// ];
///
/// let mut unarchiver = Unarchiver::new(tokens.into_iter().map(Ok));
/// let groups = unarchiver.decode_all().unwrap();
///
/// let value = groups[0].single().unwrap();
/// assert_eq!(value.encoding, "i");
/// assert_eq!(value.value, Value::SignedInteger(42));
/// ```
pub struct Unarchiver<'a> {
    /// The source of tokens, consumed one at a time
    tokens: Box<dyn Iterator<Item = Result<Token, TypedStreamError>> + 'a>,
    /// Everything read so far that can be referenced by number
    table: SharedObjectTable,
    /// Decoders for known classes and structs
    registry: Arc<KnownTypeRegistry>,
    /// Set once a top-level group failed, so iteration stops
    failed: bool,
}

impl<'a> Unarchiver<'a> {
    /// Create an `Unarchiver` that uses the process-wide registry
    pub fn new<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = Result<Token, TypedStreamError>>,
        I::IntoIter: 'a,
    {
        Self::with_registry(tokens, registry::global())
    }

    /// Create an `Unarchiver` that uses a specific registry
    pub fn with_registry<I>(tokens: I, registry: Arc<KnownTypeRegistry>) -> Self
    where
        I: IntoIterator<Item = Result<Token, TypedStreamError>>,
        I::IntoIter: 'a,
    {
        Self {
            tokens: Box::new(tokens.into_iter()),
            table: SharedObjectTable::new(),
            registry,
            failed: false,
        }
    }

    /// Create an `Unarchiver` that reads the raw bytes of a `typedstream`
    pub fn from_bytes(stream: &'a [u8]) -> Self {
        Self::new(TypedStreamReader::from(stream))
    }

    /// The shared object table built so far
    pub fn table(&self) -> &SharedObjectTable {
        &self.table
    }

    /// The registry this pass looks up known types in
    pub fn registry(&self) -> &KnownTypeRegistry {
        &self.registry
    }

    /// Read the next token, if the stream is not exhausted
    fn next_token(&mut self) -> Result<Option<Token>, UnarchiveError> {
        Ok(self.tokens.next().transpose()?)
    }

    /// Read the next token, which must exist
    fn expect_token(&mut self, expected: &'static str) -> Result<Token, UnarchiveError> {
        self.next_token()?
            .ok_or(UnarchiveError::UnexpectedToken {
                expected,
                found: None,
            })
    }

    /// Read the next token, which must be `required`
    fn require(&mut self, required: Token, expected: &'static str) -> Result<(), UnarchiveError> {
        let token = self.expect_token(expected)?;
        if token == required {
            Ok(())
        } else {
            Err(UnarchiveError::UnexpectedToken {
                expected,
                found: Some(token),
            })
        }
    }

    /// Read a single value, using `expected_encoding` to determine the shape of arrays and structs
    pub fn decode_any_untyped_value(
        &mut self,
        expected_encoding: &str,
    ) -> Result<Value, UnarchiveError> {
        let first = self.expect_token("the start of a value")?;

        match first {
            Token::Nil => Ok(Value::Nil),
            Token::SignedInteger(value) => Ok(Value::SignedInteger(value)),
            Token::UnsignedInteger(value) => Ok(Value::UnsignedInteger(value)),
            Token::Float(value) => Ok(Value::Float(value)),
            Token::Double(value) => Ok(Value::Double(value)),
            Token::String(string) => Ok(Value::String(string)),
            Token::Reference(reference) => match self.table.resolve(reference) {
                // A known object that contains itself is still being built by its decoder
                Err(UnarchiveError::UnresolvedPlaceholder(number)) => {
                    tracing::debug!(number, "reference to an object under construction");
                    Ok(Value::Nil)
                }
                result => result,
            },
            Token::CString(string) => {
                self.table
                    .append(ReferenceType::CString, Value::String(string.clone()));
                Ok(Value::String(string))
            }
            Token::Atom(string) | Token::Selector(string) => Ok(Value::String(string)),
            Token::SingleClass { name, version } => {
                Ok(Value::Class(self.decode_class_chain(name, version)?))
            }
            Token::BeginObject => self.decode_object(),
            Token::ByteArray { data, .. } => Ok(Value::Array(CArray::from_bytes(data))),
            Token::BeginArray { length, .. } => self.decode_array(length, expected_encoding),
            Token::BeginStruct { name, .. } => self.decode_struct(name, expected_encoding),
            other => Err(UnarchiveError::UnexpectedToken {
                expected: "the start of a value",
                found: Some(other),
            }),
        }
    }

    /// Read the rest of a class chain that started with the class `name`
    ///
    /// In a `typedstream`, each class is stored before its superclass, but each [`Class`] can only be built
    /// after its superclass is built. The chain is read in stream order, built in reverse, and numbered in
    /// stream order again.
    fn decode_class_chain(&mut self, name: String, version: i64) -> Result<Rc<Class>, UnarchiveError> {
        const EXPECTED: &str = "a class, a class reference, or nil";

        let mut superclasses: Vec<(String, i64)> = vec![];
        let terminator = loop {
            match self.expect_token(EXPECTED)? {
                Token::SingleClass { name, version } => superclasses.push((name, version)),
                Token::Nil => break None,
                Token::Reference(reference) => match self.resolve_class(reference)? {
                    Value::Class(class) => break Some(class),
                    _ => {
                        return Err(UnarchiveError::UnexpectedToken {
                            expected: EXPECTED,
                            found: Some(Token::Reference(reference)),
                        })
                    }
                },
                other => {
                    return Err(UnarchiveError::UnexpectedToken {
                        expected: EXPECTED,
                        found: Some(other),
                    })
                }
            }
        };

        let mut built = Vec::with_capacity(superclasses.len());
        let mut next_superclass = terminator;
        for (name, version) in superclasses.into_iter().rev() {
            let class = Rc::new(Class::new(name, version, next_superclass));
            built.push(Rc::clone(&class));
            next_superclass = Some(class);
        }
        let class = Rc::new(Class::new(name, version, next_superclass));

        // Numbers are assigned in stream order, so the most derived class comes first
        self.table
            .append(ReferenceType::Class, Value::Class(Rc::clone(&class)));
        for superclass in built.into_iter().rev() {
            self.table
                .append(ReferenceType::Class, Value::Class(superclass));
        }

        tracing::trace!(
            class = %class.name,
            depth = class.hierarchy().count(),
            "read class chain"
        );
        Ok(class)
    }

    /// Resolve a reference found where a class must be, so it fails unless it points at a class
    fn resolve_class(&self, reference: ObjectReference) -> Result<Value, UnarchiveError> {
        self.table
            .resolve(ObjectReference::new(ReferenceType::Class, reference.number))
    }

    /// Read the class of an object, which is either a new class chain or a reference to a known class
    fn decode_class(&mut self) -> Result<Rc<Class>, UnarchiveError> {
        const EXPECTED: &str = "a class or a class reference";

        match self.expect_token(EXPECTED)? {
            Token::SingleClass { name, version } => self.decode_class_chain(name, version),
            Token::Reference(reference) => {
                match self.resolve_class(reference)? {
                    Value::Class(class) => Ok(class),
                    _ => Err(UnarchiveError::UnexpectedToken {
                        expected: EXPECTED,
                        found: Some(Token::Reference(reference)),
                    }),
                }
            }
            other => Err(UnarchiveError::UnexpectedToken {
                expected: EXPECTED,
                found: Some(other),
            }),
        }
    }

    /// Read an object after its start marker
    fn decode_object(&mut self) -> Result<Value, UnarchiveError> {
        // The object's number is assigned before its class is read, but the object
        // can't be created until the class is known
        let placeholder = self.table.reserve(ReferenceType::Object);

        let class = self.decode_class()?;

        let object = match self.registry.strategy(&class.name) {
            Some(strategy) => {
                tracing::debug!(class = %class.name, number = placeholder, "decoding known object");
                let value = strategy(self, &class)?;
                Object::Known(KnownObject { class, value })
            }
            None => {
                tracing::debug!(class = %class.name, number = placeholder, "decoding generic object");
                Object::Generic(GenericObject::new(class))
            }
        };
        let object = Rc::new(object);

        self.table.overwrite(
            placeholder,
            ReferenceType::Object,
            Value::Object(Rc::clone(&object)),
        )?;

        match object.as_ref() {
            Object::Generic(generic) => loop {
                match self.expect_token("EndObject or typed values")? {
                    Token::EndObject => break,
                    lookahead => {
                        let group = self.decode_typed_values(Some(lookahead))?;
                        generic.contents.borrow_mut().push(group);
                    }
                }
            },
            // The decoder already read all of the object's values
            Object::Known(_) => self.require(Token::EndObject, "EndObject")?,
        }

        Ok(Value::Object(object))
    }

    /// Read the elements of an array after its start marker
    fn decode_array(
        &mut self,
        length: usize,
        expected_encoding: &str,
    ) -> Result<Value, UnarchiveError> {
        let element_encoding = parse_array_encoding(expected_encoding)?.element_encoding;

        let elements = (0..length)
            .map(|_| self.decode_any_untyped_value(element_encoding))
            .collect::<Result<Vec<_>, _>>()?;

        self.require(Token::EndArray, "EndArray")?;
        Ok(Value::Array(CArray::new(elements)))
    }

    /// Read the fields of a struct after its start marker
    fn decode_struct(
        &mut self,
        name: Option<String>,
        expected_encoding: &str,
    ) -> Result<Value, UnarchiveError> {
        let decoder = self.registry.struct_decoder(expected_encoding).cloned();

        let fields = match &decoder {
            Some(decoder) => decoder
                .field_encodings
                .iter()
                .map(|encoding| self.decode_any_untyped_value(encoding))
                .collect::<Result<Vec<_>, _>>()?,
            None => parse_struct_encoding(expected_encoding)?
                .field_encodings
                .into_iter()
                .map(|encoding| self.decode_any_untyped_value(encoding))
                .collect::<Result<Vec<_>, _>>()?,
        };

        self.require(Token::EndStruct, "EndStruct")?;

        match decoder {
            Some(decoder) => Ok(Value::KnownStruct((decoder.build)(fields)?)),
            None => Ok(Value::Struct(GenericStruct { name, fields })),
        }
    }

    /// Read a group of typed values, starting with `lookahead` if the start marker was already read
    pub fn decode_typed_values(
        &mut self,
        lookahead: Option<Token>,
    ) -> Result<TypedGroup, UnarchiveError> {
        let begin = match lookahead {
            Some(token) => token,
            None => self.expect_token("BeginTypedValues")?,
        };
        let encodings = match begin {
            Token::BeginTypedValues(encodings) => encodings,
            other => {
                return Err(UnarchiveError::UnexpectedToken {
                    expected: "BeginTypedValues",
                    found: Some(other),
                })
            }
        };

        let mut values = Vec::with_capacity(encodings.len());
        for encoding in encodings {
            let value = self.decode_any_untyped_value(&encoding)?;
            values.push(TypedValue::new(encoding, value));
        }

        self.require(Token::EndTypedValues, "EndTypedValues")?;
        Ok(TypedGroup::from(values))
    }

    /// Read every remaining top-level group of typed values
    pub fn decode_all(&mut self) -> Result<Vec<TypedGroup>, UnarchiveError> {
        self.by_ref().collect()
    }

    /// Read a group that must contain exactly one value with the encoding `encoding`
    pub fn decode_value_of_type(&mut self, encoding: &str) -> Result<Value, UnarchiveError> {
        match self.decode_typed_values(None)? {
            TypedGroup::Value(value) if value.encoding == encoding => Ok(value.value),
            group => Err(UnarchiveError::EncodingMismatch {
                expected: vec![encoding.to_string()],
                found: group.encodings().into_iter().map(str::to_string).collect(),
            }),
        }
    }

    /// Read a group that must contain exactly one value for each of `encodings`
    pub fn decode_values_of_types(
        &mut self,
        encodings: &[&str],
    ) -> Result<Vec<Value>, UnarchiveError> {
        let group = self.decode_typed_values(None)?;
        if group.encodings() != encodings {
            return Err(UnarchiveError::EncodingMismatch {
                expected: encodings.iter().map(|encoding| encoding.to_string()).collect(),
                found: group.encodings().into_iter().map(str::to_string).collect(),
            });
        }
        Ok(group.into_values())
    }

    /// Read the bytes of an `NSData`-like object: an `int` length followed by a `char` array
    pub fn decode_data_object(&mut self) -> Result<Vec<u8>, UnarchiveError> {
        let length = self.decode_value_of_type("i")?;
        let length = length
            .as_signed_integer()
            .ok_or_else(|| UnarchiveError::InvalidValue("data length", format!("{length:?}")))?;
        if length < 0 {
            return Err(UnarchiveError::NegativeCount("Data", length));
        }

        let encoding = build_array_encoding(length, "c")?;
        match self.decode_value_of_type(&encoding)? {
            Value::Array(array) => array
                .to_bytes()
                .ok_or_else(|| UnarchiveError::InvalidValue("data", format!("{array:?}"))),
            other => Err(UnarchiveError::InvalidValue("data", format!("{other:?}"))),
        }
    }
}

impl<'a> Iterator for Unarchiver<'a> {
    type Item = Result<TypedGroup, UnarchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.next_token() {
            Ok(None) => return None,
            Ok(Some(lookahead)) => self.decode_typed_values(Some(lookahead)),
            Err(why) => Err(why),
        };
        if let Err(why) = &result {
            tracing::debug!(%why, objects = self.table.len(), "stopped decoding");
            self.failed = true;
        }
        Some(result)
    }
}
