/*!
 Data structures produced by the [`Unarchiver`](crate::archiver::unarchiver::Unarchiver).
*/

use std::{any::Any, cell::RefCell, fmt::Debug, rc::Rc};

/// Represents a class stored in the `typedstream`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// The name of the class
    pub name: String,
    /// The encoded version of the class
    pub version: i64,
    /// The class this class inherits from, if any
    pub superclass: Option<Rc<Class>>,
}

impl Class {
    pub fn new(name: String, version: i64, superclass: Option<Rc<Class>>) -> Self {
        Self {
            name,
            version,
            superclass,
        }
    }

    /// Iterate over this class and every class it inherits from, most derived first
    pub fn hierarchy(&self) -> impl Iterator<Item = &Class> {
        std::iter::successors(Some(self), |class| class.superclass.as_deref())
    }

    /// Determine if this class is, or inherits from, a class named `name`
    pub fn is_kind_of(&self, name: &str) -> bool {
        self.hierarchy().any(|class| class.name == name)
    }
}

/// A value with a shape defined by a registered decoder
///
/// Implementations are usually plain structs; [`KnownObject::downcast_ref`] and [`Value::as_known`]
/// recover the concrete type.
pub trait KnownType: Any + Debug {
    /// Used to downcast to the concrete type
    fn as_any(&self) -> &dyn Any;
    /// Compare against another known value, which is never equal if it has a different concrete type
    fn eq_known(&self, other: &dyn KnownType) -> bool;
}

impl PartialEq for dyn KnownType {
    fn eq(&self, other: &Self) -> bool {
        self.eq_known(other)
    }
}

/// Implement [`KnownType`] for types that are [`Debug`] and [`PartialEq`]
#[macro_export]
macro_rules! known_type {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::archiver::models::KnownType for $ty {
                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn eq_known(&self, other: &dyn $crate::archiver::models::KnownType) -> bool {
                    other
                        .as_any()
                        .downcast_ref::<$ty>()
                        .is_some_and(|other| self == other)
                }
            }
        )+
    };
}

/// An object whose class has no registered decoder
///
/// The contents are every group of typed values stored for the object, in stream order.
#[derive(Debug, PartialEq)]
pub struct GenericObject {
    /// The class of the object
    pub class: Rc<Class>,
    /// The data stored on the object; filled after the object gets its number, so that
    /// references made while reading the contents resolve to this object
    pub contents: RefCell<Vec<TypedGroup>>,
}

impl GenericObject {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            contents: RefCell::new(vec![]),
        }
    }
}

/// An object built by a registered decoder
#[derive(Debug)]
pub struct KnownObject {
    /// The class of the object
    pub class: Rc<Class>,
    /// The value built by the decoder
    pub value: Box<dyn KnownType>,
}

impl PartialEq for KnownObject {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && *self.value == *other.value
    }
}

impl KnownObject {
    /// Get the decoded value as a concrete type
    pub fn downcast_ref<T: KnownType>(&self) -> Option<&T> {
        self.value.as_any().downcast_ref()
    }
}

/// An instance of a class stored in the `typedstream`
#[derive(Debug, PartialEq)]
pub enum Object {
    Generic(GenericObject),
    Known(KnownObject),
}

impl Object {
    /// The class of the object
    pub fn class(&self) -> &Rc<Class> {
        match self {
            Object::Generic(object) => &object.class,
            Object::Known(object) => &object.class,
        }
    }
}

/// A C array whose element type has no registered decoder
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CArray {
    pub elements: Vec<Value>,
}

impl CArray {
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    /// Wrap raw bytes, i.e. a `char` array
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self::new(data.into_iter().map(Value::Byte).collect())
    }

    /// Get the raw bytes, if every element is a byte
    pub fn to_bytes(&self) -> Option<Vec<u8>> {
        self.elements
            .iter()
            .map(|element| match element {
                Value::Byte(byte) => Some(*byte),
                _ => None,
            })
            .collect()
    }
}

/// A struct whose encoding has no registered decoder
#[derive(Debug, Clone, PartialEq)]
pub struct GenericStruct {
    /// The name of the struct, if the stream has one
    pub name: Option<String>,
    /// The field values, in order
    pub fields: Vec<Value>,
}

/// Rust structures containing data stored in the `typedstream`
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A missing object, class, or string
    Nil,
    /// Signed integer types are coerced into this container
    SignedInteger(i64),
    /// Unsigned integer types are coerced into this container
    UnsignedInteger(u64),
    /// Floating point numbers
    Float(f32),
    /// Double precision floats
    Double(f64),
    /// A single byte from a `char` array
    Byte(u8),
    /// Text data
    String(String),
    /// A class, with its inheritance chain
    Class(Rc<Class>),
    /// An object; references to the same object share it
    Object(Rc<Object>),
    /// A C array
    Array(CArray),
    /// A struct with no registered decoder
    Struct(GenericStruct),
    /// A struct built by a registered decoder
    KnownStruct(Rc<dyn KnownType>),
}

impl Value {
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Get an integer value as an [`i64`], if it fits
    pub fn as_signed_integer(&self) -> Option<i64> {
        match self {
            Value::SignedInteger(value) => Some(*value),
            Value::UnsignedInteger(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Get an integer value as a [`u64`], if it fits
    pub fn as_unsigned_integer(&self) -> Option<u64> {
        match self {
            Value::UnsignedInteger(value) => Some(*value),
            Value::SignedInteger(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    /// Get any numeric value as an [`f64`]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(f64::from(*value)),
            Value::Double(value) => Some(*value),
            Value::SignedInteger(value) => Some(*value as f64),
            Value::UnsignedInteger(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(string) => Some(string),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Rc<Class>> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Rc<Object>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Get the value built by a registered decoder, for both objects and structs
    pub fn as_known<T: KnownType>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => match object.as_ref() {
                Object::Known(known) => known.downcast_ref(),
                Object::Generic(_) => None,
            },
            Value::KnownStruct(known) => known.as_any().downcast_ref(),
            _ => None,
        }
    }
}

/// A single value and the encoding it was read with
#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub encoding: String,
    pub value: Value,
}

impl TypedValue {
    pub fn new(encoding: String, value: Value) -> Self {
        Self { encoding, value }
    }
}

/// Values that share one group of type encodings in the `typedstream`
#[derive(Debug, Clone, PartialEq)]
pub enum TypedGroup {
    /// A group with exactly one value, which is the most common case
    Value(TypedValue),
    /// A group with any other number of values
    Group(Vec<TypedValue>),
}

impl From<Vec<TypedValue>> for TypedGroup {
    fn from(values: Vec<TypedValue>) -> Self {
        match <[TypedValue; 1]>::try_from(values) {
            Ok([value]) => TypedGroup::Value(value),
            Err(values) => TypedGroup::Group(values),
        }
    }
}

impl TypedGroup {
    /// The typed values in the group, in order
    pub fn as_slice(&self) -> &[TypedValue] {
        match self {
            TypedGroup::Value(value) => std::slice::from_ref(value),
            TypedGroup::Group(values) => values,
        }
    }

    /// The encodings of the group, in order
    pub fn encodings(&self) -> Vec<&str> {
        self.as_slice()
            .iter()
            .map(|value| value.encoding.as_str())
            .collect()
    }

    /// The single typed value, if the group has exactly one
    pub fn single(&self) -> Option<&TypedValue> {
        match self {
            TypedGroup::Value(value) => Some(value),
            TypedGroup::Group(_) => None,
        }
    }

    /// Take the values out of the group, dropping the encodings
    pub fn into_values(self) -> Vec<Value> {
        match self {
            TypedGroup::Value(value) => vec![value.value],
            TypedGroup::Group(values) => values.into_iter().map(|value| value.value).collect(),
        }
    }
}
