/*!
 Decoders for the Foundation collection classes.
*/

use std::rc::Rc;

use crate::{
    archiver::{
        models::{Class, KnownType, Value},
        unarchiver::Unarchiver,
    },
    error::archive::UnarchiveError,
    foundation::{check_version, signed_count, string::string_value, unsigned_count},
};

/// The elements of an `NSArray` or `NSMutableArray`, in order
#[derive(Debug, Clone, PartialEq)]
pub struct NSArray {
    pub elements: Vec<Value>,
}

/// The elements of an `NSSet` or `NSMutableSet`, in stream order
#[derive(Debug, Clone, PartialEq)]
pub struct NSSet {
    pub elements: Vec<Value>,
}

/// The entries of an `NSDictionary` or `NSMutableDictionary`, in stream order
///
/// Keys are kept as decoded; they are usually strings but may be any object.
#[derive(Debug, Clone, PartialEq)]
pub struct NSDictionary {
    pub entries: Vec<(Value, Value)>,
}

crate::known_type!(NSArray, NSSet, NSDictionary);

impl NSDictionary {
    /// Get the value stored for a string key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(candidate, _)| string_value(candidate) == Some(key))
            .map(|(_, value)| value)
    }

    /// Iterate over the keys that are strings
    pub fn string_keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|(key, _)| string_value(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn decode_objects(
    unarchiver: &mut Unarchiver<'_>,
    count: usize,
) -> Result<Vec<Value>, UnarchiveError> {
    // The count is untrusted, so grow as elements are read
    let mut elements = vec![];
    for _ in 0..count {
        elements.push(unarchiver.decode_value_of_type("@")?);
    }
    Ok(elements)
}

pub(crate) fn decode_array(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    let count = signed_count(&unarchiver.decode_value_of_type("i")?, "NSArray")?;
    Ok(Box::new(NSArray {
        elements: decode_objects(unarchiver, count)?,
    }))
}

pub(crate) fn decode_set(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    let count = unsigned_count(&unarchiver.decode_value_of_type("I")?, "NSSet")?;
    Ok(Box::new(NSSet {
        elements: decode_objects(unarchiver, count)?,
    }))
}

pub(crate) fn decode_dictionary(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    let count = signed_count(&unarchiver.decode_value_of_type("i")?, "NSDictionary")?;

    let mut entries = vec![];
    for _ in 0..count {
        let key = unarchiver.decode_value_of_type("@")?;
        let value = unarchiver.decode_value_of_type("@")?;
        entries.push((key, value));
    }
    Ok(Box::new(NSDictionary { entries }))
}
