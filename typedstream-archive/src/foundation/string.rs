/*!
 Decoders for `NSString` and `NSMutableString`.
*/

use std::rc::Rc;

use crate::{
    archiver::{
        models::{Class, KnownType, Value},
        unarchiver::Unarchiver,
    },
    error::archive::UnarchiveError,
    foundation::check_version,
};

/// Text stored in an `NSString` or `NSMutableString`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NSString {
    pub value: String,
}

crate::known_type!(NSString);

pub(crate) fn decode(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 1)?;
    match unarchiver.decode_value_of_type("+")? {
        Value::String(value) => Ok(Box::new(NSString { value })),
        other => Err(UnarchiveError::InvalidValue("NSString", format!("{other:?}"))),
    }
}

/// Get the text of a value that is either a plain string or an `NSString`
///
/// Dictionary keys and attributed string contents can be stored either way.
pub fn string_value(value: &Value) -> Option<&str> {
    match value {
        Value::String(string) => Some(string),
        _ => value
            .as_known::<NSString>()
            .map(|string| string.value.as_str()),
    }
}
