/*!
 Decoders for the Foundation classes and structs found in most `typedstream` data.

 Every decoder checks the archived class version before reading anything, because the layout of an
 object's values changes between versions.
*/

use std::rc::Rc;

use crate::{
    archiver::{
        models::{Class, Value},
        registry::KnownTypeRegistry,
    },
    error::archive::UnarchiveError,
};

pub mod attributed_string;
pub mod collections;
pub mod data;
pub mod date;
pub mod geometry;
pub mod object;
pub mod string;
pub mod value;

/// Register every Foundation decoder
pub fn register_all(registry: &mut KnownTypeRegistry) {
    registry.register("NSObject", object::decode);

    registry.register("NSData", data::decode);
    registry.register("NSMutableData", data::decode);

    registry.register("NSDate", date::decode);

    registry.register("NSString", string::decode);
    registry.register("NSMutableString", string::decode);

    registry.register("NSAttributedString", attributed_string::decode);
    registry.register("NSMutableAttributedString", attributed_string::decode);

    registry.register("NSValue", value::decode);
    registry.register("NSNumber", value::decode);

    registry.register("NSArray", collections::decode_array);
    registry.register("NSMutableArray", collections::decode_array);
    registry.register("NSSet", collections::decode_set);
    registry.register("NSMutableSet", collections::decode_set);
    registry.register("NSDictionary", collections::decode_dictionary);
    registry.register("NSMutableDictionary", collections::decode_dictionary);

    registry.register_struct(geometry::POINT);
    registry.register_struct(geometry::SIZE);
    registry.register_struct(geometry::RECT);
}

/// Fail if `class` was archived with a version other than `supported`
pub(crate) fn check_version(class: &Rc<Class>, supported: i64) -> Result<(), UnarchiveError> {
    if class.version == supported {
        Ok(())
    } else {
        Err(UnarchiveError::UnsupportedClassVersion {
            class: class.name.clone(),
            version: class.version,
        })
    }
}

/// Read a signed element count, which cannot be negative
pub(crate) fn signed_count(value: &Value, name: &'static str) -> Result<usize, UnarchiveError> {
    let count = value
        .as_signed_integer()
        .ok_or_else(|| UnarchiveError::InvalidValue(name, format!("{value:?}")))?;
    usize::try_from(count).map_err(|_| UnarchiveError::NegativeCount(name, count))
}

/// Read an unsigned element count
pub(crate) fn unsigned_count(value: &Value, name: &'static str) -> Result<usize, UnarchiveError> {
    value
        .as_unsigned_integer()
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| UnarchiveError::InvalidValue(name, format!("{value:?}")))
}
