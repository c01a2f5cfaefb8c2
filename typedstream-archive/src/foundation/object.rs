/*!
 The root class of most archived objects.
*/

use std::rc::Rc;

use crate::{
    archiver::{
        models::{Class, KnownType},
        unarchiver::Unarchiver,
    },
    error::archive::UnarchiveError,
    foundation::check_version,
};

/// An `NSObject` instance, which stores no values of its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NSObject;

crate::known_type!(NSObject);

pub(crate) fn decode(
    _: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    Ok(Box::new(NSObject))
}
