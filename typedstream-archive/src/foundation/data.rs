/*!
 Decoders for `NSData` and `NSMutableData`.
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

/// Raw bytes stored in an `NSData` or `NSMutableData`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NSData {
    pub data: Vec<u8>,
}

crate::known_type!(NSData);

pub(crate) fn decode(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    Ok(Box::new(NSData {
        data: unarchiver.decode_data_object()?,
    }))
}
