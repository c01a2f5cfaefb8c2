/*!
 The table of everything in a `typedstream` that can be referenced by number.
*/

use crate::{
    archiver::models::Value,
    error::archive::UnarchiveError,
    typedstream::models::{ObjectReference, ReferenceType},
};

/// The contents of an entry in the [`SharedObjectTable`]
#[derive(Debug, Clone)]
enum Slot {
    /// Reserves the number of an object that is still being read.
    ///
    /// In a `typedstream`, an object gets its number before its class is read, but the object can only
    /// be built after that. To preserve the order, we reserve the slot first and fill it once the object exists.
    Placeholder,
    Filled(Value),
}

/// As we parse the `typedstream`, build a table of seen C strings, classes, and objects to reference in the future
///
/// All three kinds share one numbering space in order of appearance. The table is only valid for a single
/// decoding pass.
#[derive(Debug, Default)]
pub struct SharedObjectTable {
    entries: Vec<(ReferenceType, Slot)>,
}

impl SharedObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries in the table, including placeholders
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a value to the table and return its number
    pub fn append(&mut self, reference_type: ReferenceType, value: Value) -> usize {
        let index = self.entries.len();
        tracing::trace!(index, ?reference_type, "shared object");
        self.entries.push((reference_type, Slot::Filled(value)));
        index
    }

    /// Reserve a number for a value that will be added later with [`SharedObjectTable::overwrite`]
    pub fn reserve(&mut self, reference_type: ReferenceType) -> usize {
        let index = self.entries.len();
        tracing::trace!(index, ?reference_type, "placeholder");
        self.entries.push((reference_type, Slot::Placeholder));
        index
    }

    /// Fill a slot made by [`SharedObjectTable::reserve`]
    pub fn overwrite(
        &mut self,
        index: usize,
        reference_type: ReferenceType,
        value: Value,
    ) -> Result<(), UnarchiveError> {
        let len = self.entries.len();
        let (stored_type, slot) = self
            .entries
            .get_mut(index)
            .ok_or(UnarchiveError::ReferenceOutOfRange(index, len))?;
        if *stored_type != reference_type {
            return Err(UnarchiveError::ReferenceCategoryMismatch {
                number: index,
                expected: reference_type,
                found: *stored_type,
            });
        }
        match slot {
            Slot::Placeholder => {
                *slot = Slot::Filled(value);
                Ok(())
            }
            Slot::Filled(_) => Err(UnarchiveError::SlotAlreadyFilled(index)),
        }
    }

    /// Get the value a reference points to, if it has the kind the reference expects
    pub fn resolve(&self, reference: ObjectReference) -> Result<Value, UnarchiveError> {
        let (stored_type, slot) = self.entries.get(reference.number).ok_or(
            UnarchiveError::ReferenceOutOfRange(reference.number, self.entries.len()),
        )?;
        if *stored_type != reference.reference_type {
            return Err(UnarchiveError::ReferenceCategoryMismatch {
                number: reference.number,
                expected: reference.reference_type,
                found: *stored_type,
            });
        }
        match slot {
            Slot::Filled(value) => Ok(value.clone()),
            Slot::Placeholder => Err(UnarchiveError::UnresolvedPlaceholder(reference.number)),
        }
    }

    /// Get the kind of an entry and its value, which is `None` for a placeholder
    pub fn get(&self, index: usize) -> Option<(ReferenceType, Option<&Value>)> {
        self.entries.get(index).map(|(reference_type, slot)| {
            let value = match slot {
                Slot::Filled(value) => Some(value),
                Slot::Placeholder => None,
            };
            (*reference_type, value)
        })
    }

    /// Iterate over the kinds of every entry, in numbering order
    pub fn reference_types(&self) -> impl Iterator<Item = ReferenceType> + '_ {
        self.entries.iter().map(|(reference_type, _)| *reference_type)
    }
}

#[cfg(test)]
mod table_tests {
    use crate::{
        archiver::{models::Value, table::SharedObjectTable},
        error::archive::UnarchiveError,
        typedstream::models::{ObjectReference, ReferenceType},
    };

    #[test]
    fn can_append_in_order() {
        let mut table = SharedObjectTable::new();
        assert_eq!(
            table.append(ReferenceType::CString, Value::String("i".to_string())),
            0
        );
        assert_eq!(table.reserve(ReferenceType::Object), 1);
        assert_eq!(table.append(ReferenceType::Class, Value::Nil), 2);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn can_resolve() {
        let mut table = SharedObjectTable::new();
        table.append(ReferenceType::CString, Value::String("i".to_string()));

        let result = table
            .resolve(ObjectReference::new(ReferenceType::CString, 0))
            .unwrap();
        assert_eq!(result, Value::String("i".to_string()));
    }

    #[test]
    fn cant_resolve_wrong_category() {
        let mut table = SharedObjectTable::new();
        table.append(ReferenceType::CString, Value::String("i".to_string()));

        let result = table.resolve(ObjectReference::new(ReferenceType::Class, 0));
        assert!(matches!(
            result,
            Err(UnarchiveError::ReferenceCategoryMismatch {
                number: 0,
                expected: ReferenceType::Class,
                found: ReferenceType::CString,
            })
        ));
    }

    #[test]
    fn cant_resolve_out_of_range() {
        let table = SharedObjectTable::new();
        let result = table.resolve(ObjectReference::new(ReferenceType::Object, 0));
        assert!(matches!(
            result,
            Err(UnarchiveError::ReferenceOutOfRange(0, 0))
        ));
    }

    #[test]
    fn can_overwrite_placeholder_once() {
        let mut table = SharedObjectTable::new();
        let index = table.reserve(ReferenceType::Object);
        let reference = ObjectReference::new(ReferenceType::Object, index);

        assert!(matches!(
            table.resolve(reference),
            Err(UnarchiveError::UnresolvedPlaceholder(0))
        ));

        table
            .overwrite(index, ReferenceType::Object, Value::SignedInteger(1))
            .unwrap();
        assert_eq!(table.resolve(reference).unwrap(), Value::SignedInteger(1));

        assert!(matches!(
            table.overwrite(index, ReferenceType::Object, Value::SignedInteger(2)),
            Err(UnarchiveError::SlotAlreadyFilled(0))
        ));
    }

    #[test]
    fn cant_overwrite_with_other_category() {
        let mut table = SharedObjectTable::new();
        let index = table.reserve(ReferenceType::Object);
        assert!(matches!(
            table.overwrite(index, ReferenceType::Class, Value::Nil),
            Err(UnarchiveError::ReferenceCategoryMismatch { .. })
        ));
    }
}
