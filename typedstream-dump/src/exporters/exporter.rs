use std::{io::Write, rc::Rc};

use typedstream_archive::{
    archiver::models::{Class, KnownType, Object, TypedGroup, Value},
    foundation::{
        attributed_string::NSAttributedString,
        collections::{NSArray, NSDictionary, NSSet},
        data::NSData,
        date::NSDate,
        geometry::{NSPoint, NSRect, NSSize},
        object::NSObject,
        string::NSString,
        value::NSValue,
    },
};

use crate::app::error::RuntimeError;

/// Writes decoded groups to some output
pub trait Exporter<W: Write> {
    /// Create a new exporter that writes to `writer`
    fn new(writer: W) -> Self;
    /// Write a single top-level group; `index` counts groups from zero
    fn write_group(&mut self, index: usize, group: &TypedGroup) -> Result<(), RuntimeError>;
    /// Flush any buffered output and return the writer
    fn into_inner(self) -> Result<W, RuntimeError>;
}

/// Defines behavior for formatting decoded values into an output format
///
/// `I` carries per-format state down the tree, such as the indentation level.
pub(super) trait Writer<I, T> {
    /// Format any decoded value
    fn format_value(&self, value: &Value, state: I, ancestors: &mut Ancestors) -> T;
    /// Format a class and its superclasses
    fn format_class(&self, class: &Class) -> T;
    /// Format an object, stopping at objects that contain themselves
    fn format_object(&self, object: &Rc<Object>, state: I, ancestors: &mut Ancestors) -> T;
    /// Format a value built by a registered decoder
    fn format_known(&self, known: &dyn KnownType, state: I, ancestors: &mut Ancestors) -> T;
}

/// The objects currently being formatted, from the root down
#[derive(Debug, Default)]
pub(super) struct Ancestors(Vec<*const Object>);

impl Ancestors {
    /// Start formatting `object`; false if it is already being formatted further up the tree
    pub(super) fn enter(&mut self, object: &Rc<Object>) -> bool {
        let pointer = Rc::as_ptr(object);
        if self.0.contains(&pointer) {
            false
        } else {
            self.0.push(pointer);
            true
        }
    }

    pub(super) fn leave(&mut self) {
        self.0.pop();
    }
}

/// The Foundation types the exporters know how to render
pub(super) enum Known<'a> {
    String(&'a NSString),
    AttributedString(&'a NSAttributedString),
    Data(&'a NSData),
    Date(&'a NSDate),
    Value(&'a NSValue),
    Array(&'a NSArray),
    Set(&'a NSSet),
    Dictionary(&'a NSDictionary),
    Object,
    Point(&'a NSPoint),
    Size(&'a NSSize),
    Rect(&'a NSRect),
    /// Registered by another crate; only its [`Debug`] output is available
    Other(&'a dyn KnownType),
}

impl<'a> Known<'a> {
    pub(super) fn classify(known: &'a dyn KnownType) -> Self {
        let any = known.as_any();
        if let Some(string) = any.downcast_ref::<NSString>() {
            Known::String(string)
        } else if let Some(string) = any.downcast_ref::<NSAttributedString>() {
            Known::AttributedString(string)
        } else if let Some(data) = any.downcast_ref::<NSData>() {
            Known::Data(data)
        } else if let Some(date) = any.downcast_ref::<NSDate>() {
            Known::Date(date)
        } else if let Some(value) = any.downcast_ref::<NSValue>() {
            Known::Value(value)
        } else if let Some(array) = any.downcast_ref::<NSArray>() {
            Known::Array(array)
        } else if let Some(set) = any.downcast_ref::<NSSet>() {
            Known::Set(set)
        } else if let Some(dictionary) = any.downcast_ref::<NSDictionary>() {
            Known::Dictionary(dictionary)
        } else if any.is::<NSObject>() {
            Known::Object
        } else if let Some(point) = any.downcast_ref::<NSPoint>() {
            Known::Point(point)
        } else if let Some(size) = any.downcast_ref::<NSSize>() {
            Known::Size(size)
        } else if let Some(rect) = any.downcast_ref::<NSRect>() {
            Known::Rect(rect)
        } else {
            Known::Other(known)
        }
    }
}

#[cfg(test)]
pub(super) mod tests {
    use std::rc::Rc;

    use typedstream_archive::{
        archiver::{
            models::{
                Class, GenericObject, KnownObject, KnownType, Object, TypedGroup, TypedValue, Value,
            },
            unarchiver::Unarchiver,
        },
        foundation::{
            collections::NSArray, geometry::NSPoint, object::NSObject, string::NSString,
        },
    };

    use crate::exporters::exporter::{Ancestors, Known};

    /// Decode every group from raw `typedstream` bytes
    pub(crate) fn decode(bytes: &[u8]) -> Vec<TypedGroup> {
        Unarchiver::from_bytes(bytes)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    pub(crate) fn class(name: &str) -> Rc<Class> {
        Rc::new(Class::new(name.to_string(), 0, None))
    }

    /// A generic object that contains itself
    pub(crate) fn cyclic_object() -> Rc<Object> {
        let object = Rc::new(Object::Generic(GenericObject::new(class("Node"))));
        if let Object::Generic(generic) = object.as_ref() {
            generic
                .contents
                .borrow_mut()
                .push(TypedGroup::Value(TypedValue::new(
                    "@".to_string(),
                    Value::Object(Rc::clone(&object)),
                )));
        }
        object
    }

    /// Drop the contents of an object made by [`cyclic_object`] so the cycle can be freed
    pub(crate) fn break_cycle(object: &Rc<Object>) {
        if let Object::Generic(generic) = object.as_ref() {
            generic.contents.borrow_mut().clear();
        }
    }

    pub(crate) fn known_object(name: &str, value: Box<dyn KnownType>) -> Value {
        Value::Object(Rc::new(Object::Known(KnownObject {
            class: class(name),
            value,
        })))
    }

    #[test]
    fn can_classify_known_types() {
        let string = NSString {
            value: "Hi".to_string(),
        };
        assert!(matches!(Known::classify(&string), Known::String(_)));
        assert!(matches!(Known::classify(&NSObject), Known::Object));
        assert!(matches!(
            Known::classify(&NSArray { elements: vec![] }),
            Known::Array(_)
        ));
        assert!(matches!(
            Known::classify(&NSPoint { x: 1.0, y: 2.0 }),
            Known::Point(_)
        ));
    }

    #[test]
    fn can_track_ancestors() {
        let object = cyclic_object();
        let mut ancestors = Ancestors::default();

        assert!(ancestors.enter(&object));
        assert!(!ancestors.enter(&object));
        ancestors.leave();
        assert!(ancestors.enter(&object));

        break_cycle(&object);
    }
}
