/*!
 Decoders for the geometry structs that `NSValue` boxes.
*/

use std::rc::Rc;

use crate::{
    archiver::{
        models::{KnownType, Value},
        registry::StructDecoder,
    },
    error::archive::UnarchiveError,
};

/// A point in a two-dimensional coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NSPoint {
    pub x: f64,
    pub y: f64,
}

/// A width and a height
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NSSize {
    pub width: f64,
    pub height: f64,
}

/// A rectangle with its origin in the lower left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NSRect {
    pub origin: NSPoint,
    pub size: NSSize,
}

crate::known_type!(NSPoint, NSSize, NSRect);

/// Decodes `{_NSPoint=ff}`
pub const POINT: StructDecoder = StructDecoder {
    name: "_NSPoint",
    field_encodings: &["f", "f"],
    build: build_point,
};

/// Decodes `{_NSSize=ff}`
pub const SIZE: StructDecoder = StructDecoder {
    name: "_NSSize",
    field_encodings: &["f", "f"],
    build: build_size,
};

/// Decodes `{_NSRect={_NSPoint=ff}{_NSSize=ff}}`
pub const RECT: StructDecoder = StructDecoder {
    name: "_NSRect",
    field_encodings: &["{_NSPoint=ff}", "{_NSSize=ff}"],
    build: build_rect,
};

fn coordinates(fields: &[Value], name: &'static str) -> Result<(f64, f64), UnarchiveError> {
    match fields {
        [first, second] => match (first.as_double(), second.as_double()) {
            (Some(first), Some(second)) => Ok((first, second)),
            _ => Err(UnarchiveError::InvalidValue(name, format!("{fields:?}"))),
        },
        _ => Err(UnarchiveError::InvalidValue(name, format!("{fields:?}"))),
    }
}

fn build_point(fields: Vec<Value>) -> Result<Rc<dyn KnownType>, UnarchiveError> {
    let (x, y) = coordinates(&fields, "NSPoint")?;
    Ok(Rc::new(NSPoint { x, y }))
}

fn build_size(fields: Vec<Value>) -> Result<Rc<dyn KnownType>, UnarchiveError> {
    let (width, height) = coordinates(&fields, "NSSize")?;
    Ok(Rc::new(NSSize { width, height }))
}

fn build_rect(fields: Vec<Value>) -> Result<Rc<dyn KnownType>, UnarchiveError> {
    match fields.as_slice() {
        [origin, size] => match (origin.as_known::<NSPoint>(), size.as_known::<NSSize>()) {
            (Some(origin), Some(size)) => Ok(Rc::new(NSRect {
                origin: *origin,
                size: *size,
            })),
            _ => Err(UnarchiveError::InvalidValue("NSRect", format!("{fields:?}"))),
        },
        _ => Err(UnarchiveError::InvalidValue("NSRect", format!("{fields:?}"))),
    }
}
