use std::{io::Write, rc::Rc};

use base64::{prelude::BASE64_STANDARD, Engine};
use json::{object, JsonValue};
use typedstream_archive::archiver::models::{Class, KnownType, Object, TypedGroup, Value};

use crate::{
    app::error::RuntimeError,
    exporters::exporter::{Ancestors, Exporter, Known, Writer},
};

/// Writes each group as one line of JSON
///
/// Byte data is base64 encoded. Objects, classes, and structs are JSON objects with a `kind` key.
pub struct NDJSON<W: Write> {
    writer: W,
}

impl<W: Write> Exporter<W> for NDJSON<W> {
    fn new(writer: W) -> Self {
        NDJSON { writer }
    }

    fn write_group(&mut self, index: usize, group: &TypedGroup) -> Result<(), RuntimeError> {
        let mut ancestors = Ancestors::default();
        let values: Vec<JsonValue> = group
            .as_slice()
            .iter()
            .map(|typed| {
                object! {
                    encoding: typed.encoding.as_str(),
                    value: self.format_value(&typed.value, (), &mut ancestors),
                }
            })
            .collect();

        let line = object! {
            group: index,
            values: values,
        };
        self.write_line(&line)
    }

    fn into_inner(mut self) -> Result<W, RuntimeError> {
        self.writer.flush().map_err(RuntimeError::DiskError)?;
        Ok(self.writer)
    }
}

impl<W: Write> Writer<(), JsonValue> for NDJSON<W> {
    fn format_value(&self, value: &Value, _: (), ancestors: &mut Ancestors) -> JsonValue {
        match value {
            Value::Nil => JsonValue::Null,
            Value::SignedInteger(number) => (*number).into(),
            Value::UnsignedInteger(number) => (*number).into(),
            Value::Float(number) => (*number).into(),
            Value::Double(number) => (*number).into(),
            Value::Byte(byte) => (*byte).into(),
            Value::String(text) => text.as_str().into(),
            Value::Class(class) => self.format_class(class),
            Value::Object(object) => self.format_object(object, (), ancestors),
            Value::Array(array) => match array.to_bytes() {
                Some(bytes) if !bytes.is_empty() => object! {
                    kind: "bytes",
                    data: BASE64_STANDARD.encode(bytes),
                },
                _ => self.format_elements(&array.elements, ancestors),
            },
            Value::Struct(generic) => object! {
                kind: "struct",
                name: optional(generic.name.as_deref()),
                fields: self.format_elements(&generic.fields, ancestors),
            },
            Value::KnownStruct(known) => self.format_known(known.as_ref(), (), ancestors),
        }
    }

    fn format_class(&self, class: &Class) -> JsonValue {
        object! {
            kind: "class",
            name: class.name.as_str(),
            version: class.version,
            superclass: match &class.superclass {
                Some(superclass) => self.format_class(superclass),
                None => JsonValue::Null,
            },
        }
    }

    fn format_object(&self, object: &Rc<Object>, _: (), ancestors: &mut Ancestors) -> JsonValue {
        if !ancestors.enter(object) {
            return object! {
                kind: "cycle",
                class: object.class().name.as_str(),
            };
        }

        let out = match object.as_ref() {
            Object::Generic(generic) => {
                let contents: Vec<JsonValue> = generic
                    .contents
                    .borrow()
                    .iter()
                    .map(|group| {
                        let values: Vec<JsonValue> = group
                            .as_slice()
                            .iter()
                            .map(|typed| {
                                object! {
                                    encoding: typed.encoding.as_str(),
                                    value: self.format_value(&typed.value, (), ancestors),
                                }
                            })
                            .collect();
                        JsonValue::from(values)
                    })
                    .collect();
                object! {
                    kind: "object",
                    class: self.format_class(&generic.class),
                    contents: contents,
                }
            }
            Object::Known(known) => object! {
                kind: "object",
                class: self.format_class(&known.class),
                value: self.format_known(known.value.as_ref(), (), ancestors),
            },
        };

        ancestors.leave();
        out
    }

    fn format_known(&self, known: &dyn KnownType, _: (), ancestors: &mut Ancestors) -> JsonValue {
        match Known::classify(known) {
            Known::String(string) => string.value.as_str().into(),
            Known::AttributedString(string) => {
                let runs: Vec<JsonValue> = string
                    .runs
                    .iter()
                    .map(|run| {
                        object! {
                            start: run.start,
                            length: run.length,
                            attributes: self.format_value(&run.attributes, (), ancestors),
                        }
                    })
                    .collect();
                object! {
                    text: string.value.as_str(),
                    runs: runs,
                }
            }
            Known::Data(data) => BASE64_STANDARD.encode(&data.data).into(),
            Known::Date(date) => object! {
                offset: date.offset,
                date: optional(date.date().map(|date| date.to_rfc3339()).as_deref()),
            },
            Known::Value(value) => object! {
                type_encoding: value.type_encoding.as_str(),
                value: self.format_value(&value.value, (), ancestors),
            },
            Known::Array(array) => self.format_elements(&array.elements, ancestors),
            Known::Set(set) => self.format_elements(&set.elements, ancestors),
            Known::Dictionary(dictionary) => {
                let entries: Vec<JsonValue> = dictionary
                    .entries
                    .iter()
                    .map(|(key, value)| {
                        object! {
                            key: self.format_value(key, (), ancestors),
                            value: self.format_value(value, (), ancestors),
                        }
                    })
                    .collect();
                entries.into()
            }
            Known::Object => JsonValue::new_object(),
            Known::Point(point) => object! { x: point.x, y: point.y, },
            Known::Size(size) => object! { width: size.width, height: size.height, },
            Known::Rect(rect) => object! {
                origin: object! { x: rect.origin.x, y: rect.origin.y, },
                size: object! { width: rect.size.width, height: rect.size.height, },
            },
            Known::Other(other) => format!("{other:?}").into(),
        }
    }
}

impl<W: Write> NDJSON<W> {
    fn write_line(&mut self, value: &JsonValue) -> Result<(), RuntimeError> {
        self.writer
            .write_all(format!("{}\n", value.dump()).as_bytes())
            .map_err(RuntimeError::DiskError)
    }

    fn format_elements(&self, elements: &[Value], ancestors: &mut Ancestors) -> JsonValue {
        let elements: Vec<JsonValue> = elements
            .iter()
            .map(|element| self.format_value(element, (), ancestors))
            .collect();
        elements.into()
    }
}

fn optional(text: Option<&str>) -> JsonValue {
    match text {
        Some(text) => text.into(),
        None => JsonValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use typedstream_archive::archiver::models::{CArray, Class, GenericStruct, Value};

    use crate::{
        exporters::exporter::{
            tests::{break_cycle, cyclic_object, decode},
            Ancestors, Writer,
        },
        Exporter, NDJSON,
    };

    const COLLECTIONS: &[u8] =
        include_bytes!("../../../typedstream-archive/test_data/typedstream/Collections");
    const ATTRIBUTED_STRING: &[u8] =
        include_bytes!("../../../typedstream-archive/test_data/typedstream/AttributedString");

    fn format(value: &Value) -> String {
        NDJSON::new(Vec::<u8>::new())
            .format_value(value, (), &mut Ancestors::default())
            .dump()
    }

    fn export(bytes: &[u8]) -> Vec<json::JsonValue> {
        let mut exporter = NDJSON::new(Vec::<u8>::new());
        for (index, group) in decode(bytes).iter().enumerate() {
            exporter.write_group(index, group).unwrap();
        }
        let output = String::from_utf8(exporter.into_inner().unwrap()).unwrap();
        output.lines().map(|line| json::parse(line).unwrap()).collect()
    }

    #[test]
    fn can_format_scalars() {
        assert_eq!(format(&Value::Nil), "null");
        assert_eq!(format(&Value::UnsignedInteger(7)), "7");
        assert_eq!(format(&Value::String("a".to_string())), "\"a\"");
    }

    #[test]
    fn can_format_bytes_as_base64() {
        assert_eq!(
            format(&Value::Array(CArray::from_bytes(b"hi".to_vec()))),
            r#"{"kind":"bytes","data":"aGk="}"#
        );
        assert_eq!(format(&Value::Array(CArray::default())), "[]");
    }

    #[test]
    fn can_format_class_and_struct() {
        let class = Class::new("NSObject".to_string(), 0, None);
        assert_eq!(
            format(&Value::Class(Rc::new(class))),
            r#"{"kind":"class","name":"NSObject","version":0,"superclass":null}"#
        );

        let value = Value::Struct(GenericStruct {
            name: None,
            fields: vec![Value::SignedInteger(1)],
        });
        assert_eq!(format(&value), r#"{"kind":"struct","name":null,"fields":[1]}"#);
    }

    #[test]
    fn can_stop_at_cycles() {
        let object = cyclic_object();
        let parsed = json::parse(&format(&Value::Object(Rc::clone(&object)))).unwrap();
        assert_eq!(parsed["contents"][0][0]["value"]["kind"], "cycle");
        assert_eq!(parsed["contents"][0][0]["value"]["class"], "Node");
        break_cycle(&object);
    }

    #[test]
    fn can_export_collections() {
        let lines = export(COLLECTIONS);
        assert_eq!(lines.len(), 2);

        let array = &lines[0]["values"][0]["value"];
        assert_eq!(lines[0]["group"].as_usize(), Some(0));
        assert_eq!(array["class"]["name"], "NSMutableArray");
        assert_eq!(array["class"]["superclass"]["name"], "NSArray");

        let date = &array["value"][0]["value"];
        assert_eq!(date["offset"].as_f64(), Some(694224000.5));
        assert!(date["date"].as_str().unwrap().starts_with("2023-01-01T00:00:00.5"));
        assert_eq!(array["value"][1]["value"], "3q2+");
        assert_eq!(array["value"][2]["value"], "3q2+");

        let rect = &lines[1]["values"][0];
        assert_eq!(rect["encoding"], "{_NSRect={_NSPoint=ff}{_NSSize=ff}}");
        assert_eq!(rect["value"]["origin"]["y"].as_f64(), Some(2.5));
        assert_eq!(rect["value"]["size"]["width"].as_f64(), Some(320.0));
    }

    #[test]
    fn can_export_attributed_string() {
        let lines = export(ATTRIBUTED_STRING);
        let string = &lines[0]["values"][0]["value"]["value"];

        assert_eq!(string["text"], "Noter test");
        assert_eq!(string["runs"][0]["start"].as_usize(), Some(0));
        assert_eq!(string["runs"][0]["length"].as_usize(), Some(10));

        let entry = &string["runs"][0]["attributes"]["value"][0];
        assert_eq!(entry["key"]["value"], "__kIMMessagePartAttributeName");
        assert_eq!(entry["value"]["class"]["name"], "NSNumber");
        assert_eq!(entry["value"]["value"]["type_encoding"], "i");
        assert_eq!(entry["value"]["value"]["value"].as_i64(), Some(0));
    }
}
