use std::{io::Write, rc::Rc};

use typedstream_archive::archiver::models::{Class, KnownType, Object, TypedGroup, Value};

use crate::{
    app::error::RuntimeError,
    exporters::exporter::{Ancestors, Exporter, Known, Writer},
};

const INDENT: &str = "    ";

/// Writes each group as an indented tree of values
pub struct TXT<W: Write> {
    writer: W,
}

impl<W: Write> Exporter<W> for TXT<W> {
    fn new(writer: W) -> Self {
        TXT { writer }
    }

    fn write_group(&mut self, index: usize, group: &TypedGroup) -> Result<(), RuntimeError> {
        let mut ancestors = Ancestors::default();
        let mut text = String::new();
        for typed in group.as_slice() {
            let value = self.format_value(&typed.value, 0, &mut ancestors);
            text.push_str(&format!("[{index}] {}: {value}\n", typed.encoding));
        }
        self.writer
            .write_all(text.as_bytes())
            .map_err(RuntimeError::DiskError)
    }

    fn into_inner(mut self) -> Result<W, RuntimeError> {
        self.writer.flush().map_err(RuntimeError::DiskError)?;
        Ok(self.writer)
    }
}

impl<W: Write> Writer<usize, String> for TXT<W> {
    fn format_value(&self, value: &Value, indent: usize, ancestors: &mut Ancestors) -> String {
        match value {
            Value::Nil => "nil".to_string(),
            Value::SignedInteger(number) => number.to_string(),
            Value::UnsignedInteger(number) => number.to_string(),
            Value::Float(number) => number.to_string(),
            Value::Double(number) => number.to_string(),
            Value::Byte(byte) => format!("{byte:#04x}"),
            Value::String(text) => format!("{text:?}"),
            Value::Class(class) => self.format_class(class),
            Value::Object(object) => self.format_object(object, indent, ancestors),
            Value::Array(array) => match array.to_bytes() {
                Some(bytes) if !bytes.is_empty() => {
                    format!("bytes[{}] {}", bytes.len(), hex(&bytes))
                }
                _ => {
                    let mut out = format!("array[{}]", array.elements.len());
                    self.add_elements(&mut out, &array.elements, indent, ancestors);
                    out
                }
            },
            Value::Struct(generic) => {
                let mut out = match &generic.name {
                    Some(name) => format!("struct {name}"),
                    None => "struct".to_string(),
                };
                for (index, field) in generic.fields.iter().enumerate() {
                    let field = self.format_value(field, indent + 1, ancestors);
                    self.add_line(&mut out, &format!("{index}: {field}"), indent);
                }
                out
            }
            Value::KnownStruct(known) => self.format_known(known.as_ref(), indent, ancestors),
        }
    }

    fn format_class(&self, class: &Class) -> String {
        let chain: Vec<String> = class
            .hierarchy()
            .map(|class| format!("{} v{}", class.name, class.version))
            .collect();
        format!("class {}", chain.join(" : "))
    }

    fn format_object(
        &self,
        object: &Rc<Object>,
        indent: usize,
        ancestors: &mut Ancestors,
    ) -> String {
        if !ancestors.enter(object) {
            return format!("<cycle: {}>", object.class().name);
        }

        let out = match object.as_ref() {
            Object::Generic(generic) => {
                let mut out = format!("{} v{}", generic.class.name, generic.class.version);
                for group in generic.contents.borrow().iter() {
                    for typed in group.as_slice() {
                        let value = self.format_value(&typed.value, indent + 1, ancestors);
                        self.add_line(&mut out, &format!("{}: {value}", typed.encoding), indent);
                    }
                }
                out
            }
            Object::Known(known) => {
                let value = self.format_known(known.value.as_ref(), indent, ancestors);
                if value.is_empty() {
                    known.class.name.clone()
                } else {
                    format!("{} {value}", known.class.name)
                }
            }
        };

        ancestors.leave();
        out
    }

    fn format_known(&self, known: &dyn KnownType, indent: usize, ancestors: &mut Ancestors) -> String {
        match Known::classify(known) {
            Known::String(string) => format!("{:?}", string.value),
            Known::AttributedString(string) => {
                let mut out = format!("{:?}", string.value);
                for run in &string.runs {
                    let text = string.run_text(run).unwrap_or_default();
                    let attributes = self.format_value(&run.attributes, indent + 1, ancestors);
                    self.add_line(
                        &mut out,
                        &format!(
                            "[{}..{}] {text:?} {attributes}",
                            run.start,
                            run.start + run.length
                        ),
                        indent,
                    );
                }
                out
            }
            Known::Data(data) if data.data.is_empty() => "0 bytes".to_string(),
            Known::Data(data) => format!("{} bytes {}", data.data.len(), hex(&data.data)),
            Known::Date(date) => match date.date() {
                Some(date) => date.to_rfc3339(),
                None => format!("{} seconds after 2001-01-01", date.offset),
            },
            Known::Value(value) => format!(
                "{} {}",
                value.type_encoding,
                self.format_value(&value.value, indent, ancestors)
            ),
            Known::Array(array) => {
                let mut out = format!("({} elements)", array.elements.len());
                self.add_elements(&mut out, &array.elements, indent, ancestors);
                out
            }
            Known::Set(set) => {
                let mut out = format!("({} elements)", set.elements.len());
                self.add_elements(&mut out, &set.elements, indent, ancestors);
                out
            }
            Known::Dictionary(dictionary) => {
                let mut out = format!("({} entries)", dictionary.len());
                for (key, value) in &dictionary.entries {
                    let key = self.format_value(key, indent + 1, ancestors);
                    let value = self.format_value(value, indent + 1, ancestors);
                    self.add_line(&mut out, &format!("{key} => {value}"), indent);
                }
                out
            }
            Known::Object => String::new(),
            Known::Point(point) => format!("({}, {})", point.x, point.y),
            Known::Size(size) => format!("({} x {})", size.width, size.height),
            Known::Rect(rect) => format!(
                "origin ({}, {}) size ({} x {})",
                rect.origin.x, rect.origin.y, rect.size.width, rect.size.height
            ),
            Known::Other(other) => format!("{other:?}"),
        }
    }
}

impl<W: Write> TXT<W> {
    /// Add a line one level deeper than `indent`
    fn add_line(&self, string: &mut String, part: &str, indent: usize) {
        string.push('\n');
        string.push_str(&INDENT.repeat(indent + 1));
        string.push_str(part);
    }

    fn add_elements(
        &self,
        string: &mut String,
        elements: &[Value],
        indent: usize,
        ancestors: &mut Ancestors,
    ) {
        for (index, element) in elements.iter().enumerate() {
            let element = self.format_value(element, indent + 1, ancestors);
            self.add_line(string, &format!("[{index}] {element}"), indent);
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use typedstream_archive::{
        archiver::models::{CArray, Class, GenericStruct, Value},
        foundation::{collections::NSDictionary, data::NSData, string::NSString},
    };

    use crate::{
        exporters::exporter::{
            tests::{break_cycle, cyclic_object, decode, known_object},
            Ancestors, Writer,
        },
        Exporter, TXT,
    };

    const COLLECTIONS: &[u8] =
        include_bytes!("../../../typedstream-archive/test_data/typedstream/Collections");
    const ATTRIBUTED_STRING: &[u8] =
        include_bytes!("../../../typedstream-archive/test_data/typedstream/AttributedString");

    fn format(value: &Value) -> String {
        TXT::new(Vec::<u8>::new()).format_value(value, 0, &mut Ancestors::default())
    }

    fn export(bytes: &[u8]) -> String {
        let mut exporter = TXT::new(Vec::<u8>::new());
        for (index, group) in decode(bytes).iter().enumerate() {
            exporter.write_group(index, group).unwrap();
        }
        String::from_utf8(exporter.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn can_format_scalars() {
        assert_eq!(format(&Value::Nil), "nil");
        assert_eq!(format(&Value::SignedInteger(-4)), "-4");
        assert_eq!(format(&Value::Double(1.5)), "1.5");
        assert_eq!(format(&Value::Byte(10)), "0x0a");
        assert_eq!(format(&Value::String("a\"b".to_string())), "\"a\\\"b\"");
    }

    #[test]
    fn can_format_class_chain() {
        let base = Rc::new(Class::new("NSObject".to_string(), 0, None));
        let class = Class::new("NSString".to_string(), 1, Some(base));
        assert_eq!(
            format(&Value::Class(Rc::new(class))),
            "class NSString v1 : NSObject v0"
        );
    }

    #[test]
    fn can_format_arrays() {
        assert_eq!(
            format(&Value::Array(CArray::from_bytes(vec![0xde, 0xad]))),
            "bytes[2] de ad"
        );
        assert_eq!(
            format(&Value::Array(CArray::new(vec![
                Value::SignedInteger(1),
                Value::SignedInteger(2)
            ]))),
            "array[2]\n    [0] 1\n    [1] 2"
        );
    }

    #[test]
    fn can_format_struct() {
        let value = Value::Struct(GenericStruct {
            name: Some("Pair".to_string()),
            fields: vec![Value::Float(1.0), Value::Array(CArray::new(vec![Value::Nil]))],
        });
        assert_eq!(
            format(&value),
            "struct Pair\n    0: 1\n    1: array[1]\n        [0] nil"
        );
    }

    #[test]
    fn can_format_known_objects() {
        let string = known_object(
            "NSMutableString",
            Box::new(NSString {
                value: "Hi".to_string(),
            }),
        );
        assert_eq!(format(&string), "NSMutableString \"Hi\"");

        let data = known_object("NSData", Box::new(NSData { data: vec![] }));
        assert_eq!(format(&data), "NSData 0 bytes");

        let dictionary = known_object(
            "NSDictionary",
            Box::new(NSDictionary {
                entries: vec![(Value::String("key".to_string()), string)],
            }),
        );
        assert_eq!(
            format(&dictionary),
            "NSDictionary (1 entries)\n    \"key\" => NSMutableString \"Hi\""
        );
    }

    #[test]
    fn can_stop_at_cycles() {
        let object = cyclic_object();
        assert_eq!(
            format(&Value::Object(Rc::clone(&object))),
            "Node v0\n    @: <cycle: Node>"
        );
        break_cycle(&object);
    }

    #[test]
    fn can_export_collections() {
        let output = export(COLLECTIONS);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "[0] @: NSMutableArray (3 elements)");
        assert!(lines[1].starts_with("    [0] NSDate 2023-01-01T00:00:00.5"));
        assert_eq!(lines[2], "    [1] NSData 3 bytes de ad be");
        assert_eq!(lines[3], "    [2] NSData 3 bytes de ad be");
        assert_eq!(
            lines[4],
            "[1] {_NSRect={_NSPoint=ff}{_NSSize=ff}}: origin (1, 2.5) size (320 x 240)"
        );
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn can_export_attributed_string() {
        let output = export(ATTRIBUTED_STRING);
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "[0] @: NSAttributedString \"Noter test\"");
        assert!(lines[1].starts_with("    [0..10] \"Noter test\" NSDictionary (1 entries)"));
        assert!(lines[2].contains("\"__kIMMessagePartAttributeName\""));
        assert!(lines[2].ends_with("=> NSNumber i 0"));
    }
}
