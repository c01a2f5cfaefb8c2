/*!
 Decoders for `NSValue` and `NSNumber`, which box a single value along with its type encoding.
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

/// A boxed value stored in an `NSValue` or `NSNumber`
#[derive(Debug, Clone, PartialEq)]
pub struct NSValue {
    /// The type encoding of the boxed value, i.e. `i` for an `int`
    pub type_encoding: String,
    pub value: Value,
}

crate::known_type!(NSValue);

pub(crate) fn decode(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;
    let type_encoding = match unarchiver.decode_value_of_type("*")? {
        Value::String(encoding) => encoding,
        other => return Err(UnarchiveError::InvalidValue("NSValue", format!("{other:?}"))),
    };
    let value = unarchiver.decode_value_of_type(&type_encoding)?;
    Ok(Box::new(NSValue {
        type_encoding,
        value,
    }))
}

#[cfg(test)]
mod value_tests {
    use crate::{
        archiver::{
            models::Value,
            tests::helpers::{decode, decode_single, group, object},
        },
        error::archive::UnarchiveError,
        foundation::{geometry::NSPoint, value::NSValue},
        typedstream::models::{ObjectReference, ReferenceType, Token},
    };

    #[test]
    fn can_decode_number() {
        let tokens = group(
            &["@"],
            object(
                "NSNumber",
                0,
                vec![
                    group(&["*"], vec![Token::CString("i".to_string())]),
                    group(&["i"], vec![Token::SignedInteger(0)]),
                ],
            ),
        );
        let value = decode_single(tokens).unwrap();
        assert_eq!(
            value.as_known::<NSValue>(),
            Some(&NSValue {
                type_encoding: "i".to_string(),
                value: Value::SignedInteger(0),
            })
        );
    }

    #[test]
    fn can_decode_number_with_shared_encoding() {
        // The first number's object, class, and C string take numbers 0, 1, and 2
        let mut tokens = group(
            &["@"],
            object(
                "NSNumber",
                0,
                vec![
                    group(&["*"], vec![Token::CString("q".to_string())]),
                    group(&["q"], vec![Token::SignedInteger(1)]),
                ],
            ),
        );
        tokens.extend(group(
            &["@"],
            object(
                "NSNumber",
                0,
                vec![
                    group(
                        &["*"],
                        vec![Token::Reference(ObjectReference::new(
                            ReferenceType::CString,
                            2,
                        ))],
                    ),
                    group(&["q"], vec![Token::SignedInteger(2)]),
                ],
            ),
        ));

        let groups = decode(tokens).unwrap();
        let second = groups[1].single().unwrap();
        let number = second.value.as_known::<NSValue>().unwrap();
        assert_eq!(number.type_encoding, "q");
        assert_eq!(number.value, Value::SignedInteger(2));
    }

    #[test]
    fn can_decode_point_value() {
        let tokens = group(
            &["@"],
            object(
                "NSValue",
                0,
                vec![
                    group(&["*"], vec![Token::CString("{_NSPoint=ff}".to_string())]),
                    group(
                        &["{_NSPoint=ff}"],
                        vec![
                            Token::BeginStruct {
                                name: Some("_NSPoint".to_string()),
                                field_encodings: vec!["f".to_string(), "f".to_string()],
                            },
                            Token::Float(1.5),
                            Token::Float(-2.0),
                            Token::EndStruct,
                        ],
                    ),
                ],
            ),
        );
        let value = decode_single(tokens).unwrap();
        let boxed = value.as_known::<NSValue>().unwrap();
        assert_eq!(
            boxed.value.as_known::<NSPoint>(),
            Some(&NSPoint { x: 1.5, y: -2.0 })
        );
    }

    #[test]
    fn cant_decode_mismatched_value() {
        let tokens = group(
            &["@"],
            object(
                "NSNumber",
                0,
                vec![
                    group(&["*"], vec![Token::CString("i".to_string())]),
                    group(&["d"], vec![Token::Double(1.0)]),
                ],
            ),
        );
        assert!(matches!(
            decode_single(tokens),
            Err(UnarchiveError::EncodingMismatch { .. })
        ));
    }
}
