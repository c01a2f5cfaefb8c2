/*!
 Decoders for [NSAttributedString](https://developer.apple.com/documentation/foundation/nsattributedstring)
 and `NSMutableAttributedString`.

 An attributed string is stored as its text followed by a list of runs. Each run is a pair of an attribute
 number and a length in UTF-16 code units. The first time a number appears, the dictionary of attributes
 for that number follows the run; later runs with the same number reuse it. Runs are read until they
 cover the whole text.
*/

use std::{collections::HashMap, rc::Rc};

use crate::{
    archiver::{
        models::{Class, KnownType, Value},
        unarchiver::Unarchiver,
    },
    error::archive::UnarchiveError,
    foundation::{check_version, collections::NSDictionary, string::string_value},
};

/// A range of an [`NSAttributedString`] that shares the same attributes
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRun {
    /// The first UTF-16 code unit in the range
    pub start: usize,
    /// The number of UTF-16 code units in the range
    pub length: usize,
    /// The attributes of the range, usually an [`NSDictionary`]
    pub attributes: Value,
}

impl AttributeRun {
    /// The attributes of the range, if they are a dictionary
    pub fn dictionary(&self) -> Option<&NSDictionary> {
        self.attributes.as_known()
    }
}

/// Text with attributes applied to ranges of it
#[derive(Debug, Clone, PartialEq)]
pub struct NSAttributedString {
    pub value: String,
    pub runs: Vec<AttributeRun>,
}

crate::known_type!(NSAttributedString);

impl NSAttributedString {
    /// Get the text covered by `run`, or `None` if the range does not fit or splits a surrogate pair
    pub fn run_text(&self, run: &AttributeRun) -> Option<String> {
        let units: Vec<u16> = self.value.encode_utf16().collect();
        let end = run.start.checked_add(run.length)?;
        String::from_utf16(units.get(run.start..end)?).ok()
    }
}

/// Read one run header, which is an attribute number and a length
fn decode_range(unarchiver: &mut Unarchiver<'_>) -> Result<(i64, usize), UnarchiveError> {
    let range = unarchiver.decode_values_of_types(&["i", "I"])?;
    let parsed = match range.as_slice() {
        [number, length] => number.as_signed_integer().zip(
            length
                .as_unsigned_integer()
                .and_then(|length| usize::try_from(length).ok()),
        ),
        _ => None,
    };
    parsed.ok_or_else(|| {
        UnarchiveError::InvalidValue("NSAttributedString range", format!("{range:?}"))
    })
}

pub(crate) fn decode(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Box<dyn KnownType>, UnarchiveError> {
    check_version(class, 0)?;

    let text = unarchiver.decode_value_of_type("@")?;
    let value = string_value(&text)
        .ok_or_else(|| UnarchiveError::InvalidValue("NSAttributedString", format!("{text:?}")))?
        .to_string();
    let total = value.encode_utf16().count();

    let mut shared_attributes: HashMap<i64, Value> = HashMap::new();
    let mut runs = vec![];
    let mut start = 0;
    while start < total {
        let (number, length) = decode_range(unarchiver)?;
        // A zero length run never advances
        if length == 0 {
            return Err(UnarchiveError::InvalidValue(
                "NSAttributedString range",
                format!("empty run {number} at {start}"),
            ));
        }

        let attributes = match shared_attributes.get(&number) {
            Some(attributes) => attributes.clone(),
            None => {
                let attributes = unarchiver.decode_value_of_type("@")?;
                shared_attributes.insert(number, attributes.clone());
                attributes
            }
        };

        runs.push(AttributeRun {
            start,
            length,
            attributes,
        });
        start = start.saturating_add(length);
    }

    tracing::trace!(length = total, runs = runs.len(), "read attributed string");
    Ok(Box::new(NSAttributedString { value, runs }))
}

#[cfg(test)]
mod attributed_string_tests {
    use std::rc::Rc;

    use crate::{
        archiver::{
            models::Value,
            tests::helpers::{decode_single, group, ns_string, object},
        },
        error::archive::UnarchiveError,
        foundation::{
            attributed_string::NSAttributedString, collections::NSDictionary, value::NSValue,
        },
        typedstream::models::Token,
    };

    fn range(number: i64, length: u64) -> Vec<Token> {
        group(
            &["i", "I"],
            vec![Token::SignedInteger(number), Token::UnsignedInteger(length)],
        )
    }

    fn part_attributes(part: i64) -> Vec<Token> {
        group(
            &["@"],
            object(
                "NSDictionary",
                0,
                vec![
                    group(&["i"], vec![Token::SignedInteger(1)]),
                    group(&["@"], ns_string("__kIMMessagePartAttributeName")),
                    group(
                        &["@"],
                        object(
                            "NSNumber",
                            0,
                            vec![
                                group(&["*"], vec![Token::CString("i".to_string())]),
                                group(&["i"], vec![Token::SignedInteger(part)]),
                            ],
                        ),
                    ),
                ],
            ),
        )
    }

    fn attributed_string(text: &str, runs: Vec<Vec<Token>>) -> Vec<Token> {
        let mut groups = vec![group(&["@"], ns_string(text))];
        groups.extend(runs);
        group(&["@"], object("NSAttributedString", 0, groups))
    }

    fn part_number(value: &Value) -> Option<i64> {
        value
            .as_known::<NSDictionary>()?
            .get("__kIMMessagePartAttributeName")?
            .as_known::<NSValue>()?
            .value
            .as_signed_integer()
    }

    #[test]
    fn can_decode_single_run() {
        let tokens = attributed_string("Noter test", vec![range(1, 10), part_attributes(0)]);
        let value = decode_single(tokens).unwrap();
        let string = value.as_known::<NSAttributedString>().unwrap();

        assert_eq!(string.value, "Noter test");
        assert_eq!(string.runs.len(), 1);
        assert_eq!(string.runs[0].start, 0);
        assert_eq!(string.runs[0].length, 10);
        assert_eq!(part_number(&string.runs[0].attributes), Some(0));
        assert_eq!(string.run_text(&string.runs[0]).as_deref(), Some("Noter test"));
    }

    #[test]
    fn can_decode_shared_attributes() {
        let tokens = attributed_string(
            "one two three",
            vec![
                range(1, 4),
                part_attributes(0),
                range(2, 4),
                part_attributes(1),
                // The attributes for number 1 are not repeated
                range(1, 5),
            ],
        );
        let value = decode_single(tokens).unwrap();
        let string = value.as_known::<NSAttributedString>().unwrap();

        let parts: Vec<_> = string
            .runs
            .iter()
            .map(|run| (run.start, run.length, part_number(&run.attributes)))
            .collect();
        assert_eq!(
            parts,
            vec![(0, 4, Some(0)), (4, 4, Some(1)), (8, 5, Some(0))]
        );

        let first = string.runs[0].attributes.as_object().unwrap();
        let last = string.runs[2].attributes.as_object().unwrap();
        assert!(Rc::ptr_eq(first, last));
        assert_eq!(string.run_text(&string.runs[1]).as_deref(), Some("two "));
    }

    #[test]
    fn can_decode_utf16_lengths() {
        // The wave emoji is two UTF-16 code units
        let tokens = attributed_string(
            "\u{1F44B} hi",
            vec![range(1, 2), part_attributes(0), range(2, 3), part_attributes(1)],
        );
        let value = decode_single(tokens).unwrap();
        let string = value.as_known::<NSAttributedString>().unwrap();

        assert_eq!(string.runs.len(), 2);
        assert_eq!(string.run_text(&string.runs[0]).as_deref(), Some("\u{1F44B}"));
        assert_eq!(string.run_text(&string.runs[1]).as_deref(), Some(" hi"));
    }

    #[test]
    fn can_decode_empty_string() {
        let tokens = attributed_string("", vec![]);
        let value = decode_single(tokens).unwrap();
        let string = value.as_known::<NSAttributedString>().unwrap();

        assert!(string.value.is_empty());
        assert!(string.runs.is_empty());
    }

    #[test]
    fn cant_decode_empty_run() {
        let tokens = attributed_string("text", vec![range(1, 0), part_attributes(0)]);
        assert!(matches!(
            decode_single(tokens),
            Err(UnarchiveError::InvalidValue("NSAttributedString range", _))
        ));
    }

    #[test]
    fn cant_decode_missing_runs() {
        let tokens = attributed_string("text", vec![range(1, 2), part_attributes(0)]);
        assert!(matches!(
            decode_single(tokens),
            Err(UnarchiveError::UnexpectedToken { .. })
        ));
    }
}
