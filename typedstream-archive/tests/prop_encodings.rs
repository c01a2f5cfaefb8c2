use proptest::prelude::*;
use typedstream_archive::encodings::{
    build_array_encoding, build_struct_encoding, end_of_encoding, join_encodings,
    parse_array_encoding, parse_struct_encoding, split_encodings,
};

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z_][A-Za-z0-9_]{0,8}"
}

fn encoding_strategy() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        Just("c".to_string()),
        Just("C".to_string()),
        Just("i".to_string()),
        Just("I".to_string()),
        Just("q".to_string()),
        Just("f".to_string()),
        Just("d".to_string()),
        Just("@".to_string()),
        Just("#".to_string()),
        Just("*".to_string()),
        Just("+".to_string()),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (0i64..10_000, inner.clone())
                .prop_map(|(length, element)| build_array_encoding(length, &element).unwrap()),
            (
                prop::option::of(name_strategy()),
                prop::collection::vec(inner, 0..4)
            )
                .prop_map(|(name, fields)| build_struct_encoding(&fields, name.as_deref())),
        ]
    })
}

proptest! {
    #[test]
    fn prop_split_joined(parts in prop::collection::vec(encoding_strategy(), 0..8)) {
        let joined = join_encodings(&parts);
        let split: Vec<&str> = split_encodings(&joined).collect::<Result<_, _>>().unwrap();
        prop_assert_eq!(split, parts.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_end_of_single(encoding in encoding_strategy()) {
        prop_assert_eq!(end_of_encoding(&encoding, 0), Ok(encoding.len()));
    }

    #[test]
    fn prop_array_roundtrip(length in 0i64..1_000_000, element in encoding_strategy()) {
        let built = build_array_encoding(length, &element).unwrap();
        let parsed = parse_array_encoding(&built).unwrap();
        prop_assert_eq!(parsed.length as i64, length);
        prop_assert_eq!(parsed.element_encoding, element.as_str());
    }

    #[test]
    fn prop_array_negative(length in i64::MIN..0, element in encoding_strategy()) {
        prop_assert!(build_array_encoding(length, &element).is_err());
    }

    #[test]
    fn prop_struct_roundtrip(
        name in prop::option::of(name_strategy()),
        fields in prop::collection::vec(encoding_strategy(), 0..6),
    ) {
        let built = build_struct_encoding(&fields, name.as_deref());
        let parsed = parse_struct_encoding(&built).unwrap();
        prop_assert_eq!(parsed.name, name.as_deref());
        prop_assert_eq!(parsed.field_encodings, fields.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn prop_truncated_is_error(encoding in encoding_strategy()) {
        prop_assume!(encoding.len() > 1);
        let truncated = &encoding[..encoding.len() - 1];
        // Dropping the last closer leaves an open bracket
        prop_assert!(end_of_encoding(truncated, 0).is_err());
    }
}
