//! Builders for token streams shared by the unarchiver and Foundation tests

use std::sync::Arc;

use crate::{
    archiver::{
        models::{TypedGroup, Value},
        registry::KnownTypeRegistry,
        unarchiver::Unarchiver,
    },
    error::archive::UnarchiveError,
    typedstream::models::Token,
};

/// Wrap `values` in a group of typed values
pub(crate) fn group(encodings: &[&str], values: Vec<Token>) -> Vec<Token> {
    let mut tokens = vec![Token::BeginTypedValues(
        encodings.iter().map(|encoding| encoding.to_string()).collect(),
    )];
    tokens.extend(values);
    tokens.push(Token::EndTypedValues);
    tokens
}

/// A new object of a new class with no superclass, followed by its groups of typed values
pub(crate) fn object(name: &str, version: i64, groups: Vec<Vec<Token>>) -> Vec<Token> {
    let mut tokens = vec![
        Token::BeginObject,
        Token::SingleClass {
            name: name.to_string(),
            version,
        },
        Token::Nil,
    ];
    tokens.extend(groups.into_iter().flatten());
    tokens.push(Token::EndObject);
    tokens
}

/// A new `NSString` object
pub(crate) fn ns_string(text: &str) -> Vec<Token> {
    object(
        "NSString",
        1,
        vec![group(&["+"], vec![Token::String(text.to_string())])],
    )
}

/// Decode every group with only the Foundation decoders registered
pub(crate) fn decode(tokens: Vec<Token>) -> Result<Vec<TypedGroup>, UnarchiveError> {
    let registry = Arc::new(KnownTypeRegistry::with_foundation());
    Unarchiver::with_registry(tokens.into_iter().map(Ok), registry).decode_all()
}

/// Decode a stream that holds a single group with a single value
pub(crate) fn decode_single(tokens: Vec<Token>) -> Result<Value, UnarchiveError> {
    let mut groups = decode(tokens)?;
    assert_eq!(groups.len(), 1, "expected one group, got {groups:?}");
    match groups.remove(0) {
        TypedGroup::Value(value) => Ok(value.value),
        group => panic!("expected a single value, got {group:?}"),
    }
}
