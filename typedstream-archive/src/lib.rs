#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub mod archiver;
pub mod encodings;
pub mod error;
pub mod foundation;
pub mod typedstream;
