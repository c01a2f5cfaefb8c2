/*!
 Contains logic and data structures used to tokenize raw `typedstream` data.

 ## Overview

 The typedstream format is a binary serialization protocol designed for `C` and `Objective-C` data structures.
 It is primarily used in Apple's Foundation framework, specifically within the `NSArchiver` and `NSUnarchiver` classes.

 ## Origin

 The format is derived from the data structure used by NeXTSTEP's `NXTypedStream` APIs.

 ## Layout

 The [`parser`] turns bytes into flat [`models::Token`]s; rebuilding objects from those tokens is handled by
 the [`archiver`](crate::archiver) module.
*/

pub mod models;
pub mod parser;
