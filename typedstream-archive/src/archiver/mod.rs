/*!
 Contains logic and data structures used to rebuild objects from `typedstream` tokens.

 The [`unarchiver::Unarchiver`] consumes [`Token`](crate::typedstream::models::Token)s and resolves
 back-references against a [`table::SharedObjectTable`]. Objects whose class has a decoder in the
 [`registry`] are built into typed Rust structures; all other objects keep their raw typed values.
*/

pub mod models;
pub mod registry;
pub mod table;
pub mod unarchiver;
#[cfg(test)]
pub(crate) mod tests;
