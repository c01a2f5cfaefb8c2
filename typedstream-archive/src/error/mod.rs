/*!
 Errors that can happen while tokenizing or decoding `typedstream` data.
*/

pub mod archive;
pub mod encoding;
pub mod typedstream;
