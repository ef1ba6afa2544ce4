// Core modules implementing descriptors, schema compilation, codecs, and errors.
pub mod codec;
pub mod desc;
pub mod error;
pub mod schema;
pub mod timestamp;
pub mod union;
pub mod value;
pub mod zone;
