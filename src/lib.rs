//! Purpose: Type-directed marshalling engine for cached records.
//! Exports: `api` (stable surface), `core` (descriptors, compiler, codecs, errors), `json` (byte seam).
//! Role: Library backing the `cachew-marshal` CLI and any caching layer that persists `Json`.
//! Invariants: `load(dump(v)) == v` for every value a compiled schema accepts.
//! Invariants: Engine calls are pure and synchronous; no I/O outside `api::stream`.
pub mod api;
pub mod core;
pub mod json;

pub use api::{
    Error, ErrorKind, Json, Marshal, MarshalOptions, Marshaller, Record, RecordFields, TypeDesc,
    TypedMarshaller, Value, Variant, Zone, ZonedTimestamp,
};
