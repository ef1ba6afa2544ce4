//! Purpose: Define the stable public Rust API boundary for the marshalling engine.
//! Exports: Marshallers, the `Marshal` trait, record streams, and the core value/descriptor types.
//! Role: Public, additive-only surface; engine internals stay behind `core`.
//! Invariants: Everything a caller needs to dump/load records is reachable from here.
//! Invariants: Codec tree types remain crate-private.

mod marshal;
mod marshaller;
pub mod stream;

pub use crate::core::desc::{FieldDesc, PrimitiveKind, RecordDesc, TypeDesc, UnionDesc};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind, PathSegment};
pub use crate::core::schema::{MarshalOptions, Schema};
pub use crate::core::timestamp::{Zone, ZonedTimestamp};
pub use crate::core::value::{Record, Value, Variant};
pub use crate::core::zone::{NamedZone, StaticZones, Tzdb, ZoneResolver, ZoneRules};
pub use crate::json::Json;
pub use marshal::{Marshal, RecordFields};
pub use marshaller::{Marshaller, TypedMarshaller};
pub use stream::{ErrorPolicy, LoadedRecord, StreamOutcome, read_jsonl, write_jsonl};
