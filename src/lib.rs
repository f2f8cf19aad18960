// schemata library entry point
//
// Schema compiler, canonical JSON emitter, logical type registry and the
// generic data engine built on top of them.

pub mod codec;
pub mod generic;
pub mod internal;
pub mod schema;

pub use crate::codec::{BinaryCodec, Datum, DatumCodec, GenericRecord, LogicalValue};
pub use crate::generic::{GenericData, GenericDataConfig};
pub use crate::internal::error::{Error, Result};
pub use crate::schema::{compile_json_schema, Schema, ValidSchema};
