// Codec module for schemata datums
//
// The generic data engine only needs two capabilities from a codec: encode a
// JSON literal under a schema, and decode those bytes back into a raw datum.
// `BinaryCodec` is the reference implementation of the compact binary form.

use serde_json::Value;

use crate::internal::error::Result;
use crate::schema::types::Schema;

pub mod decode;
pub mod encode;
pub mod types;
pub mod varint;

pub use self::types::{CustomValue, Datum, Decimal, EnumSymbol, GenericFixed, GenericRecord, LogicalValue};

/// Encoder/decoder pair used to materialize default values.
pub trait DatumCodec: Send + Sync {
    /// Encodes a JSON literal written under the default-value conventions.
    fn encode(&self, schema: &Schema, literal: &Value) -> Result<Vec<u8>>;

    /// Decodes one datum; all of `data` must be consumed.
    fn decode(&self, schema: &Schema, data: &[u8]) -> Result<Datum>;
}

/// Compact binary codec: zig-zag varints, little-endian floats, length
/// prefixed bytes and strings, block-encoded arrays and maps.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryCodec;

impl BinaryCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DatumCodec for BinaryCodec {
    fn encode(&self, schema: &Schema, literal: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        encode::encode_literal(schema, literal, &mut buf)?;
        Ok(buf)
    }

    fn decode(&self, schema: &Schema, data: &[u8]) -> Result<Datum> {
        decode::decode_datum(schema, data)
    }
}
