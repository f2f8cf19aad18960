// decode.rs
//
// Binary decoder producing raw datums. Strings come back as `Datum::Utf8`,
// records as fresh `GenericRecord`s, logical values in their raw form.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use crate::codec::types::{Datum, EnumSymbol, GenericFixed, GenericRecord};
use crate::codec::varint;
use crate::internal::error::{Error, Result};
use crate::schema::types::{NodeKind, Schema};

/// Decodes a single datum; trailing bytes are an error.
pub fn decode_datum(schema: &Schema, data: &[u8]) -> Result<Datum> {
    let mut reader = Reader { data, pos: 0 };
    let datum = reader.read_datum(schema)?;
    if reader.pos != data.len() {
        return Err(Error::Codec(format!(
            "{} trailing bytes after datum",
            data.len() - reader.pos
        )));
    }
    Ok(datum)
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| {
                Error::Codec(format!(
                    "Incomplete data: need {} bytes at offset {}, have {}",
                    len,
                    self.pos,
                    self.data.len() - self.pos
                ))
            })?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_long(&mut self) -> Result<i64> {
        let (value, read) = varint::read_long(&self.data[self.pos..])?;
        self.pos += read;
        Ok(value)
    }

    fn read_int(&mut self) -> Result<i32> {
        let value = self.read_long()?;
        i32::try_from(value).map_err(|_| Error::Codec(format!("Int out of range: {}", value)))
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_long()?;
        usize::try_from(len).map_err(|_| Error::Codec(format!("Negative length: {}", len)))
    }

    fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        self.take(len)
    }

    /// Reads a block header; a negative count is followed by the block's byte size.
    fn read_block_count(&mut self) -> Result<usize> {
        let count = self.read_long()?;
        if count < 0 {
            let _block_size = self.read_long()?;
        }
        usize::try_from(count.unsigned_abs())
            .map_err(|_| Error::Codec(format!("Block count too large: {}", count)))
    }

    fn read_datum(&mut self, schema: &Schema) -> Result<Datum> {
        let schema = schema.resolve()?;
        match schema.node() {
            NodeKind::Null => Ok(Datum::Null),
            NodeKind::Boolean => match self.take(1)?[0] {
                0 => Ok(Datum::Boolean(false)),
                1 => Ok(Datum::Boolean(true)),
                other => Err(Error::Codec(format!("Invalid boolean byte: {}", other))),
            },
            NodeKind::Int => Ok(Datum::Int(self.read_int()?)),
            NodeKind::Long => Ok(Datum::Long(self.read_long()?)),
            NodeKind::Float => Ok(Datum::Float(LittleEndian::read_f32(self.take(4)?))),
            NodeKind::Double => Ok(Datum::Double(LittleEndian::read_f64(self.take(8)?))),
            NodeKind::Bytes => Ok(Datum::Bytes(Bytes::copy_from_slice(self.read_bytes()?))),
            NodeKind::String => {
                let raw = self.read_bytes()?;
                std::str::from_utf8(raw)
                    .map_err(|e| Error::Codec(format!("Invalid UTF-8 sequence for string: {}", e)))?;
                Ok(Datum::Utf8(Bytes::copy_from_slice(raw)))
            }
            NodeKind::Fixed(fixed) => {
                let bytes = Bytes::copy_from_slice(self.take(fixed.size())?);
                Ok(Datum::Fixed(GenericFixed::new(schema.clone(), bytes)))
            }
            NodeKind::Enum(node) => {
                let ordinal = self.read_int()?;
                let symbol = usize::try_from(ordinal)
                    .ok()
                    .and_then(|idx| node.symbols().get(idx))
                    .ok_or_else(|| {
                        Error::Codec(format!("Enum ordinal {} out of range for {}", ordinal, node.name()))
                    })?;
                Ok(Datum::Enum(EnumSymbol::new(schema.clone(), symbol.clone())))
            }
            NodeKind::Array(items) => {
                let mut elements = Vec::new();
                loop {
                    let count = self.read_block_count()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        elements.push(self.read_datum(items)?);
                    }
                }
                Ok(Datum::Array(elements))
            }
            NodeKind::Map(values) => {
                let mut entries = BTreeMap::new();
                loop {
                    let count = self.read_block_count()?;
                    if count == 0 {
                        break;
                    }
                    for _ in 0..count {
                        let key = std::str::from_utf8(self.read_bytes()?)
                            .map_err(|e| Error::Codec(format!("Invalid UTF-8 map key: {}", e)))?
                            .to_string();
                        entries.insert(key, self.read_datum(values)?);
                    }
                }
                Ok(Datum::Map(entries))
            }
            NodeKind::Record(record) => {
                let instance = GenericRecord::new(&schema)?;
                for field in record.fields() {
                    instance.put_at(field.position(), self.read_datum(field.schema())?)?;
                }
                Ok(Datum::record(instance))
            }
            NodeKind::Union(branches) => {
                let index = self.read_long()?;
                let branch = usize::try_from(index)
                    .ok()
                    .and_then(|idx| branches.get(idx))
                    .ok_or_else(|| Error::Codec(format!("Union index {} out of range", index)))?;
                self.read_datum(branch)
            }
            NodeKind::Symbolic(symbolic) => Err(Error::Codec(format!(
                "Unresolved reference to '{}'",
                symbolic.name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::compile_json_schema;

    fn decode(schema: &str, data: &[u8]) -> Result<Datum> {
        let schema = compile_json_schema(schema).unwrap();
        decode_datum(schema.root(), data)
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode("\"int\"", &[0x01]).unwrap(), Datum::Int(-1));
        assert_eq!(decode("\"long\"", &[0x80, 0x01]).unwrap(), Datum::Long(64));
        assert_eq!(decode("\"null\"", &[]).unwrap(), Datum::Null);
        assert_eq!(decode("\"float\"", &1.5f32.to_le_bytes()).unwrap(), Datum::Float(1.5));
        assert!(matches!(decode("\"string\"", &[0x02, b'a']).unwrap(), Datum::Utf8(_)));
    }

    #[test]
    fn test_decode_negative_block_count() {
        // Count -2 followed by a byte size of 2
        let data = [0x03, 0x04, 0x02, 0x04, 0x00];
        let datum = decode(r#"{"type": "array", "items": "int"}"#, &data).unwrap();
        assert_eq!(datum, Datum::Array(vec![Datum::Int(1), Datum::Int(2)]));
    }

    #[test]
    fn test_decode_record_and_union() {
        let schema = r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": ["null", "string"]}]}"#;
        let datum = decode(schema, &[0x02, 0x02, 0x02, b'z']).unwrap();
        let Datum::Record(record) = datum else {
            panic!("expected a record");
        };
        assert_eq!(record.get("a"), Some(Datum::Int(1)));
        assert_eq!(record.get("b"), Some(Datum::from("z")));
    }

    #[test]
    fn test_decode_errors() {
        assert!(decode("\"int\"", &[0x02, 0x00]).is_err());
        assert!(decode("\"double\"", &[0x00; 4]).is_err());
        assert!(decode(r#"["null", "int"]"#, &[0x08]).is_err());
        assert!(decode("\"boolean\"", &[0x05]).is_err());
    }
}
