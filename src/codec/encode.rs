use byteorder::{LittleEndian, WriteBytesExt};
use serde_json::Value;

use crate::codec::varint;
use crate::internal::error::{Error, Result};
use crate::schema::defaults::first_valid_branch;
use crate::schema::types::{NodeKind, Schema};
use crate::schema::utils;

/// Encodes a JSON literal under `schema` into the binary form, appending to `buf`.
///
/// Literals follow the default-value conventions: bytes and fixed are
/// ISO-8859-1 strings, records are objects (missing fields take their own
/// defaults) and a union literal is written under the first branch it is
/// valid for.
pub fn encode_literal(schema: &Schema, literal: &Value, buf: &mut Vec<u8>) -> Result<()> {
    let schema = schema.resolve()?;
    match (schema.node(), literal) {
        (NodeKind::Null, Value::Null) => Ok(()),
        (NodeKind::Boolean, Value::Bool(v)) => {
            buf.push(u8::from(*v));
            Ok(())
        }
        (NodeKind::Int, Value::Number(n)) => {
            let v = n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| mismatch(&schema, literal))?;
            varint::write_long(buf, i64::from(v));
            Ok(())
        }
        (NodeKind::Long, Value::Number(n)) => {
            let v = n.as_i64().ok_or_else(|| mismatch(&schema, literal))?;
            varint::write_long(buf, v);
            Ok(())
        }
        (NodeKind::Float, Value::Number(n)) => {
            let v = n.as_f64().ok_or_else(|| mismatch(&schema, literal))?;
            buf.write_f32::<LittleEndian>(v as f32)?;
            Ok(())
        }
        (NodeKind::Double, Value::Number(n)) => {
            let v = n.as_f64().ok_or_else(|| mismatch(&schema, literal))?;
            buf.write_f64::<LittleEndian>(v)?;
            Ok(())
        }
        (NodeKind::String, Value::String(s)) => {
            write_bytes(buf, s.as_bytes());
            Ok(())
        }
        (NodeKind::Bytes, Value::String(s)) => {
            let bytes = utils::latin1_bytes(s).ok_or_else(|| mismatch(&schema, literal))?;
            write_bytes(buf, &bytes);
            Ok(())
        }
        (NodeKind::Fixed(fixed), Value::String(s)) => {
            let bytes = utils::latin1_bytes(s)
                .filter(|bytes| bytes.len() == fixed.size())
                .ok_or_else(|| mismatch(&schema, literal))?;
            buf.extend_from_slice(&bytes);
            Ok(())
        }
        (NodeKind::Enum(node), Value::String(symbol)) => {
            let ordinal = node.ordinal(symbol).ok_or_else(|| mismatch(&schema, literal))?;
            varint::write_long(buf, ordinal as i64);
            Ok(())
        }
        (NodeKind::Array(items), Value::Array(elements)) => {
            if !elements.is_empty() {
                varint::write_long(buf, elements.len() as i64);
                for element in elements {
                    encode_literal(items, element, buf)?;
                }
            }
            varint::write_long(buf, 0);
            Ok(())
        }
        (NodeKind::Map(values), Value::Object(entries)) => {
            if !entries.is_empty() {
                varint::write_long(buf, entries.len() as i64);
                for (key, value) in entries {
                    write_bytes(buf, key.as_bytes());
                    encode_literal(values, value, buf)?;
                }
            }
            varint::write_long(buf, 0);
            Ok(())
        }
        (NodeKind::Record(record), Value::Object(entries)) => {
            for field in record.fields() {
                let value = entries
                    .get(field.name())
                    .or_else(|| field.default_value())
                    .ok_or_else(|| {
                        Error::Codec(format!(
                            "No value for field '{}' of {}",
                            field.name(),
                            record.name()
                        ))
                    })?;
                encode_literal(field.schema(), value, buf)?;
            }
            Ok(())
        }
        (NodeKind::Union(branches), literal) => {
            let index = first_valid_branch(branches, literal).ok_or_else(|| mismatch(&schema, literal))?;
            varint::write_long(buf, index as i64);
            encode_literal(&branches[index], literal, buf)
        }
        _ => Err(mismatch(&schema, literal)),
    }
}

/// Length-prefixed byte string.
fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    varint::write_long(buf, bytes.len() as i64);
    buf.extend_from_slice(bytes);
}

fn mismatch(schema: &Schema, literal: &Value) -> Error {
    Error::Codec(format!(
        "Cannot encode {} literal {} as {}",
        utils::json_kind_name(literal),
        literal,
        schema.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::compile_json_schema;
    use serde_json::json;

    fn encode(schema: &str, literal: Value) -> Result<Vec<u8>> {
        let schema = compile_json_schema(schema).unwrap();
        let mut buf = Vec::new();
        encode_literal(schema.root(), &literal, &mut buf)?;
        Ok(buf)
    }

    #[test]
    fn test_encode_scalars() {
        assert_eq!(encode("\"int\"", json!(-1)).unwrap(), vec![0x01]);
        assert_eq!(encode("\"long\"", json!(64)).unwrap(), vec![0x80, 0x01]);
        assert_eq!(encode("\"boolean\"", json!(true)).unwrap(), vec![0x01]);
        assert_eq!(encode("\"double\"", json!(1)).unwrap(), 1f64.to_le_bytes().to_vec());
        assert_eq!(encode("\"string\"", json!("hi")).unwrap(), vec![0x04, b'h', b'i']);
        assert_eq!(encode("\"bytes\"", json!("\u{00ff}")).unwrap(), vec![0x02, 0xff]);
    }

    #[test]
    fn test_encode_blocks() {
        let array = encode(r#"{"type": "array", "items": "int"}"#, json!([1, 2])).unwrap();
        assert_eq!(array, vec![0x04, 0x02, 0x04, 0x00]);
        let empty = encode(r#"{"type": "map", "values": "int"}"#, json!({})).unwrap();
        assert_eq!(empty, vec![0x00]);
    }

    #[test]
    fn test_encode_union_under_first_valid_branch() {
        let bytes = encode(r#"["null", "string"]"#, json!("a")).unwrap();
        assert_eq!(bytes, vec![0x02, 0x02, b'a']);
    }

    #[test]
    fn test_encode_record_uses_field_defaults() {
        let schema = r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": "int", "default": 7}]}"#;
        assert_eq!(encode(schema, json!({"a": 1})).unwrap(), vec![0x02, 0x0e]);
        assert!(matches!(encode(schema, json!({})), Err(Error::Codec(_))));
    }

    #[test]
    fn test_encode_mismatch() {
        assert!(encode("\"int\"", json!("x")).is_err());
        assert!(encode(r#"{"type": "fixed", "name": "F", "size": 2}"#, json!("abc")).is_err());
    }
}
