// Deep copy of datums

use bytes::Bytes;

use crate::codec::types::{Datum, EnumSymbol, GenericFixed, GenericRecord};
use crate::generic::GenericData;
use crate::internal::error::{Error, Result};
use crate::schema::types::{NodeKind, Schema};

impl GenericData {
    /// Returns a copy of `value` that shares no mutable state with it.
    ///
    /// Records are rebuilt field by field. A converted logical value is
    /// copied through its raw form and converted back.
    pub fn deep_copy(&self, schema: &Schema, value: &Datum) -> Result<Datum> {
        if value.is_null() {
            return Ok(Datum::Null);
        }
        let schema = schema.resolve()?;

        if let NodeKind::Union(branches) = schema.node() {
            let index = self
                .resolve_union(&schema, value)
                .map_err(|e| Error::DeepCopy(e.to_string()))?;
            return self.deep_copy(&branches[index], value);
        }
        if let Datum::Logical(logical) = value {
            let raw = self.to_raw(&schema, logical)?;
            let copied = self.deep_copy(&schema, &raw)?;
            let conversion = schema
                .logical_type()
                .name()
                .and_then(|name| self.conversion_for(logical.representation(), name))
                .ok_or_else(|| {
                    Error::DeepCopy(format!("No conversion back to {}", logical.representation()))
                })?;
            return conversion.from_raw(&copied, &schema);
        }

        match (schema.node(), value) {
            (NodeKind::Record(record), Datum::Record(instance)) => {
                let copy = GenericRecord::new(&schema)?;
                let values = instance.values();
                for field in record.fields() {
                    if let Some(v) = values.get(field.position()) {
                        copy.put_at(field.position(), self.deep_copy(field.schema(), v)?)?;
                    }
                }
                Ok(Datum::record(copy))
            }
            (NodeKind::Array(items), Datum::Array(elements)) => elements
                .iter()
                .map(|element| self.deep_copy(items, element))
                .collect::<Result<Vec<_>>>()
                .map(Datum::Array),
            (NodeKind::Map(values), Datum::Map(entries)) => entries
                .iter()
                .map(|(key, entry)| -> Result<(String, Datum)> {
                    Ok((key.clone(), self.deep_copy(values, entry)?))
                })
                .collect::<Result<_>>()
                .map(Datum::Map),
            (NodeKind::Enum(_), Datum::Enum(symbol)) => {
                Ok(Datum::Enum(EnumSymbol::new(schema.clone(), symbol.symbol())))
            }
            (NodeKind::Fixed(_), Datum::Fixed(fixed)) => Ok(Datum::Fixed(GenericFixed::new(
                schema.clone(),
                Bytes::copy_from_slice(fixed.bytes()),
            ))),
            (NodeKind::Bytes, Datum::Bytes(bytes)) => Ok(Datum::Bytes(Bytes::copy_from_slice(bytes))),
            (NodeKind::String, Datum::String(s)) => Ok(Datum::String(s.clone())),
            (NodeKind::String, Datum::Utf8(bytes)) => Ok(Datum::Utf8(Bytes::copy_from_slice(bytes))),
            (NodeKind::Int, Datum::Int(_))
            | (NodeKind::Long, Datum::Long(_))
            | (NodeKind::Float, Datum::Float(_))
            | (NodeKind::Double, Datum::Double(_))
            | (NodeKind::Boolean, Datum::Boolean(_)) => Ok(value.clone()),
            _ => Err(Error::DeepCopy(format!(
                "Deep copy failed for schema \"{}\" and value \"{}\"",
                schema,
                self.render(value)
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::types::LogicalValue;
    use crate::schema::parser::compile_json_schema;
    use std::sync::Arc;

    fn schema(text: &str) -> Schema {
        compile_json_schema(text).unwrap().root().clone()
    }

    #[test]
    fn test_record_copy_is_independent() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "record", "name": "R", "fields": [
            {"name": "tags", "type": {"type": "array", "items": "string"}},
            {"name": "note", "type": ["null", "string"]}]}"#);
        let record = GenericRecord::new(&s).unwrap();
        record.put("tags", Datum::Array(vec![Datum::from("a")])).unwrap();
        let original = Datum::record(record);

        let copy = data.deep_copy(&s, &original).unwrap();
        assert_eq!(copy, original);
        let (Datum::Record(a), Datum::Record(b)) = (&original, &copy) else {
            panic!("expected records");
        };
        assert!(!Arc::ptr_eq(a, b));
        b.put("note", Datum::from("changed")).unwrap();
        assert_eq!(a.get("note"), Some(Datum::Null));
    }

    #[test]
    fn test_uuid_round_trips_through_raw() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "string", "logicalType": "uuid"}"#);
        let value = Datum::Logical(LogicalValue::Uuid(uuid::Uuid::from_u128(42)));
        assert_eq!(data.deep_copy(&s, &value).unwrap(), value);
    }

    #[test]
    fn test_mismatch_is_an_error() {
        let data = GenericData::new();
        let err = data.deep_copy(&schema("\"int\""), &Datum::from("x")).unwrap_err();
        assert!(matches!(err, Error::DeepCopy(_)));
        let err = data.deep_copy(&schema(r#"["null", "int"]"#), &Datum::Long(1)).unwrap_err();
        assert!(matches!(err, Error::DeepCopy(_)));
    }

    #[test]
    fn test_null_copies_to_null() {
        let data = GenericData::new();
        assert_eq!(data.deep_copy(&schema("\"string\""), &Datum::Null).unwrap(), Datum::Null);
    }
}
