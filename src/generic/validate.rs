// Datum validation and union resolution

use tracing::trace;

use crate::codec::types::Datum;
use crate::generic::{GenericData, NULL_DATUM};
use crate::internal::error::{Error, Result};
use crate::schema::types::{NodeKind, Schema};

impl GenericData {
    /// Returns true when `datum` conforms to `schema`. Never fails loudly.
    pub fn validate(&self, schema: &Schema, datum: &Datum) -> bool {
        let Ok(schema) = schema.resolve() else {
            return false;
        };
        if let NodeKind::Union(branches) = schema.node() {
            return match self.resolve_union(&schema, datum) {
                Ok(index) => self.validate(&branches[index], datum),
                Err(_) => false,
            };
        }
        if let Datum::Logical(value) = datum {
            return match self.to_raw(&schema, value) {
                Ok(raw) => self.validate(&schema, &raw),
                Err(_) => false,
            };
        }

        match (schema.node(), datum) {
            (NodeKind::Null, Datum::Null) => true,
            (NodeKind::Boolean, Datum::Boolean(_)) => true,
            (NodeKind::Int, Datum::Int(_)) => true,
            (NodeKind::Long, Datum::Long(_)) => true,
            (NodeKind::Float, Datum::Float(_)) => true,
            (NodeKind::Double, Datum::Double(_)) => true,
            (NodeKind::Bytes, Datum::Bytes(_)) => true,
            (NodeKind::String, Datum::String(_) | Datum::Utf8(_)) => true,
            (NodeKind::Enum(node), Datum::Enum(symbol)) => node.ordinal(symbol.symbol()).is_some(),
            (NodeKind::Fixed(node), Datum::Fixed(fixed)) => fixed.bytes().len() == node.size(),
            (NodeKind::Array(items), Datum::Array(elements)) => {
                elements.iter().all(|element| self.validate(items, element))
            }
            (NodeKind::Map(values), Datum::Map(entries)) => {
                entries.values().all(|entry| self.validate(values, entry))
            }
            (NodeKind::Record(record), Datum::Record(instance)) => {
                let values = instance.values();
                record.fields().iter().all(|field| {
                    let value = values.get(field.position()).unwrap_or(&NULL_DATUM);
                    self.validate(field.schema(), value)
                })
            }
            _ => false,
        }
    }

    /// Picks the union branch that holds `datum`.
    ///
    /// A converted logical value goes to the first branch declaring a logical
    /// type its representation converts to. Anything else is matched by its
    /// full type name.
    pub fn resolve_union(&self, union: &Schema, datum: &Datum) -> Result<usize> {
        let union = union.resolve()?;
        let branches = union
            .branches()
            .ok_or_else(|| Error::TypeMismatch(format!("Not a union: {}", union)))?;

        if let Datum::Logical(value) = datum {
            for (index, branch) in branches.iter().enumerate() {
                let branch = branch.resolve()?;
                if let Some(name) = branch.logical_type().name() {
                    if self.conversion_for(value.representation(), name).is_some() {
                        trace!(index, logical_type = name, "union resolved by conversion");
                        return Ok(index);
                    }
                }
            }
        } else if let Some(name) = datum.schema_name() {
            if let Some(index) = union.branch_index_named(&name) {
                return Ok(index);
            }
        }

        Err(Error::UnresolvedUnion {
            union: union.to_string(),
            datum: self.render(datum),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::types::{EnumSymbol, GenericRecord, LogicalValue};
    use crate::schema::parser::compile_json_schema;

    fn schema(text: &str) -> Schema {
        compile_json_schema(text).unwrap().root().clone()
    }

    #[test]
    fn test_null_resolves_to_first_branch() {
        let data = GenericData::new();
        let union = schema(r#"["null", "long"]"#);
        assert_eq!(data.resolve_union(&union, &Datum::Null).unwrap(), 0);
        assert_eq!(data.resolve_union(&union, &Datum::Long(3)).unwrap(), 1);
        let err = data.resolve_union(&union, &Datum::Int(3)).unwrap_err();
        assert!(matches!(err, Error::UnresolvedUnion { .. }));
    }

    #[test]
    fn test_logical_value_resolves_by_conversion() {
        let data = GenericData::new();
        let union = schema(r#"["null", "string", {"type": "fixed", "name": "U", "size": 16, "logicalType": "uuid"}]"#);
        let datum = Datum::Logical(LogicalValue::Uuid(uuid::Uuid::nil()));
        assert_eq!(data.resolve_union(&union, &datum).unwrap(), 2);
        assert!(data.validate(&union, &datum));
    }

    #[test]
    fn test_named_branches() {
        let data = GenericData::new();
        let union = schema(
            r#"[{"type": "enum", "name": "ns.E", "symbols": ["A", "B"]}, "string"]"#,
        );
        let enum_schema = union.branches().unwrap()[0].clone();
        let datum = Datum::Enum(EnumSymbol::new(enum_schema, "B"));
        assert_eq!(data.resolve_union(&union, &datum).unwrap(), 0);
        assert!(data.validate(&union, &datum));
        assert!(data.validate(&union, &Datum::utf8("x")));
    }

    #[test]
    fn test_validate_records() {
        let data = GenericData::new();
        let record_schema = schema(
            r#"{"type": "record", "name": "R", "fields": [
                {"name": "a", "type": "int"}, {"name": "b", "type": ["null", "string"]}]}"#,
        );
        let record = GenericRecord::new(&record_schema).unwrap();
        assert!(!data.validate(&record_schema, &Datum::record(GenericRecord::new(&record_schema).unwrap())));
        record.put("a", Datum::Int(1)).unwrap();
        let datum = Datum::record(record);
        assert!(data.validate(&record_schema, &datum));
        assert!(!data.validate(&schema("\"int\""), &datum));
    }

    #[test]
    fn test_validate_enum_and_fixed() {
        let data = GenericData::new();
        let fixed = schema(r#"{"type": "fixed", "name": "F", "size": 2}"#);
        let ok = Datum::Fixed(crate::codec::types::GenericFixed::new(
            fixed.clone(),
            bytes::Bytes::from_static(b"ab"),
        ));
        assert!(data.validate(&fixed, &ok));
        let short = Datum::Fixed(crate::codec::types::GenericFixed::new(
            fixed.clone(),
            bytes::Bytes::from_static(b"a"),
        ));
        assert!(!data.validate(&fixed, &short));

        let enumeration = schema(r#"{"type": "enum", "name": "E", "symbols": ["A"]}"#);
        assert!(!data.validate(&enumeration, &Datum::Enum(EnumSymbol::new(enumeration.clone(), "Z"))));
    }
}
