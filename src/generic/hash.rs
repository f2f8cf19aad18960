// Schema-driven hashing
//
// Hashes agree with `compare(.., equals_only = true)`: datums that compare
// equal under a schema hash to the same value. A single accumulator seeded
// at 1 runs through every nested record and array. The budget counter is
// `GenericDataConfig::hash_contribution_limit`; it is spent before each
// field (ignored ones too) or element, and hashing stops when it hits zero,
// so at most `limit - 1` values contribute.

use crate::codec::types::Datum;
use crate::generic::{GenericData, NULL_DATUM};
use crate::internal::error::{Error, Result};
use crate::schema::types::{FieldOrder, NodeKind, Schema};

impl GenericData {
    /// Hash of `datum` as an instance of `schema`.
    pub fn hash_code(&self, datum: &Datum, schema: &Schema) -> Result<i32> {
        HashCodeCalculator::new(self).hash(datum, schema)
    }
}

/// One hashing pass. Nested records and arrays fold into the same
/// accumulator, and the budget counter is shared by the whole datum.
struct HashCodeCalculator<'a> {
    data: &'a GenericData,
    counter: usize,
    current: i32,
}

impl<'a> HashCodeCalculator<'a> {
    fn new(data: &'a GenericData) -> Self {
        Self {
            data,
            counter: data.config().hash_contribution_limit,
            current: 1,
        }
    }

    /// Spends one unit of budget; true once the counter reaches zero.
    fn should_stop(&mut self) -> bool {
        self.counter = self.counter.saturating_sub(1);
        self.counter == 0
    }

    /// Folds one element into the accumulator. The prefix is taken before
    /// the element is hashed, so a nested aggregate adds its own running
    /// value on top of it.
    fn add(&mut self, datum: &Datum, schema: &Schema) -> Result<()> {
        let prefix = self.current.wrapping_mul(31);
        let element = self.hash(datum, schema)?;
        self.current = prefix.wrapping_add(element);
        Ok(())
    }

    fn hash(&mut self, datum: &Datum, schema: &Schema) -> Result<i32> {
        if datum.is_null() {
            return Ok(0);
        }
        let schema = schema.resolve()?;

        if let NodeKind::Union(branches) = schema.node() {
            let index = self.data.resolve_union(&schema, datum)?;
            return self.hash(datum, &branches[index]);
        }
        if let Datum::Logical(value) = datum {
            let raw = self.data.to_raw(&schema, value)?;
            return self.hash(&raw, &schema);
        }

        match (schema.node(), datum) {
            (NodeKind::Record(record), Datum::Record(instance)) => {
                let values = instance.values();
                for field in record.fields() {
                    if self.should_stop() {
                        break;
                    }
                    if field.order() == FieldOrder::Ignore {
                        continue;
                    }
                    let value = values.get(field.position()).unwrap_or(&NULL_DATUM);
                    self.add(value, field.schema())?;
                }
                Ok(self.current)
            }
            (NodeKind::Array(items), Datum::Array(elements)) => {
                for element in elements {
                    if self.should_stop() {
                        break;
                    }
                    self.add(element, items)?;
                }
                Ok(self.current)
            }
            (NodeKind::Map(values), Datum::Map(entries)) => {
                let mut hash = 0i32;
                for (key, value) in entries {
                    let value_hash = HashCodeCalculator::new(self.data).hash(value, values)?;
                    hash = hash.wrapping_add(string_hash(key.as_bytes()) ^ value_hash);
                }
                Ok(hash)
            }
            (NodeKind::Enum(node), Datum::Enum(symbol)) => node
                .ordinal(symbol.symbol())
                .map(|ordinal| ordinal as i32)
                .ok_or_else(|| {
                    Error::TypeMismatch(format!("'{}' is not a symbol of {}", symbol.symbol(), node.name()))
                }),
            (NodeKind::Fixed(_), Datum::Fixed(fixed)) => Ok(bytes_hash(fixed.bytes())),
            (NodeKind::Bytes, Datum::Bytes(bytes)) => Ok(bytes_hash(bytes)),
            (NodeKind::String, other) => other
                .string_bytes()
                .map(string_hash)
                .ok_or_else(|| mismatch(&schema, datum)),
            (NodeKind::Int, Datum::Int(v)) => Ok(*v),
            (NodeKind::Long, Datum::Long(v)) => Ok((*v ^ ((*v as u64) >> 32) as i64) as i32),
            (NodeKind::Float, Datum::Float(v)) => Ok(v.to_bits() as i32),
            (NodeKind::Double, Datum::Double(v)) => {
                let bits = v.to_bits();
                Ok((bits ^ (bits >> 32)) as i32)
            }
            (NodeKind::Boolean, Datum::Boolean(v)) => Ok(if *v { 1231 } else { 1237 }),
            (NodeKind::Null, _) => Ok(0),
            _ => Err(mismatch(&schema, datum)),
        }
    }
}

fn string_hash(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .fold(0i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(*b as i8)))
}

fn bytes_hash(bytes: &[u8]) -> i32 {
    bytes
        .iter()
        .fold(1i32, |h, b| h.wrapping_mul(31).wrapping_add(i32::from(*b as i8)))
}

fn mismatch(schema: &Schema, datum: &Datum) -> Error {
    Error::TypeMismatch(format!(
        "Cannot hash {} as {}",
        datum.schema_name().unwrap_or_else(|| "logical value".to_string()),
        schema.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::types::{GenericRecord, LogicalValue};
    use crate::generic::GenericDataConfig;
    use crate::schema::parser::compile_json_schema;
    use std::collections::BTreeMap;

    fn schema(text: &str) -> Schema {
        compile_json_schema(text).unwrap().root().clone()
    }

    #[test]
    fn test_leaf_hashes() {
        let data = GenericData::new();
        assert_eq!(data.hash_code(&Datum::Int(7), &schema("\"int\"")).unwrap(), 7);
        assert_eq!(data.hash_code(&Datum::Boolean(true), &schema("\"boolean\"")).unwrap(), 1231);
        assert_eq!(data.hash_code(&Datum::Long(1 << 32), &schema("\"long\"")).unwrap(), 1);
        assert_eq!(data.hash_code(&Datum::from("ab"), &schema("\"string\"")).unwrap(), 31 * 97 + 98);
        assert_eq!(data.hash_code(&Datum::Null, &schema("\"null\"")).unwrap(), 0);
    }

    #[test]
    fn test_string_forms_hash_alike() {
        let data = GenericData::new();
        let s = schema("\"string\"");
        assert_eq!(
            data.hash_code(&Datum::from("héllo"), &s).unwrap(),
            data.hash_code(&Datum::utf8("héllo"), &s).unwrap()
        );
    }

    #[test]
    fn test_array_accumulator() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "array", "items": "int"}"#);
        let datum = Datum::Array(vec![Datum::Int(1), Datum::Int(2)]);
        assert_eq!(data.hash_code(&datum, &s).unwrap(), (31 + 1) * 31 + 2);
    }

    #[test]
    fn test_contribution_limit() {
        let data = GenericData::with_config(GenericDataConfig {
            hash_contribution_limit: 2,
            ..GenericDataConfig::default()
        });
        let s = schema(r#"{"type": "array", "items": "int"}"#);
        let a = Datum::Array(vec![Datum::Int(1), Datum::Int(2), Datum::Int(3)]);
        let b = Datum::Array(vec![Datum::Int(1), Datum::Int(2), Datum::Int(99)]);
        assert_eq!(data.hash_code(&a, &s).unwrap(), data.hash_code(&b, &s).unwrap());
    }

    #[test]
    fn test_nested_aggregates_share_the_accumulator() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "record", "name": "Outer", "fields": [
            {"name": "a", "type": "int"},
            {"name": "inner", "type": {"type": "record", "name": "Inner", "fields": [
                {"name": "b", "type": "int"}]}},
            {"name": "c", "type": "int"}]}"#);
        let inner_schema = s.fields().unwrap()[1].schema().clone();
        let inner = GenericRecord::new(&inner_schema).unwrap();
        inner.put("b", Datum::Int(2)).unwrap();
        let outer = GenericRecord::new(&s).unwrap();
        outer.put("a", Datum::Int(1)).unwrap();
        outer.put("inner", Datum::record(inner)).unwrap();
        outer.put("c", Datum::Int(3)).unwrap();

        // a: 31 + 1 = 32; inner runs on from 32: 31 * 32 + 2 = 994;
        // folded: 31 * 32 + 994 = 1986; c: 31 * 1986 + 3
        assert_eq!(data.hash_code(&Datum::record(outer), &s).unwrap(), 31 * 1986 + 3);
    }

    #[test]
    fn test_default_budget_allows_nine_contributions() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "array", "items": "int"}"#);
        let with = |index: usize, value: i32| {
            let mut elements = vec![Datum::Int(0); 12];
            elements[index] = Datum::Int(value);
            Datum::Array(elements)
        };
        let base = data.hash_code(&with(0, 0), &s).unwrap();
        assert_ne!(data.hash_code(&with(8, 5), &s).unwrap(), base);
        assert_eq!(data.hash_code(&with(9, 5), &s).unwrap(), base);
    }

    #[test]
    fn test_ignored_fields_do_not_contribute() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": "int"}, {"name": "b", "type": "int", "order": "ignore"}]}"#);
        let make = |b: i32| {
            let record = GenericRecord::new(&s).unwrap();
            record.put("a", Datum::Int(1)).unwrap();
            record.put("b", Datum::Int(b)).unwrap();
            Datum::record(record)
        };
        assert_eq!(data.hash_code(&make(1), &s).unwrap(), data.hash_code(&make(2), &s).unwrap());
    }

    #[test]
    fn test_map_hash_is_order_independent() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "map", "values": "long"}"#);
        let map = Datum::Map(BTreeMap::from([
            ("a".to_string(), Datum::Long(1)),
            ("b".to_string(), Datum::Long(2)),
        ]));
        let expected = (97 ^ 1) + (98 ^ 2);
        assert_eq!(data.hash_code(&map, &s).unwrap(), expected);
    }

    #[test]
    fn test_logical_values_hash_as_raw() {
        let data = GenericData::new();
        let s = schema(r#"{"type": "int", "logicalType": "date"}"#);
        let date = Datum::Logical(LogicalValue::Date(chrono::NaiveDate::from_ymd_opt(1970, 1, 4).unwrap()));
        assert_eq!(data.hash_code(&date, &s).unwrap(), 3);
    }

    #[test]
    fn test_union_hashes_branch_value() {
        let data = GenericData::new();
        let s = schema(r#"["null", "int"]"#);
        assert_eq!(data.hash_code(&Datum::Int(5), &s).unwrap(), 5);
        assert!(data.hash_code(&Datum::from("x"), &s).is_err());
    }
}
