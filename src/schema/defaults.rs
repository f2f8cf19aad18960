// Default value checks for the schemata schema system
//
// A field default is kept as its literal JSON. This module decides whether
// such a literal can be encoded under a given schema, following the JSON
// conventions for defaults (bytes and fixed as ISO-8859-1 strings, records as
// objects, unions under the first branch that accepts the literal).

use serde_json::Value;

use crate::schema::types::{NodeKind, Schema};
use crate::schema::utils;

/// Returns true when `literal` is an encodable default for `schema`.
pub fn is_valid_default(schema: &Schema, literal: &Value) -> bool {
    // References to named types are followed; an unbound one accepts nothing
    let schema = match schema.resolve() {
        Ok(schema) => schema,
        Err(_) => return false,
    };

    match (schema.node(), literal) {
        (NodeKind::Null, Value::Null) => true,
        (NodeKind::Boolean, Value::Bool(_)) => true,
        (NodeKind::Int, Value::Number(n)) => n
            .as_i64()
            .map_or(false, |v| i32::try_from(v).is_ok()),
        (NodeKind::Long, Value::Number(n)) => n.is_i64(),
        // Integer literals widen to floating point
        (NodeKind::Float, Value::Number(n)) | (NodeKind::Double, Value::Number(n)) => {
            n.as_f64().is_some()
        }
        (NodeKind::String, Value::String(_)) => true,
        (NodeKind::Bytes, Value::String(s)) => utils::latin1_bytes(s).is_some(),
        (NodeKind::Fixed(fixed), Value::String(s)) => {
            utils::latin1_bytes(s).map_or(false, |bytes| bytes.len() == fixed.size())
        }
        (NodeKind::Enum(e), Value::String(s)) => e.ordinal(s).is_some(),
        (NodeKind::Array(items), Value::Array(elements)) => {
            elements.iter().all(|element| is_valid_default(items, element))
        }
        (NodeKind::Map(values), Value::Object(entries)) => {
            entries.values().all(|entry| is_valid_default(values, entry))
        }
        (NodeKind::Record(record), Value::Object(entries)) => {
            record.fields().iter().all(|field| match entries.get(field.name()) {
                Some(value) => is_valid_default(field.schema(), value),
                None => field.default_value().is_some(),
            })
        }
        (NodeKind::Union(branches), literal) => first_valid_branch(branches, literal).is_some(),
        _ => false,
    }
}

/// Index of the first union branch that accepts `literal`.
pub fn first_valid_branch(branches: &[Schema], literal: &Value) -> Option<usize> {
    branches
        .iter()
        .position(|branch| is_valid_default(branch, literal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Field, Name, SchemaKind};
    use serde_json::json;

    fn primitive(kind: SchemaKind) -> Schema {
        Schema::primitive(kind).unwrap()
    }

    #[test]
    fn test_numeric_defaults() {
        assert!(is_valid_default(&primitive(SchemaKind::Int), &json!(3)));
        assert!(!is_valid_default(&primitive(SchemaKind::Int), &json!(4_000_000_000i64)));
        assert!(is_valid_default(&primitive(SchemaKind::Long), &json!(4_000_000_000i64)));
        assert!(!is_valid_default(&primitive(SchemaKind::Long), &json!(1.5)));
        assert!(is_valid_default(&primitive(SchemaKind::Double), &json!(2)));
        assert!(is_valid_default(&primitive(SchemaKind::Float), &json!(2.5)));
    }

    #[test]
    fn test_double_rejects_null_and_string() {
        let double = primitive(SchemaKind::Double);
        assert!(!is_valid_default(&double, &json!(null)));
        assert!(!is_valid_default(&double, &json!("string")));
    }

    #[test]
    fn test_bytes_and_fixed_literals() {
        assert!(is_valid_default(&primitive(SchemaKind::Bytes), &json!("\u{00ff}")));
        assert!(!is_valid_default(&primitive(SchemaKind::Bytes), &json!("\u{0100}")));
        let fixed = Schema::fixed(Name::new("F").unwrap(), 2).unwrap();
        assert!(is_valid_default(&fixed, &json!("ab")));
        assert!(!is_valid_default(&fixed, &json!("abc")));
    }

    #[test]
    fn test_union_defaults() {
        let union = Schema::union(vec![primitive(SchemaKind::Null), primitive(SchemaKind::Long)]).unwrap();
        assert!(is_valid_default(&union, &json!(null)));
        assert!(is_valid_default(&union, &json!(5)));
        assert_eq!(first_valid_branch(union.branches().unwrap(), &json!(5)), Some(1));
        assert!(!is_valid_default(&union, &json!("x")));
    }

    #[test]
    fn test_record_defaults() {
        let record = Schema::record(
            Name::new("R").unwrap(),
            vec![
                Field::new("a", primitive(SchemaKind::Int)),
                Field::new("b", primitive(SchemaKind::String)).with_default(json!("x")),
            ],
        )
        .unwrap();
        assert!(is_valid_default(&record, &json!({"a": 1})));
        assert!(!is_valid_default(&record, &json!({"b": "y"})));
        assert!(!is_valid_default(&record, &json!({"a": "1"})));
    }
}
