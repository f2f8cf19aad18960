// Field default materialization
//
// A default is written as a JSON literal in the schema. The engine turns it
// into a datum by encoding the literal with its codec and decoding the bytes,
// then keeps the result per field so the work happens once.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

use crate::codec::types::Datum;
use crate::generic::GenericData;
use crate::internal::error::{Error, Result};
use crate::schema::types::{Field, NodeKind, SchemaKind};

struct CacheEntry {
    field: Weak<Field>,
    value: Datum,
}

/// Materialized defaults keyed by field identity. An entry is only valid
/// while its field is alive; dead entries are swept on insert.
pub(crate) struct DefaultValueCache {
    entries: DashMap<usize, CacheEntry>,
}

impl DefaultValueCache {
    pub(crate) fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn key(field: &Arc<Field>) -> usize {
        Arc::as_ptr(field) as usize
    }

    pub(crate) fn get(&self, field: &Arc<Field>) -> Option<Datum> {
        let entry = self.entries.get(&Self::key(field))?;
        let live = entry.field.upgrade()?;
        Arc::ptr_eq(&live, field).then(|| entry.value.clone())
    }

    pub(crate) fn insert(&self, field: &Arc<Field>, value: Datum) {
        self.entries.retain(|_, entry| entry.field.strong_count() > 0);
        self.entries.insert(
            Self::key(field),
            CacheEntry {
                field: Arc::downgrade(field),
                value,
            },
        );
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl GenericData {
    /// The default value of `field` as a datum.
    ///
    /// Every call returns a fresh copy; the cached datum is never handed out.
    pub fn default_value(&self, field: &Arc<Field>) -> Result<Datum> {
        let literal = field
            .default_value()
            .ok_or_else(|| Error::MissingDefault(field.name().to_string()))?;
        let schema = field.schema().resolve()?;

        if literal.is_null() {
            let null_first = match schema.node() {
                NodeKind::Null => true,
                NodeKind::Union(branches) => branches
                    .first()
                    .map(|branch| branch.kind() == SchemaKind::Null)
                    .unwrap_or(false),
                _ => false,
            };
            if null_first {
                return Ok(Datum::Null);
            }
        }

        if let Some(cached) = self.default_cache.get(field) {
            return self.deep_copy(&schema, &cached);
        }

        let encoded = self.codec.encode(&schema, literal)?;
        let value = self.codec.decode(&schema, &encoded)?;
        debug!(field = field.name(), bytes = encoded.len(), "materialized default value");
        self.default_cache.insert(field, value.clone());
        self.deep_copy(&schema, &value)
    }

    /// Number of field defaults currently cached.
    pub fn cached_defaults(&self) -> usize {
        self.default_cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::compile_json_schema;
    use crate::schema::types::Schema;

    fn fields(text: &str) -> Vec<Arc<Field>> {
        let schema = compile_json_schema(text).unwrap();
        schema.root().fields().unwrap().to_vec()
    }

    #[test]
    fn test_defaults_are_cached_per_field() {
        let data = GenericData::new();
        let fields = fields(r#"{"type": "record", "name": "R", "fields": [
            {"name": "n", "type": "long", "default": 42},
            {"name": "tags", "type": {"type": "array", "items": "string"}, "default": ["a"]}]}"#);
        assert_eq!(data.default_value(&fields[0]).unwrap(), Datum::Long(42));
        assert_eq!(data.cached_defaults(), 1);
        assert_eq!(data.default_value(&fields[0]).unwrap(), Datum::Long(42));
        assert_eq!(data.cached_defaults(), 1);
        assert_eq!(
            data.default_value(&fields[1]).unwrap(),
            Datum::Array(vec![Datum::from("a")])
        );
        assert_eq!(data.cached_defaults(), 2);
    }

    #[test]
    fn test_null_defaults_skip_the_codec() {
        let data = GenericData::new();
        let fields = fields(r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": ["null", "string"], "default": null},
            {"name": "b", "type": "null", "default": null}]}"#);
        assert_eq!(data.default_value(&fields[0]).unwrap(), Datum::Null);
        assert_eq!(data.default_value(&fields[1]).unwrap(), Datum::Null);
        assert_eq!(data.cached_defaults(), 0);
    }

    #[test]
    fn test_union_default_uses_first_branch() {
        let data = GenericData::new();
        let fields = fields(r#"{"type": "record", "name": "R", "fields": [
            {"name": "a", "type": ["string", "null"], "default": "x"}]}"#);
        assert_eq!(data.default_value(&fields[0]).unwrap(), Datum::from("x"));
    }

    #[test]
    fn test_missing_default() {
        let data = GenericData::new();
        let field = Arc::new(Field::new("a", Schema::primitive(SchemaKind::Int).unwrap()));
        assert!(matches!(data.default_value(&field), Err(Error::MissingDefault(_))));
    }

    #[test]
    fn test_record_defaults_are_not_aliased() {
        let data = GenericData::new();
        let fields = fields(r#"{"type": "record", "name": "Outer", "fields": [
            {"name": "inner", "type": {"type": "record", "name": "Inner", "fields": [
                {"name": "v", "type": "int"}]}, "default": {"v": 1}}]}"#);
        let first = data.default_value(&fields[0]).unwrap();
        let Datum::Record(record) = &first else {
            panic!("expected a record");
        };
        record.put("v", Datum::Int(9)).unwrap();
        let second = data.default_value(&fields[0]).unwrap();
        let Datum::Record(fresh) = &second else {
            panic!("expected a record");
        };
        assert_eq!(fresh.get("v"), Some(Datum::Int(1)));
    }

    #[test]
    fn test_dead_fields_are_swept() {
        let data = GenericData::new();
        let field = Arc::new(
            Field::new("a", Schema::primitive(SchemaKind::Int).unwrap())
                .with_default(serde_json::json!(3)),
        );
        assert_eq!(data.default_value(&field).unwrap(), Datum::Int(3));
        drop(field);
        let other = Arc::new(
            Field::new("b", Schema::primitive(SchemaKind::Int).unwrap())
                .with_default(serde_json::json!(4)),
        );
        assert_eq!(data.default_value(&other).unwrap(), Datum::Int(4));
        assert_eq!(data.cached_defaults(), 1);
    }
}
