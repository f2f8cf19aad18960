// Canonical JSON emitter for schemata
//
// Serializes a node graph back to schema JSON in canonical key order. A
// named type is written out in full the first time it is reached and as a
// name reference afterwards.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::schema::types::{CustomAttributes, Field, FieldOrder, Name, NodeKind, Schema};

/// Emits a schema as a JSON value.
pub fn to_json_value(schema: &Schema) -> Value {
    Emitter::default().emit(schema, None)
}

/// Emits a schema as JSON text, compact or pretty-printed.
pub fn to_json_string(schema: &Schema, pretty: bool) -> String {
    let value = to_json_value(schema);
    if pretty {
        format!("{:#}", value)
    } else {
        value.to_string()
    }
}

#[derive(Default)]
struct Emitter {
    emitted: HashSet<String>,
}

impl Emitter {
    fn emit(&mut self, schema: &Schema, namespace: Option<&str>) -> Value {
        match schema.node() {
            NodeKind::Record(record) => {
                if let Some(reference) = self.reference(record.name(), namespace) {
                    return reference;
                }
                let mut object = Map::new();
                let type_name = if record.is_error() { "error" } else { "record" };
                object.insert("type".into(), Value::String(type_name.into()));
                insert_name(&mut object, record.name(), namespace);
                insert_doc(&mut object, record.doc());

                let inner = record.name().namespace();
                let fields = record
                    .fields()
                    .iter()
                    .map(|field| self.emit_field(field, inner))
                    .collect();
                object.insert("fields".into(), Value::Array(fields));
                insert_aliases(&mut object, record.aliases());
                finish(object, schema)
            }
            NodeKind::Enum(node) => {
                if let Some(reference) = self.reference(node.name(), namespace) {
                    return reference;
                }
                let mut object = Map::new();
                object.insert("type".into(), Value::String("enum".into()));
                insert_name(&mut object, node.name(), namespace);
                insert_doc(&mut object, node.doc());
                let symbols = node.symbols().iter().cloned().map(Value::String).collect();
                object.insert("symbols".into(), Value::Array(symbols));
                if let Some(default) = node.default_symbol() {
                    object.insert("default".into(), Value::String(default.into()));
                }
                insert_aliases(&mut object, node.aliases());
                finish(object, schema)
            }
            NodeKind::Fixed(node) => {
                if let Some(reference) = self.reference(node.name(), namespace) {
                    return reference;
                }
                let mut object = Map::new();
                object.insert("type".into(), Value::String("fixed".into()));
                insert_name(&mut object, node.name(), namespace);
                insert_doc(&mut object, node.doc());
                object.insert("size".into(), Value::from(node.size()));
                insert_aliases(&mut object, node.aliases());
                finish(object, schema)
            }
            NodeKind::Array(items) => {
                let mut object = Map::new();
                object.insert("type".into(), Value::String("array".into()));
                object.insert("items".into(), self.emit(items, namespace));
                finish(object, schema)
            }
            NodeKind::Map(values) => {
                let mut object = Map::new();
                object.insert("type".into(), Value::String("map".into()));
                object.insert("values".into(), self.emit(values, namespace));
                finish(object, schema)
            }
            NodeKind::Union(branches) => Value::Array(
                branches
                    .iter()
                    .map(|branch| self.emit(branch, namespace))
                    .collect(),
            ),
            NodeKind::Symbolic(symbolic) => {
                let reference = Value::String(reference_name(symbolic.name(), namespace));
                wrap_if_annotated(reference, schema)
            }
            _ => {
                let primitive = Value::String(schema.kind().name().into());
                wrap_if_annotated(primitive, schema)
            }
        }
    }

    fn emit_field(&mut self, field: &Field, namespace: Option<&str>) -> Value {
        let mut object = Map::new();
        object.insert("name".into(), Value::String(field.name().into()));
        object.insert("type".into(), self.emit(field.schema(), namespace));
        if let Some(default) = field.default_value() {
            object.insert("default".into(), default.clone());
        }
        insert_doc(&mut object, field.doc());
        if field.order() != FieldOrder::Ascending {
            object.insert("order".into(), Value::String(field.order().as_str().into()));
        }
        insert_aliases(&mut object, field.aliases());
        insert_attributes(&mut object, field.attributes());
        Value::Object(object)
    }

    /// Returns a name reference when the type was already written out.
    fn reference(&mut self, name: &Name, namespace: Option<&str>) -> Option<Value> {
        if self.emitted.insert(name.fullname()) {
            None
        } else {
            Some(Value::String(reference_name(name, namespace)))
        }
    }
}

fn reference_name(name: &Name, namespace: Option<&str>) -> String {
    if name.namespace() == namespace {
        name.name().to_string()
    } else {
        name.fullname()
    }
}

fn insert_name(object: &mut Map<String, Value>, name: &Name, enclosing: Option<&str>) {
    if name.namespace() != enclosing {
        // An empty namespace resets an inherited one
        let namespace = name.namespace().unwrap_or_default();
        object.insert("namespace".into(), Value::String(namespace.into()));
    }
    object.insert("name".into(), Value::String(name.name().into()));
}

fn insert_doc(object: &mut Map<String, Value>, doc: Option<&str>) {
    if let Some(doc) = doc {
        object.insert("doc".into(), Value::String(doc.into()));
    }
}

fn insert_aliases(object: &mut Map<String, Value>, aliases: &[String]) {
    if !aliases.is_empty() {
        let aliases = aliases.iter().cloned().map(Value::String).collect();
        object.insert("aliases".into(), Value::Array(aliases));
    }
}

fn insert_attributes(object: &mut Map<String, Value>, attributes: &CustomAttributes) {
    for (key, value) in attributes.iter() {
        object.insert(key.into(), value.clone());
    }
}

/// Appends the logical type keys and custom attributes of `schema`.
fn finish(mut object: Map<String, Value>, schema: &Schema) -> Value {
    for (key, value) in schema.logical_type().json_entries() {
        object.insert(key, value);
    }
    insert_attributes(&mut object, schema.attributes());
    Value::Object(object)
}

fn wrap_if_annotated(bare: Value, schema: &Schema) -> Value {
    if schema.logical_type().is_none() && schema.attributes().is_empty() {
        return bare;
    }
    let mut object = Map::new();
    object.insert("type".into(), bare);
    finish(object, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::parser::compile_json_schema;

    fn strip(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn round_trip(text: &str) -> String {
        strip(&compile_json_schema(text).unwrap().to_json(false))
    }

    #[test]
    fn test_primitives_are_bare_strings() {
        assert_eq!(round_trip("\"null\""), "\"null\"");
        assert_eq!(round_trip(r#"{"type": "int"}"#), "\"int\"");
    }

    #[test]
    fn test_named_type_emitted_once() {
        let text = r#"{"type":"record","name":"LongList","fields":[{"name":"value","type":"long"},{"name":"next","type":["LongList","null"]}]}"#;
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn test_namespace_before_name() {
        let text = r#"{"type":"fixed","namespace":"org.apache.hadoop.avro","name":"MyFixed","size":1}"#;
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn test_inherited_namespace_is_omitted() {
        let text = r#"{"type":"record","namespace":"n","name":"R","fields":[{"name":"f","type":{"type":"enum","name":"E","symbols":["A"]}},{"name":"g","type":"E"}]}"#;
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn test_canonical_field_key_order() {
        let text = r#"{"type":"record","name":"R","fields":[{"doc":"d","type":"int","name":"f","default":1}]}"#;
        assert_eq!(
            round_trip(text),
            r#"{"type":"record","name":"R","fields":[{"name":"f","type":"int","default":1,"doc":"d"}]}"#
        );
    }

    #[test]
    fn test_pretty_matches_compact() {
        let schema = compile_json_schema(
            r#"{"type":"record","name":"R","fields":[{"name":"m","type":{"type":"map","values":"bytes"}}]}"#,
        )
        .unwrap();
        assert_eq!(strip(&schema.to_json(true)), strip(&schema.to_json(false)));
        assert!(schema.to_json(true).contains('\n'));
    }
}
