// JSON-like rendering of datums
//
// Output is meant for logs and error messages. Records that are already being
// rendered further up the stack are replaced by a sentinel, so a record that
// ends up inside itself still renders.

use std::collections::HashSet;
use std::fmt::Write;
use std::sync::Arc;

use serde_json::Value;

use crate::codec::types::{Datum, GenericRecord, LogicalValue};
use crate::generic::GenericData;
use crate::schema::utils::latin1_string;

const CIRCULAR_REFERENCE: &str = "\"<circular reference>\"";

impl GenericData {
    /// Renders `datum` as JSON-like text.
    pub fn render(&self, datum: &Datum) -> String {
        let mut renderer = Renderer::new(self.config().render_seen_capacity);
        renderer.datum(datum);
        renderer.out
    }

    pub(crate) fn render_record(&self, record: &GenericRecord) -> String {
        let mut renderer = Renderer::new(self.config().render_seen_capacity);
        renderer.record(record);
        renderer.out
    }
}

struct Renderer {
    out: String,
    seen: HashSet<usize>,
}

impl Renderer {
    fn new(capacity: usize) -> Self {
        Self {
            out: String::new(),
            seen: HashSet::with_capacity(capacity),
        }
    }

    fn quoted(&mut self, text: &str) {
        self.out.push_str(&Value::String(text.to_string()).to_string());
    }

    fn datum(&mut self, datum: &Datum) {
        match datum {
            Datum::Null => self.out.push_str("null"),
            Datum::Boolean(v) => self.out.push_str(if *v { "true" } else { "false" }),
            Datum::Int(v) => {
                let _ = write!(self.out, "{}", v);
            }
            Datum::Long(v) => {
                let _ = write!(self.out, "{}", v);
            }
            Datum::Float(v) => self.float(f64::from(*v), format!("{:?}", v)),
            Datum::Double(v) => self.float(*v, format!("{:?}", v)),
            Datum::Bytes(bytes) => self.quoted(&latin1_string(bytes)),
            Datum::String(s) => self.quoted(s),
            Datum::Utf8(bytes) => self.quoted(&String::from_utf8_lossy(bytes)),
            Datum::Enum(symbol) => self.quoted(symbol.symbol()),
            Datum::Fixed(fixed) => self.quoted(&latin1_string(fixed.bytes())),
            Datum::Logical(LogicalValue::Decimal(decimal)) => {
                let _ = write!(self.out, "{}", decimal);
            }
            Datum::Logical(value) => self.quoted(&value.to_string()),
            Datum::Array(elements) => {
                self.out.push('[');
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.datum(element);
                }
                self.out.push(']');
            }
            Datum::Map(entries) => {
                self.out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.quoted(key);
                    self.out.push_str(": ");
                    self.datum(value);
                }
                self.out.push('}');
            }
            Datum::Record(record) => self.record(Arc::as_ref(record)),
        }
    }

    fn float(&mut self, value: f64, text: String) {
        if value.is_finite() {
            self.out.push_str(&text);
        } else if value.is_nan() {
            self.out.push_str("\"NaN\"");
        } else if value > 0.0 {
            self.out.push_str("\"Infinity\"");
        } else {
            self.out.push_str("\"-Infinity\"");
        }
    }

    fn record(&mut self, record: &GenericRecord) {
        let identity = record as *const GenericRecord as usize;
        if !self.seen.insert(identity) {
            self.out.push_str(CIRCULAR_REFERENCE);
            return;
        }
        self.out.push('{');
        if let Some(fields) = record.schema().fields() {
            let values = record.values();
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.quoted(field.name());
                self.out.push_str(": ");
                match values.get(field.position()) {
                    Some(value) => self.datum(value),
                    None => self.out.push_str("null"),
                }
            }
        }
        self.out.push('}');
        self.seen.remove(&identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::types::Decimal;
    use crate::schema::parser::compile_json_schema;
    use bytes::Bytes;
    use std::collections::BTreeMap;

    #[test]
    fn test_render_scalars() {
        let data = GenericData::new();
        assert_eq!(data.render(&Datum::Null), "null");
        assert_eq!(data.render(&Datum::Double(1.0)), "1.0");
        assert_eq!(data.render(&Datum::Float(f32::NAN)), "\"NaN\"");
        assert_eq!(data.render(&Datum::Double(f64::NEG_INFINITY)), "\"-Infinity\"");
        assert_eq!(data.render(&Datum::from("a\"b")), "\"a\\\"b\"");
        assert_eq!(data.render(&Datum::Bytes(Bytes::from_static(&[0x41, 0xE9]))), "\"Aé\"");
    }

    #[test]
    fn test_render_containers() {
        let data = GenericData::new();
        let array = Datum::Array(vec![Datum::Int(1), Datum::Int(2)]);
        assert_eq!(data.render(&array), "[1, 2]");
        let map = Datum::Map(BTreeMap::from([("k".to_string(), Datum::Boolean(true))]));
        assert_eq!(data.render(&map), "{\"k\": true}");
    }

    #[test]
    fn test_render_logical_values() {
        let data = GenericData::new();
        let decimal = Datum::Logical(LogicalValue::Decimal(Decimal::new(150, 2)));
        assert_eq!(data.render(&decimal), "1.50");
        let uuid = Datum::Logical(LogicalValue::Uuid(uuid::Uuid::nil()));
        assert_eq!(data.render(&uuid), "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn test_render_record_cycle() {
        let data = GenericData::new();
        let schema = compile_json_schema(
            r#"{"type": "record", "name": "Node", "fields": [
                {"name": "value", "type": "int"},
                {"name": "next", "type": ["null", "Node"]}]}"#,
        )
        .unwrap();
        let node = Arc::new(GenericRecord::new(schema.root()).unwrap());
        node.put("value", Datum::Int(1)).unwrap();
        node.put("next", Datum::Record(node.clone())).unwrap();
        let rendered = data.render(&Datum::Record(node.clone()));
        assert_eq!(rendered, "{\"value\": 1, \"next\": \"<circular reference>\"}");
        // Break the cycle so the record can be freed
        node.put("next", Datum::Null).unwrap();
    }

    #[test]
    fn test_shared_records_are_not_cycles() {
        let data = GenericData::new();
        let schema = compile_json_schema(
            r#"{"type": "record", "name": "Leaf", "fields": [{"name": "v", "type": "int"}]}"#,
        )
        .unwrap();
        let leaf = Arc::new(GenericRecord::new(schema.root()).unwrap());
        let pair = Datum::Array(vec![Datum::Record(leaf.clone()), Datum::Record(leaf)]);
        assert_eq!(data.render(&pair), "[{\"v\": null}, {\"v\": null}]");
    }
}
