// JSON schema compiler for schemata
//
// This module compiles schema JSON into a `ValidSchema`. Parsing is a
// recursive descent on the "type" discriminator; named types are declared
// before their bodies are parsed so that they may refer to themselves.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::debug;

use crate::internal::error::{Error, Result};
use crate::schema::logical::{self, LogicalType};
use crate::schema::types::{
    CustomAttributes, EnumNode, Field, FieldOrder, FixedNode, Name, NodeKind, RecordNode, Schema,
    SchemaKind,
};
use crate::schema::validator::ValidSchema;

const RECORD_KEYS: &[&str] = &["type", "name", "namespace", "doc", "fields", "aliases"];
const ENUM_KEYS: &[&str] = &["type", "name", "namespace", "doc", "symbols", "default", "aliases"];
const FIXED_KEYS: &[&str] = &["type", "name", "namespace", "doc", "size", "aliases"];
const ARRAY_KEYS: &[&str] = &["type", "items"];
const MAP_KEYS: &[&str] = &["type", "values"];
const PRIMITIVE_KEYS: &[&str] = &["type"];
const FIELD_KEYS: &[&str] = &["name", "type", "default", "doc", "order", "aliases"];

/// Configuration for the schema compiler
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Whether field defaults are checked against their field types
    pub validate_defaults: bool,

    /// Maximum nesting depth of the schema document
    pub max_nesting_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            validate_defaults: true,
            max_nesting_depth: 64,
        }
    }
}

/// Compiler from schema JSON to a validated node graph
#[derive(Debug, Default)]
pub struct SchemaParser {
    config: ParserConfig,
}

/// Names declared so far while compiling one document.
#[derive(Default)]
struct ParseContext {
    declared: HashSet<String>,
}

impl ParseContext {
    fn declare(&mut self, name: &Name) -> bool {
        self.declared.insert(name.fullname())
    }

    /// Resolves a reference relative to the enclosing namespace, then as given.
    fn lookup(&self, reference: &str, namespace: Option<&str>) -> Option<String> {
        if !reference.contains('.') {
            if let Some(ns) = namespace.filter(|ns| !ns.is_empty()) {
                let qualified = format!("{}.{}", ns, reference);
                if self.declared.contains(&qualified) {
                    return Some(qualified);
                }
            }
        }
        self.declared
            .contains(reference)
            .then(|| reference.to_string())
    }
}

impl SchemaParser {
    /// Creates a compiler with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a compiler with a custom configuration
    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Compiles schema JSON text
    pub fn parse_str(&self, text: &str) -> Result<ValidSchema> {
        let json: Value = serde_json::from_str(text)?;
        self.parse_value(&json)
    }

    /// Compiles an already parsed JSON document
    pub fn parse_value(&self, json: &Value) -> Result<ValidSchema> {
        let mut context = ParseContext::default();
        let root = self.parse_node(json, None, 0, &mut context)?;
        let valid = ValidSchema::with_default_check(root, self.config.validate_defaults)?;
        debug!(
            root = %valid.root().type_name(),
            named_types = context.declared.len(),
            "schema compiled"
        );
        Ok(valid)
    }

    fn parse_node(
        &self,
        json: &Value,
        namespace: Option<&str>,
        depth: usize,
        context: &mut ParseContext,
    ) -> Result<Schema> {
        if depth > self.config.max_nesting_depth {
            return Err(Error::parse(format!(
                "Schema nesting exceeds the maximum depth of {}",
                self.config.max_nesting_depth
            )));
        }

        match json {
            Value::String(name) => self.parse_reference(name, namespace, context, json),
            Value::Array(branches) => {
                let branches = branches
                    .iter()
                    .map(|branch| self.parse_node(branch, namespace, depth + 1, context))
                    .collect::<Result<Vec<_>>>()?;
                Schema::union(branches).map_err(|err| err.with_fragment(json))
            }
            Value::Object(object) => self.parse_object(object, json, namespace, depth, context),
            other => Err(Error::parse_at(
                "Schema must be a string, an array or an object",
                other,
            )),
        }
    }

    /// Bare string: a primitive or a reference to an already declared name.
    fn parse_reference(
        &self,
        name: &str,
        namespace: Option<&str>,
        context: &ParseContext,
        json: &Value,
    ) -> Result<Schema> {
        if let Some(kind) = SchemaKind::primitive(name) {
            return Schema::primitive(kind);
        }
        let fullname = context
            .lookup(name, namespace)
            .ok_or_else(|| Error::validation_at(format!("Undefined name: '{}'", name), json))?;
        Ok(Schema::symbolic(Name::new(&fullname)?))
    }

    fn parse_object(
        &self,
        object: &Map<String, Value>,
        json: &Value,
        namespace: Option<&str>,
        depth: usize,
        context: &mut ParseContext,
    ) -> Result<Schema> {
        let type_name = match object.get("type") {
            Some(Value::String(type_name)) => type_name.as_str(),
            // {"type": [..]} and {"type": {..}} wrap another schema
            Some(inner @ (Value::Array(_) | Value::Object(_))) if object.len() == 1 => {
                return self.parse_node(inner, namespace, depth + 1, context);
            }
            Some(_) => return Err(Error::parse_at("\"type\" must be a string", json)),
            None => return Err(Error::parse_at("Missing \"type\"", json)),
        };

        match type_name {
            "record" | "error" => {
                self.parse_record(object, json, namespace, depth, context, type_name == "error")
            }
            "enum" => self.parse_enum(object, json, namespace, context),
            "fixed" => self.parse_fixed(object, json, namespace, context),
            "array" => {
                let items = required(object, "items", json)?;
                let items = self.parse_node(items, namespace, depth + 1, context)?;
                finish(NodeKind::Array(items), object, ARRAY_KEYS, json)
            }
            "map" => {
                let values = required(object, "values", json)?;
                let values = self.parse_node(values, namespace, depth + 1, context)?;
                finish(NodeKind::Map(values), object, MAP_KEYS, json)
            }
            other => match SchemaKind::primitive(other).and_then(NodeKind::primitive) {
                Some(kind) => finish(kind, object, PRIMITIVE_KEYS, json),
                None => {
                    // {"type": "SomeName", ...} refers to a declared type
                    let reference = self.parse_reference(other, namespace, context, json)?;
                    if object.len() == 1 {
                        return Ok(reference);
                    }
                    finish(reference.node().clone(), object, PRIMITIVE_KEYS, json)
                }
            },
        }
    }

    fn parse_record(
        &self,
        object: &Map<String, Value>,
        json: &Value,
        namespace: Option<&str>,
        depth: usize,
        context: &mut ParseContext,
        is_error: bool,
    ) -> Result<Schema> {
        let name = declare_name(object, json, namespace, context)?;
        let fields_json = match object.get("fields") {
            Some(Value::Array(fields)) => fields,
            Some(_) => return Err(Error::parse_at("\"fields\" must be an array", json)),
            None => return Err(Error::parse_at("Record is missing \"fields\"", json)),
        };

        // Fields resolve names against the record's own namespace
        let record_namespace = name.namespace().map(str::to_string);
        let mut fields = Vec::with_capacity(fields_json.len());
        for field_json in fields_json {
            fields.push(self.parse_field(field_json, record_namespace.as_deref(), depth + 1, context)?);
        }

        let mut record = RecordNode::new(name, fields).map_err(|err| err.with_fragment(json))?;
        if let Some(doc) = optional_string(object, "doc", json)? {
            record = record.with_doc(doc);
        }
        let aliases = parse_aliases(object, json)?;
        if !aliases.is_empty() {
            record = record.with_aliases(aliases);
        }
        if is_error {
            record = record.as_error();
        }
        finish(NodeKind::Record(record), object, RECORD_KEYS, json)
    }

    fn parse_field(
        &self,
        json: &Value,
        namespace: Option<&str>,
        depth: usize,
        context: &mut ParseContext,
    ) -> Result<Field> {
        let object = json
            .as_object()
            .ok_or_else(|| Error::parse_at("Record field must be an object", json))?;
        let name = match object.get("name") {
            Some(Value::String(name)) => name,
            Some(_) => return Err(Error::parse_at("Field \"name\" must be a string", json)),
            None => return Err(Error::parse_at("Field is missing \"name\"", json)),
        };
        let field_type = required(object, "type", json)?;
        let schema = self.parse_node(field_type, namespace, depth + 1, context)?;

        let mut field = Field::new(name.clone(), schema);
        if let Some(default) = object.get("default") {
            // Kept as the literal; checked once all names are bound
            field = field.with_default(default.clone());
        }
        if let Some(doc) = optional_string(object, "doc", json)? {
            field = field.with_doc(doc);
        }
        if let Some(order) = optional_string(object, "order", json)? {
            let order = FieldOrder::parse(&order).ok_or_else(|| {
                Error::parse_at(format!("Unknown field order '{}'", order), json)
            })?;
            field = field.with_order(order);
        }
        let aliases = parse_aliases(object, json)?;
        if !aliases.is_empty() {
            field = field.with_aliases(aliases);
        }
        Ok(field.with_attributes(collect_attributes(object, FIELD_KEYS, &[])))
    }

    fn parse_enum(
        &self,
        object: &Map<String, Value>,
        json: &Value,
        namespace: Option<&str>,
        context: &mut ParseContext,
    ) -> Result<Schema> {
        let name = declare_name(object, json, namespace, context)?;
        let symbols = match object.get("symbols") {
            Some(Value::Array(symbols)) => symbols
                .iter()
                .map(|symbol| {
                    symbol
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| Error::parse_at("Enum symbols must be strings", json))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => return Err(Error::parse_at("\"symbols\" must be an array", json)),
            None => return Err(Error::parse_at("Enum is missing \"symbols\"", json)),
        };

        let mut node = EnumNode::new(name, symbols).map_err(|err| err.with_fragment(json))?;
        if let Some(default) = optional_string(object, "default", json)? {
            node = node.with_default(default).map_err(|err| err.with_fragment(json))?;
        }
        if let Some(doc) = optional_string(object, "doc", json)? {
            node = node.with_doc(doc);
        }
        let aliases = parse_aliases(object, json)?;
        if !aliases.is_empty() {
            node = node.with_aliases(aliases);
        }
        finish(NodeKind::Enum(node), object, ENUM_KEYS, json)
    }

    fn parse_fixed(
        &self,
        object: &Map<String, Value>,
        json: &Value,
        namespace: Option<&str>,
        context: &mut ParseContext,
    ) -> Result<Schema> {
        let name = declare_name(object, json, namespace, context)?;
        let size = match object.get("size") {
            Some(Value::Number(size)) => size
                .as_u64()
                .and_then(|size| usize::try_from(size).ok())
                .ok_or_else(|| Error::parse_at("Fixed \"size\" must be a non-negative integer", json))?,
            Some(_) => return Err(Error::parse_at("Fixed \"size\" must be a number", json)),
            None => return Err(Error::parse_at("Fixed is missing \"size\"", json)),
        };

        let mut node = FixedNode::new(name, size).map_err(|err| err.with_fragment(json))?;
        if let Some(doc) = optional_string(object, "doc", json)? {
            node = node.with_doc(doc);
        }
        let aliases = parse_aliases(object, json)?;
        if !aliases.is_empty() {
            node = node.with_aliases(aliases);
        }
        finish(NodeKind::Fixed(node), object, FIXED_KEYS, json)
    }
}

/// Compiles schema JSON text with the default configuration.
pub fn compile_json_schema(text: &str) -> Result<ValidSchema> {
    SchemaParser::new().parse_str(text)
}

/// Reads and declares the name of a record, enum or fixed.
fn declare_name(
    object: &Map<String, Value>,
    json: &Value,
    enclosing: Option<&str>,
    context: &mut ParseContext,
) -> Result<Name> {
    let name = match object.get("name") {
        Some(Value::String(name)) => name,
        Some(_) => return Err(Error::parse_at("\"name\" must be a string", json)),
        None => return Err(Error::parse_at("Missing \"name\"", json)),
    };
    let namespace = match object.get("namespace") {
        Some(Value::String(namespace)) => Some(namespace.as_str()),
        Some(Value::Null) | None => enclosing,
        Some(_) => return Err(Error::parse_at("\"namespace\" must be a string", json)),
    };
    let name = Name::with_namespace(name, namespace).map_err(|err| err.with_fragment(json))?;
    if !context.declare(&name) {
        return Err(Error::validation_at(
            format!("Type '{}' is already defined", name),
            json,
        ));
    }
    Ok(name)
}

/// Applies the logical type annotation and captures the remaining keys.
fn finish(
    kind: NodeKind,
    object: &Map<String, Value>,
    reserved: &[&str],
    json: &Value,
) -> Result<Schema> {
    let resolved = logical::resolve_annotation(object, &kind).map_err(|err| err.with_fragment(json))?;
    let (logical_type, consumed) = match resolved {
        Some(resolved) => (resolved.logical_type, resolved.consumed),
        None => (LogicalType::none(), Vec::new()),
    };
    let attributes = collect_attributes(object, reserved, &consumed);
    Schema::with_metadata(kind, logical_type, attributes).map_err(|err| err.with_fragment(json))
}

fn collect_attributes(
    object: &Map<String, Value>,
    reserved: &[&str],
    consumed: &[String],
) -> CustomAttributes {
    let mut attributes = CustomAttributes::new();
    for (key, value) in object {
        if reserved.contains(&key.as_str()) || consumed.iter().any(|c| c == key) {
            continue;
        }
        attributes.add(key.clone(), value.clone());
    }
    attributes
}

fn required<'a>(object: &'a Map<String, Value>, key: &str, json: &Value) -> Result<&'a Value> {
    object
        .get(key)
        .ok_or_else(|| Error::parse_at(format!("Missing \"{}\"", key), json))
}

fn optional_string(object: &Map<String, Value>, key: &str, json: &Value) -> Result<Option<String>> {
    match object.get(key) {
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(Error::parse_at(format!("\"{}\" must be a string", key), json)),
        None => Ok(None),
    }
}

fn parse_aliases(object: &Map<String, Value>, json: &Value) -> Result<Vec<String>> {
    match object.get("aliases") {
        Some(Value::Array(aliases)) => aliases
            .iter()
            .map(|alias| {
                alias
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::parse_at("Aliases must be strings", json))
            })
            .collect(),
        Some(_) => Err(Error::parse_at("\"aliases\" must be an array", json)),
        None => Ok(Vec::new()),
    }
}
