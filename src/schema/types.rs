// Type node graph for the schemata schema language
//
// A compiled schema is a tree of immutable nodes shared through `Arc`.
// Named types (record, enum, fixed) may be referenced again further down the
// tree, including from inside themselves; such references are symbolic nodes
// holding a name and a weak link to the definition, so the graph never owns
// a cycle.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde_json::Value;

use crate::internal::error::{Error, Result};
use crate::schema::logical::LogicalType;
use crate::schema::utils;

/// The closed set of node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record,
    Enum,
    Array,
    Map,
    Fixed,
    Union,
    Symbolic,
}

impl SchemaKind {
    /// The name used for this kind in schema JSON.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Null => "null",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Float => "float",
            SchemaKind::Double => "double",
            SchemaKind::Bytes => "bytes",
            SchemaKind::String => "string",
            SchemaKind::Record => "record",
            SchemaKind::Enum => "enum",
            SchemaKind::Array => "array",
            SchemaKind::Map => "map",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Union => "union",
            SchemaKind::Symbolic => "symbolic",
        }
    }

    /// Looks up a primitive kind by its JSON name.
    pub fn primitive(name: &str) -> Option<SchemaKind> {
        match name {
            "null" => Some(SchemaKind::Null),
            "boolean" => Some(SchemaKind::Boolean),
            "int" => Some(SchemaKind::Int),
            "long" => Some(SchemaKind::Long),
            "float" => Some(SchemaKind::Float),
            "double" => Some(SchemaKind::Double),
            "bytes" => Some(SchemaKind::Bytes),
            "string" => Some(SchemaKind::String),
            _ => None,
        }
    }

    /// Returns true for the eight primitive kinds.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Float
                | SchemaKind::Double
                | SchemaKind::Bytes
                | SchemaKind::String
        )
    }

    /// Returns true for kinds that carry a name (record, enum, fixed).
    pub fn is_named(&self) -> bool {
        matches!(self, SchemaKind::Record | SchemaKind::Enum | SchemaKind::Fixed)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of a named type: simple name plus optional namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    name: String,
    namespace: Option<String>,
}

impl Name {
    /// Parses a possibly dotted name; the part before the last dot becomes the namespace.
    pub fn new(name: &str) -> Result<Self> {
        Self::with_namespace(name, None)
    }

    /// Builds a name, using `namespace` only when `name` itself is not dotted.
    ///
    /// An empty namespace is the same as no namespace.
    pub fn with_namespace(name: &str, namespace: Option<&str>) -> Result<Self> {
        let (simple, space) = match name.rfind('.') {
            Some(idx) => (&name[idx + 1..], Some(&name[..idx])),
            None => (name, namespace),
        };
        if !utils::is_valid_simple_name(simple) {
            return Err(Error::validation(format!("Invalid name: '{}'", name)));
        }
        if SchemaKind::primitive(simple).is_some() && space.map_or(true, str::is_empty) {
            return Err(Error::validation(format!(
                "Primitive type name '{}' cannot be redefined",
                simple
            )));
        }
        let namespace = match space {
            Some(ns) if !ns.is_empty() => {
                if !utils::is_valid_namespace(ns) {
                    return Err(Error::validation(format!("Invalid namespace: '{}'", ns)));
                }
                Some(ns.to_string())
            }
            _ => None,
        };
        Ok(Self {
            name: simple.to_string(),
            namespace,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns `namespace.name`, or just the name when there is no namespace.
    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}.{}", ns, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fullname())
    }
}

/// Ordered, lexically preserved custom attributes attached to a node or field.
///
/// Values are kept as parsed JSON, so `1` and `"1"` stay distinct through
/// compile and emission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomAttributes {
    entries: Vec<(String, Value)>,
}

impl CustomAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute, replacing an existing value in place.
    pub fn add(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Returns the attribute as text: string contents unquoted, anything else
    /// in its JSON form.
    pub fn get_lexical(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Sort order of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldOrder {
    #[default]
    Ascending,
    Descending,
    Ignore,
}

impl FieldOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOrder::Ascending => "ascending",
            FieldOrder::Descending => "descending",
            FieldOrder::Ignore => "ignore",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ascending" => Some(FieldOrder::Ascending),
            "descending" => Some(FieldOrder::Descending),
            "ignore" => Some(FieldOrder::Ignore),
            _ => None,
        }
    }
}

/// A field of a record.
///
/// Fields are shared as `Arc<Field>`; the address of that allocation is the
/// identity used to memoize materialized defaults.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    schema: Schema,
    default: Option<Value>,
    doc: Option<String>,
    order: FieldOrder,
    aliases: Vec<String>,
    attributes: CustomAttributes,
    position: usize,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            default: None,
            doc: None,
            order: FieldOrder::Ascending,
            aliases: Vec::new(),
            attributes: CustomAttributes::new(),
            position: 0,
        }
    }

    /// Sets the literal JSON default. It is checked when the enclosing schema is validated.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_order(mut self, order: FieldOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.add(key, value);
        self
    }

    pub fn with_attributes(mut self, attributes: CustomAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn order(&self) -> FieldOrder {
        self.order
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn attributes(&self) -> &CustomAttributes {
        &self.attributes
    }

    /// Index of this field within its record.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.position == other.position
            && self.order == other.order
            && self.default == other.default
            && self.doc == other.doc
            && self.aliases == other.aliases
            && self.attributes == other.attributes
            && self.schema == other.schema
    }
}

/// Record (or error) definition.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordNode {
    name: Name,
    doc: Option<String>,
    aliases: Vec<String>,
    fields: Vec<Arc<Field>>,
    is_error: bool,
}

impl RecordNode {
    /// Creates a record; field names must be unique.
    pub fn new(name: Name, fields: Vec<Field>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut shared = Vec::with_capacity(fields.len());
        for (position, mut field) in fields.into_iter().enumerate() {
            if !seen.insert(field.name.clone()) {
                return Err(Error::validation(format!(
                    "Duplicate field '{}' in record '{}'",
                    field.name, name
                )));
            }
            field.position = position;
            shared.push(Arc::new(field));
        }
        Ok(Self {
            name,
            doc: None,
            aliases: Vec::new(),
            fields: shared,
            is_error: false,
        })
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Marks the record as an error type (`"type": "error"`).
    pub fn as_error(mut self) -> Self {
        self.is_error = true;
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn fields(&self) -> &[Arc<Field>] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Arc<Field>> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

/// Enum definition.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumNode {
    name: Name,
    doc: Option<String>,
    aliases: Vec<String>,
    symbols: Vec<String>,
    default: Option<String>,
}

impl EnumNode {
    /// Creates an enum; symbols must be unique and non-empty.
    pub fn new(name: Name, symbols: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::new();
        for symbol in &symbols {
            if symbol.is_empty() {
                return Err(Error::validation(format!("Empty symbol in enum '{}'", name)));
            }
            if !seen.insert(symbol.as_str()) {
                return Err(Error::validation(format!(
                    "Duplicate symbol '{}' in enum '{}'",
                    symbol, name
                )));
            }
        }
        Ok(Self {
            name,
            doc: None,
            aliases: Vec::new(),
            symbols,
            default: None,
        })
    }

    /// Sets the enum default, which must be one of the symbols.
    pub fn with_default(mut self, symbol: impl Into<String>) -> Result<Self> {
        let symbol = symbol.into();
        if !self.symbols.contains(&symbol) {
            return Err(Error::validation(format!(
                "Enum default '{}' is not a symbol of '{}'",
                symbol, self.name
            )));
        }
        self.default = Some(symbol);
        Ok(self)
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn default_symbol(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Declaration index of a symbol.
    pub fn ordinal(&self, symbol: &str) -> Option<usize> {
        self.symbols.iter().position(|s| s == symbol)
    }
}

/// Fixed-size binary definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedNode {
    name: Name,
    doc: Option<String>,
    aliases: Vec<String>,
    size: usize,
}

impl FixedNode {
    pub fn new(name: Name, size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::validation(format!(
                "Fixed '{}' must have a positive size",
                name
            )));
        }
        Ok(Self {
            name,
            doc: None,
            aliases: Vec::new(),
            size,
        })
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// A by-name reference to a named type.
///
/// The link is set once, when the enclosing `ValidSchema` is built, and never
/// keeps its target alive.
#[derive(Debug)]
pub struct SymbolicNode {
    name: Name,
    target: OnceLock<Weak<Node>>,
}

impl SymbolicNode {
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    pub(crate) fn bind(&self, target: &Schema) -> Result<()> {
        let weak = Arc::downgrade(&target.0);
        if let Err(weak) = self.target.set(weak) {
            let current = self.target.get().map(Weak::as_ptr);
            if current != Some(weak.as_ptr()) {
                return Err(Error::validation(format!(
                    "Reference '{}' is already bound to another definition",
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn resolve(&self) -> Result<Schema> {
        self.target
            .get()
            .and_then(Weak::upgrade)
            .map(Schema)
            .ok_or_else(|| Error::validation(format!("Unresolved reference to '{}'", self.name)))
    }
}

impl Clone for SymbolicNode {
    fn clone(&self) -> Self {
        let target = OnceLock::new();
        if let Some(weak) = self.target.get() {
            let _ = target.set(weak.clone());
        }
        Self {
            name: self.name.clone(),
            target,
        }
    }
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Record(RecordNode),
    Enum(EnumNode),
    Array(Schema),
    Map(Schema),
    Fixed(FixedNode),
    Union(Vec<Schema>),
    Symbolic(SymbolicNode),
}

impl NodeKind {
    pub fn kind(&self) -> SchemaKind {
        match self {
            NodeKind::Null => SchemaKind::Null,
            NodeKind::Boolean => SchemaKind::Boolean,
            NodeKind::Int => SchemaKind::Int,
            NodeKind::Long => SchemaKind::Long,
            NodeKind::Float => SchemaKind::Float,
            NodeKind::Double => SchemaKind::Double,
            NodeKind::Bytes => SchemaKind::Bytes,
            NodeKind::String => SchemaKind::String,
            NodeKind::Record(_) => SchemaKind::Record,
            NodeKind::Enum(_) => SchemaKind::Enum,
            NodeKind::Array(_) => SchemaKind::Array,
            NodeKind::Map(_) => SchemaKind::Map,
            NodeKind::Fixed(_) => SchemaKind::Fixed,
            NodeKind::Union(_) => SchemaKind::Union,
            NodeKind::Symbolic(_) => SchemaKind::Symbolic,
        }
    }

    pub(crate) fn primitive(kind: SchemaKind) -> Option<NodeKind> {
        match kind {
            SchemaKind::Null => Some(NodeKind::Null),
            SchemaKind::Boolean => Some(NodeKind::Boolean),
            SchemaKind::Int => Some(NodeKind::Int),
            SchemaKind::Long => Some(NodeKind::Long),
            SchemaKind::Float => Some(NodeKind::Float),
            SchemaKind::Double => Some(NodeKind::Double),
            SchemaKind::Bytes => Some(NodeKind::Bytes),
            SchemaKind::String => Some(NodeKind::String),
            _ => None,
        }
    }
}

/// One vertex of the schema graph.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    logical_type: LogicalType,
    attributes: CustomAttributes,
}

/// Shared handle to an immutable schema node.
#[derive(Debug, Clone)]
pub struct Schema(Arc<Node>);

impl Schema {
    /// Wraps a node payload with no logical type and no attributes.
    pub fn new(kind: NodeKind) -> Self {
        Schema(Arc::new(Node {
            kind,
            logical_type: LogicalType::none(),
            attributes: CustomAttributes::new(),
        }))
    }

    /// Wraps a node payload with a logical type and custom attributes.
    ///
    /// The logical type must be applicable to the node kind.
    pub fn with_metadata(
        kind: NodeKind,
        logical_type: LogicalType,
        attributes: CustomAttributes,
    ) -> Result<Self> {
        logical_type.check_applicable(&kind)?;
        Ok(Schema(Arc::new(Node {
            kind,
            logical_type,
            attributes,
        })))
    }

    pub fn primitive(kind: SchemaKind) -> Result<Self> {
        NodeKind::primitive(kind)
            .map(Schema::new)
            .ok_or_else(|| Error::TypeMismatch(format!("'{}' is not a primitive type", kind)))
    }

    pub fn record(name: Name, fields: Vec<Field>) -> Result<Self> {
        Ok(Schema::new(NodeKind::Record(RecordNode::new(name, fields)?)))
    }

    pub fn enumeration(name: Name, symbols: Vec<String>) -> Result<Self> {
        Ok(Schema::new(NodeKind::Enum(EnumNode::new(name, symbols)?)))
    }

    pub fn fixed(name: Name, size: usize) -> Result<Self> {
        Ok(Schema::new(NodeKind::Fixed(FixedNode::new(name, size)?)))
    }

    pub fn array(items: Schema) -> Self {
        Schema::new(NodeKind::Array(items))
    }

    pub fn map(values: Schema) -> Self {
        Schema::new(NodeKind::Map(values))
    }

    /// Creates a union. Branches may not be unions and their type names must be distinct.
    pub fn union(branches: Vec<Schema>) -> Result<Self> {
        check_union_branches(&branches)?;
        Ok(Schema::new(NodeKind::Union(branches)))
    }

    /// Creates an unbound reference to a named type.
    pub fn symbolic(name: Name) -> Self {
        Schema::new(NodeKind::Symbolic(SymbolicNode {
            name,
            target: OnceLock::new(),
        }))
    }

    pub fn node(&self) -> &NodeKind {
        &self.0.kind
    }

    pub fn kind(&self) -> SchemaKind {
        self.0.kind.kind()
    }

    pub fn logical_type(&self) -> &LogicalType {
        &self.0.logical_type
    }

    pub fn attributes(&self) -> &CustomAttributes {
        &self.0.attributes
    }

    /// Name of a named type or of the type a symbolic node refers to.
    pub fn name(&self) -> Option<&Name> {
        match &self.0.kind {
            NodeKind::Record(r) => Some(&r.name),
            NodeKind::Enum(e) => Some(&e.name),
            NodeKind::Fixed(f) => Some(&f.name),
            NodeKind::Symbolic(s) => Some(&s.name),
            _ => None,
        }
    }

    /// The name a datum of this type is matched by inside a union: the full name
    /// of named types, the kind name otherwise.
    pub fn type_name(&self) -> String {
        match self.name() {
            Some(name) => name.fullname(),
            None => self.kind().name().to_string(),
        }
    }

    /// Follows a symbolic reference to its definition; any other node is returned as is.
    pub fn resolve(&self) -> Result<Schema> {
        match &self.0.kind {
            NodeKind::Symbolic(s) => s.resolve(),
            _ => Ok(self.clone()),
        }
    }

    pub fn as_record(&self) -> Option<&RecordNode> {
        match &self.0.kind {
            NodeKind::Record(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumNode> {
        match &self.0.kind {
            NodeKind::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_fixed(&self) -> Option<&FixedNode> {
        match &self.0.kind {
            NodeKind::Fixed(f) => Some(f),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[Arc<Field>]> {
        self.as_record().map(RecordNode::fields)
    }

    pub fn items(&self) -> Option<&Schema> {
        match &self.0.kind {
            NodeKind::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn values(&self) -> Option<&Schema> {
        match &self.0.kind {
            NodeKind::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn branches(&self) -> Option<&[Schema]> {
        match &self.0.kind {
            NodeKind::Union(branches) => Some(branches),
            _ => None,
        }
    }

    /// Index of the union branch whose type name is `type_name`.
    pub fn branch_index_named(&self, type_name: &str) -> Option<usize> {
        self.branches()?
            .iter()
            .position(|branch| branch.type_name() == type_name)
    }

    /// Returns true when both handles point at the same node.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Serializes the schema to canonical JSON.
    pub fn to_json(&self, pretty: bool) -> String {
        crate::schema::emitter::to_json_string(self, pretty)
    }
}

fn check_union_branches(branches: &[Schema]) -> Result<()> {
    let mut seen = HashSet::new();
    for branch in branches {
        if branch.kind() == SchemaKind::Union {
            return Err(Error::validation("Unions may not immediately contain other unions"));
        }
        let type_name = branch.type_name();
        if !seen.insert(type_name.clone()) {
            return Err(Error::validation(format!(
                "Duplicate type '{}' in union",
                type_name
            )));
        }
    }
    Ok(())
}

impl PartialEq for Schema {
    /// Structural equality. Symbolic references compare by name, which keeps
    /// comparison of self-referential schemas finite.
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.0.logical_type != other.0.logical_type || self.0.attributes != other.0.attributes {
            return false;
        }
        match (&self.0.kind, &other.0.kind) {
            (NodeKind::Record(a), NodeKind::Record(b)) => a == b,
            (NodeKind::Enum(a), NodeKind::Enum(b)) => a == b,
            (NodeKind::Fixed(a), NodeKind::Fixed(b)) => a == b,
            (NodeKind::Array(a), NodeKind::Array(b)) => a == b,
            (NodeKind::Map(a), NodeKind::Map(b)) => a == b,
            (NodeKind::Union(a), NodeKind::Union(b)) => a == b,
            (NodeKind::Symbolic(a), NodeKind::Symbolic(b)) => a.name == b.name,
            (a, b) => a.kind() == b.kind() && a.kind().is_primitive(),
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long() -> Schema {
        Schema::primitive(SchemaKind::Long).unwrap()
    }

    #[test]
    fn test_name_splits_dotted_names() {
        let name = Name::new("org.example.Thing").unwrap();
        assert_eq!(name.name(), "Thing");
        assert_eq!(name.namespace(), Some("org.example"));
        assert_eq!(name.fullname(), "org.example.Thing");

        let name = Name::with_namespace("Thing", Some("a.b$")).unwrap();
        assert_eq!(name.fullname(), "a.b$.Thing");

        let name = Name::with_namespace("Thing", Some("")).unwrap();
        assert_eq!(name.namespace(), None);
    }

    #[test]
    fn test_name_rejects_primitive_and_empty() {
        assert!(Name::new("int").is_err());
        assert!(Name::new("").is_err());
        assert!(Name::new("a..B").is_err());
    }

    #[test]
    fn test_record_rejects_duplicate_fields() {
        let fields = vec![Field::new("f", long()), Field::new("f", long())];
        assert!(Schema::record(Name::new("R").unwrap(), fields).is_err());
    }

    #[test]
    fn test_record_assigns_positions() {
        let schema = Schema::record(
            Name::new("R").unwrap(),
            vec![Field::new("a", long()), Field::new("b", long())],
        )
        .unwrap();
        let fields = schema.fields().unwrap();
        assert_eq!(fields[0].position(), 0);
        assert_eq!(fields[1].position(), 1);
        assert_eq!(schema.as_record().unwrap().field("b").unwrap().name(), "b");
    }

    #[test]
    fn test_enum_invariants() {
        let name = Name::new("E").unwrap();
        assert!(Schema::enumeration(name.clone(), vec!["AA".into(), "AA".into()]).is_err());
        assert!(Schema::enumeration(name.clone(), vec!["".into()]).is_err());
        let node = EnumNode::new(name, vec!["A".into(), "B".into()]).unwrap();
        assert_eq!(node.ordinal("B"), Some(1));
        assert!(node.clone().with_default("C").is_err());
        assert_eq!(node.with_default("A").unwrap().default_symbol(), Some("A"));
    }

    #[test]
    fn test_fixed_requires_positive_size() {
        assert!(Schema::fixed(Name::new("F").unwrap(), 0).is_err());
        assert_eq!(Schema::fixed(Name::new("F").unwrap(), 4).unwrap().as_fixed().unwrap().size(), 4);
    }

    #[test]
    fn test_union_rules() {
        let array_long = Schema::array(long());
        let array_string = Schema::array(Schema::primitive(SchemaKind::String).unwrap());
        assert!(Schema::union(vec![array_long.clone(), array_string]).is_err());
        assert!(Schema::union(vec![long(), long()]).is_err());

        let inner = Schema::union(vec![long()]).unwrap();
        assert!(Schema::union(vec![inner]).is_err());

        let ok = Schema::union(vec![Schema::primitive(SchemaKind::Null).unwrap(), long(), array_long])
            .unwrap();
        assert_eq!(ok.branch_index_named("long"), Some(1));
        assert_eq!(ok.branch_index_named("array"), Some(2));
        assert_eq!(ok.branch_index_named("map"), None);
    }

    #[test]
    fn test_unbound_symbolic_does_not_resolve() {
        let reference = Schema::symbolic(Name::new("Missing").unwrap());
        assert_eq!(reference.type_name(), "Missing");
        assert!(reference.resolve().is_err());
    }

    #[test]
    fn test_structural_equality() {
        let a = Schema::array(long());
        let b = Schema::array(long());
        assert_eq!(a, b);
        assert_ne!(a, Schema::map(long()));
    }

    #[test]
    fn test_custom_attributes_lexical_form() {
        let mut attrs = CustomAttributes::new();
        attrs.add("int_key", serde_json::json!(1));
        attrs.add("str_key", serde_json::json!("1"));
        assert_eq!(attrs.get_lexical("int_key").unwrap(), "1");
        assert_eq!(attrs.get_lexical("str_key").unwrap(), "1");
        assert_ne!(attrs.get("int_key"), attrs.get("str_key"));
        attrs.add("int_key", serde_json::json!(2));
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs.iter().next().unwrap().0, "int_key");
    }
}
