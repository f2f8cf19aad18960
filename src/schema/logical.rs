// Logical types for schemata
//
// A logical type refines the meaning of a base node (a date stored as an int,
// a decimal stored as bytes). Built-in kinds are known statically; custom
// kinds are installed in a process-wide registry and looked up by name when a
// schema is compiled.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::internal::error::{Error, Result};
use crate::schema::types::{NodeKind, SchemaKind};
use crate::schema::utils;

/// Built-in logical type kinds, plus `None` and `Custom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalTypeKind {
    None,
    Decimal,
    BigDecimal,
    Date,
    TimeMillis,
    TimeMicros,
    TimestampMillis,
    TimestampMicros,
    TimestampNanos,
    LocalTimestampMillis,
    LocalTimestampMicros,
    LocalTimestampNanos,
    Duration,
    Uuid,
    Custom,
}

impl LogicalTypeKind {
    /// Looks up a built-in kind by its `logicalType` name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "decimal" => Some(LogicalTypeKind::Decimal),
            "big-decimal" => Some(LogicalTypeKind::BigDecimal),
            "date" => Some(LogicalTypeKind::Date),
            "time-millis" => Some(LogicalTypeKind::TimeMillis),
            "time-micros" => Some(LogicalTypeKind::TimeMicros),
            "timestamp-millis" => Some(LogicalTypeKind::TimestampMillis),
            "timestamp-micros" => Some(LogicalTypeKind::TimestampMicros),
            "timestamp-nanos" => Some(LogicalTypeKind::TimestampNanos),
            "local-timestamp-millis" => Some(LogicalTypeKind::LocalTimestampMillis),
            "local-timestamp-micros" => Some(LogicalTypeKind::LocalTimestampMicros),
            "local-timestamp-nanos" => Some(LogicalTypeKind::LocalTimestampNanos),
            "duration" => Some(LogicalTypeKind::Duration),
            "uuid" => Some(LogicalTypeKind::Uuid),
            _ => None,
        }
    }

    /// The `logicalType` name of a built-in kind.
    pub fn builtin_name(&self) -> Option<&'static str> {
        match self {
            LogicalTypeKind::Decimal => Some("decimal"),
            LogicalTypeKind::BigDecimal => Some("big-decimal"),
            LogicalTypeKind::Date => Some("date"),
            LogicalTypeKind::TimeMillis => Some("time-millis"),
            LogicalTypeKind::TimeMicros => Some("time-micros"),
            LogicalTypeKind::TimestampMillis => Some("timestamp-millis"),
            LogicalTypeKind::TimestampMicros => Some("timestamp-micros"),
            LogicalTypeKind::TimestampNanos => Some("timestamp-nanos"),
            LogicalTypeKind::LocalTimestampMillis => Some("local-timestamp-millis"),
            LogicalTypeKind::LocalTimestampMicros => Some("local-timestamp-micros"),
            LogicalTypeKind::LocalTimestampNanos => Some("local-timestamp-nanos"),
            LogicalTypeKind::Duration => Some("duration"),
            LogicalTypeKind::Uuid => Some("uuid"),
            LogicalTypeKind::None | LogicalTypeKind::Custom => None,
        }
    }

    /// Checks the base-kind gate of a built-in kind.
    pub fn accepts(&self, base: &NodeKind) -> bool {
        match self {
            LogicalTypeKind::None | LogicalTypeKind::Custom => true,
            LogicalTypeKind::Decimal => {
                matches!(base, NodeKind::Bytes | NodeKind::Fixed(_))
            }
            LogicalTypeKind::BigDecimal => matches!(base, NodeKind::Bytes),
            LogicalTypeKind::Date | LogicalTypeKind::TimeMillis => matches!(base, NodeKind::Int),
            LogicalTypeKind::TimeMicros
            | LogicalTypeKind::TimestampMillis
            | LogicalTypeKind::TimestampMicros
            | LogicalTypeKind::TimestampNanos
            | LogicalTypeKind::LocalTimestampMillis
            | LogicalTypeKind::LocalTimestampMicros
            | LogicalTypeKind::LocalTimestampNanos => matches!(base, NodeKind::Long),
            LogicalTypeKind::Duration => {
                matches!(base, NodeKind::Fixed(f) if f.size() == 12)
            }
            LogicalTypeKind::Uuid => match base {
                NodeKind::String => true,
                NodeKind::Fixed(f) => f.size() == 16,
                _ => false,
            },
        }
    }
}

/// A user-defined logical type produced by a registered factory.
pub trait CustomLogicalType: fmt::Debug + Send + Sync {
    /// The `logicalType` name.
    fn name(&self) -> &str;

    /// Extra keys emitted after `logicalType`, in order.
    fn parameters(&self) -> Vec<(String, Value)> {
        Vec::new()
    }

    /// Base-kind gate; returning false degrades the node to no logical type.
    fn accepts(&self, _base: SchemaKind) -> bool {
        true
    }
}

/// Builds a custom logical type from the attribute map of the annotated node.
pub type LogicalTypeFactory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Arc<dyn CustomLogicalType>> + Send + Sync>;

/// Logical type descriptor carried by every node.
#[derive(Debug, Clone)]
pub struct LogicalType {
    kind: LogicalTypeKind,
    precision: Option<u32>,
    scale: Option<u32>,
    custom: Option<Arc<dyn CustomLogicalType>>,
}

impl Default for LogicalType {
    fn default() -> Self {
        Self::none()
    }
}

impl LogicalType {
    pub fn none() -> Self {
        Self {
            kind: LogicalTypeKind::None,
            precision: None,
            scale: None,
            custom: None,
        }
    }

    /// A parameterless built-in kind. Use [`LogicalType::decimal`] for decimals.
    pub fn builtin(kind: LogicalTypeKind) -> Result<Self> {
        match kind {
            LogicalTypeKind::Decimal | LogicalTypeKind::Custom => Err(Error::LogicalType(
                format!("{:?} logical types need parameters", kind),
            )),
            _ => Ok(Self {
                kind,
                ..Self::none()
            }),
        }
    }

    /// A decimal with the given precision and optional scale (absent means 0).
    pub fn decimal(precision: u32, scale: Option<u32>) -> Result<Self> {
        if precision < 1 {
            return Err(Error::validation(format!(
                "Decimal precision must be positive, got {}",
                precision
            )));
        }
        if let Some(scale) = scale {
            if scale > precision {
                return Err(Error::validation(format!(
                    "Decimal scale {} is greater than precision {}",
                    scale, precision
                )));
            }
        }
        Ok(Self {
            kind: LogicalTypeKind::Decimal,
            precision: Some(precision),
            scale,
            custom: None,
        })
    }

    pub fn custom(custom: Arc<dyn CustomLogicalType>) -> Self {
        Self {
            kind: LogicalTypeKind::Custom,
            precision: None,
            scale: None,
            custom: Some(custom),
        }
    }

    pub fn kind(&self) -> LogicalTypeKind {
        self.kind
    }

    pub fn is_none(&self) -> bool {
        self.kind == LogicalTypeKind::None
    }

    /// The `logicalType` name, if any.
    pub fn name(&self) -> Option<&str> {
        match &self.custom {
            Some(custom) => Some(custom.name()),
            None => self.kind.builtin_name(),
        }
    }

    pub fn precision(&self) -> Option<u32> {
        self.precision
    }

    /// Decimal scale; 0 when not declared.
    pub fn scale(&self) -> u32 {
        self.scale.unwrap_or(0)
    }

    pub fn custom_type(&self) -> Option<&Arc<dyn CustomLogicalType>> {
        self.custom.as_ref()
    }

    /// Keys emitted after the node's own keys: `logicalType` and its parameters.
    pub fn json_entries(&self) -> Vec<(String, Value)> {
        let Some(name) = self.name() else {
            return Vec::new();
        };
        let mut entries = vec![("logicalType".to_string(), Value::String(name.to_string()))];
        if let Some(precision) = self.precision {
            entries.push(("precision".to_string(), Value::from(precision)));
        }
        if let Some(scale) = self.scale {
            entries.push(("scale".to_string(), Value::from(scale)));
        }
        if let Some(custom) = &self.custom {
            entries.extend(custom.parameters());
        }
        entries
    }

    /// Verifies that this logical type may annotate a node of the given kind.
    pub(crate) fn check_applicable(&self, base: &NodeKind) -> Result<()> {
        let accepted = match &self.custom {
            Some(custom) => custom.accepts(base.kind()),
            None => self.kind.accepts(base),
        };
        if !accepted {
            return Err(Error::validation(format!(
                "Logical type '{}' cannot annotate a {} node",
                self.name().unwrap_or("none"),
                base.kind()
            )));
        }
        if let (LogicalTypeKind::Decimal, NodeKind::Fixed(fixed)) = (self.kind, base) {
            let max = utils::max_decimal_precision(fixed.size());
            let precision = self.precision.unwrap_or(0) as u64;
            if precision > max {
                return Err(Error::validation(format!(
                    "Fixed of size {} can hold at most {} decimal digits, precision is {}",
                    fixed.size(),
                    max,
                    precision
                )));
            }
        }
        Ok(())
    }
}

impl PartialEq for LogicalType {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.precision == other.precision
            && self.scale == other.scale
            && match (&self.custom, &other.custom) {
                (Some(a), Some(b)) => a.name() == b.name() && a.parameters() == b.parameters(),
                (None, None) => true,
                _ => false,
            }
    }
}

/// Result of looking a logical type name up in the registry.
#[derive(Clone)]
pub enum Registration {
    Builtin(LogicalTypeKind),
    Custom(LogicalTypeFactory),
}

/// Process-wide registry of custom logical types.
///
/// Built-in names are always known and cannot be overridden.
pub struct LogicalTypeRegistry {
    custom: DashMap<String, LogicalTypeFactory>,
}

static REGISTRY: Lazy<LogicalTypeRegistry> = Lazy::new(|| LogicalTypeRegistry {
    custom: DashMap::new(),
});

impl LogicalTypeRegistry {
    /// The process-wide registry consulted by the schema compiler.
    pub fn global() -> &'static LogicalTypeRegistry {
        &REGISTRY
    }

    /// Installs a factory for a custom logical type name.
    pub fn register<F>(&self, name: &str, factory: F) -> Result<()>
    where
        F: Fn(&Map<String, Value>) -> Result<Arc<dyn CustomLogicalType>> + Send + Sync + 'static,
    {
        if LogicalTypeKind::builtin(name).is_some() {
            return Err(Error::LogicalType(format!(
                "'{}' is a built-in logical type and cannot be re-registered",
                name
            )));
        }
        if name.is_empty() {
            return Err(Error::LogicalType("Logical type name cannot be empty".to_string()));
        }
        debug!(logical_type = name, "registering custom logical type");
        self.custom.insert(name.to_string(), Arc::new(factory));
        Ok(())
    }

    /// Removes a custom registration. Returns true when one existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.custom.remove(name).is_some()
    }

    pub fn lookup(&self, name: &str) -> Option<Registration> {
        if let Some(kind) = LogicalTypeKind::builtin(name) {
            return Some(Registration::Builtin(kind));
        }
        self.custom
            .get(name)
            .map(|factory| Registration::Custom(factory.value().clone()))
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }
}

/// A resolved logical type together with the attribute keys it consumed.
pub(crate) struct ResolvedLogicalType {
    pub logical_type: LogicalType,
    pub consumed: Vec<String>,
}

/// Reads the `logicalType` annotation of a schema object.
///
/// Returns `Ok(None)` when the node carries no usable logical type: no
/// annotation, an unknown name, or a base kind the type does not accept.
/// Parameter errors on an accepted base are validation errors.
pub(crate) fn resolve_annotation(
    object: &Map<String, Value>,
    base: &NodeKind,
) -> Result<Option<ResolvedLogicalType>> {
    let Some(annotation) = object.get("logicalType") else {
        return Ok(None);
    };
    let Some(name) = annotation.as_str() else {
        warn!(annotation = %annotation, "ignoring non-string logicalType");
        return Ok(None);
    };
    let Some(registration) = LogicalTypeRegistry::global().lookup(name) else {
        warn!(logical_type = name, "unknown logical type, keeping it as an attribute");
        return Ok(None);
    };

    match registration {
        Registration::Builtin(kind) => {
            if !kind.accepts(base) {
                warn!(
                    logical_type = name,
                    base = %base.kind(),
                    "logical type does not apply to its base type, ignoring it"
                );
                return Ok(None);
            }
            let mut consumed = vec!["logicalType".to_string()];
            let logical_type = match kind {
                LogicalTypeKind::Decimal => {
                    let precision = decimal_parameter(object, "precision")?.ok_or_else(|| {
                        Error::validation_at("Decimal is missing its precision", &Value::Object(object.clone()))
                    })?;
                    let scale = decimal_parameter(object, "scale")?;
                    consumed.push("precision".to_string());
                    if scale.is_some() {
                        consumed.push("scale".to_string());
                    }
                    let logical_type = LogicalType::decimal(precision, scale)?;
                    logical_type.check_applicable(base)?;
                    logical_type
                }
                LogicalTypeKind::BigDecimal => {
                    if object.contains_key("precision") || object.contains_key("scale") {
                        return Err(Error::validation(
                            "big-decimal does not take precision or scale",
                        ));
                    }
                    LogicalType::builtin(kind)?
                }
                _ => LogicalType::builtin(kind)?,
            };
            Ok(Some(ResolvedLogicalType {
                logical_type,
                consumed,
            }))
        }
        Registration::Custom(factory) => {
            let custom = factory(object)?;
            if !custom.accepts(base.kind()) {
                warn!(
                    logical_type = name,
                    base = %base.kind(),
                    "custom logical type rejected its base type, ignoring it"
                );
                return Ok(None);
            }
            let mut consumed = vec!["logicalType".to_string()];
            consumed.extend(custom.parameters().into_iter().map(|(key, _)| key));
            Ok(Some(ResolvedLogicalType {
                logical_type: LogicalType::custom(custom),
                consumed,
            }))
        }
    }
}

fn decimal_parameter(object: &Map<String, Value>, key: &str) -> Result<Option<u32>> {
    match object.get(key) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| Error::validation_at(format!("Invalid decimal {}", key), value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{FixedNode, Name};
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn fixed(size: usize) -> NodeKind {
        NodeKind::Fixed(FixedNode::new(Name::new("F").unwrap(), size).unwrap())
    }

    #[derive(Debug)]
    struct Tagged;

    impl CustomLogicalType for Tagged {
        fn name(&self) -> &str {
            "tagged-for-tests"
        }
    }

    #[test]
    fn test_builtin_names_round_trip() {
        for name in ["decimal", "date", "time-micros", "local-timestamp-nanos", "uuid"] {
            let kind = LogicalTypeKind::builtin(name).unwrap();
            assert_eq!(kind.builtin_name(), Some(name));
        }
        assert!(LogicalTypeKind::builtin("map").is_none());
    }

    #[test]
    fn test_base_kind_gate_degrades() {
        let obj = object(json!({"type": "string", "logicalType": "date"}));
        assert!(resolve_annotation(&obj, &NodeKind::String).unwrap().is_none());

        let obj = object(json!({"type": "fixed", "logicalType": "uuid"}));
        assert!(resolve_annotation(&obj, &fixed(8)).unwrap().is_none());
        assert!(resolve_annotation(&obj, &fixed(16)).unwrap().is_some());
    }

    #[test]
    fn test_decimal_parameters() {
        let obj = object(json!({"logicalType": "decimal", "precision": 12, "scale": 6}));
        let resolved = resolve_annotation(&obj, &NodeKind::Bytes).unwrap().unwrap();
        assert_eq!(resolved.logical_type.precision(), Some(12));
        assert_eq!(resolved.logical_type.scale(), 6);
        assert_eq!(resolved.consumed, vec!["logicalType", "precision", "scale"]);

        let missing = object(json!({"logicalType": "decimal"}));
        assert!(resolve_annotation(&missing, &NodeKind::Bytes).is_err());

        let inverted = object(json!({"logicalType": "decimal", "precision": 2, "scale": 3}));
        assert!(resolve_annotation(&inverted, &NodeKind::Bytes).is_err());
    }

    #[test]
    fn test_decimal_fixed_capacity() {
        let ok = object(json!({"logicalType": "decimal", "precision": 310}));
        assert!(resolve_annotation(&ok, &fixed(129)).unwrap().is_some());
        let too_wide = object(json!({"logicalType": "decimal", "precision": 311}));
        assert!(resolve_annotation(&too_wide, &fixed(129)).is_err());
    }

    #[test]
    fn test_big_decimal_rejects_parameters() {
        let obj = object(json!({"logicalType": "big-decimal", "precision": 4}));
        assert!(resolve_annotation(&obj, &NodeKind::Bytes).is_err());
        let obj = object(json!({"logicalType": "big-decimal"}));
        assert!(resolve_annotation(&obj, &NodeKind::Bytes).unwrap().is_some());
    }

    #[test]
    fn test_registry_rejects_builtin_override() {
        let registry = LogicalTypeRegistry::global();
        let result = registry.register("date", |_| Ok(Arc::new(Tagged) as Arc<dyn CustomLogicalType>));
        assert!(matches!(result, Err(Error::LogicalType(_))));
    }

    #[test]
    fn test_registered_custom_type_resolves() {
        let registry = LogicalTypeRegistry::global();
        registry
            .register("tagged-for-tests", |_| Ok(Arc::new(Tagged) as Arc<dyn CustomLogicalType>))
            .unwrap();
        let obj = object(json!({"type": "long", "logicalType": "tagged-for-tests"}));
        let resolved = resolve_annotation(&obj, &NodeKind::Long).unwrap().unwrap();
        assert_eq!(resolved.logical_type.kind(), LogicalTypeKind::Custom);
        assert_eq!(resolved.logical_type.name(), Some("tagged-for-tests"));
        assert!(registry.unregister("tagged-for-tests"));
    }

    #[test]
    fn test_unknown_name_is_not_an_error() {
        let obj = object(json!({"type": "array", "items": "int", "logicalType": "no-such-type"}));
        assert!(resolve_annotation(&obj, &NodeKind::Int).unwrap().is_none());
    }
}
