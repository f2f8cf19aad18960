use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};

use crate::generic::GenericData;
use crate::internal::error::{Error, Result};
use crate::schema::types::Schema;

/// A runtime value paired with a schema by the generic data engine.
#[derive(Debug, Clone)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    /// An owned string.
    String(String),
    /// UTF-8 string bytes as produced by decoders.
    Utf8(Bytes),
    Record(Arc<GenericRecord>),
    Enum(EnumSymbol),
    Array(Vec<Datum>),
    Map(BTreeMap<String, Datum>),
    Fixed(GenericFixed),
    /// A converted logical value (uuid, date, decimal, ...).
    Logical(LogicalValue),
}

impl Datum {
    /// Builds the decoder form of a string.
    pub fn utf8(text: &str) -> Self {
        Datum::Utf8(Bytes::copy_from_slice(text.as_bytes()))
    }

    pub fn record(record: GenericRecord) -> Self {
        Datum::Record(Arc::new(record))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// The UTF-8 bytes of either string representation.
    pub fn string_bytes(&self) -> Option<&[u8]> {
        match self {
            Datum::String(s) => Some(s.as_bytes()),
            Datum::Utf8(b) => Some(b),
            _ => None,
        }
    }

    /// The name a union branch must carry to hold this datum: the full name of
    /// named values, the kind name otherwise. Logical values have none.
    pub fn schema_name(&self) -> Option<String> {
        let name = match self {
            Datum::Null => "null",
            Datum::Boolean(_) => "boolean",
            Datum::Int(_) => "int",
            Datum::Long(_) => "long",
            Datum::Float(_) => "float",
            Datum::Double(_) => "double",
            Datum::Bytes(_) => "bytes",
            Datum::String(_) | Datum::Utf8(_) => "string",
            Datum::Array(_) => "array",
            Datum::Map(_) => "map",
            Datum::Record(record) => return Some(record.schema().type_name()),
            Datum::Enum(symbol) => return Some(symbol.schema().type_name()),
            Datum::Fixed(fixed) => return Some(fixed.schema().type_name()),
            Datum::Logical(_) => return None,
        };
        Some(name.to_string())
    }
}

/// Structural equality. Records that are the same instance are equal
/// without traversal, which also stops a self-referencing value from
/// recursing. Two distinct cyclic graphs are not detected and must not be
/// compared.
impl PartialEq for Datum {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Datum::Null, Datum::Null) => true,
            (Datum::Boolean(a), Datum::Boolean(b)) => a == b,
            (Datum::Int(a), Datum::Int(b)) => a == b,
            (Datum::Long(a), Datum::Long(b)) => a == b,
            (Datum::Float(a), Datum::Float(b)) => a.to_bits() == b.to_bits(),
            (Datum::Double(a), Datum::Double(b)) => a.to_bits() == b.to_bits(),
            (Datum::Bytes(a), Datum::Bytes(b)) => a == b,
            (Datum::Record(a), Datum::Record(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.schema().type_name() == b.schema().type_name()
                        && GenericData::get()
                            .compare(self, other, a.schema(), true)
                            .map_or(false, |ordering| ordering.is_eq()))
            }
            (Datum::Enum(a), Datum::Enum(b)) => a == b,
            (Datum::Array(a), Datum::Array(b)) => a == b,
            (Datum::Map(a), Datum::Map(b)) => a == b,
            (Datum::Fixed(a), Datum::Fixed(b)) => a == b,
            (Datum::Logical(a), Datum::Logical(b)) => a == b,
            (a, b) => match (a.string_bytes(), b.string_bytes()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&GenericData::get().render(self))
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::String(value.to_string())
    }
}

impl From<i32> for Datum {
    fn from(value: i32) -> Self {
        Datum::Int(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Long(value)
    }
}

impl From<LogicalValue> for Datum {
    fn from(value: LogicalValue) -> Self {
        Datum::Logical(value)
    }
}

/// A mutable record instance shared through `Arc`.
///
/// Values sit behind a lock, so a record can be filled in after it has been
/// placed inside another value; this is also how a record can end up
/// containing itself.
pub struct GenericRecord {
    schema: Schema,
    values: RwLock<Vec<Datum>>,
}

impl GenericRecord {
    /// Creates a record with every field set to null.
    pub fn new(schema: &Schema) -> Result<Self> {
        let schema = schema.resolve()?;
        let width = schema
            .fields()
            .map(<[_]>::len)
            .ok_or_else(|| Error::TypeMismatch(format!("Not a record schema: {}", schema)))?;
        Ok(Self {
            schema,
            values: RwLock::new(vec![Datum::Null; width]),
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn put(&self, name: &str, value: Datum) -> Result<()> {
        let position = self.position(name)?;
        self.put_at(position, value)
    }

    pub fn put_at(&self, position: usize, value: Datum) -> Result<()> {
        let mut values = self.values.write();
        let slot = values.get_mut(position).ok_or_else(|| {
            Error::TypeMismatch(format!(
                "Field position {} out of range for {}",
                position,
                self.schema.type_name()
            ))
        })?;
        *slot = value;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Datum> {
        let position = self.position(name).ok()?;
        self.get_at(position)
    }

    pub fn get_at(&self, position: usize) -> Option<Datum> {
        self.values.read().get(position).cloned()
    }

    /// Read access to all field values in field order.
    pub fn values(&self) -> RwLockReadGuard<'_, Vec<Datum>> {
        self.values.read()
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.schema
            .as_record()
            .and_then(|record| record.field(name))
            .map(|field| field.position())
            .ok_or_else(|| {
                Error::TypeMismatch(format!(
                    "Record {} has no field '{}'",
                    self.schema.type_name(),
                    name
                ))
            })
    }
}

impl fmt::Debug for GenericRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Values may refer back to this record
        write!(
            f,
            "GenericRecord({}: {})",
            self.schema.type_name(),
            GenericData::get().render_record(self)
        )
    }
}

/// An enum value: a symbol together with its enum schema.
#[derive(Debug, Clone)]
pub struct EnumSymbol {
    schema: Schema,
    symbol: String,
}

impl EnumSymbol {
    pub fn new(schema: Schema, symbol: impl Into<String>) -> Self {
        Self {
            schema,
            symbol: symbol.into(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Declaration index of the symbol, if the schema defines it.
    pub fn ordinal(&self) -> Option<usize> {
        self.schema.resolve().ok()?.as_enum()?.ordinal(&self.symbol)
    }
}

impl PartialEq for EnumSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol && self.schema.type_name() == other.schema.type_name()
    }
}

/// A fixed-size binary value together with its fixed schema.
#[derive(Debug, Clone)]
pub struct GenericFixed {
    schema: Schema,
    bytes: Bytes,
}

impl GenericFixed {
    pub fn new(schema: Schema, bytes: Bytes) -> Self {
        Self { schema, bytes }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

impl PartialEq for GenericFixed {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes && self.schema.type_name() == other.schema.type_name()
    }
}

/// Exact decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Decimal {
    unscaled: i128,
    scale: u32,
}

impl Decimal {
    pub fn new(unscaled: i128, scale: u32) -> Self {
        Self { unscaled, scale }
    }

    pub fn unscaled(&self) -> i128 {
        self.unscaled
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scale == 0 {
            return write!(f, "{}", self.unscaled);
        }
        let digits = self.unscaled.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (whole, fraction) = padded.split_at(padded.len() - scale);
        let sign = if self.unscaled < 0 { "-" } else { "" };
        write!(f, "{}{}.{}", sign, whole, fraction)
    }
}

/// Opaque value produced by a user-registered conversion.
#[derive(Clone)]
pub struct CustomValue {
    representation: Arc<str>,
    value: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    pub fn new<T: Any + Send + Sync>(representation: &str, value: T) -> Self {
        Self {
            representation: Arc::from(representation),
            value: Arc::new(value),
        }
    }

    pub fn representation(&self) -> &str {
        &self.representation
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl PartialEq for CustomValue {
    fn eq(&self, other: &Self) -> bool {
        self.representation == other.representation && Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("representation", &self.representation)
            .finish_non_exhaustive()
    }
}

/// A value in its converted (logical) form.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalValue {
    Uuid(uuid::Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(DateTime<Utc>),
    LocalTimestamp(NaiveDateTime),
    Decimal(Decimal),
    Custom(CustomValue),
}

impl LogicalValue {
    /// Key under which conversions for this value are registered.
    pub fn representation(&self) -> &str {
        match self {
            LogicalValue::Uuid(_) => "uuid",
            LogicalValue::Date(_) => "date",
            LogicalValue::Time(_) => "time",
            LogicalValue::Timestamp(_) => "timestamp",
            LogicalValue::LocalTimestamp(_) => "local-timestamp",
            LogicalValue::Decimal(_) => "decimal",
            LogicalValue::Custom(custom) => custom.representation(),
        }
    }
}

impl fmt::Display for LogicalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalValue::Uuid(uuid) => write!(f, "{}", uuid),
            LogicalValue::Date(date) => write!(f, "{}", date),
            LogicalValue::Time(time) => write!(f, "{}", time),
            LogicalValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            LogicalValue::LocalTimestamp(ts) => write!(f, "{}", ts),
            LogicalValue::Decimal(decimal) => write!(f, "{}", decimal),
            LogicalValue::Custom(custom) => write!(f, "<{}>", custom.representation()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::{Field, Name, SchemaKind};

    fn point_schema() -> Schema {
        Schema::record(
            Name::new("Point").unwrap(),
            vec![
                Field::new("x", Schema::primitive(SchemaKind::Int).unwrap()),
                Field::new("y", Schema::primitive(SchemaKind::Int).unwrap()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_record_put_get() {
        let record = GenericRecord::new(&point_schema()).unwrap();
        assert_eq!(record.get("x"), Some(Datum::Null));
        record.put("x", Datum::Int(3)).unwrap();
        record.put_at(1, Datum::Int(4)).unwrap();
        assert_eq!(record.get_at(0), Some(Datum::Int(3)));
        assert_eq!(record.get("y"), Some(Datum::Int(4)));
        assert!(record.put("z", Datum::Int(5)).is_err());
        assert!(record.put_at(2, Datum::Int(5)).is_err());
    }

    #[test]
    fn test_record_requires_record_schema() {
        let err = GenericRecord::new(&Schema::primitive(SchemaKind::Int).unwrap()).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }

    #[test]
    fn test_string_representations_are_equal() {
        assert_eq!(Datum::from("abc"), Datum::utf8("abc"));
        assert_ne!(Datum::from("abc"), Datum::utf8("abd"));
    }

    #[test]
    fn test_schema_names() {
        assert_eq!(Datum::Null.schema_name().as_deref(), Some("null"));
        assert_eq!(Datum::utf8("x").schema_name().as_deref(), Some("string"));
        let record = Datum::record(GenericRecord::new(&point_schema()).unwrap());
        assert_eq!(record.schema_name().as_deref(), Some("Point"));
        let uuid = Datum::Logical(LogicalValue::Uuid(uuid::Uuid::nil()));
        assert_eq!(uuid.schema_name(), None);
    }

    #[test]
    fn test_decimal_display() {
        assert_eq!(Decimal::new(12345, 2).to_string(), "123.45");
        assert_eq!(Decimal::new(-5, 3).to_string(), "-0.005");
        assert_eq!(Decimal::new(42, 0).to_string(), "42");
    }

    #[test]
    fn test_shared_cyclic_record_is_compared_by_identity() {
        let schema = crate::schema::parser::compile_json_schema(
            r#"{"type": "record", "name": "Node", "fields": [{"name": "next", "type": ["null", "Node"]}]}"#,
        )
        .unwrap()
        .root()
        .clone();
        let cycle = Arc::new(GenericRecord::new(&schema).unwrap());
        cycle.put("next", Datum::Record(cycle.clone())).unwrap();
        let a = GenericRecord::new(&schema).unwrap();
        a.put("next", Datum::Record(cycle.clone())).unwrap();
        let b = GenericRecord::new(&schema).unwrap();
        b.put("next", Datum::Record(cycle.clone())).unwrap();

        assert_eq!(Datum::record(a), Datum::record(b));
        assert_eq!(Datum::Record(cycle.clone()), Datum::Record(cycle.clone()));
        cycle.put("next", Datum::Null).unwrap();
    }

    #[test]
    fn test_custom_values_compare_by_identity() {
        let a = CustomValue::new("money", 10u32);
        let b = CustomValue::new("money", 10u32);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_eq!(a.downcast_ref::<u32>(), Some(&10));
    }
}
