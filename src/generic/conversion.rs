// Logical type conversions
//
// A conversion maps between a converted runtime value (`LogicalValue`) and
// the raw datum its base schema describes. Conversions are registered on a
// `GenericData` instance under (representation, logical type name).

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::codec::types::{Datum, Decimal, GenericFixed, LogicalValue};
use crate::generic::GenericData;
use crate::internal::error::{Error, Result};
use crate::schema::types::{NodeKind, Schema};

/// Two-way mapping between a logical value and its raw datum.
pub trait Conversion: Send + Sync {
    /// Representation key of the converted values (see [`LogicalValue::representation`]).
    fn representation(&self) -> &str;

    /// The `logicalType` name this conversion applies to.
    fn logical_type_name(&self) -> &str;

    /// Converts a logical value into the raw datum for `schema`.
    fn to_raw(&self, value: &LogicalValue, schema: &Schema) -> Result<Datum>;

    /// Converts a raw datum of `schema` into a `Datum::Logical`.
    fn from_raw(&self, raw: &Datum, schema: &Schema) -> Result<Datum>;
}

impl GenericData {
    /// Registers a conversion, replacing any previous one for the same key.
    pub fn add_logical_type_conversion(&self, conversion: Arc<dyn Conversion>) {
        debug!(
            representation = conversion.representation(),
            logical_type = conversion.logical_type_name(),
            "registering logical type conversion"
        );
        let key = (
            conversion.representation().to_string(),
            conversion.logical_type_name().to_string(),
        );
        self.conversions.insert(key, conversion);
    }

    /// Looks up the conversion for a representation and a logical type name.
    pub fn conversion_for(&self, representation: &str, logical_type: &str) -> Option<Arc<dyn Conversion>> {
        self.conversions
            .get(&(representation.to_string(), logical_type.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Returns true when some conversion is registered for `representation`.
    pub fn has_conversions_for(&self, representation: &str) -> bool {
        self.conversions.iter().any(|entry| entry.key().0 == representation)
    }

    /// Converts a logical value into the raw form described by `schema`.
    pub fn to_raw(&self, schema: &Schema, value: &LogicalValue) -> Result<Datum> {
        let schema = schema.resolve()?;
        let logical_name = schema.logical_type().name().ok_or_else(|| {
            Error::LogicalType(format!(
                "Schema {} has no logical type for a {} value",
                schema.type_name(),
                value.representation()
            ))
        })?;
        let conversion = self
            .conversion_for(value.representation(), logical_name)
            .ok_or_else(|| {
                Error::LogicalType(format!(
                    "No conversion from {} to {}",
                    value.representation(),
                    logical_name
                ))
            })?;
        conversion.to_raw(value, &schema)
    }

    /// Converts a raw datum into its logical form when `schema` declares a
    /// logical type with a registered conversion; otherwise returns it as is.
    pub fn to_logical(&self, schema: &Schema, raw: &Datum) -> Result<Datum> {
        let schema = schema.resolve()?;
        let Some(logical_name) = schema.logical_type().name() else {
            return Ok(raw.clone());
        };
        let conversion = self
            .conversions
            .iter()
            .find(|entry| entry.key().1 == logical_name)
            .map(|entry| entry.value().clone());
        match conversion {
            Some(conversion) => conversion.from_raw(raw, &schema),
            None => Ok(raw.clone()),
        }
    }

    /// Raw view of a datum for schema-driven traversal.
    pub(crate) fn raw_operand(&self, schema: &Schema, datum: &Datum) -> Result<Datum> {
        match datum {
            Datum::Logical(value) => self.to_raw(schema, value),
            other => Ok(other.clone()),
        }
    }
}

/// The conversions every `GenericData` starts with.
pub(crate) fn builtin_conversions() -> Vec<Arc<dyn Conversion>> {
    vec![
        Arc::new(UuidConversion),
        Arc::new(DateConversion),
        Arc::new(TimeConversion { unit: TimeUnit::Millis }),
        Arc::new(TimeConversion { unit: TimeUnit::Micros }),
        Arc::new(TimestampConversion { unit: TimeUnit::Millis, local: false }),
        Arc::new(TimestampConversion { unit: TimeUnit::Micros, local: false }),
        Arc::new(TimestampConversion { unit: TimeUnit::Nanos, local: false }),
        Arc::new(TimestampConversion { unit: TimeUnit::Millis, local: true }),
        Arc::new(TimestampConversion { unit: TimeUnit::Micros, local: true }),
        Arc::new(TimestampConversion { unit: TimeUnit::Nanos, local: true }),
        Arc::new(DecimalConversion),
    ]
}

fn unexpected(conversion: &str, found: impl std::fmt::Debug) -> Error {
    Error::LogicalType(format!("{} conversion cannot handle {:?}", conversion, found))
}

/// uuid over string (canonical text) or fixed(16).
pub struct UuidConversion;

impl Conversion for UuidConversion {
    fn representation(&self) -> &str {
        "uuid"
    }

    fn logical_type_name(&self) -> &str {
        "uuid"
    }

    fn to_raw(&self, value: &LogicalValue, schema: &Schema) -> Result<Datum> {
        let LogicalValue::Uuid(uuid) = value else {
            return Err(unexpected("uuid", value));
        };
        match schema.node() {
            NodeKind::Fixed(_) => Ok(Datum::Fixed(GenericFixed::new(
                schema.clone(),
                Bytes::copy_from_slice(uuid.as_bytes()),
            ))),
            _ => Ok(Datum::String(uuid.hyphenated().to_string())),
        }
    }

    fn from_raw(&self, raw: &Datum, _schema: &Schema) -> Result<Datum> {
        let uuid = match raw {
            Datum::Fixed(fixed) => Uuid::from_slice(fixed.bytes())
                .map_err(|e| Error::LogicalType(format!("Invalid uuid bytes: {}", e)))?,
            other => {
                let text = other
                    .string_bytes()
                    .and_then(|bytes| std::str::from_utf8(bytes).ok())
                    .ok_or_else(|| unexpected("uuid", other))?;
                Uuid::parse_str(text)
                    .map_err(|e| Error::LogicalType(format!("Invalid uuid '{}': {}", text, e)))?
            }
        };
        Ok(Datum::Logical(LogicalValue::Uuid(uuid)))
    }
}

fn epoch_date() -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| Error::LogicalType("Epoch date out of range".to_string()))
}

/// date: days since 1970-01-01 as an int.
pub struct DateConversion;

impl Conversion for DateConversion {
    fn representation(&self) -> &str {
        "date"
    }

    fn logical_type_name(&self) -> &str {
        "date"
    }

    fn to_raw(&self, value: &LogicalValue, _schema: &Schema) -> Result<Datum> {
        let LogicalValue::Date(date) = value else {
            return Err(unexpected("date", value));
        };
        let days = date.signed_duration_since(epoch_date()?).num_days();
        i32::try_from(days)
            .map(Datum::Int)
            .map_err(|_| Error::LogicalType(format!("Date {} out of int range", date)))
    }

    fn from_raw(&self, raw: &Datum, _schema: &Schema) -> Result<Datum> {
        let Datum::Int(days) = raw else {
            return Err(unexpected("date", raw));
        };
        let date = TimeDelta::try_days(i64::from(*days))
            .and_then(|delta| epoch_date().ok()?.checked_add_signed(delta))
            .ok_or_else(|| Error::LogicalType(format!("Day count {} out of range", days)))?;
        Ok(Datum::Logical(LogicalValue::Date(date)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeUnit {
    Millis,
    Micros,
    Nanos,
}

impl TimeUnit {
    fn per_second(self) -> i64 {
        match self {
            TimeUnit::Millis => 1_000,
            TimeUnit::Micros => 1_000_000,
            TimeUnit::Nanos => 1_000_000_000,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            TimeUnit::Millis => "millis",
            TimeUnit::Micros => "micros",
            TimeUnit::Nanos => "nanos",
        }
    }

    fn from_epoch(self, value: i64) -> Option<DateTime<Utc>> {
        let per_second = self.per_second();
        let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
        DateTime::from_timestamp(value.div_euclid(per_second), nanos as u32)
    }

    fn to_epoch(self, value: &DateTime<Utc>) -> Option<i64> {
        match self {
            TimeUnit::Millis => Some(value.timestamp_millis()),
            TimeUnit::Micros => Some(value.timestamp_micros()),
            TimeUnit::Nanos => value.timestamp_nanos_opt(),
        }
    }
}

/// time-millis (int) and time-micros (long): time since midnight.
struct TimeConversion {
    unit: TimeUnit,
}

impl Conversion for TimeConversion {
    fn representation(&self) -> &str {
        "time"
    }

    fn logical_type_name(&self) -> &str {
        match self.unit {
            TimeUnit::Millis => "time-millis",
            _ => "time-micros",
        }
    }

    fn to_raw(&self, value: &LogicalValue, _schema: &Schema) -> Result<Datum> {
        let LogicalValue::Time(time) = value else {
            return Err(unexpected(self.logical_type_name(), value));
        };
        let per_second = self.unit.per_second();
        let units = i64::from(time.num_seconds_from_midnight()) * per_second
            + i64::from(time.nanosecond()) / (1_000_000_000 / per_second);
        match self.unit {
            TimeUnit::Millis => Ok(Datum::Int(units as i32)),
            _ => Ok(Datum::Long(units)),
        }
    }

    fn from_raw(&self, raw: &Datum, _schema: &Schema) -> Result<Datum> {
        let units = match (self.unit, raw) {
            (TimeUnit::Millis, Datum::Int(v)) => i64::from(*v),
            (TimeUnit::Micros, Datum::Long(v)) => *v,
            _ => return Err(unexpected(self.logical_type_name(), raw)),
        };
        let per_second = self.unit.per_second();
        let time = u32::try_from(units / per_second)
            .ok()
            .filter(|_| units >= 0)
            .and_then(|secs| {
                let nanos = (units % per_second) * (1_000_000_000 / per_second);
                NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos as u32)
            })
            .ok_or_else(|| Error::LogicalType(format!("Time of day {} out of range", units)))?;
        Ok(Datum::Logical(LogicalValue::Time(time)))
    }
}

/// timestamp-* (instant) and local-timestamp-* (wall clock) over long.
struct TimestampConversion {
    unit: TimeUnit,
    local: bool,
}

impl Conversion for TimestampConversion {
    fn representation(&self) -> &str {
        if self.local {
            "local-timestamp"
        } else {
            "timestamp"
        }
    }

    fn logical_type_name(&self) -> &str {
        match (self.local, self.unit) {
            (false, TimeUnit::Millis) => "timestamp-millis",
            (false, TimeUnit::Micros) => "timestamp-micros",
            (false, TimeUnit::Nanos) => "timestamp-nanos",
            (true, TimeUnit::Millis) => "local-timestamp-millis",
            (true, TimeUnit::Micros) => "local-timestamp-micros",
            (true, TimeUnit::Nanos) => "local-timestamp-nanos",
        }
    }

    fn to_raw(&self, value: &LogicalValue, _schema: &Schema) -> Result<Datum> {
        let instant = match (self.local, value) {
            (false, LogicalValue::Timestamp(ts)) => *ts,
            (true, LogicalValue::LocalTimestamp(ts)) => {
                DateTime::<Utc>::from_naive_utc_and_offset(*ts, Utc)
            }
            _ => return Err(unexpected(self.logical_type_name(), value)),
        };
        self.unit
            .to_epoch(&instant)
            .map(Datum::Long)
            .ok_or_else(|| {
                Error::LogicalType(format!(
                    "Timestamp {} does not fit in {}",
                    instant,
                    self.unit.suffix()
                ))
            })
    }

    fn from_raw(&self, raw: &Datum, _schema: &Schema) -> Result<Datum> {
        let Datum::Long(value) = raw else {
            return Err(unexpected(self.logical_type_name(), raw));
        };
        let instant = self.unit.from_epoch(*value).ok_or_else(|| {
            Error::LogicalType(format!("Timestamp {} out of range", value))
        })?;
        let logical = if self.local {
            LogicalValue::LocalTimestamp(instant.naive_utc())
        } else {
            LogicalValue::Timestamp(instant)
        };
        Ok(Datum::Logical(logical))
    }
}

/// decimal over bytes or fixed: big-endian two's complement unscaled value.
pub struct DecimalConversion;

impl DecimalConversion {
    fn rescale(decimal: &Decimal, schema: &Schema) -> Result<i128> {
        let target = schema.logical_type().scale();
        if decimal.scale() > target {
            return Err(Error::LogicalType(format!(
                "Cannot write decimal {} with scale {} without rounding",
                decimal, target
            )));
        }
        let unscaled = 10i128
            .checked_pow(target - decimal.scale())
            .and_then(|factor| decimal.unscaled().checked_mul(factor))
            .ok_or_else(|| Error::LogicalType(format!("Decimal {} overflows", decimal)))?;
        if let Some(precision) = schema.logical_type().precision() {
            let digits = unscaled.unsigned_abs().to_string().len() as u32;
            if unscaled != 0 && digits > precision {
                return Err(Error::LogicalType(format!(
                    "Decimal {} exceeds precision {}",
                    decimal, precision
                )));
            }
        }
        Ok(unscaled)
    }
}

/// Shortest two's complement big-endian encoding.
fn minimal_twos_complement(value: i128) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

fn read_twos_complement(bytes: &[u8]) -> Result<i128> {
    if bytes.is_empty() {
        return Ok(0);
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let (extra, tail) = bytes.split_at(bytes.len().saturating_sub(16));
    if extra.iter().any(|b| *b != fill) || tail[0] & 0x80 != fill & 0x80 {
        return Err(Error::LogicalType(format!(
            "Decimal of {} bytes does not fit in 128 bits",
            bytes.len()
        )));
    }
    let mut buf = [fill; 16];
    buf[16 - tail.len()..].copy_from_slice(tail);
    Ok(i128::from_be_bytes(buf))
}

impl Conversion for DecimalConversion {
    fn representation(&self) -> &str {
        "decimal"
    }

    fn logical_type_name(&self) -> &str {
        "decimal"
    }

    fn to_raw(&self, value: &LogicalValue, schema: &Schema) -> Result<Datum> {
        let LogicalValue::Decimal(decimal) = value else {
            return Err(unexpected("decimal", value));
        };
        let unscaled = Self::rescale(decimal, schema)?;
        let minimal = minimal_twos_complement(unscaled);
        match schema.node() {
            NodeKind::Fixed(fixed) => {
                if minimal.len() > fixed.size() {
                    return Err(Error::LogicalType(format!(
                        "Decimal {} does not fit in fixed({})",
                        decimal,
                        fixed.size()
                    )));
                }
                let fill = if unscaled < 0 { 0xFF } else { 0x00 };
                let mut bytes = vec![fill; fixed.size() - minimal.len()];
                bytes.extend_from_slice(&minimal);
                Ok(Datum::Fixed(GenericFixed::new(schema.clone(), Bytes::from(bytes))))
            }
            _ => Ok(Datum::Bytes(Bytes::from(minimal))),
        }
    }

    fn from_raw(&self, raw: &Datum, schema: &Schema) -> Result<Datum> {
        let bytes = match raw {
            Datum::Bytes(bytes) => bytes,
            Datum::Fixed(fixed) => fixed.bytes(),
            other => return Err(unexpected("decimal", other)),
        };
        // Unscaled values are held in an i128; wider ones stay raw
        let unscaled = match read_twos_complement(bytes) {
            Ok(unscaled) => unscaled,
            Err(e) => {
                debug!(error = %e, "decimal kept in raw form");
                return Ok(raw.clone());
            }
        };
        Ok(Datum::Logical(LogicalValue::Decimal(Decimal::new(
            unscaled,
            schema.logical_type().scale(),
        ))))
    }
}
