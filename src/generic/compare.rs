// Schema-driven ordering of datums
//
// The order agrees with a byte-wise comparison of the binary encoding:
// records by declared fields, enums by ordinal, arrays lexicographically,
// unions by branch index first.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::codec::types::Datum;
use crate::generic::{GenericData, NULL_DATUM};
use crate::internal::error::{Error, Result};
use crate::schema::types::{FieldOrder, NodeKind, Schema};

impl GenericData {
    /// Compares two datums of `schema`.
    ///
    /// With `equals_only` set, maps are compared for equality (unequal maps
    /// report `Greater`); without it, comparing maps is an error since they
    /// have no order.
    pub fn compare(&self, a: &Datum, b: &Datum, schema: &Schema, equals_only: bool) -> Result<Ordering> {
        if let (Datum::Record(x), Datum::Record(y)) = (a, b) {
            if Arc::ptr_eq(x, y) {
                return Ok(Ordering::Equal);
            }
        }
        let schema = schema.resolve()?;

        if let NodeKind::Union(branches) = schema.node() {
            let i = self.resolve_union(&schema, a)?;
            let j = self.resolve_union(&schema, b)?;
            if i != j {
                return Ok(i.cmp(&j));
            }
            return self.compare(a, b, &branches[i], equals_only);
        }

        if matches!(a, Datum::Logical(_)) || matches!(b, Datum::Logical(_)) {
            let a = self.raw_operand(&schema, a)?;
            let b = self.raw_operand(&schema, b)?;
            return self.compare(&a, &b, &schema, equals_only);
        }

        match (schema.node(), a, b) {
            (NodeKind::Record(record), Datum::Record(x), Datum::Record(y)) => {
                let xs = x.values();
                let ys = y.values();
                for field in record.fields() {
                    if field.order() == FieldOrder::Ignore {
                        continue;
                    }
                    let position = field.position();
                    let ordering = self.compare(
                        xs.get(position).unwrap_or(&NULL_DATUM),
                        ys.get(position).unwrap_or(&NULL_DATUM),
                        field.schema(),
                        equals_only,
                    )?;
                    if ordering != Ordering::Equal {
                        return Ok(match field.order() {
                            FieldOrder::Descending => ordering.reverse(),
                            _ => ordering,
                        });
                    }
                }
                Ok(Ordering::Equal)
            }
            (NodeKind::Enum(node), Datum::Enum(x), Datum::Enum(y)) => {
                let ordinal = |symbol: &str| {
                    node.ordinal(symbol).ok_or_else(|| {
                        Error::TypeMismatch(format!("'{}' is not a symbol of {}", symbol, node.name()))
                    })
                };
                Ok(ordinal(x.symbol())?.cmp(&ordinal(y.symbol())?))
            }
            (NodeKind::Array(items), Datum::Array(xs), Datum::Array(ys)) => {
                for (x, y) in xs.iter().zip(ys) {
                    let ordering = self.compare(x, y, items, equals_only)?;
                    if ordering != Ordering::Equal {
                        return Ok(ordering);
                    }
                }
                Ok(xs.len().cmp(&ys.len()))
            }
            (NodeKind::Map(values), Datum::Map(xs), Datum::Map(ys)) => {
                if !equals_only {
                    return Err(Error::TypeMismatch("Maps have no order and can only be tested for equality".to_string()));
                }
                if xs.len() != ys.len() {
                    return Ok(Ordering::Greater);
                }
                for (key, x) in xs {
                    let Some(y) = ys.get(key) else {
                        return Ok(Ordering::Greater);
                    };
                    if self.compare(x, y, values, true)? != Ordering::Equal {
                        return Ok(Ordering::Greater);
                    }
                }
                Ok(Ordering::Equal)
            }
            (NodeKind::Fixed(_), Datum::Fixed(x), Datum::Fixed(y)) => Ok(x.bytes().cmp(y.bytes())),
            (NodeKind::Bytes, Datum::Bytes(x), Datum::Bytes(y)) => Ok(x.cmp(y)),
            (NodeKind::String, x, y) => match (x.string_bytes(), y.string_bytes()) {
                (Some(x), Some(y)) => Ok(x.cmp(y)),
                _ => Err(mismatch(&schema, a, b)),
            },
            (NodeKind::Int, Datum::Int(x), Datum::Int(y)) => Ok(x.cmp(y)),
            (NodeKind::Long, Datum::Long(x), Datum::Long(y)) => Ok(x.cmp(y)),
            (NodeKind::Float, Datum::Float(x), Datum::Float(y)) => Ok(x.total_cmp(y)),
            (NodeKind::Double, Datum::Double(x), Datum::Double(y)) => Ok(x.total_cmp(y)),
            (NodeKind::Boolean, Datum::Boolean(x), Datum::Boolean(y)) => Ok(x.cmp(y)),
            (NodeKind::Null, Datum::Null, Datum::Null) => Ok(Ordering::Equal),
            _ => Err(mismatch(&schema, a, b)),
        }
    }
}

fn mismatch(schema: &Schema, a: &Datum, b: &Datum) -> Error {
    Error::TypeMismatch(format!(
        "Cannot compare {} and {} as {}",
        a.schema_name().unwrap_or_else(|| "logical value".to_string()),
        b.schema_name().unwrap_or_else(|| "logical value".to_string()),
        schema.type_name()
    ))
}
