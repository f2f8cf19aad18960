// Schema induction for schemata
//
// Derives the schema a datum is an instance of. Named values carry their own
// schema; aggregates induce their element schema and require every element
// to agree on it.

use crate::codec::types::Datum;
use crate::generic::GenericData;
use crate::internal::error::{Error, Result};
use crate::schema::types::{Schema, SchemaKind};

/// Induces the schema of `datum`.
pub fn induce(datum: &Datum) -> Result<Schema> {
    match datum {
        Datum::Record(record) => Ok(record.schema().clone()),
        Datum::Enum(symbol) => Ok(symbol.schema().clone()),
        Datum::Fixed(fixed) => Ok(fixed.schema().clone()),
        Datum::Array(elements) => {
            let items = induce_common(elements.iter(), "No mixed type arrays")?
                .ok_or_else(|| Error::TypeMismatch("Empty array: cannot induce item schema".to_string()))?;
            Ok(Schema::array(items))
        }
        Datum::Map(entries) => {
            let values = induce_common(entries.values(), "No mixed type map values")?
                .ok_or_else(|| Error::TypeMismatch("Empty map: cannot induce value schema".to_string()))?;
            Ok(Schema::map(values))
        }
        Datum::Null => Schema::primitive(SchemaKind::Null),
        Datum::Boolean(_) => Schema::primitive(SchemaKind::Boolean),
        Datum::Int(_) => Schema::primitive(SchemaKind::Int),
        Datum::Long(_) => Schema::primitive(SchemaKind::Long),
        Datum::Float(_) => Schema::primitive(SchemaKind::Float),
        Datum::Double(_) => Schema::primitive(SchemaKind::Double),
        Datum::Bytes(_) => Schema::primitive(SchemaKind::Bytes),
        Datum::String(_) | Datum::Utf8(_) => Schema::primitive(SchemaKind::String),
        Datum::Logical(value) => Err(Error::TypeMismatch(format!(
            "Cannot induce a schema for a converted {} value",
            value.representation()
        ))),
    }
}

fn induce_common<'a>(
    elements: impl Iterator<Item = &'a Datum>,
    mixed: &str,
) -> Result<Option<Schema>> {
    let mut common: Option<Schema> = None;
    for element in elements {
        let schema = induce(element)?;
        match &common {
            None => common = Some(schema),
            Some(existing) if *existing != schema => {
                return Err(Error::TypeMismatch(format!(
                    "{}: found {} and {}",
                    mixed,
                    existing.type_name(),
                    schema.type_name()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(common)
}

impl GenericData {
    /// Induces the schema of `datum`; see [`induce`].
    pub fn induce(&self, datum: &Datum) -> Result<Schema> {
        induce(datum)
    }
}
