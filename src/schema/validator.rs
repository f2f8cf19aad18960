// Schema validator for schemata
//
// This module turns a node graph into a `ValidSchema`: every named type is
// registered once, every symbolic reference is bound to its definition and
// every field default is checked against its field type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::internal::error::{Error, Result};
use crate::schema::defaults::is_valid_default;
use crate::schema::types::{NodeKind, Schema};

/// A schema whose references are bound and whose defaults are valid.
///
/// Cloning is cheap; the graph and the name registry are shared.
#[derive(Debug, Clone)]
pub struct ValidSchema {
    root: Schema,
    names: Arc<HashMap<String, Schema>>,
}

impl ValidSchema {
    /// Validates a graph built programmatically or by the compiler.
    pub fn new(root: Schema) -> Result<Self> {
        Self::with_default_check(root, true)
    }

    /// Validates a graph, optionally skipping the default-value check.
    pub fn with_default_check(root: Schema, check_defaults: bool) -> Result<Self> {
        let mut binder = Binder::default();
        binder.collect(&root);
        if let Some(duplicate) = binder.duplicate {
            return Err(Error::validation(format!(
                "Type '{}' is defined more than once",
                duplicate
            )));
        }

        if let Some(early) = binder
            .early_references
            .iter()
            .find(|fullname| binder.names.contains_key(*fullname))
        {
            return Err(Error::validation(format!(
                "Name '{}' is referenced before its definition",
                early
            )));
        }

        // Definitions are all known now; bind references
        for reference in &binder.references {
            if let NodeKind::Symbolic(symbolic) = reference.node() {
                let fullname = symbolic.name().fullname();
                let target = binder.names.get(&fullname).ok_or_else(|| {
                    Error::validation(format!("Undefined name: '{}'", fullname))
                })?;
                symbolic.bind(target)?;
            }
        }

        if check_defaults {
            for definition in binder.names.values() {
                check_field_defaults(definition)?;
            }
        }

        debug!(
            named_types = binder.names.len(),
            references = binder.references.len(),
            "schema validated"
        );
        Ok(Self {
            root,
            names: Arc::new(binder.names),
        })
    }

    /// The root node.
    pub fn root(&self) -> &Schema {
        &self.root
    }

    /// Looks up a named type by full name.
    pub fn named(&self, fullname: &str) -> Option<&Schema> {
        self.names.get(fullname)
    }

    /// Full names of all named types, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    /// Emits canonical JSON for the root node.
    pub fn to_json(&self, pretty: bool) -> String {
        self.root.to_json(pretty)
    }
}

impl fmt::Display for ValidSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.root, f)
    }
}

#[derive(Default)]
struct Binder {
    names: HashMap<String, Schema>,
    references: Vec<Schema>,
    // Names used before the traversal reached their definition
    early_references: Vec<String>,
    duplicate: Option<String>,
}

impl Binder {
    fn collect(&mut self, schema: &Schema) {
        if let Some(name) = schema.name() {
            if schema.kind().is_named() {
                let fullname = name.fullname();
                match self.names.get(&fullname) {
                    // The same definition shared twice is not a redefinition
                    Some(existing) if existing.ptr_eq(schema) => return,
                    Some(_) => {
                        self.duplicate.get_or_insert(fullname);
                        return;
                    }
                    None => {
                        self.names.insert(fullname, schema.clone());
                    }
                }
            }
        }

        match schema.node() {
            NodeKind::Record(record) => {
                for field in record.fields() {
                    self.collect(field.schema());
                }
            }
            NodeKind::Array(inner) | NodeKind::Map(inner) => self.collect(inner),
            NodeKind::Union(branches) => {
                for branch in branches {
                    self.collect(branch);
                }
            }
            NodeKind::Symbolic(symbolic) => {
                let fullname = symbolic.name().fullname();
                if !self.names.contains_key(&fullname) {
                    self.early_references.push(fullname);
                }
                self.references.push(schema.clone());
            }
            _ => {}
        }
    }
}

fn check_field_defaults(schema: &Schema) -> Result<()> {
    let Some(record) = schema.as_record() else {
        return Ok(());
    };
    for field in record.fields() {
        if let Some(default) = field.default_value() {
            if !is_valid_default(field.schema(), default) {
                return Err(Error::validation_at(
                    format!(
                        "Invalid default for field '{}' of type {} in record '{}'",
                        field.name(),
                        field.schema().type_name(),
                        record.name()
                    ),
                    default,
                ));
            }
        }
    }
    Ok(())
}
