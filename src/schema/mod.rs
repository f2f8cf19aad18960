// Schema module for schemata
//
// This module turns schema JSON into a validated type graph and back. It
// includes:
//
// 1. Node graph types with named-type references
// 2. Logical type annotations and the process-wide registry
// 3. The JSON schema compiler and its validation pass
// 4. Canonical JSON emission
// 5. Default literal checks and schema induction

// Re-export public types and functions
pub use self::types::{
    CustomAttributes, EnumNode, Field, FieldOrder, FixedNode, Name, NodeKind, RecordNode, Schema,
    SchemaKind, SymbolicNode,
};
pub use self::logical::{CustomLogicalType, LogicalType, LogicalTypeKind, LogicalTypeRegistry};
pub use self::parser::{compile_json_schema, ParserConfig, SchemaParser};
pub use self::validator::ValidSchema;
pub use self::inference::induce;

// Sub-modules
pub mod types;
pub mod logical;
pub mod parser;
pub mod validator;
pub mod emitter;
pub mod defaults;
pub mod inference;
pub mod utils;
