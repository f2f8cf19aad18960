// Utility functions for the schema module
//
// This module provides shared helpers used by the compiler, the type graph
// and the logical type checks.

use serde_json::Value;

/// Checks a simple (undotted) type name.
///
/// Names must be non-empty, must not start with a digit and may not contain
/// whitespace or dots. Other punctuation such as `$` is tolerated.
pub fn is_valid_simple_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(first) if first.is_ascii_digit() => false,
        Some(first) => {
            is_name_char(first) && chars.all(is_name_char)
        }
    }
}

fn is_name_char(c: char) -> bool {
    !c.is_whitespace() && c != '.' && c != '"'
}

/// Checks a dotted namespace; every segment must be a valid simple name.
pub fn is_valid_namespace(namespace: &str) -> bool {
    namespace.split('.').all(is_valid_simple_name)
}

/// Largest decimal precision a two's-complement fixed of `size` bytes can hold.
///
/// This is `floor(log10(2^(8 * size - 1) - 1))`.
pub fn max_decimal_precision(size: usize) -> u64 {
    if size == 0 {
        return 0;
    }
    let bits = size as f64 * 8.0 - 1.0;
    (bits * std::f64::consts::LOG10_2).floor() as u64
}

/// Short description of a JSON value's kind, for error messages.
pub fn json_kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Returns true when a JSON number is written as an integer literal.
pub fn is_integer_literal(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64() || n.is_u64(),
        _ => false,
    }
}

/// Converts a string of code points 0-255 into bytes (ISO-8859-1).
///
/// Returns `None` if any character is outside that range.
pub fn latin1_bytes(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).ok())
        .collect()
}

/// Converts bytes to a string with one code point per byte (ISO-8859-1).
pub fn latin1_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_names() {
        assert!(is_valid_simple_name("LongList"));
        assert!(is_valid_simple_name("_x1"));
        assert!(is_valid_simple_name("b$"));
        assert!(!is_valid_simple_name(""));
        assert!(!is_valid_simple_name("1abc"));
        assert!(!is_valid_simple_name("has space"));
        assert!(!is_valid_simple_name("a.b"));
    }

    #[test]
    fn test_namespaces() {
        assert!(is_valid_namespace("org.apache.hadoop.avro"));
        assert!(is_valid_namespace("a.b$"));
        assert!(!is_valid_namespace("a..b"));
    }

    #[test]
    fn test_max_decimal_precision() {
        assert_eq!(max_decimal_precision(1), 2);
        assert_eq!(max_decimal_precision(4), 9);
        assert_eq!(max_decimal_precision(8), 18);
        assert_eq!(max_decimal_precision(16), 38);
        assert_eq!(max_decimal_precision(129), 310);
        assert!(max_decimal_precision(usize::MAX) > 310);
        assert!(max_decimal_precision(1 << 62) > 0);
    }

    #[test]
    fn test_integer_literals() {
        assert!(is_integer_literal(&json!(2)));
        assert!(is_integer_literal(&json!(-7)));
        assert!(!is_integer_literal(&json!(2.5)));
        assert!(!is_integer_literal(&json!("2")));
    }

    #[test]
    fn test_latin1() {
        assert_eq!(latin1_bytes("\u{00ff}a").unwrap(), vec![0xff, b'a']);
        assert!(latin1_bytes("\u{0100}").is_none());
        assert_eq!(latin1_string(&[0xe9, b'b']), "\u{00e9}b");
    }
}
