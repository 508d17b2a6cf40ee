//! Value model for expression operands and results

use crate::error::{ExpressionError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Expression value that can hold different types.
///
/// `Undefined` is what a field path resolves to when any segment is missing
/// or walks through a non-object. It is distinct from an explicit JSON `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "Json", from = "Json")]
pub enum ExpressionValue {
    /// Absent field
    Undefined,
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// String value
    String(String),
    /// Array of values
    Array(Vec<ExpressionValue>),
    /// Object with key-value pairs
    Object(HashMap<String, ExpressionValue>),
}

impl ExpressionValue {
    /// Create a null value
    pub fn null() -> Self {
        Self::Null
    }

    /// Create a boolean value
    pub fn bool(value: bool) -> Self {
        Self::Bool(value)
    }

    /// Create an integer value
    pub fn int(value: i64) -> Self {
        Self::Int(value)
    }

    /// Create a float value
    pub fn float(value: f64) -> Self {
        Self::Float(value)
    }

    /// Create a string value
    pub fn string(value: impl Into<String>) -> Self {
        Self::String(value.into())
    }

    /// Convert a borrowed JSON value
    pub fn from_json(value: &Json) -> Self {
        match value {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    n.as_f64().map(Self::Float).unwrap_or(Self::Null)
                }
            }
            Json::String(s) => Self::String(s.clone()),
            Json::Array(items) => Self::Array(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Get the type of this value
    pub fn get_type(&self) -> ExpressionType {
        match self {
            Self::Undefined => ExpressionType::Undefined,
            Self::Null => ExpressionType::Null,
            Self::Bool(_) => ExpressionType::Bool,
            Self::Int(_) => ExpressionType::Int,
            Self::Float(_) => ExpressionType::Float,
            Self::String(_) => ExpressionType::String,
            Self::Array(_) => ExpressionType::Array,
            Self::Object(_) => ExpressionType::Object,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Boolean coercion used by `&&`, `||`, `!` and ternary conditions
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0 && !f.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
            Self::Object(o) => !o.is_empty(),
        }
    }

    /// Try to convert to boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to convert to number (float)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality as defined by `==`.
    ///
    /// Ints and floats compare by exact numeric value. A missing field equals an explicit
    /// `null`, but two missing fields are never equal. Any other cross-type
    /// pair is unequal.
    pub fn equals(&self, other: &ExpressionValue) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => false,
            (Self::Undefined, Self::Null) | (Self::Null, Self::Undefined) => true,
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => {
                compare_int_float(*i, *f) == Some(Ordering::Equal)
            }
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.equals(other)))
            }
            _ => false,
        }
    }

    /// Ordering used by `<`, `<=`, `>` and `>=`.
    ///
    /// Returns `Ok(None)` when either side is `undefined` or the numbers are
    /// unordered (NaN); the comparison then evaluates to `false`. Only numbers
    /// and strings can be ordered, every other pair is a type error.
    pub fn compare(&self, other: &ExpressionValue, operation: &str) -> Result<Option<Ordering>> {
        match (self, other) {
            (Self::Undefined, _) | (_, Self::Undefined) => Ok(None),
            (Self::Int(a), Self::Int(b)) => Ok(Some(a.cmp(b))),
            (Self::Int(i), Self::Float(f)) => Ok(compare_int_float(*i, *f)),
            (Self::Float(f), Self::Int(i)) => Ok(compare_int_float(*i, *f).map(Ordering::reverse)),
            (Self::Float(a), Self::Float(b)) => Ok(a.partial_cmp(b)),
            (Self::String(a), Self::String(b)) => Ok(Some(a.cmp(b))),
            _ => Err(ExpressionError::unsupported_operation(
                operation,
                self.get_type(),
                other.get_type(),
            )),
        }
    }

    /// Convert to string representation
    pub fn to_string_repr(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Array(a) => {
                let items: Vec<String> = a.iter().map(|v| v.to_string_repr()).collect();
                format!("[{}]", items.join(", "))
            }
            Self::Object(o) => {
                let mut items: Vec<String> = o
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_string_repr()))
                    .collect();
                items.sort();
                format!("{{{}}}", items.join(", "))
            }
        }
    }
}

impl fmt::Display for ExpressionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "'{s}'"),
            other => write!(f, "{}", other.to_string_repr()),
        }
    }
}

impl From<Json> for ExpressionValue {
    fn from(value: Json) -> Self {
        Self::from_json(&value)
    }
}

impl From<ExpressionValue> for Json {
    fn from(value: ExpressionValue) -> Self {
        match value {
            ExpressionValue::Undefined | ExpressionValue::Null => Json::Null,
            ExpressionValue::Bool(b) => Json::Bool(b),
            ExpressionValue::Int(i) => Json::Number(i.into()),
            ExpressionValue::Float(f) => serde_json::Number::from_f64(f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            ExpressionValue::String(s) => Json::String(s),
            ExpressionValue::Array(arr) => Json::Array(arr.into_iter().map(Json::from).collect()),
            ExpressionValue::Object(obj) => {
                Json::Object(obj.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
            }
        }
    }
}

/// Orders an int against a float without rounding the int through `f64`.
/// `None` when the float is NaN.
fn compare_int_float(i: i64, f: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if f.is_nan() {
        return None;
    }
    if f >= LIMIT {
        return Some(Ordering::Less);
    }
    if f < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal if f > whole => Some(Ordering::Less),
        Ordering::Equal if f < whole => Some(Ordering::Greater),
        ordering => Some(ordering),
    }
}

/// Expression type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionType {
    Undefined,
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Object,
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        };
        write!(f, "{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_truthiness_table() {
        let fixture = vec![
            (ExpressionValue::Undefined, false),
            (ExpressionValue::Null, false),
            (ExpressionValue::bool(false), false),
            (ExpressionValue::bool(true), true),
            (ExpressionValue::int(0), false),
            (ExpressionValue::int(-3), true),
            (ExpressionValue::float(0.0), false),
            (ExpressionValue::float(f64::NAN), false),
            (ExpressionValue::float(0.5), true),
            (ExpressionValue::string(""), false),
            (ExpressionValue::string("x"), true),
            (ExpressionValue::Array(vec![]), false),
            (ExpressionValue::from(json!({"a": 1})), true),
        ];

        for (value, expected) in fixture {
            let actual = value.is_truthy();
            assert_eq!(actual, expected, "truthiness of {value}");
        }
    }

    #[test]
    fn test_numeric_equality_across_int_and_float() {
        let fixture_a = ExpressionValue::int(42);
        let fixture_b = ExpressionValue::float(42.0);
        let actual = fixture_a.equals(&fixture_b);
        let expected = true;
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_int_float_comparison_is_exact() {
        // 2^53 + 1 has no f64 representation and rounds to 2^53
        let fixture = ExpressionValue::int(9_007_199_254_740_993);
        let other = ExpressionValue::float(9_007_199_254_740_992.0);

        assert!(!fixture.equals(&other));
        assert!(!other.equals(&fixture));

        let actual = fixture.compare(&other, ">").unwrap();
        let expected = Some(Ordering::Greater);
        assert_eq!(actual, expected);

        let actual = other.compare(&fixture, "<").unwrap();
        let expected = Some(Ordering::Less);
        assert_eq!(actual, expected);

        let fixture = vec![
            (ExpressionValue::int(3), ExpressionValue::float(3.5), Some(Ordering::Less)),
            (ExpressionValue::int(-3), ExpressionValue::float(-3.5), Some(Ordering::Greater)),
            (ExpressionValue::int(i64::MAX), ExpressionValue::float(9.3e18), Some(Ordering::Less)),
            (ExpressionValue::int(i64::MIN), ExpressionValue::float(-9.3e18), Some(Ordering::Greater)),
            (ExpressionValue::int(1), ExpressionValue::float(f64::NAN), None),
        ];
        for (left, right, expected) in fixture {
            let actual = left.compare(&right, "<").unwrap();
            assert_eq!(actual, expected, "{left} vs {right}");
        }
    }

    #[test]
    fn test_cross_type_equality_is_false() {
        let fixture_a = ExpressionValue::int(1);
        let fixture_b = ExpressionValue::string("1");
        let actual = fixture_a.equals(&fixture_b);
        let expected = false;
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_string_equality_is_case_sensitive() {
        let fixture_a = ExpressionValue::string("Enterprise");
        let fixture_b = ExpressionValue::string("enterprise");
        let actual = fixture_a.equals(&fixture_b);
        let expected = false;
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_absent_equality() {
        assert!(ExpressionValue::Undefined.equals(&ExpressionValue::Null));
        assert!(ExpressionValue::Null.equals(&ExpressionValue::Undefined));
        assert!(ExpressionValue::Null.equals(&ExpressionValue::Null));
        assert!(!ExpressionValue::Undefined.equals(&ExpressionValue::Undefined));
        assert!(!ExpressionValue::Undefined.equals(&ExpressionValue::string("x")));
    }

    #[test]
    fn test_deep_equality() {
        let fixture_a = ExpressionValue::from(json!({"items": [1, 2.0, {"k": "v"}]}));
        let fixture_b = ExpressionValue::from(json!({"items": [1.0, 2, {"k": "v"}]}));
        let actual = fixture_a.equals(&fixture_b);
        let expected = true;
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_compare_numbers_and_strings() {
        let actual = ExpressionValue::int(10)
            .compare(&ExpressionValue::float(20.5), "<")
            .unwrap();
        assert_eq!(actual, Some(Ordering::Less));

        let actual = ExpressionValue::string("b")
            .compare(&ExpressionValue::string("a"), ">")
            .unwrap();
        assert_eq!(actual, Some(Ordering::Greater));
    }

    #[test]
    fn test_compare_undefined_is_unordered() {
        let fixture = ExpressionValue::Undefined;
        let actual = fixture.compare(&ExpressionValue::int(5), ">").unwrap();
        let expected = None;
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_compare_mismatched_types_is_type_error() {
        let fixture = ExpressionValue::string("10");
        let actual = fixture.compare(&ExpressionValue::int(5), ">");
        assert!(matches!(actual, Err(ExpressionError::TypeError { .. })));

        let actual = ExpressionValue::Null.compare(&ExpressionValue::int(5), "<");
        assert!(matches!(actual, Err(ExpressionError::TypeError { .. })));
    }

    #[test]
    fn test_from_json() {
        let fixture = json!({"name": "John", "age": 30, "score": 1.5});
        let actual = ExpressionValue::from(fixture);
        let expected = ExpressionValue::Object(HashMap::from([
            ("name".to_string(), ExpressionValue::string("John")),
            ("age".to_string(), ExpressionValue::int(30)),
            ("score".to_string(), ExpressionValue::float(1.5)),
        ]));
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_to_json_maps_undefined_to_null() {
        let fixture = ExpressionValue::Array(vec![
            ExpressionValue::Undefined,
            ExpressionValue::int(1),
        ]);
        let actual = Json::from(fixture);
        let expected = json!([null, 1]);
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_serializes_as_plain_json() {
        let fixture = ExpressionValue::string("A1");
        let actual = serde_json::to_string(&fixture).unwrap();
        let expected = "\"A1\"";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_display() {
        let fixture = ExpressionValue::Array(vec![
            ExpressionValue::int(1),
            ExpressionValue::string("hello"),
        ]);
        let actual = format!("{fixture}");
        let expected = "[1, hello]";
        assert_eq!(actual, expected);

        let actual = format!("{}", ExpressionValue::string("x"));
        let expected = "'x'";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_expression_type_display() {
        let fixture = ExpressionType::Undefined;
        let actual = format!("{fixture}");
        let expected = "undefined";
        assert_eq!(actual, expected);
    }
}
