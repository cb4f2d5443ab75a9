//! runtime value representation
//!
//! A [RuntimeValue] is one closed sum type over all value tags:
//! - primitives: string, number (f64), boolean, null
//! - collections: array (ordered), object and block (string keyed)
//! - callables: function (see [crate::functions])
//! - structural placeholders: type/collection constructors, directives, meta-arguments
//! - expressions: a [ExpressionKind] wrapping its operand. Expressions are kept as structure and never reduced.
//!
//! [coerce] turns untyped JSON (as found in state files) plus a declared type name into a [RuntimeValue].
//! The declared type only governs the top level. Elements of lists and maps are coerced using their own JSON type,
//! because state files do not carry per-element types in a form we rely on.
use crate::functions::Function;
use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize, Serializer,
};
use serde_json::Value as Json;

/// Tag of a [RuntimeValue]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    String,
    Number,
    Boolean,
    Null,
    Array,
    Object,
    Function,
    Block,
    TypeConstructor,
    CollectionConstructor,
    Directive,
    MetaArgument,
    Ternary,
    Comparison,
    Logical,
    Arithmetic,
    NullCoalescing,
    Unary,
    Postfix,
    Pipe,
    ListComprehension,
    MapComprehension,
    Interpolation,
    LegacyInterpolation,
    Reference,
}

impl ValueType {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            ValueType::String | ValueType::Number | ValueType::Boolean | ValueType::Null
        )
    }

    pub fn is_expression(self) -> bool {
        ExpressionKind::try_from(self).is_ok()
    }
}

/// Expression tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExpressionKind {
    Ternary,
    Comparison,
    Logical,
    Arithmetic,
    NullCoalescing,
    Unary,
    Postfix,
    Pipe,
    ListComprehension,
    MapComprehension,
    Interpolation,
    LegacyInterpolation,
    Reference,
}

impl From<ExpressionKind> for ValueType {
    fn from(value: ExpressionKind) -> Self {
        match value {
            ExpressionKind::Ternary => ValueType::Ternary,
            ExpressionKind::Comparison => ValueType::Comparison,
            ExpressionKind::Logical => ValueType::Logical,
            ExpressionKind::Arithmetic => ValueType::Arithmetic,
            ExpressionKind::NullCoalescing => ValueType::NullCoalescing,
            ExpressionKind::Unary => ValueType::Unary,
            ExpressionKind::Postfix => ValueType::Postfix,
            ExpressionKind::Pipe => ValueType::Pipe,
            ExpressionKind::ListComprehension => ValueType::ListComprehension,
            ExpressionKind::MapComprehension => ValueType::MapComprehension,
            ExpressionKind::Interpolation => ValueType::Interpolation,
            ExpressionKind::LegacyInterpolation => ValueType::LegacyInterpolation,
            ExpressionKind::Reference => ValueType::Reference,
        }
    }
}

impl TryFrom<ValueType> for ExpressionKind {
    type Error = ValueType;

    fn try_from(value: ValueType) -> Result<Self, Self::Error> {
        Ok(match value {
            ValueType::Ternary => ExpressionKind::Ternary,
            ValueType::Comparison => ExpressionKind::Comparison,
            ValueType::Logical => ExpressionKind::Logical,
            ValueType::Arithmetic => ExpressionKind::Arithmetic,
            ValueType::NullCoalescing => ExpressionKind::NullCoalescing,
            ValueType::Unary => ExpressionKind::Unary,
            ValueType::Postfix => ExpressionKind::Postfix,
            ValueType::Pipe => ExpressionKind::Pipe,
            ValueType::ListComprehension => ExpressionKind::ListComprehension,
            ValueType::MapComprehension => ExpressionKind::MapComprehension,
            ValueType::Interpolation => ExpressionKind::Interpolation,
            ValueType::LegacyInterpolation => ExpressionKind::LegacyInterpolation,
            ValueType::Reference => ExpressionKind::Reference,
            other => return Err(other),
        })
    }
}

/// All possible runtime values
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Array(Vec<RuntimeValue>),
    Object(IndexMap<String, RuntimeValue>),
    Block(IndexMap<String, RuntimeValue>),
    Function(Function),
    /// `list(string)`, `object({...})`
    TypeConstructor {
        name: String,
        arguments: Vec<RuntimeValue>,
    },
    /// `tolist(...)`, `toset(...)`, `tomap(...)`
    CollectionConstructor {
        name: String,
        arguments: Vec<RuntimeValue>,
    },
    /// `%{ if ... }`, `%{ for ... }`
    Directive(String),
    /// `count`, `for_each`, `depends_on`, `provider`, `lifecycle`
    MetaArgument(String),
    /// Unevaluated expression structure
    Expression {
        kind: ExpressionKind,
        operand: Box<RuntimeValue>,
    },
}

impl RuntimeValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            RuntimeValue::String(_) => ValueType::String,
            RuntimeValue::Number(_) => ValueType::Number,
            RuntimeValue::Boolean(_) => ValueType::Boolean,
            RuntimeValue::Null => ValueType::Null,
            RuntimeValue::Array(_) => ValueType::Array,
            RuntimeValue::Object(_) => ValueType::Object,
            RuntimeValue::Block(_) => ValueType::Block,
            RuntimeValue::Function(_) => ValueType::Function,
            RuntimeValue::TypeConstructor { .. } => ValueType::TypeConstructor,
            RuntimeValue::CollectionConstructor { .. } => ValueType::CollectionConstructor,
            RuntimeValue::Directive(_) => ValueType::Directive,
            RuntimeValue::MetaArgument(_) => ValueType::MetaArgument,
            RuntimeValue::Expression { kind, .. } => (*kind).into(),
        }
    }

    pub fn expression(kind: ExpressionKind, operand: RuntimeValue) -> Self {
        RuntimeValue::Expression {
            kind,
            operand: Box::new(operand),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RuntimeValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a key of an object or block
    pub fn get(&self, key: &str) -> Option<&RuntimeValue> {
        match self {
            RuntimeValue::Object(map) | RuntimeValue::Block(map) => map.get(key),
            _ => None,
        }
    }

    /// Follow a path of keys (and numeric indices into arrays)
    pub fn get_path<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<&RuntimeValue> {
        path.into_iter().try_fold(self, |value, segment| match value {
            RuntimeValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            other => other.get(segment),
        })
    }

    /// Back to untyped JSON
    ///
    /// Non-finite numbers become `null`, placeholders become their rendered text.
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

/// Coerce untyped JSON into a [RuntimeValue] of the declared type
///
/// Total: unknown declared types produce a string holding the JSON text of `raw`.
pub fn coerce(raw: &Json, declared_type: &str) -> RuntimeValue {
    match declared_type {
        "string" => RuntimeValue::String(match raw {
            Json::String(s) => s.clone(),
            other => other.to_string(),
        }),
        "number" => RuntimeValue::Number(numeric(raw)),
        "bool" => RuntimeValue::Boolean(truthy(raw)),
        "list" | "tuple" | "set" => match raw {
            Json::Array(items) => RuntimeValue::Array(items.iter().map(coerce_inferred).collect()),
            _ => RuntimeValue::Array(vec![]),
        },
        "map" | "object" => match raw {
            Json::Object(entries) => RuntimeValue::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), coerce_inferred(value)))
                    .collect(),
            ),
            _ => RuntimeValue::Object(IndexMap::new()),
        },
        _ => {
            tracing::trace!(declared_type, "unrecognized declared type, falling back to string");
            RuntimeValue::String(raw.to_string())
        }
    }
}

/// Coerce using the JSON type of `raw` itself as declared type
fn coerce_inferred(raw: &Json) -> RuntimeValue {
    coerce(raw, json_type_name(raw))
}

/// Type name used when an element is coerced without a declared type
///
/// `null` is not a declared type [coerce] knows, so null elements take the string fallback.
pub fn json_type_name(raw: &Json) -> &'static str {
    match raw {
        Json::String(_) => "string",
        Json::Number(_) => "number",
        Json::Bool(_) => "bool",
        Json::Array(_) => "list",
        Json::Object(_) => "object",
        Json::Null => "null",
    }
}

/// Numbers stay numbers, numeric strings are parsed, booleans are 1/0, everything else is NaN
fn numeric(raw: &Json) -> f64 {
    match raw {
        Json::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Json::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        Json::Bool(b) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

/// `false`, `null`, `0`, NaN and `""` are false, everything else (including empty collections) is true
fn truthy(raw: &Json) -> bool {
    match raw {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Json::String(s) => !s.is_empty(),
        Json::Array(_) | Json::Object(_) => true,
    }
}

impl From<String> for RuntimeValue {
    fn from(value: String) -> Self {
        RuntimeValue::String(value)
    }
}

impl From<&str> for RuntimeValue {
    fn from(value: &str) -> Self {
        RuntimeValue::String(value.to_string())
    }
}

impl From<bool> for RuntimeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<f64> for RuntimeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<Function> for RuntimeValue {
    fn from(value: Function) -> Self {
        Self::Function(value)
    }
}

impl<T: Into<RuntimeValue>> From<Vec<T>> for RuntimeValue {
    fn from(value: Vec<T>) -> Self {
        RuntimeValue::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<RuntimeValue>> From<IndexMap<K, V>> for RuntimeValue {
    fn from(value: IndexMap<K, V>) -> Self {
        RuntimeValue::Object(
            value
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for RuntimeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RuntimeValue::String(value) => serializer.serialize_str(value),
            RuntimeValue::Number(value) => serializer.serialize_f64(*value),
            RuntimeValue::Boolean(value) => serializer.serialize_bool(*value),
            RuntimeValue::Null => serializer.serialize_unit(),
            RuntimeValue::Array(value) => {
                let mut ser = serializer.serialize_seq(Some(value.len()))?;
                for element in value {
                    ser.serialize_element(element)?;
                }
                ser.end()
            }
            RuntimeValue::Object(value) | RuntimeValue::Block(value) => {
                let mut ser = serializer.serialize_map(Some(value.len()))?;
                for (element_key, element_value) in value {
                    ser.serialize_entry(element_key, element_value)?;
                }
                ser.end()
            }
            RuntimeValue::Expression { operand, .. } => operand.serialize(serializer),
            placeholder => serializer.serialize_str(&placeholder.to_string()),
        }
    }
}

/// HCL-like rendering, used for hover text
impl std::fmt::Display for RuntimeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeValue::String(value) => write!(f, "{value:?}"),
            RuntimeValue::Number(value) if value.fract() == 0.0 && value.abs() < 1e15 => {
                write!(f, "{}", *value as i64)
            }
            RuntimeValue::Number(value) => write!(f, "{value}"),
            RuntimeValue::Boolean(value) => write!(f, "{value}"),
            RuntimeValue::Null => f.write_str("null"),
            RuntimeValue::Array(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            RuntimeValue::Object(entries) | RuntimeValue::Block(entries) => {
                if entries.is_empty() {
                    return f.write_str("{}");
                }
                f.write_str("{ ")?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key} = {value}")?;
                }
                f.write_str(" }")
            }
            RuntimeValue::Function(function) => write!(f, "{}()", function.name()),
            RuntimeValue::TypeConstructor { name, arguments }
            | RuntimeValue::CollectionConstructor { name, arguments } => {
                write!(f, "{name}(")?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(")")
            }
            RuntimeValue::Directive(directive) => write!(f, "%{{ {directive} }}"),
            RuntimeValue::MetaArgument(name) => f.write_str(name),
            RuntimeValue::Expression { operand, .. } => write!(f, "{operand}"),
        }
    }
}
