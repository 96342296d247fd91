//! Value types for provider elements.
//!
//! This module provides the [`Value`] enum that represents every element a
//! provider can expose: leaf primitives, ordered collections, keyed structures
//! and invocable operations.

use std::{collections::BTreeMap, fmt, sync::Arc};

use base64ct::{Base64, Encoding};

use crate::{Result, provider::ProviderError};

/// JSON key marking an encoded byte string.
pub const BYTES_TAG: &str = "@bytes";

/// JSON key marking an operation that cannot travel as data.
pub const OPERATION_TAG: &str = "@operation";

/// Signature of the function behind an [`Operation`].
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value> + Send + Sync;

/// An invocable leaf element.
///
/// Operations take zero or more argument values and return one value:
/// `Value::Null` for "no result", a `Value::Collection` for many results.
/// Two operations are equal only if they share the same underlying function.
#[derive(Clone)]
pub struct Operation {
    func: Arc<OperationFn>,
}

impl Operation {
    /// Wrap a function as an operation.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
        }
    }

    /// A placeholder for an operation that lives on a remote peer.
    ///
    /// Reading an operation over a transport yields this stub; the operation has to
    /// be invoked through the provider that owns it.
    pub fn remote() -> Self {
        Self::new(|_| {
            Err(ProviderError::Unsupported {
                operation: "invoke".to_string(),
                path: "<remote operation>".to_string(),
            }
            .into())
        })
    }

    /// Invoke the operation.
    pub fn call(&self, args: Vec<Value>) -> Result<Value> {
        (self.func)(args)
    }
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Operation")
    }
}

/// Values exposed by providers.
///
/// # Value Types
///
/// ## Leaf Values
/// - [`Value::Null`], [`Value::Bool`], [`Value::Int`], [`Value::Float`],
///   [`Value::Text`], [`Value::Bytes`]
///
/// ## Containers
/// - [`Value::Collection`] - Ordered members, never addressed by index
/// - [`Value::Structure`] - Named children
///
/// ## Invocables
/// - [`Value::Operation`] - Invoked rather than read
///
/// ```
/// # use vab::Value;
/// let number = Value::Int(42);
/// assert!(number == 42);
/// assert!(Value::from("hello") == "hello");
/// assert!(Value::from(true) == true);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null/empty value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text string value
    Text(String),
    /// Raw binary value
    Bytes(Vec<u8>),
    /// Ordered collection of values
    Collection(Vec<Value>),
    /// Named children
    Structure(BTreeMap<String, Value>),
    /// Invocable operation
    Operation(Operation),
}

impl Value {
    /// An empty structure.
    pub fn structure() -> Self {
        Value::Structure(BTreeMap::new())
    }

    /// An empty collection.
    pub fn collection() -> Self {
        Value::Collection(Vec::new())
    }

    /// Returns true if this is a leaf primitive.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Null
                | Value::Bool(_)
                | Value::Int(_)
                | Value::Float(_)
                | Value::Text(_)
                | Value::Bytes(_)
        )
    }

    /// Returns true if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Collection(_) => "collection",
            Value::Structure(_) => "structure",
            Value::Operation(_) => "operation",
        }
    }

    /// Attempts to convert to a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Attempts to convert to an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Attempts to convert to a float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Attempts to convert to a string
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Attempts to view as a collection
    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(items) => Some(items),
            _ => None,
        }
    }

    /// Attempts to view as a structure
    pub fn as_structure(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Structure(map) => Some(map),
            _ => None,
        }
    }

    /// Attempts to view as a mutable structure
    pub fn as_structure_mut(&mut self) -> Option<&mut BTreeMap<String, Value>> {
        match self {
            Value::Structure(map) => Some(map),
            _ => None,
        }
    }

    /// Attempts to view as an operation
    pub fn as_operation(&self) -> Option<&Operation> {
        match self {
            Value::Operation(op) => Some(op),
            _ => None,
        }
    }

    /// Builder-style insert for structures. Non-structures are replaced by a structure.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        if !matches!(self, Value::Structure(_)) {
            self = Value::structure();
        }
        if let Value::Structure(map) = &mut self {
            map.insert(key.into(), value.into());
        }
        self
    }

    /// Converts to the JSON form used on every transport.
    ///
    /// Byte strings become `{"@bytes": "<base64>"}` and operations become
    /// `{"@operation": true}`; everything else maps onto its natural JSON type.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => {
                let mut map = serde_json::Map::new();
                map.insert(BYTES_TAG.to_string(), Json::String(Base64::encode_string(bytes)));
                Json::Object(map)
            }
            Value::Collection(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Structure(map) => Json::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
            Value::Operation(_) => {
                let mut map = serde_json::Map::new();
                map.insert(OPERATION_TAG.to_string(), Json::Bool(true));
                Json::Object(map)
            }
        }
    }

    /// Converts from the JSON form produced by [`Value::to_json`].
    ///
    /// Integral JSON numbers become `Int`, all other numbers `Float`.
    pub fn from_json(json: serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => {
                Value::Collection(items.into_iter().map(Value::from_json).collect())
            }
            Json::Object(mut map) => {
                if map.len() == 1 {
                    if let Some(Json::String(encoded)) = map.get(BYTES_TAG)
                        && let Ok(bytes) = Base64::decode_vec(encoded)
                    {
                        return Value::Bytes(bytes);
                    }
                    if let Some(Json::Bool(true)) = map.get(OPERATION_TAG) {
                        return Value::Operation(Operation::remote());
                    }
                }
                Value::Structure(
                    std::mem::take(&mut map)
                        .into_iter()
                        .map(|(key, value)| (key, Value::from_json(value)))
                        .collect(),
                )
            }
        }
    }

    /// Serializes to JSON text.
    ///
    /// Non-finite floats are written as `null`; use [`Value::encode`] where the
    /// text has to read back as the same value.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Serializes to JSON text, failing `Malformed` at `path` for a value
    /// holding a NaN or infinite float, which JSON cannot represent.
    pub fn encode(&self, path: &str) -> Result<String> {
        if !self.is_json_representable() {
            return Err(
                ProviderError::malformed(path, "non-finite floats have no JSON form").into(),
            );
        }
        Ok(self.to_json_string())
    }

    fn is_json_representable(&self) -> bool {
        match self {
            Value::Float(n) => n.is_finite(),
            Value::Collection(items) => items.iter().all(Value::is_json_representable),
            Value::Structure(map) => map.values().all(Value::is_json_representable),
            _ => true,
        }
    }

    /// Parses JSON text.
    pub fn from_json_str(text: &str) -> Result<Value> {
        Ok(Value::from_json(serde_json::from_str(text)?))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Operation(_) => write!(f, "<operation>"),
            Value::Collection(_) | Value::Structure(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Collection(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Structure(value)
    }
}

impl From<Operation> for Value {
    fn from(value: Operation) -> Self {
        Value::Operation(value)
    }
}

impl PartialEq<bool> for Value {
    fn eq(&self, other: &bool) -> bool {
        self.as_bool() == Some(*other)
    }
}

impl PartialEq<i64> for Value {
    fn eq(&self, other: &i64) -> bool {
        self.as_int() == Some(*other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}
