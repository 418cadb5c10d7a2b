//! Bindable values and the `Scannable` column capability.
//!
//! [`Value`] is the single representation for statement arguments and result
//! cells. A Rust type becomes usable as a mapped column by implementing
//! [`Scannable`]; struct-shaped scalars such as timestamps, UUIDs or nullable
//! wrappers are registered this way so the mapper treats them as one column.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// A bindable SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Date(_) => "date",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
        }
    }

    /// Integer view over any integer variant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }
}

/// A value could not be converted into the requested Rust type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ConversionError {
    fn new(expected: &'static str, found: &Value) -> Self {
        Self {
            expected,
            found: found.kind(),
        }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ConversionError {}

/// A Rust type stored in a single column.
///
/// Implemented for the supported scalars, for `Option<T>` (nullable) and for
/// struct-shaped scalars (`chrono`, `uuid`, `serde_json`). Implement it for
/// your own wrapper types to map them as an opaque column instead of a nested
/// record.
pub trait Scannable: Sized + Send + Sync + 'static {
    /// Convert the field into a bindable value.
    fn to_value(&self) -> Value;

    /// Build the field from a result cell.
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

macro_rules! scannable {
    ($ty:ty, $name:literal, $variant:ident) => {
        impl Scannable for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> Result<Self, ConversionError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ConversionError::new($name, &other)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

scannable!(bool, "bool", Bool);
scannable!(String, "text", Text);
scannable!(Vec<u8>, "bytes", Bytes);
scannable!(NaiveDate, "date", Date);
scannable!(Uuid, "uuid", Uuid);
scannable!(serde_json::Value, "json", Json);

impl Scannable for i16 {
    fn to_value(&self) -> Value {
        Value::I16(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::I16(v) => Ok(v),
            Value::I32(v) => i16::try_from(v).map_err(|_| ConversionError::new("i16", &value)),
            Value::I64(v) => i16::try_from(v).map_err(|_| ConversionError::new("i16", &value)),
            other => Err(ConversionError::new("i16", &other)),
        }
    }
}

impl Scannable for i32 {
    fn to_value(&self) -> Value {
        Value::I32(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::I16(v) => Ok(i32::from(v)),
            Value::I32(v) => Ok(v),
            Value::I64(v) => i32::try_from(v).map_err(|_| ConversionError::new("i32", &value)),
            other => Err(ConversionError::new("i32", &other)),
        }
    }
}

impl Scannable for i64 {
    fn to_value(&self) -> Value {
        Value::I64(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        value
            .as_i64()
            .ok_or_else(|| ConversionError::new("i64", &value))
    }
}

impl Scannable for f32 {
    fn to_value(&self) -> Value {
        Value::F32(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::F32(v) => Ok(v),
            Value::F64(v) => Ok(v as f32),
            other => Err(ConversionError::new("f32", &other)),
        }
    }
}

impl Scannable for f64 {
    fn to_value(&self) -> Value {
        Value::F64(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::F32(v) => Ok(f64::from(v)),
            Value::F64(v) => Ok(v),
            Value::I16(v) => Ok(f64::from(v)),
            Value::I32(v) => Ok(f64::from(v)),
            other => Err(ConversionError::new("f64", &other)),
        }
    }
}

impl Scannable for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Timestamp(v) => Ok(v),
            Value::TimestampTz(v) => Ok(v.naive_utc()),
            other => Err(ConversionError::new("timestamp", &other)),
        }
    }
}

impl Scannable for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::TimestampTz(*self)
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::TimestampTz(v) => Ok(v),
            Value::Timestamp(v) => Ok(v.and_utc()),
            other => Err(ConversionError::new("timestamptz", &other)),
        }
    }
}

impl<T: Scannable> Scannable for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::F32(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::TimestampTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// A positional condition argument: a single value, or a list that expands
/// into one placeholder per element.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Value(Value),
    List(Vec<Value>),
}

/// Conversion into a condition argument.
///
/// Scalars become [`Arg::Value`]; `Vec<T>`, slices and arrays become
/// [`Arg::List`].
pub trait IntoArg {
    fn into_arg(self) -> Arg;
}

impl IntoArg for Arg {
    fn into_arg(self) -> Arg {
        self
    }
}

impl IntoArg for Value {
    fn into_arg(self) -> Arg {
        Arg::Value(self)
    }
}

macro_rules! scalar_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoArg for $ty {
                fn into_arg(self) -> Arg {
                    Arg::Value(Value::from(self))
                }
            }
        )*
    };
}

scalar_arg!(
    bool,
    i16,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    NaiveDate,
    NaiveDateTime,
    DateTime<Utc>,
    Uuid,
    serde_json::Value,
);

impl<T: Scannable> IntoArg for Option<T> {
    fn into_arg(self) -> Arg {
        Arg::Value(self.to_value())
    }
}

impl<T: Scannable> IntoArg for Vec<T> {
    fn into_arg(self) -> Arg {
        Arg::List(self.iter().map(Scannable::to_value).collect())
    }
}

impl<T: Scannable> IntoArg for &[T] {
    fn into_arg(self) -> Arg {
        Arg::List(self.iter().map(Scannable::to_value).collect())
    }
}

impl<T: Scannable, const N: usize> IntoArg for [T; N] {
    fn into_arg(self) -> Arg {
        Arg::List(self.iter().map(Scannable::to_value).collect())
    }
}

impl IntoArg for Vec<&str> {
    fn into_arg(self) -> Arg {
        Arg::List(self.into_iter().map(Value::from).collect())
    }
}

impl IntoArg for &[&str] {
    fn into_arg(self) -> Arg {
        Arg::List(self.iter().map(|s| Value::from(*s)).collect())
    }
}

impl<const N: usize> IntoArg for [&str; N] {
    fn into_arg(self) -> Arg {
        Arg::List(self.into_iter().map(Value::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_widen_and_narrow() {
        assert_eq!(i64::from_value(Value::I32(7)), Ok(7));
        assert_eq!(i32::from_value(Value::I64(7)), Ok(7));
        assert!(i16::from_value(Value::I64(i64::from(i32::MAX))).is_err());
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_value(Value::Text("a".into())),
            Ok(Some("a".to_string()))
        );
        assert_eq!(None::<i64>.to_value(), Value::Null);
    }

    #[test]
    fn conversion_error_names_both_sides() {
        let err = bool::from_value(Value::Text("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "expected bool, found text");
    }

    #[test]
    fn lists_become_list_args() {
        assert_eq!(
            vec![1i64, 2].into_arg(),
            Arg::List(vec![Value::I64(1), Value::I64(2)])
        );
        assert_eq!("a".into_arg(), Arg::Value(Value::Text("a".into())));
        assert_eq!(
            ["x".to_string()].into_arg(),
            Arg::List(vec![Value::Text("x".into())])
        );
    }

    #[test]
    fn string_literal_lists_become_text_lists() {
        let expected = Arg::List(vec![Value::Text("x".into()), Value::Text("y".into())]);
        assert_eq!(vec!["x", "y"].into_arg(), expected);
        assert_eq!(["x", "y"].into_arg(), expected);
        let kinds: &[&str] = &["x", "y"];
        assert_eq!(kinds.into_arg(), expected);
    }

    #[test]
    fn timestamps_cross_convert() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .expect("valid timestamp");
        let utc = DateTime::<Utc>::from_value(Value::Timestamp(ts)).expect("convert");
        assert_eq!(utc.naive_utc(), ts);
    }
}
