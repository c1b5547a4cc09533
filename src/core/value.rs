//! Dynamic values flowing between generators, and coercion to declared types.

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

use crate::core::generator::Generator;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("expected {context} to be a value of type {expected}, but it was a {actual} with value '{value}'")]
    Mismatch {
        context: String,
        expected: ValueType,
        actual: ValueType,
        value: String,
    },
    #[error("malformed numeral for {context}: '{text}' is not a valid {kind}")]
    MalformedNumeral {
        context: String,
        kind: NumericKind,
        text: String,
    },
}

/// Numeric representations a generator may declare as its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericKind {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    BigInt,
    BigDecimal,
}

impl NumericKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::BigInt => "big integer",
            Self::BigDecimal => "big decimal",
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result type tag declared by every generator node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    String,
    Number(NumericKind),
    Boolean,
    Generator,
    /// Accepts any value unchanged.
    Any,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Number(kind) => f.write_str(kind.name()),
            Self::Boolean => f.write_str("boolean"),
            Self::Generator => f.write_str("generator"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// A number in one of the supported representations.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    BigInt(BigInt),
    BigDecimal(BigDecimal),
}

impl Number {
    pub fn kind(&self) -> NumericKind {
        match self {
            Self::Byte(_) => NumericKind::Byte,
            Self::Short(_) => NumericKind::Short,
            Self::Int(_) => NumericKind::Int,
            Self::Long(_) => NumericKind::Long,
            Self::Float(_) => NumericKind::Float,
            Self::Double(_) => NumericKind::Double,
            Self::BigInt(_) => NumericKind::BigInt,
            Self::BigDecimal(_) => NumericKind::BigDecimal,
        }
    }

    /// Low 64 bits of the integral part, or `None` for binary floating point.
    fn integral(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(*v as i64),
            Self::Short(v) => Some(*v as i64),
            Self::Int(v) => Some(*v as i64),
            Self::Long(v) => Some(*v),
            Self::Float(_) | Self::Double(_) => None,
            Self::BigInt(v) => Some(low_bits(v)),
            Self::BigDecimal(v) => Some(low_bits(&truncate_decimal(v))),
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Self::Byte(v) => *v as f64,
            Self::Short(v) => *v as f64,
            Self::Int(v) => *v as f64,
            Self::Long(v) => *v as f64,
            Self::Float(v) => *v as f64,
            Self::Double(v) => *v,
            Self::BigInt(v) => v.to_f64().unwrap_or(f64::NAN),
            Self::BigDecimal(v) => v.to_f64().unwrap_or(f64::NAN),
        }
    }

    /// Converts to another representation. Narrowing truncates toward zero
    /// and keeps the low bits of integers. Returns `None` when a non-finite
    /// float is asked to become an arbitrary-precision number.
    pub fn convert(&self, kind: NumericKind) -> Option<Number> {
        let converted = match kind {
            NumericKind::Byte => Number::Byte(match self.integral() {
                Some(v) => v as i8,
                None => self.to_f64() as i32 as i8,
            }),
            NumericKind::Short => Number::Short(match self.integral() {
                Some(v) => v as i16,
                None => self.to_f64() as i32 as i16,
            }),
            NumericKind::Int => Number::Int(match self.integral() {
                Some(v) => v as i32,
                None => self.to_f64() as i32,
            }),
            NumericKind::Long => Number::Long(match self.integral() {
                Some(v) => v,
                None => self.to_f64() as i64,
            }),
            NumericKind::Float => Number::Float(self.to_f64() as f32),
            NumericKind::Double => Number::Double(self.to_f64()),
            NumericKind::BigInt => Number::BigInt(match self {
                Self::BigInt(v) => v.clone(),
                Self::BigDecimal(v) => truncate_decimal(v),
                Self::Float(_) | Self::Double(_) => {
                    let decimal = BigDecimal::from_str(&self.to_f64().to_string()).ok()?;
                    truncate_decimal(&decimal)
                }
                other => BigInt::from(other.integral()?),
            }),
            NumericKind::BigDecimal => Number::BigDecimal(match self {
                Self::BigDecimal(v) => v.clone(),
                Self::BigInt(v) => BigDecimal::new(v.clone(), 0),
                Self::Float(v) => BigDecimal::from_str(&v.to_string()).ok()?,
                Self::Double(v) => BigDecimal::from_str(&v.to_string()).ok()?,
                other => BigDecimal::from(other.integral()?),
            }),
        };
        Some(converted)
    }

    /// Parses `text` as a literal of the given representation.
    pub fn parse(text: &str, kind: NumericKind) -> Option<Number> {
        let text = text.trim();
        let parsed = match kind {
            NumericKind::Byte => Number::Byte(text.parse().ok()?),
            NumericKind::Short => Number::Short(text.parse().ok()?),
            NumericKind::Int => Number::Int(text.parse().ok()?),
            NumericKind::Long => Number::Long(text.parse().ok()?),
            NumericKind::Float => Number::Float(text.parse().ok()?),
            NumericKind::Double => Number::Double(text.parse().ok()?),
            NumericKind::BigInt => Number::BigInt(BigInt::from_str(text).ok()?),
            NumericKind::BigDecimal => Number::BigDecimal(BigDecimal::from_str(text).ok()?),
        };
        Some(parsed)
    }
}

fn truncate_decimal(value: &BigDecimal) -> BigInt {
    let (digits, _) = value.with_scale(0).into_bigint_and_exponent();
    digits
}

/// Two's complement low 64 bits, the way a fixed-width cast wraps.
fn low_bits(value: &BigInt) -> i64 {
    let (sign, digits) = value.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0) as i64;
    if sign == Sign::Minus {
        low.wrapping_neg()
    } else {
        low
    }
}

/// Shortest text that reads back as the same float, with a trailing ".0"
/// on whole values of every magnitude.
fn write_float<F: fmt::Display>(f: &mut fmt::Formatter<'_>, x: F, finite: bool) -> fmt::Result {
    let text = x.to_string();
    if finite && !text.contains('.') {
        write!(f, "{}.0", text)
    } else {
        f.write_str(&text)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}"),
            Self::Short(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::Float(v) => write_float(f, *v, v.is_finite()),
            Self::Double(v) => write_float(f, *v, v.is_finite()),
            Self::BigInt(v) => write!(f, "{v}"),
            Self::BigDecimal(v) => write!(f, "{v}"),
        }
    }
}

/// A dynamically typed value: a generator result or a parameter.
#[derive(Debug, Clone)]
pub enum Value {
    Str(String),
    Number(Number),
    Bool(bool),
    /// A generator handed over as a parameter; references to it evaluate it.
    Generator(Arc<Generator>),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Str(_) => ValueType::String,
            Self::Number(n) => ValueType::Number(n.kind()),
            Self::Bool(_) => ValueType::Boolean,
            Self::Generator(_) => ValueType::Generator,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Generator(a), Self::Generator(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Generator(g) => write!(f, "<{} generator>", g.output_type()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(Number::Int(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(Number::Long(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(Number::Double(v))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Self::Number(n)
    }
}

impl From<Generator> for Value {
    fn from(g: Generator) -> Self {
        Self::Generator(Arc::new(g))
    }
}

fn mismatch(value: &Value, declared: ValueType, context: &str) -> CoercionError {
    CoercionError::Mismatch {
        context: context.to_string(),
        expected: declared,
        actual: value.value_type(),
        value: value.to_string(),
    }
}

/// Adapts `value` to the `declared` type.
///
/// Values already of the declared type pass through. Anything becomes a
/// string through its textual form. Numbers convert between
/// representations and strings parse as numerals. Booleans only come from
/// the strings `true`/`false`, ignoring case and surrounding whitespace.
/// `context` names what is being coerced in the error.
pub fn coerce(value: Value, declared: ValueType, context: &str) -> Result<Value, CoercionError> {
    if declared == ValueType::Any || value.value_type() == declared {
        return Ok(value);
    }

    match (declared, &value) {
        (ValueType::String, _) => Ok(Value::Str(value.to_string())),
        (ValueType::Number(kind), Value::Number(n)) => {
            n.convert(kind)
                .map(Value::Number)
                .ok_or_else(|| CoercionError::MalformedNumeral {
                    context: context.to_string(),
                    kind,
                    text: n.to_string(),
                })
        }
        (ValueType::Number(kind), Value::Str(s)) => {
            Number::parse(s, kind)
                .map(Value::Number)
                .ok_or_else(|| CoercionError::MalformedNumeral {
                    context: context.to_string(),
                    kind,
                    text: s.clone(),
                })
        }
        (ValueType::Boolean, Value::Str(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch(&value, declared, context)),
        },
        _ => Err(mismatch(&value, declared, context)),
    }
}

/// Rust types a generated value can be extracted as.
pub trait FromValue: Sized {
    fn from_value(value: Value, context: &str) -> Result<Self, CoercionError>;
}

impl FromValue for Value {
    fn from_value(value: Value, _context: &str) -> Result<Self, CoercionError> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value, context: &str) -> Result<Self, CoercionError> {
        match coerce(value, ValueType::String, context)? {
            Value::Str(s) => Ok(s),
            other => Err(mismatch(&other, ValueType::String, context)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value, context: &str) -> Result<Self, CoercionError> {
        match coerce(value, ValueType::Boolean, context)? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch(&other, ValueType::Boolean, context)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value, context: &str) -> Result<Self, CoercionError> {
        let declared = ValueType::Number(NumericKind::Int);
        match coerce(value, declared, context)? {
            Value::Number(Number::Int(v)) => Ok(v),
            other => Err(mismatch(&other, declared, context)),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value, context: &str) -> Result<Self, CoercionError> {
        let declared = ValueType::Number(NumericKind::Long);
        match coerce(value, declared, context)? {
            Value::Number(Number::Long(v)) => Ok(v),
            other => Err(mismatch(&other, declared, context)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value, context: &str) -> Result<Self, CoercionError> {
        let declared = ValueType::Number(NumericKind::Double);
        match coerce(value, declared, context)? {
            Value::Number(Number::Double(v)) => Ok(v),
            other => Err(mismatch(&other, declared, context)),
        }
    }
}
