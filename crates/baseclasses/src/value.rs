use std::{
    cmp::Ordering,
    fmt::{self, Write},
    hash::{Hash, Hasher},
};

use indexmap::IndexMap;

use crate::{instance::Instance, py_hash};

/// A field value held by a record instance.
///
/// `Value` owns all its data and can be freely cloned. Field declarations carry
/// their type only as informational text, so any variant may be stored in any field.
///
/// # Equality and hashing
///
/// Numeric variants compare by numeric value, so `Bool(true) == Int(1) == Float(1.0)`,
/// and their hashes agree. `NaN` compares equal to `NaN` so that `Eq` stays lawful
/// for values used as map keys. Maps compare without regard to insertion order.
///
/// # Rendering
///
/// [`Value::repr`] renders the unambiguous form used by record representations
/// (`'text'`, `6.0`, `(1,)`), while `Display` renders the readable form used by a
/// record's string conversion (strings unquoted, nested records abbreviated).
#[derive(Debug, Clone)]
pub enum Value {
    /// The absent value.
    None,
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit IEEE 754 float.
    Float(f64),
    /// UTF-8 text.
    Str(String),
    Bytes(Vec<u8>),
    /// Mutable-style sequence; renders with brackets.
    List(Vec<Self>),
    /// Immutable-style sequence; renders with parentheses.
    Tuple(Vec<Self>),
    /// Insertion-ordered, string-keyed mapping.
    Map(IndexMap<String, Self>),
    /// A nested record instance.
    Record(Box<Instance>),
}

/// Numeric view used for cross-kind comparison.
#[derive(Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn eq_number(self, other: Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Int(i), Self::Float(f)) | (Self::Float(f), Self::Int(i)) => float_as_exact_int(f) == Some(i),
        }
    }

    fn cmp_number(self, other: Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(&b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(&b),
            (Self::Int(i), Self::Float(f)) => match float_as_exact_int(f) {
                Some(j) => Some(i.cmp(&j)),
                None => (i as f64).partial_cmp(&f),
            },
            (Self::Float(f), Self::Int(i)) => match float_as_exact_int(f) {
                Some(j) => Some(j.cmp(&i)),
                None => f.partial_cmp(&(i as f64)),
            },
        }
    }
}

/// Returns the integer a float is exactly equal to, if it is integral and in range.
fn float_as_exact_int(f: f64) -> Option<i64> {
    if f.is_finite() && f.trunc() == f && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

impl Value {
    /// Builds a tuple value.
    #[must_use]
    pub fn tuple(items: impl IntoIterator<Item = impl Into<Self>>) -> Self {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Builds a list value.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = impl Into<Self>>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Builds a map value, preserving the iteration order of `pairs`.
    #[must_use]
    pub fn map<K: Into<String>, V: Into<Self>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self::Map(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    #[must_use]
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(data.into())
    }

    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the integer value of an `Int` or `Bool`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Returns the value as a float, widening integers and booleans.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_record(&self) -> Option<&Instance> {
        match self {
            Self::Record(instance) => Some(instance),
            _ => None,
        }
    }

    /// Returns the type name of the value; records report their class name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tuple(_) => "tuple",
            Self::Map(_) => "dict",
            Self::Record(instance) => instance.class().name(),
        }
    }

    /// Returns the deterministic hash of this value.
    ///
    /// Equal values always produce equal hashes.
    #[must_use]
    pub fn hash_value(&self) -> i64 {
        py_hash::hash_value(self)
    }

    /// Returns the unambiguous representation of this value.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.repr_fmt(&mut out);
        out
    }

    fn numeric(&self) -> Option<Number> {
        match self {
            Self::Bool(b) => Some(Number::Int(i64::from(*b))),
            Self::Int(i) => Some(Number::Int(*i)),
            Self::Float(f) => Some(Number::Float(*f)),
            _ => None,
        }
    }

    pub(crate) fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => float_repr_fmt(*v, f),
            Self::Str(s) => string_repr_fmt(s, f),
            Self::Bytes(b) => bytes_repr_fmt(b, f),
            Self::List(items) => {
                f.write_char('[')?;
                join_fmt(items, f, Self::repr_fmt)?;
                f.write_char(']')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                join_fmt(items, f, Self::repr_fmt)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Self::Map(map) => {
                f.write_char('{')?;
                let mut first = true;
                for (key, value) in map {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    string_repr_fmt(key, f)?;
                    f.write_str(": ")?;
                    value.repr_fmt(f)?;
                }
                f.write_char('}')
            }
            Self::Record(instance) => instance.repr_fmt(f),
        }
    }

    /// Readable rendering: elements of collections are rendered with this same
    /// form rather than their repr, and nested records are not expanded.
    pub(crate) fn str_fmt(&self, f: &mut impl Write) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::List(items) => {
                f.write_char('[')?;
                join_fmt(items, f, Self::str_fmt)?;
                f.write_char(']')
            }
            Self::Tuple(items) => {
                f.write_char('(')?;
                join_fmt(items, f, Self::str_fmt)?;
                f.write_char(')')
            }
            Self::Map(map) => {
                f.write_char('{')?;
                let mut first = true;
                for (key, value) in map {
                    if !first {
                        f.write_str(", ")?;
                    }
                    first = false;
                    string_repr_fmt(key, f)?;
                    f.write_str(": ")?;
                    value.str_fmt(f)?;
                }
                f.write_char('}')
            }
            Self::Record(instance) => write!(f, "{}(...)", instance.class().name()),
            other => other.repr_fmt(f),
        }
    }
}

fn join_fmt<W: Write>(items: &[Value], f: &mut W, item_fmt: fn(&Value, &mut W) -> fmt::Result) -> fmt::Result {
    let mut iter = items.iter();
    if let Some(first) = iter.next() {
        item_fmt(first, f)?;
        for item in iter {
            f.write_str(", ")?;
            item_fmt(item, f)?;
        }
    }
    Ok(())
}

fn float_repr_fmt(v: f64, f: &mut impl Write) -> fmt::Result {
    if v.is_nan() {
        return f.write_str("nan");
    }
    if v.is_infinite() {
        return f.write_str(if v > 0.0 { "inf" } else { "-inf" });
    }
    let s = v.to_string();
    f.write_str(&s)?;
    if !s.contains('.') {
        f.write_str(".0")?;
    }
    Ok(())
}

/// Writes a quoted string, preferring single quotes unless the text contains
/// a single quote and no double quote.
pub(crate) fn string_repr_fmt(s: &str, f: &mut impl Write) -> fmt::Result {
    let quote = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    f.write_char(quote)?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c == quote => {
                f.write_char('\\')?;
                f.write_char(c)?;
            }
            c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(quote)
}

fn bytes_repr_fmt(bytes: &[u8], f: &mut impl Write) -> fmt::Result {
    f.write_str("b'")?;
    for &byte in bytes {
        match byte {
            b'\\' => f.write_str("\\\\")?,
            b'\'' => f.write_str("\\'")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            0x20..=0x7e => f.write_char(char::from(byte))?,
            _ => write!(f, "\\x{byte:02x}")?,
        }
    }
    f.write_char('\'')
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.str_fmt(f)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a.eq_number(b),
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.hash_value());
    }
}

impl PartialOrd for Value {
    /// Orders values of comparable kinds; unrelated kinds are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        // Equal values are always ordered, even kinds with no ordering of their own.
        if self == other {
            return Some(Ordering::Equal);
        }
        match (self, other) {
            (Self::Str(a), Self::Str(b)) => Some(a.cmp(b)),
            (Self::Bytes(a), Self::Bytes(b)) => Some(a.cmp(b)),
            (Self::List(a), Self::List(b)) | (Self::Tuple(a), Self::Tuple(b)) => sequence_cmp(a, b),
            (Self::Record(a), Self::Record(b)) => a.as_ref().partial_cmp(b.as_ref()),
            _ => match (self.numeric(), other.numeric()) {
                (Some(a), Some(b)) => a.cmp_number(b),
                _ => None,
            },
        }
    }
}

/// Lexicographic comparison: the first unequal pair decides, then length.
pub(crate) fn sequence_cmp(a: &[Value], b: &[Value]) -> Option<Ordering> {
    for (left, right) in a.iter().zip(b) {
        if left != right {
            return left.partial_cmp(right);
        }
    }
    Some(a.len().cmp(&b.len()))
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<IndexMap<String, Self>> for Value {
    fn from(value: IndexMap<String, Self>) -> Self {
        Self::Map(value)
    }
}

impl From<Instance> for Value {
    fn from(value: Instance) -> Self {
        Self::Record(Box::new(value))
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}
