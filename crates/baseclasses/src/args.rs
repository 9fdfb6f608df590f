use indexmap::IndexMap;

use crate::{
    error::{ErrorKind, RecordError, RecordResult},
    value::Value,
};

/// Keyword arguments: an insertion-ordered field name -> value mapping.
pub type Kwargs = IndexMap<String, Value>;

/// Arguments passed to a record constructor.
///
/// Construction is keyword-based; positional values are accepted only by classes
/// whose direct bases are all root classes, and are folded into keywords in field
/// order before anything else runs.
#[derive(Debug, Clone, Default)]
pub struct Args {
    positional: Vec<Value>,
    keywords: Kwargs,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments consisting only of positional values.
    #[must_use]
    pub fn positional(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self {
            positional: values.into_iter().map(Into::into).collect(),
            keywords: Kwargs::new(),
        }
    }

    /// Appends one positional value.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Adds or replaces one keyword value.
    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn positional_count(&self) -> usize {
        self.positional.len()
    }

    pub(crate) fn into_parts(self) -> (Vec<Value>, Kwargs) {
        (self.positional, self.keywords)
    }
}

impl From<Kwargs> for Args {
    fn from(keywords: Kwargs) -> Self {
        Self {
            positional: Vec::new(),
            keywords,
        }
    }
}

/// Read-only view of the field values resolved so far during construction.
///
/// Default factories receive this view. It holds only fields that precede the
/// factory's own field in the resolved field table, so a factory can depend on
/// earlier fields but never on later ones.
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'a> {
    class_name: &'a str,
    values: &'a Kwargs,
}

impl<'a> Resolved<'a> {
    pub(crate) fn new(class_name: &'a str, values: &'a Kwargs) -> Self {
        Self { class_name, values }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'a Value> {
        self.values.get(name)
    }

    /// Returns an earlier field's value, failing with `MissingFieldError` when it
    /// has not been resolved before the calling factory's field.
    pub fn require(&self, name: &str) -> RecordResult<&'a Value> {
        self.values.get(name).ok_or_else(|| {
            RecordError::new(
                ErrorKind::MissingFieldError,
                format!(
                    "{}: default factory requires field {name:?}, which is not resolved before it",
                    self.class_name
                ),
            )
        })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates resolved fields in field-table order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Builds a [`Kwargs`] map from `name => value` pairs.
///
/// ```
/// use baseclasses::{kwargs, Value};
///
/// let kw = kwargs! { "a" => 1, "b" => "text" };
/// assert_eq!(kw["a"], Value::Int(1));
/// assert_eq!(kw.get_index(1).map(|(k, _)| k.as_str()), Some("b"));
/// ```
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Kwargs::new();
        $(
            map.insert(::std::string::String::from($name), $crate::Value::from($value));
        )+
        map
    }};
}
