//! Field descriptors and resolved field specifications.
//!
//! A [`Field`] is the inert, declarative value a class body attaches to an
//! annotated name. It carries no instance data. When the class is built the
//! descriptor is resolved into a [`FieldSpec`]: the name becomes known, the
//! underscore-private convention is applied, and the participation flags are
//! fixed. Resolved specs are immutable and shared by `Arc` with every subclass
//! that does not redeclare the name.

use std::{fmt, sync::Arc};

use indexmap::IndexMap;

use crate::{
    args::Resolved,
    error::{RecordError, RecordResult},
    value::Value,
};

/// Zero-argument default factory.
pub type FactoryFn = dyn Fn() -> Value + Send + Sync;

/// Default factory that reads the values already resolved for earlier fields.
pub type DependentFactoryFn = dyn Fn(&Resolved<'_>) -> RecordResult<Value> + Send + Sync;

/// Per-field metadata, read-only once the field is declared.
pub type Metadata = IndexMap<String, Value>;

/// A deferred default value, invoked once per construction that needs it.
#[derive(Clone)]
pub enum DefaultFactory {
    /// Called with no arguments.
    Plain(Arc<FactoryFn>),
    /// Called with a read-only view of earlier fields' resolved values.
    Dependent(Arc<DependentFactoryFn>),
}

impl DefaultFactory {
    pub fn plain(factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Self::Plain(Arc::new(factory))
    }

    pub fn dependent(factory: impl Fn(&Resolved<'_>) -> RecordResult<Value> + Send + Sync + 'static) -> Self {
        Self::Dependent(Arc::new(factory))
    }

    pub(crate) fn produce(&self, resolved: &Resolved<'_>) -> RecordResult<Value> {
        match self {
            Self::Plain(factory) => Ok(factory()),
            Self::Dependent(factory) => factory(resolved),
        }
    }
}

impl fmt::Debug for DefaultFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("<factory>"),
            Self::Dependent(_) => f.write_str("<dependent factory>"),
        }
    }
}

/// Where a field's value comes from when the constructor is not given one.
#[derive(Debug, Clone, Default)]
pub enum FieldDefault {
    /// Required: the constructor must receive a value.
    #[default]
    Missing,
    /// A static value, cloned into each instance.
    Value(Value),
    /// A factory invoked per instance.
    Factory(DefaultFactory),
}

impl FieldDefault {
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// A field descriptor: the declarative configuration of one class attribute.
///
/// Participation flags left unset are decided when the field is attached to a
/// class, because the defaults depend on the field name:
/// - `repr` defaults to `true`, or `false` for `_`-prefixed names
/// - `str` defaults to the effective `repr`
/// - `hash` defaults to `true`, or `false` for `_`-prefixed names
/// - `compare` defaults to the effective `hash`
///
/// A field excluded from comparison is never hashed either, so equal instances
/// always hash equally.
#[derive(Debug, Clone, Default)]
pub struct Field {
    default: FieldDefault,
    repr: Option<bool>,
    str: Option<bool>,
    hash: Option<bool>,
    compare: Option<bool>,
    metadata: Metadata,
}

impl Field {
    /// Starts building a descriptor.
    #[must_use]
    pub fn builder() -> FieldBuilder {
        FieldBuilder::new()
    }

    /// A required field with default flags.
    #[must_use]
    pub fn required() -> Self {
        Self::default()
    }

    /// A field with a static default and default flags.
    #[must_use]
    pub fn with_default(value: impl Into<Value>) -> Self {
        Self {
            default: FieldDefault::Value(value.into()),
            ..Self::default()
        }
    }

    /// A field whose default is computed from the fields resolved before it.
    #[must_use]
    pub fn with_factory(factory: impl Fn(&Resolved<'_>) -> RecordResult<Value> + Send + Sync + 'static) -> Self {
        Self {
            default: FieldDefault::Factory(DefaultFactory::dependent(factory)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn default_value(&self) -> &FieldDefault {
        &self.default
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Fixes the descriptor's flags for a concrete field name.
    pub(crate) fn resolve(self, name: &str, annotation: Option<String>, declared_by: &str) -> FieldSpec {
        let is_private = name.starts_with('_');
        let repr = self.repr.unwrap_or(!is_private);
        let hash = self.hash.unwrap_or(!is_private);
        let compare = self.compare.unwrap_or(hash);
        FieldSpec {
            name: name.to_owned(),
            annotation,
            default: self.default,
            repr,
            str: self.str.unwrap_or(repr),
            hash: hash && compare,
            compare,
            metadata: self.metadata,
            is_private,
            declared_by: declared_by.to_owned(),
        }
    }
}

/// Builder for [`Field`], validating option conflicts in [`FieldBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct FieldBuilder {
    default: Option<Value>,
    default_factory: Option<DefaultFactory>,
    repr: Option<bool>,
    str: Option<bool>,
    hash: Option<bool>,
    compare: Option<bool>,
    metadata: Metadata,
}

impl FieldBuilder {
    #[must_use]
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    /// Sets a static default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets a zero-argument factory.
    #[must_use]
    pub fn default_factory(mut self, factory: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.default_factory = Some(DefaultFactory::plain(factory));
        self
    }

    /// Sets a factory that reads earlier fields' resolved values.
    #[must_use]
    pub fn dependent_factory(
        mut self,
        factory: impl Fn(&Resolved<'_>) -> RecordResult<Value> + Send + Sync + 'static,
    ) -> Self {
        self.default_factory = Some(DefaultFactory::dependent(factory));
        self
    }

    #[must_use]
    pub fn factory(mut self, factory: DefaultFactory) -> Self {
        self.default_factory = Some(factory);
        self
    }

    #[must_use]
    pub fn repr(mut self, enabled: bool) -> Self {
        self.repr = Some(enabled);
        self
    }

    #[must_use]
    pub fn str(mut self, enabled: bool) -> Self {
        self.str = Some(enabled);
        self
    }

    #[must_use]
    pub fn hash(mut self, enabled: bool) -> Self {
        self.hash = Some(enabled);
        self
    }

    #[must_use]
    pub fn compare(mut self, enabled: bool) -> Self {
        self.compare = Some(enabled);
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Finishes the descriptor.
    ///
    /// Fails with `ConfigurationError` when both a default and a default factory
    /// were given.
    pub fn build(self) -> RecordResult<Field> {
        let default = match (self.default, self.default_factory) {
            (Some(_), Some(_)) => {
                return Err(RecordError::configuration("cannot set both default and default_factory"));
            }
            (Some(value), None) => FieldDefault::Value(value),
            (None, Some(factory)) => FieldDefault::Factory(factory),
            (None, None) => FieldDefault::Missing,
        };
        Ok(Field {
            default,
            repr: self.repr,
            str: self.str,
            hash: self.hash,
            compare: self.compare,
            metadata: self.metadata,
        })
    }
}

/// Starts an internal-state field: bookkeeping that is not part of the value's
/// public identity.
///
/// Identical to [`Field::builder`] except that `repr`, `str`, `hash`, and
/// `compare` start out disabled.
#[must_use]
pub fn internal_state_field() -> FieldBuilder {
    FieldBuilder::new().repr(false).str(false).hash(false).compare(false)
}

/// A field resolved onto the class that declared it.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    annotation: Option<String>,
    default: FieldDefault,
    repr: bool,
    str: bool,
    hash: bool,
    compare: bool,
    metadata: Metadata,
    is_private: bool,
    declared_by: String,
}

impl FieldSpec {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared type, informational only.
    #[must_use]
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    #[must_use]
    pub fn default_value(&self) -> &FieldDefault {
        &self.default
    }

    /// True when the field has a static default or a factory.
    #[must_use]
    pub fn has_default(&self) -> bool {
        !self.default.is_missing()
    }

    /// Whether the field appears in the generated representation.
    #[must_use]
    pub fn repr(&self) -> bool {
        self.repr
    }

    /// Whether the field appears in the readable string form.
    #[must_use]
    pub fn str(&self) -> bool {
        self.str
    }

    /// Whether the field contributes to the hash (never true when `compare` is false).
    #[must_use]
    pub fn hash(&self) -> bool {
        self.hash
    }

    /// Whether the field participates in equality and ordering.
    #[must_use]
    pub fn compare(&self) -> bool {
        self.compare
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// True for `_`-prefixed names.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.is_private
    }

    /// Name of the class whose body declared this spec.
    #[must_use]
    pub fn declared_by(&self) -> &str {
        &self.declared_by
    }
}
