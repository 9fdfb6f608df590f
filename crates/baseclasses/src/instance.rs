//! Record instances and the construction algorithm.

use std::{
    cmp::Ordering,
    fmt::{self, Write},
    hash::{Hash, Hasher},
    sync::Arc,
};

use strum::Display;

use crate::{
    args::{Args, Kwargs, Resolved},
    class::{ClassRef, FieldTable, RecordClass},
    error::{RecordError, RecordResult},
    field::{FieldDefault, FieldSpec},
    py_hash,
    tracer::{ConstructionTracer, LogTracer, ValueSource},
    value::Value,
};

/// Lifecycle state of an instance.
///
/// Every instance starts in `Building` while its fields are assigned and the
/// post-init hook runs. Construction ends by moving to `Sealed` for frozen
/// classes or `Open` for mutable ones; neither transition is reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum InstanceState {
    Building,
    Open,
    Sealed,
}

impl RecordClass {
    /// Constructs an instance, logging each resolution step through [`LogTracer`].
    ///
    /// Steps, in order:
    /// 1. positional values, where the class accepts them, are folded into the
    ///    keyword mapping in field order
    /// 2. the pre-init hook in effect rewrites the keyword mapping
    /// 3. each field, in table order, takes the supplied value, else its static
    ///    default, else the value of its factory; a factory only sees the fields
    ///    resolved before it
    /// 4. any keyword left over names no field and is rejected
    /// 5. the post-init hook runs, then the instance is sealed or opened
    pub fn instantiate(self: &Arc<Self>, args: Args) -> RecordResult<Instance> {
        self.instantiate_traced(args, &mut LogTracer)
    }

    /// Keyword-only shorthand for [`RecordClass::instantiate`].
    pub fn new_instance(self: &Arc<Self>, kwargs: Kwargs) -> RecordResult<Instance> {
        self.instantiate(Args::from(kwargs))
    }

    /// Constructs an instance, reporting each step to `tracer`.
    pub fn instantiate_traced(
        self: &Arc<Self>,
        args: Args,
        tracer: &mut impl ConstructionTracer,
    ) -> RecordResult<Instance> {
        let (positional, mut kwargs) = args.into_parts();
        if !positional.is_empty() {
            kwargs = self.fold_positional(positional, kwargs)?;
        }
        if let Some(hook) = self.pre_init_hook() {
            kwargs = hook(kwargs)?;
            tracer.on_pre_init(self.name(), &kwargs);
        }

        let mut resolved = Kwargs::with_capacity(self.fields().len());
        for (name, spec) in self.fields() {
            let (value, source) = match kwargs.shift_remove(name) {
                Some(value) => (value, ValueSource::Supplied),
                None => match spec.default_value() {
                    FieldDefault::Value(value) => (value.clone(), ValueSource::StaticDefault),
                    FieldDefault::Factory(factory) => (
                        factory.produce(&Resolved::new(self.name(), &resolved))?,
                        ValueSource::Factory,
                    ),
                    FieldDefault::Missing => return Err(RecordError::missing_field(self.name(), name)),
                },
            };
            tracer.on_field_resolved(self.name(), name, source);
            resolved.insert(name.clone(), value);
        }
        if !kwargs.is_empty() {
            let unknown = kwargs.keys().map(String::as_str).collect::<Vec<_>>();
            return Err(RecordError::unknown_fields(self.name(), &unknown));
        }

        let mut instance = Instance {
            class: Arc::clone(self),
            values: resolved.into_values().collect(),
            state: InstanceState::Building,
        };
        if let Some(hook) = self.post_init_hook() {
            hook(&mut instance)?;
        }
        instance.state = if self.is_frozen() {
            InstanceState::Sealed
        } else {
            InstanceState::Open
        };
        tracer.on_instance_ready(self.name(), instance.state);
        Ok(instance)
    }

    fn fold_positional(&self, positional: Vec<Value>, kwargs: Kwargs) -> RecordResult<Kwargs> {
        if !self.accepts_positional() {
            return Err(RecordError::argument(format!(
                "{}() takes keyword arguments only: positional arguments require every base to be a root class",
                self.name()
            )));
        }
        if positional.len() > self.fields().len() {
            return Err(RecordError::argument(format!(
                "{}() takes {} positional arguments but {} were given",
                self.name(),
                self.fields().len(),
                positional.len()
            )));
        }
        let mut folded = Kwargs::with_capacity(positional.len() + kwargs.len());
        for (name, value) in self.fields().keys().zip(positional) {
            if kwargs.contains_key(name) {
                return Err(RecordError::argument(format!(
                    "{}() got multiple values for argument {name:?}",
                    self.name()
                )));
            }
            folded.insert(name.clone(), value);
        }
        folded.extend(kwargs);
        Ok(folded)
    }
}

/// An instance of a record class.
///
/// Values are stored in field-table order. Equality, hashing, and ordering
/// consider only the fields whose flags enable them; two instances are never
/// equal unless they belong to the same class.
#[derive(Clone)]
pub struct Instance {
    class: ClassRef,
    values: Vec<Value>,
    state: InstanceState,
}

impl Instance {
    #[must_use]
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    #[must_use]
    pub fn state(&self) -> InstanceState {
        self.state
    }

    /// True once construction finished on a frozen class.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.state == InstanceState::Sealed
    }

    /// The class's resolved field table.
    #[must_use]
    pub fn fields(&self) -> &FieldTable {
        self.class.fields()
    }

    /// Reads a field.
    pub fn get(&self, name: &str) -> RecordResult<&Value> {
        self.fields()
            .get_index_of(name)
            .and_then(|index| self.values.get(index))
            .ok_or_else(|| RecordError::unknown_attribute(self.class.name(), name))
    }

    /// Writes a field.
    ///
    /// Fails with `FrozenInstanceError` once a frozen instance is sealed, and
    /// with `UnknownFieldError` for a name the class does not declare.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> RecordResult<()> {
        if self.state == InstanceState::Sealed {
            return Err(RecordError::frozen_instance(name));
        }
        let index = self
            .class
            .fields()
            .get_index_of(name)
            .ok_or_else(|| RecordError::unknown_attribute(self.class.name(), name))?;
        self.values[index] = value.into();
        Ok(())
    }

    /// Field values in table order.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates `(name, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields().keys().map(String::as_str).zip(&self.values)
    }

    /// All field values as a tuple, in table order.
    #[must_use]
    pub fn as_tuple(&self) -> Value {
        Value::Tuple(self.values.clone())
    }

    /// All fields as a keyword mapping that reconstructs an equal instance.
    #[must_use]
    pub fn as_dict(&self) -> Kwargs {
        self.iter().map(|(name, value)| (name.to_owned(), value.clone())).collect()
    }

    /// Builds a new instance of the same class with `changes` applied.
    ///
    /// The result goes through the full constructor, hooks included, so it is
    /// sealed again when the class is frozen.
    pub fn replace(&self, changes: Kwargs) -> RecordResult<Self> {
        let mut kwargs = self.as_dict();
        kwargs.extend(changes);
        self.class.new_instance(kwargs)
    }

    /// True when this instance's class is `class` or derives from it.
    #[must_use]
    pub fn is_instance_of(&self, class: &RecordClass) -> bool {
        self.class.is_subclass_of(class)
    }

    /// The representation: `Name(a=1, b='x')`, listing repr-enabled fields.
    #[must_use]
    pub fn repr(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.repr_fmt(&mut out);
        out
    }

    pub(crate) fn repr_fmt(&self, f: &mut impl Write) -> fmt::Result {
        write!(f, "{}(", self.class.name())?;
        let mut first = true;
        for ((name, spec), value) in self.fields().iter().zip(&self.values) {
            if !spec.repr() {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}=")?;
            value.repr_fmt(f)?;
        }
        f.write_char(')')
    }

    /// Deterministic hash over the hash-enabled field values.
    #[must_use]
    pub fn hash_value(&self) -> i64 {
        py_hash::hash_sequence(self.flagged_values(FieldSpec::hash).map(Value::hash_value))
    }

    fn flagged_values(&self, flag: fn(&FieldSpec) -> bool) -> impl Iterator<Item = &Value> {
        self.fields()
            .values()
            .zip(&self.values)
            .filter(move |(spec, _)| flag(spec))
            .map(|(_, value)| value)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.class.name());
        for (name, value) in self.iter() {
            s.field(name, value);
        }
        s.finish()
    }
}

impl fmt::Display for Instance {
    /// The readable form, listing str-enabled fields.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.class.name())?;
        let mut first = true;
        for ((name, spec), value) in self.fields().iter().zip(&self.values) {
            if !spec.str() {
                continue;
            }
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{name}=")?;
            value.str_fmt(f)?;
        }
        f.write_char(')')
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.class.class_uid() == other.class.class_uid()
            && self
                .flagged_values(FieldSpec::compare)
                .eq(other.flagged_values(FieldSpec::compare))
    }
}

impl Eq for Instance {}

impl Hash for Instance {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i64(self.hash_value());
    }
}

impl PartialOrd for Instance {
    /// Instances of different classes are unordered.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.class.class_uid() != other.class.class_uid() {
            return None;
        }
        for (left, right) in self
            .flagged_values(FieldSpec::compare)
            .zip(other.flagged_values(FieldSpec::compare))
        {
            if left != right {
                return left.partial_cmp(right);
            }
        }
        Some(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{class::ClassDecl, class::base_class, error::ErrorKind, kwargs};

    fn point() -> ClassRef {
        ClassDecl::new("Point")
            .extends(&base_class())
            .required("x", "int")
            .with_default("y", "int", 0)
            .build()
            .unwrap()
    }

    #[test]
    fn positional_values_fold_in_field_order() {
        let p = point().instantiate(Args::positional([3, 4])).unwrap();
        assert_eq!(p.get("x").unwrap(), &Value::Int(3));
        assert_eq!(p.get("y").unwrap(), &Value::Int(4));
        assert_eq!(p.state(), InstanceState::Open);
    }

    #[test]
    fn positional_and_keyword_conflict() {
        let err = point()
            .instantiate(Args::positional([3]).kwarg("x", 4))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentError);

        let err = point().instantiate(Args::positional([1, 2, 3])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentError);
    }

    #[test]
    fn set_on_unknown_field() {
        let mut p = point().new_instance(kwargs! { "x" => 1 }).unwrap();
        let err = p.set("z", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownFieldError);
    }

    #[test]
    fn repr_and_display() {
        let p = point().new_instance(kwargs! { "x" => 1, "y" => "two" }).unwrap();
        assert_eq!(p.repr(), "Point(x=1, y='two')");
        assert_eq!(p.to_string(), "Point(x=1, y=two)");
    }
}
