//! Constructor signature introspection.
//!
//! A [`Signature`] describes the constructor a record class accepts, derived
//! from its resolved field table. Its `Display` form mirrors a Python signature:
//! `Foo(*, a: int, b: int = 5, y: float = <factory>)`. The leading `*` marks
//! keyword-only construction and is omitted for classes that accept positional
//! arguments.

use std::fmt::{self, Write};

use crate::{class::RecordClass, field::FieldDefault, value::Value};

/// Default shown for one constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterDefault {
    /// The parameter is required.
    Required,
    /// A static default value.
    Value(Value),
    /// Computed per instance by a factory.
    Factory,
}

/// One constructor parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub annotation: Option<String>,
    pub default: ParameterDefault,
}

impl Parameter {
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default == ParameterDefault::Required
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(annotation) = &self.annotation {
            write!(f, ": {annotation}")?;
        }
        let sep = if self.annotation.is_some() { " = " } else { "=" };
        match &self.default {
            ParameterDefault::Required => Ok(()),
            ParameterDefault::Value(value) => {
                f.write_str(sep)?;
                value.repr_fmt(f)
            }
            ParameterDefault::Factory => {
                f.write_str(sep)?;
                f.write_str("<factory>")
            }
        }
    }
}

/// The constructor signature of a record class.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    class_name: String,
    parameters: Vec<Parameter>,
    keyword_only: bool,
}

impl Signature {
    pub(crate) fn of(class: &RecordClass) -> Self {
        let parameters = class
            .fields()
            .values()
            .map(|spec| Parameter {
                name: spec.name().to_owned(),
                annotation: spec.annotation().map(str::to_owned),
                default: match spec.default_value() {
                    FieldDefault::Missing => ParameterDefault::Required,
                    FieldDefault::Value(value) => ParameterDefault::Value(value.clone()),
                    FieldDefault::Factory(_) => ParameterDefault::Factory,
                },
            })
            .collect();
        Self {
            class_name: class.name().to_owned(),
            parameters,
            keyword_only: !class.accepts_positional(),
        }
    }

    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Parameters in field-table order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Names of the parameters that must be supplied.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name.as_str())
    }

    /// Whether every parameter must be passed by keyword.
    #[must_use]
    pub fn is_keyword_only(&self) -> bool {
        self.keyword_only
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.class_name)?;
        let mut first = true;
        if self.keyword_only && !self.parameters.is_empty() {
            f.write_char('*')?;
            first = false;
        }
        for param in &self.parameters {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{param}")?;
        }
        f.write_char(')')
    }
}
