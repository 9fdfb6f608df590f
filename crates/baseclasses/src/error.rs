use std::fmt;

use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for every fallible record operation.
pub type RecordResult<T> = Result<T, RecordError>;

/// Kinds of contract violation a record class or instance can report.
///
/// Uses strum derives for `Display`, `FromStr`, and `Into<&'static str>`; the string
/// form matches the variant name exactly (e.g. `FieldOrderError` -> "FieldOrderError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
pub enum ErrorKind {
    /// Conflicting or invalid field descriptor or class declaration options.
    ConfigurationError,
    /// A field without a default follows a field with one in the merged order.
    FieldOrderError,
    /// A required field was neither supplied nor defaulted.
    MissingFieldError,
    /// A keyword argument or attribute name is not a declared field.
    UnknownFieldError,
    /// Positional arguments were used where the class does not support them.
    ArgumentError,
    /// A write was attempted on a sealed (frozen) instance.
    FrozenInstanceError,
}

impl ErrorKind {
    /// Returns true for kinds raised while a class is being defined.
    ///
    /// Every other kind is raised while an instance is being built or used.
    #[must_use]
    pub fn is_definition_error(self) -> bool {
        matches!(self, Self::ConfigurationError | Self::FieldOrderError)
    }
}

/// A record contract violation: the kind plus a human readable message.
///
/// Every error surfaces immediately; nothing in this crate retries or swallows one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    kind: ErrorKind,
    message: String,
}

impl RecordError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn into_message(self) -> String {
        self.message
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigurationError, message)
    }

    pub(crate) fn field_order(class_name: &str, field: &str, after: &str) -> Self {
        Self::new(
            ErrorKind::FieldOrderError,
            format!("{class_name}: non-default field {field:?} follows default field {after:?}"),
        )
    }

    pub(crate) fn missing_field(class_name: &str, field: &str) -> Self {
        Self::new(
            ErrorKind::MissingFieldError,
            format!("{class_name}() missing required argument: {field:?}"),
        )
    }

    pub(crate) fn unknown_fields(class_name: &str, names: &[&str]) -> Self {
        let listed = names.iter().map(|name| format!("{name:?}")).collect::<Vec<_>>().join(", ");
        Self::new(
            ErrorKind::UnknownFieldError,
            format!("{class_name}() unexpected arguments: {listed}"),
        )
    }

    pub(crate) fn unknown_attribute(class_name: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownFieldError,
            format!("{class_name} has no field {name:?}"),
        )
    }

    pub(crate) fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ArgumentError, message)
    }

    pub(crate) fn frozen_instance(field: &str) -> Self {
        Self::new(ErrorKind::FrozenInstanceError, format!("cannot assign to field {field:?}"))
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RecordError {}
