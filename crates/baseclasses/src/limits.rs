/// Maximum length of the Method Resolution Order (MRO) list for any record class.
///
/// Limits the output of C3 linearization so diamond-heavy hierarchies cannot
/// consume unbounded memory while a class is being defined.
pub const MAX_MRO_LENGTH: usize = 2600;

/// Maximum depth of single-path inheritance chains.
pub const MAX_INHERITANCE_DEPTH: usize = 1000;

/// Definition-time limits applied while a record class is built.
///
/// Field-count limits are optional - set to `None` to disable them.
/// Use `SchemaLimits::default()` for the standard limits, or build custom limits
/// with the builder pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLimits {
    /// Maximum length of any base's MRO before the new class is rejected.
    pub max_inheritance_depth: usize,
    /// Maximum length of the linearized MRO of the new class.
    pub max_mro_length: usize,
    /// Maximum number of fields in the merged field table.
    pub max_fields: Option<usize>,
}

impl Default for SchemaLimits {
    fn default() -> Self {
        Self {
            max_inheritance_depth: MAX_INHERITANCE_DEPTH,
            max_mro_length: MAX_MRO_LENGTH,
            max_fields: None,
        }
    }
}

impl SchemaLimits {
    /// Creates limits with the default depth and MRO caps and no field cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum inheritance depth.
    #[must_use]
    pub fn max_inheritance_depth(mut self, limit: usize) -> Self {
        self.max_inheritance_depth = limit;
        self
    }

    /// Sets the maximum MRO length.
    #[must_use]
    pub fn max_mro_length(mut self, limit: usize) -> Self {
        self.max_mro_length = limit;
        self
    }

    /// Sets the maximum number of merged fields.
    #[must_use]
    pub fn max_fields(mut self, limit: usize) -> Self {
        self.max_fields = Some(limit);
        self
    }
}
