//! Construction tracing infrastructure.
//!
//! The [`ConstructionTracer`] trait defines hook points at the events of class
//! definition and instance construction. Every hook has a default no-op body, and
//! the engine takes the tracer as a generic parameter, so [`NoopTracer`] compiles
//! away entirely.
//!
//! | Tracer | Purpose |
//! |--------|---------|
//! | [`NoopTracer`] | Zero-cost no-op |
//! | [`LogTracer`] | Forwards events to the `tracing` ecosystem (the default) |
//! | [`RecordingTracer`] | Full event recording for tests or post-mortem inspection |
//!
//! `ClassDecl::build` and `RecordClass::instantiate` use [`LogTracer`]; the
//! `*_traced` variants accept any tracer:
//!
//! ```
//! use baseclasses::{ClassDecl, RecordingTracer, TraceEvent, frozen_base_class, kwargs};
//!
//! let mut tracer = RecordingTracer::new();
//! let foo = ClassDecl::new("Foo")
//!     .extends(&frozen_base_class())
//!     .required("a", "int")
//!     .build_traced(&mut tracer)
//!     .unwrap();
//! foo.instantiate_traced(kwargs! { "a" => 1 }.into(), &mut tracer).unwrap();
//! assert!(matches!(tracer.events().last(), Some(TraceEvent::InstanceReady { .. })));
//! ```

use std::fmt;

use strum::Display;

use crate::{
    args::Kwargs,
    class::ClassStage,
    error::{ErrorKind, RecordError},
    instance::InstanceState,
};

/// Where a field's constructed value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ValueSource {
    /// Given by the caller (possibly rewritten by the pre-init hook).
    Supplied,
    /// The field's static default.
    StaticDefault,
    /// The field's default factory.
    Factory,
}

/// Trace event captured by [`RecordingTracer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// A class definition entered a new stage.
    ClassStage {
        class_name: String,
        stage: ClassStage,
    },
    /// A class definition failed; no class was produced.
    ClassRejected {
        class_name: String,
        kind: ErrorKind,
    },
    /// The pre-init hook returned the keyword mapping that construction will use.
    PreInit {
        class_name: String,
        /// Keys of the returned mapping, in order.
        keys: Vec<String>,
    },
    /// One field received its value.
    FieldResolved {
        class_name: String,
        field: String,
        source: ValueSource,
    },
    /// Construction finished; the instance is sealed or open.
    InstanceReady {
        class_name: String,
        state: InstanceState,
    },
}

/// Trait for construction tracing.
///
/// All methods have default no-op implementations, so implementations only
/// override the hooks they care about.
pub trait ConstructionTracer: fmt::Debug {
    /// Called when a class definition enters `stage`.
    #[inline(always)]
    fn on_class_stage(&mut self, _class_name: &str, _stage: ClassStage) {}

    /// Called when a class definition is aborted by `error`.
    #[inline(always)]
    fn on_class_rejected(&mut self, _class_name: &str, _error: &RecordError) {}

    /// Called after the pre-init hook with the mapping it returned.
    #[inline(always)]
    fn on_pre_init(&mut self, _class_name: &str, _kwargs: &Kwargs) {}

    /// Called as each field's value is resolved, in field-table order.
    #[inline(always)]
    fn on_field_resolved(&mut self, _class_name: &str, _field: &str, _source: ValueSource) {}

    /// Called once an instance leaves its construction state.
    #[inline(always)]
    fn on_instance_ready(&mut self, _class_name: &str, _state: InstanceState) {}
}

/// Zero-cost tracer that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl ConstructionTracer for NoopTracer {}

/// Tracer that emits every event through the `tracing` crate.
///
/// Class-level events are logged at `debug`, per-field events at `trace`, and
/// rejected class definitions at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl ConstructionTracer for LogTracer {
    fn on_class_stage(&mut self, class_name: &str, stage: ClassStage) {
        tracing::debug!(class = class_name, %stage, "record class stage");
    }

    fn on_class_rejected(&mut self, class_name: &str, error: &RecordError) {
        tracing::warn!(class = class_name, kind = %error.kind(), "record class rejected: {}", error.message());
    }

    fn on_pre_init(&mut self, class_name: &str, kwargs: &Kwargs) {
        tracing::trace!(class = class_name, keys = ?kwargs.keys().collect::<Vec<_>>(), "pre-init hook applied");
    }

    fn on_field_resolved(&mut self, class_name: &str, field: &str, source: ValueSource) {
        tracing::trace!(class = class_name, field, %source, "field resolved");
    }

    fn on_instance_ready(&mut self, class_name: &str, state: InstanceState) {
        tracing::trace!(class = class_name, %state, "instance constructed");
    }
}

/// Tracer that records every event in order.
#[derive(Debug, Clone)]
pub struct RecordingTracer {
    /// All recorded events in chronological order.
    events: Vec<TraceEvent>,
    /// Optional limit on number of events recorded.
    limit: Option<usize>,
}

impl RecordingTracer {
    /// Creates a new recording tracer with no event limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            limit: None,
        }
    }

    /// Creates a new recording tracer that stops recording after `limit` events.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Vec::with_capacity(limit.min(1024)),
            limit: Some(limit),
        }
    }

    /// Returns the recorded events.
    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Consumes the tracer and returns the recorded events.
    #[must_use]
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }

    /// Clears recorded events, keeping the limit.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    fn record(&mut self, event: TraceEvent) {
        if self.limit.is_some_and(|l| self.events.len() >= l) {
            return;
        }
        self.events.push(event);
    }
}

impl Default for RecordingTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionTracer for RecordingTracer {
    fn on_class_stage(&mut self, class_name: &str, stage: ClassStage) {
        self.record(TraceEvent::ClassStage {
            class_name: class_name.to_owned(),
            stage,
        });
    }

    fn on_class_rejected(&mut self, class_name: &str, error: &RecordError) {
        self.record(TraceEvent::ClassRejected {
            class_name: class_name.to_owned(),
            kind: error.kind(),
        });
    }

    fn on_pre_init(&mut self, class_name: &str, kwargs: &Kwargs) {
        self.record(TraceEvent::PreInit {
            class_name: class_name.to_owned(),
            keys: kwargs.keys().cloned().collect(),
        });
    }

    fn on_field_resolved(&mut self, class_name: &str, field: &str, source: ValueSource) {
        self.record(TraceEvent::FieldResolved {
            class_name: class_name.to_owned(),
            field: field.to_owned(),
            source,
        });
    }

    fn on_instance_ready(&mut self, class_name: &str, state: InstanceState) {
        self.record(TraceEvent::InstanceReady {
            class_name: class_name.to_owned(),
            state,
        });
    }
}
